use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use triagem_rs_config::CallsConfig;
use triagem_rs_core::{CallBroadcast, PatientStore, RefreshLoop};
use triagem_rs_storage::MemoryDurableStore;
use triagem_rs_test_utils::{GatewayRequest, StubGateway, triage_record};

fn store(stub: &StubGateway) -> PatientStore {
    let broadcast = CallBroadcast::new(Arc::new(MemoryDurableStore::new()), "recentCalls");
    PatientStore::new(Arc::new(stub.clone()), broadcast, CallsConfig::default())
}

fn triage_fetches(stub: &StubGateway) -> usize {
    stub.requests()
        .iter()
        .filter(|request| **request == GatewayRequest::WaitingForTriage)
        .count()
}

#[tokio::test]
async fn loop_refreshes_immediately_and_repeatedly() {
    let stub = StubGateway::new();
    stub.set_triage_queue(vec![triage_record(1, "Ana Silva", "T001")]);
    let store = store(&stub);
    let refresh_loop = RefreshLoop::spawn(store.clone(), Duration::from_millis(20));

    tokio::time::timeout(Duration::from_secs(2), async {
        while triage_fetches(&stub) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("three refreshes");
    assert!(refresh_loop.is_running());
    assert_eq!(store.waiting_for_triage().len(), 1);

    refresh_loop.stop();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!refresh_loop.is_running());
    let after_stop = triage_fetches(&stub);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(triage_fetches(&stub), after_stop);
}

#[tokio::test]
async fn dropping_loop_stops_refreshing() {
    let stub = StubGateway::new();
    let refresh_loop = RefreshLoop::spawn(store(&stub), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(refresh_loop);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let after_drop = triage_fetches(&stub);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(triage_fetches(&stub), after_drop);
}
