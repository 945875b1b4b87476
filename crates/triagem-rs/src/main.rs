//! Command-line front-end for the emergency-room screens.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use triagem_rs::Screen;
use triagem_rs::config::{LayeredConfigOptions, TriageConfig};
use triagem_rs::core::{CallAnnouncer, LogAnnouncer, PanelView, announcement_text};
use triagem_rs::protocol::{
    AttendanceType, Patient, PriorityLevel, StoreEvent, TriageCall, available_priorities,
};

/// Command-line options.
#[derive(Parser, Debug)]
#[command(name = "triagem", version, about = "Emergency-room triage screens")]
struct Cli {
    /// Extra triagem.json5 layer applied over the user and cwd files
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overriding config and TRIAGEM_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a patient at reception
    Register {
        #[arg(long)]
        name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: String,
        #[arg(long)]
        cpf: String,
    },
    /// Show both waiting queues
    Queue,
    /// Call a patient to triage
    CallTriage { patient_id: String },
    /// Classify a patient after triage
    Classify {
        patient_id: String,
        #[arg(long)]
        priority: PriorityLevel,
        #[arg(long)]
        attendance: AttendanceType,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Call a patient to a consultation room
    CallDoctor {
        patient_id: String,
        /// Room label shown on the panel
        #[arg(long)]
        room: String,
        /// Room id sent to the backend; defaults to calls.default_room_id
        #[arg(long)]
        room_id: Option<u32>,
    },
    /// Finish a consultation (local only)
    Complete { patient_id: String },
    /// Print the recent calls list
    Calls {
        #[arg(long)]
        json: bool,
    },
    /// Print the Manchester priority table
    Priorities,
    /// Manage consultation rooms
    Rooms {
        #[command(subcommand)]
        command: RoomsCommand,
    },
    /// Run the public call panel until interrupted
    Panel,
    /// Poll the backend and print the queues until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
enum RoomsCommand {
    List,
    Add { numero: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    triagem_rs::init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        "starting triagem (base_url={}, command={:?})",
        config.gateway.base_url, cli.command
    );
    let mut screen = Screen::open(config)?;
    run(&mut screen, cli.command).await?;
    screen.close();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<TriageConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = &cli.config {
        options = options.with_runtime_path(path);
    }
    let layered =
        TriageConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    if let Some(url) = &cli.api_url {
        config.gateway.base_url = url.clone();
        config.validate().context("invalid --api-url")?;
    }
    Ok(config)
}

async fn run(screen: &mut Screen, command: Command) -> Result<()> {
    let store = screen.store().clone();
    match command {
        Command::Register {
            name,
            birth_date,
            cpf,
        } => {
            let patient = store
                .register_patient(&name, &birth_date, &cpf)
                .await
                .context("failed to register patient")?;
            println!(
                "registered {} (id {}, ticket {})",
                patient.full_name, patient.id, patient.ticket_number
            );
        }
        Command::Queue => {
            refresh_or_bail(screen).await?;
            print_queues(&store.waiting_for_triage(), &store.waiting_for_doctor());
        }
        Command::CallTriage { patient_id } => {
            refresh_or_bail(screen).await?;
            let call = store
                .call_for_triage(&patient_id)
                .context("failed to call patient to triage")?;
            println!("{}", announcement_text(&call));
        }
        Command::Classify {
            patient_id,
            priority,
            attendance,
            notes,
        } => {
            if !available_priorities(attendance).contains(&priority) {
                let allowed: Vec<&str> = available_priorities(attendance)
                    .iter()
                    .map(PriorityLevel::as_str)
                    .collect();
                bail!(
                    "{} attendance allows priorities: {}",
                    attendance.label(),
                    allowed.join(", ")
                );
            }
            store
                .assign_priority(&patient_id, priority, attendance, &notes)
                .await
                .context("failed to classify patient")?;
            println!(
                "patient {patient_id} classified as {} ({})",
                priority.config().label,
                attendance.label()
            );
        }
        Command::CallDoctor {
            patient_id,
            room,
            room_id,
        } => {
            refresh_or_bail(screen).await?;
            let room_id = room_id.unwrap_or(screen.config().calls.default_room_id);
            match store
                .call_for_doctor_in(&patient_id, room_id, &room)
                .await
                .context("failed to call patient to consultation")?
            {
                Some(call) => println!("{}", announcement_text(&call)),
                None => println!("patient {patient_id} called (not in the local queue)"),
            }
        }
        Command::Complete { patient_id } => {
            refresh_or_bail(screen).await?;
            if store.complete_consultation(&patient_id) {
                println!("consultation for {patient_id} completed locally");
            } else {
                bail!("patient {patient_id} is not in the local queue");
            }
        }
        Command::Calls { json } => {
            let calls = store.recent_calls();
            if json {
                println!("{}", serde_json::to_string_pretty(&calls)?);
            } else {
                calls.iter().for_each(print_call);
            }
        }
        Command::Priorities => {
            for level in PriorityLevel::ALL {
                let config = level.config();
                println!(
                    "{}. {:<7} {:<14} {}",
                    config.order,
                    level.as_str(),
                    config.label,
                    config.wait_time
                );
            }
        }
        Command::Rooms { command } => {
            let rooms = screen.rooms();
            match command {
                RoomsCommand::List => {
                    for room in rooms.list().await.context("failed to list rooms")? {
                        println!("Consultório {} (id {})", room.numero, room.id);
                    }
                }
                RoomsCommand::Add { numero } => {
                    let numero = rooms.add(&numero).await.context("failed to add room")?;
                    println!("Consultório {numero} registered");
                }
            }
        }
        Command::Panel => run_panel(screen).await?,
        Command::Watch => run_watch(screen).await?,
    }
    Ok(())
}

async fn refresh_or_bail(screen: &Screen) -> Result<()> {
    if !screen.store().refresh().await.is_applied() {
        bail!(
            "could not load queues from {}",
            screen.config().gateway.base_url
        );
    }
    Ok(())
}

async fn run_panel(screen: &mut Screen) -> Result<()> {
    screen.follow_calls()?;
    let store = screen.store().clone();
    let mut events = store.subscribe();
    let mut announcer = CallAnnouncer::new(Arc::new(LogAnnouncer));
    let initial = store.recent_calls();
    print_panel(&PanelView::from_calls(&initial));
    announcer.observe(&initial);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::CallsChanged { calls }) => {
                    if announcer.observe(&calls) {
                        print_panel(&PanelView::from_calls(&calls));
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("panel lagged behind store events (skipped={skipped})");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    info!("panel stopped");
    Ok(())
}

async fn run_watch(screen: &mut Screen) -> Result<()> {
    screen.follow_calls()?;
    let store = screen.store().clone();
    let mut events = store.subscribe();
    let refresh_loop = screen.start_refresh();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::PatientsRefreshed { .. }) => {
                    print_queues(&store.waiting_for_triage(), &store.waiting_for_doctor());
                }
                Ok(StoreEvent::Divergence(divergence)) => {
                    println!(
                        "! patient {} changed on the server ({:?})",
                        divergence.patient_id, divergence.kind
                    );
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("watch lagged behind store events (skipped={skipped})");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    refresh_loop.stop();
    Ok(())
}

fn print_queues(triage: &[Patient], doctor: &[Patient]) {
    println!("Aguardando triagem ({})", triage.len());
    for patient in triage {
        println!("  {:<6} {:<4} {}", patient.ticket_number, patient.id, patient.full_name);
    }
    println!("Aguardando médico ({})", doctor.len());
    for patient in doctor {
        let priority = patient
            .priority
            .map(|level| level.config().label)
            .unwrap_or("-");
        let attendance = patient
            .attendance_type
            .map(|kind| kind.label())
            .unwrap_or("-");
        println!(
            "  {:<6} {:<4} {:<24} {:<14} {}",
            patient.ticket_number, patient.id, patient.full_name, priority, attendance
        );
    }
}

fn print_call(call: &TriageCall) {
    println!(
        "{} {}",
        call.timestamp.format("%H:%M:%S"),
        announcement_text(call)
    );
}

fn print_panel(view: &PanelView) {
    match &view.current {
        Some(call) => println!("== {} ==", announcement_text(call)),
        None => println!("== aguardando chamadas =="),
    }
    view.previous.iter().for_each(print_call);
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, RoomsCommand};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use triagem_rs::protocol::{AttendanceType, PriorityLevel};

    #[test]
    fn parses_classify_with_typed_levels() {
        let cli = Cli::try_parse_from([
            "triagem",
            "classify",
            "7",
            "--priority",
            "orange",
            "--attendance",
            "samu",
        ])
        .expect("parse");
        match cli.command {
            Command::Classify {
                patient_id,
                priority,
                attendance,
                notes,
            } => {
                assert_eq!(patient_id, "7");
                assert_eq!(priority, PriorityLevel::Orange);
                assert_eq!(attendance, AttendanceType::Samu);
                assert_eq!(notes, "");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_priority() {
        let parsed = Cli::try_parse_from([
            "triagem",
            "classify",
            "7",
            "--priority",
            "purple",
            "--attendance",
            "clinical",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "triagem",
            "rooms",
            "add",
            "5",
            "--api-url",
            "http://127.0.0.1:9000",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert!(matches!(
            cli.command,
            Command::Rooms {
                command: RoomsCommand::Add { ref numero }
            } if numero == "5"
        ));
    }
}
