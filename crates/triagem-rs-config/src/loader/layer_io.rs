//! Reading `triagem.json5` layers from disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Read a layer. A missing file is `None` unless the layer is required.
pub(super) fn read_layer(
    source: ConfigLayerSource,
    path: &Path,
    required: bool,
) -> Result<Option<LoadedLayer>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            debug!("no {:?} layer at {}", source, path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let value = parse_json5(&contents, &path.display().to_string())?;
    schema::validate_layer_schema(&value, &format!("{source:?}({})", path.display()))?;
    debug!(
        "read config layer (source={:?}, path={}, keys={})",
        source,
        path.display(),
        value.as_object().map_or(0, |map| map.len())
    );
    Ok(Some(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    }))
}

/// Parse JSON5 text, naming `origin` in the error.
pub(super) fn parse_json5(contents: &str, origin: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::ParseFailed {
        origin: origin.to_string(),
        source,
    })
}

/// `~/.triagem/triagem.json5`, when a home directory is known.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    let home = UserDirs::new()?.home_dir().to_path_buf();
    Some(home.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
}
