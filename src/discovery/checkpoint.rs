//! Discovery checkpoint persistence.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::schema::DiscoveryCheckpoint;

/// Checkpoint load or save failure.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no checkpoint found")]
    NoCheckpoint,
    #[error("invalid checkpoint: {0}")]
    Invalid(String),
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Write a checkpoint as pretty JSON.
///
/// The file is written next to its destination and renamed into place, so a
/// reader never sees a partial checkpoint.
pub fn save_checkpoint(
    path: &Path,
    checkpoint: &DiscoveryCheckpoint,
) -> Result<(), CheckpointError> {
    let json = serde_json::to_string_pretty(checkpoint)
        .map_err(|e| CheckpointError::Invalid(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a checkpoint written by [`save_checkpoint`].
pub fn load_checkpoint(path: &Path) -> Result<DiscoveryCheckpoint, CheckpointError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CheckpointError::NoCheckpoint),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&json).map_err(|e| CheckpointError::Invalid(e.to_string()))
}
