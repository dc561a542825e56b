//! Read model configuration files.
//!
//! A config file holds one model's configuration struct. Missing fields take
//! the model defaults, so `{"loss": 2}` is a valid static credit config.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::AppError;

pub fn read_config_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open config JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::io(format!("Invalid config JSON '{}': {e}", path.display())))
}
