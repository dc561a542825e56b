//! Export a run (configuration + results) to JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::ModelConfig;
use crate::error::AppError;

/// On-disk schema of an exported run.
#[derive(Debug, Serialize)]
pub struct RunFile<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub config: &'a ModelConfig,
    pub result: &'a RunOutput,
}

impl<'a> RunFile<'a> {
    pub fn new(config: &'a ModelConfig, result: &'a RunOutput) -> Self {
        Self {
            tool: "rq",
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            config,
            result,
        }
    }
}

pub fn write_run_json(path: &Path, config: &ModelConfig, result: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create run JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &RunFile::new(config, result))
        .map_err(|e| AppError::io(format!("Failed to write run JSON: {e}")))?;
    Ok(())
}
