//! Studio configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command-line flags override whatever the file sets.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::upload::MAX_UPLOAD_BYTES;
use crate::error::{Result, StudioError};
use crate::export::ExportFormat;

/// Settings shared by the library session and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Largest accepted upload in bytes
    pub max_upload_bytes: u64,
    /// Seed for reverb impulse responses; random per render when unset
    pub impulse_seed: Option<u64>,
    /// Format requested when exporting
    pub export_format: ExportFormat,
    /// Delay before the single playback recovery attempt
    pub recovery_delay_ms: u64,
    /// Per-field tolerance under which two parameter sets count as equal
    pub param_epsilon: f64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            impulse_seed: None,
            export_format: ExportFormat::Wav,
            recovery_delay_ms: 100,
            param_epsilon: 0.001,
        }
    }
}

impl StudioConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: StudioConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(StudioError::InvalidParameter {
                param: "max_upload_bytes".to_string(),
                value: self.max_upload_bytes.to_string(),
                expected: "a positive byte count".to_string(),
            });
        }

        if !self.param_epsilon.is_finite() || self.param_epsilon <= 0.0 {
            return Err(StudioError::InvalidParameter {
                param: "param_epsilon".to_string(),
                value: self.param_epsilon.to_string(),
                expected: "a positive tolerance".to_string(),
            });
        }

        Ok(())
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}
