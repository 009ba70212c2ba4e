//! Engine configuration, loaded from JSON.
//!
//! Every field has a default, so a partial document (or `{}`) is valid:
//!
//! ```
//! use stratum_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "light_count": 4 }"#).unwrap();
//! assert_eq!(config.light_count, 4);
//! assert_eq!(config.database.bucket_byte_budget, 32_000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use stratum_ecs::implementer::MAX_BUCKET_BYTES;
use stratum_ecs::DatabaseConfig;

use crate::engines::SceneConfig;
use crate::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    /// Seed for the debug scene's generator.
    pub random_seed: u64,
    /// Scattered rock meshes in the debug scene.
    pub mesh_count: u32,
    /// Light spheres in the debug scene.
    pub light_count: u32,
    /// Frames the demo runs before exiting.
    pub frame_count: u64,
    /// Half-size of the cubic culling region centered on the origin.
    pub cull_half_extent: f32,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            random_seed: 512,
            mesh_count: 256,
            light_count: 32,
            frame_count: 60,
            cull_half_extent: 50.0,
            log_filter: "info".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.database.bucket_byte_budget == 0 {
            return Err(invalid("database.bucket_byte_budget must be positive"));
        }
        if self.database.bucket_byte_budget > MAX_BUCKET_BYTES {
            return Err(invalid(format!(
                "database.bucket_byte_budget must be at most {MAX_BUCKET_BYTES}, got {}",
                self.database.bucket_byte_budget
            )));
        }
        if !(self.cull_half_extent.is_finite() && self.cull_half_extent > 0.0) {
            return Err(invalid(format!(
                "cull_half_extent must be positive and finite, got {}",
                self.cull_half_extent
            )));
        }
        if self.log_filter.trim().is_empty() {
            return Err(invalid("log_filter must not be empty"));
        }
        Ok(())
    }

    /// The debug scene this configuration describes.
    pub fn scene(&self) -> SceneConfig {
        SceneConfig {
            seed: self.random_seed,
            mesh_count: self.mesh_count,
            light_count: self.light_count,
        }
    }
}

fn invalid(reason: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig {
        reason: reason.into(),
    }
}
