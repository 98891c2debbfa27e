//! Job configuration assembled from the environment.

use std::path::PathBuf;

use grid_processor::LoadOptions;
use renderer::RenderConfig;
use storage::ObjectStorageConfig;
use storm_common::{StormError, StormResult};

/// Everything a run needs besides its parameters.
#[derive(Debug, Clone, Default)]
pub struct StormConfig {
    pub storage: ObjectStorageConfig,
    pub load: LoadOptions,
    pub render: RenderConfig,
    /// Union every watershed feature instead of keeping the first.
    pub combine_all: bool,
    /// Parent of the per-run scratch directory; system temp dir when unset.
    pub work_root: Option<PathBuf>,
}

impl StormConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let combine_all = std::env::var("COMBINE_ALL_GEOMETRIES")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let work_root = std::env::var("WORK_ROOT")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            storage: ObjectStorageConfig::from_env(),
            load: LoadOptions::from_env(),
            render: RenderConfig::from_env(),
            combine_all,
            work_root,
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> StormResult<()> {
        self.storage.validate()?;
        self.load.validate()?;
        self.render.validate()?;

        if let Some(root) = &self.work_root {
            if !root.is_dir() {
                return Err(StormError::Config(format!(
                    "WORK_ROOT {} is not a directory",
                    root.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_plugin_behaviour() {
        let config = StormConfig::default();
        assert!(!config.load.clip);
        assert!(config.load.convert_units);
        assert!(!config.combine_all);
        assert_eq!(config.render.buffer_degrees, 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_work_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = StormConfig {
            work_root: Some(dir.path().join("nope")),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StormError::Config(_))));
    }
}
