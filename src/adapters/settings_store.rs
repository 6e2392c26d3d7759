use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::builder_for;
use crate::domain::Settings;
use crate::error::Result;
use crate::strategy::SettingsStore;

/// Settings read from the `[settings]` section of the config directory (plus env overrides)
#[derive(Debug, Clone)]
pub struct ConfigSettingsStore {
    config_dir: PathBuf,
}

impl ConfigSettingsStore {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SettingsStore for ConfigSettingsStore {
    async fn fetch_settings(&self) -> Result<Settings> {
        debug!("loading settings from {}", self.config_dir.display());
        let settings = builder_for(&self.config_dir)?
            .build()?
            .get::<Settings>("settings")?;
        Ok(settings)
    }
}
