use cinder_anvil::DEFAULT_DATA_VERSION;
use cinder_world::{Biome, SECTION_HEIGHT};

use crate::error::LoaderError;

pub const DEFAULT_WORLD_HEIGHT: usize = 256;
/// Section indices are stored as a signed byte.
pub const MAX_WORLD_HEIGHT: usize = 128 * SECTION_HEIGHT;

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Blocks per chunk column, a multiple of 16.
    pub world_height: usize,
    /// Biome used where the stored one is missing or unknown.
    pub default_biome: Biome,
    /// `DataVersion` written into saved chunks.
    pub data_version: i32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            world_height: DEFAULT_WORLD_HEIGHT,
            default_biome: Biome::PLAINS,
            data_version: DEFAULT_DATA_VERSION,
        }
    }
}

impl LoaderConfig {
    /// Defaults overridden by `CINDER_WORLD_HEIGHT` and `CINDER_DATA_VERSION`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(height) = env_parse::<usize>("CINDER_WORLD_HEIGHT") {
            config.world_height = height;
        }
        if let Some(version) = env_parse::<i32>("CINDER_DATA_VERSION") {
            config.data_version = version;
        }
        if let Err(e) = config.validate() {
            log::warn!("{e}; falling back to a height of {DEFAULT_WORLD_HEIGHT}");
            config.world_height = DEFAULT_WORLD_HEIGHT;
        }
        config
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        let h = self.world_height;
        if h == 0 || h % SECTION_HEIGHT != 0 || h > MAX_WORLD_HEIGHT {
            return Err(LoaderError::InvalidConfig(format!(
                "world height {h} must be a multiple of {SECTION_HEIGHT} between {SECTION_HEIGHT} and {MAX_WORLD_HEIGHT}"
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "height={}, default_biome={}, data_version={}",
            self.world_height,
            self.default_biome.name(),
            self.data_version
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring {key}={raw:?}: not a number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world_height, 256);
        assert_eq!(config.default_biome, Biome::PLAINS);
    }

    #[test]
    fn test_rejects_bad_heights() {
        for height in [0, 100, 4096] {
            let config = LoaderConfig {
                world_height: height,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(LoaderError::InvalidConfig(_))), "{height}");
        }
        let tall = LoaderConfig {
            world_height: 384,
            ..Default::default()
        };
        assert!(tall.validate().is_ok());
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            LoaderConfig::default().summary(),
            "height=256, default_biome=minecraft:plains, data_version=2586"
        );
    }
}
