//! Configuration file loader with multi-source merging, adapted from
//! `infrastructure/src/config/loader.rs`'s project → global → defaults
//! figment layering — same priority order, renamed for this project.

use super::RuntimeConfig;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use std::path::PathBuf;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Priority (highest to lowest):
    /// 1. Explicit `--config` path
    /// 2. Project root: `./massgen.toml` or `./.massgen.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/massgen/config.toml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<RuntimeConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(RuntimeConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path).nested());
            }
        }

        for filename in &["massgen.toml", ".massgen.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path).nested());
        }

        figment.extract().map_err(Box::new)
    }

    pub fn load_defaults() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("massgen").join("config.toml"))
    }

    pub fn project_config_path() -> Option<PathBuf> {
        for filename in &["massgen.toml", ".massgen.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_defaults_matches_coordination_config_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.coordination.agents.is_empty());
        assert_eq!(config.workspace_root, PathBuf::from(".massgen/workspaces"));
    }

    #[test]
    fn global_config_path_is_always_some() {
        assert!(ConfigLoader::global_config_path().is_some());
    }
}
