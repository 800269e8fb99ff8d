use crate::io::Configuration;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads the configuration file. If it does not exist, the default settings are used and
/// written to `path` so that the user can see all the options of the run. The flag tells
/// whether the file was written.
pub fn read_config(path: &Path) -> Result<(Configuration, bool)> {
    let written: bool = !path.exists();
    let config: Configuration = if !written {
        let config_string: String = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str(&config_string)
            .with_context(|| format!("unable to parse config file {}", path.display()))?
    } else {
        let config = Configuration::default();
        let config_string: String = toml::to_string(&config)?;
        fs::write(path, config_string)
            .with_context(|| format!("unable to write config file {}", path.display()))?;
        config
    };
    config.validate()?;
    Ok((config, written))
}
