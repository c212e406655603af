use blindclock_core::WidgetConfig;
use clap::Subcommand;

use crate::paths;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "ids.toggle", "timing.beep_at_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let path = paths::config_path()?;
    match action {
        ConfigAction::Get { key } => {
            let config = WidgetConfig::load_from(&path)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = WidgetConfig::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = WidgetConfig::load_from(&path)?;
            println!("{}", config.to_toml_string()?);
        }
        ConfigAction::Reset => {
            WidgetConfig::default().save_to(&path)?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
