use std::path::PathBuf;

/// Returns the configuration directory.
///
/// `BLINDCLOCK_CONFIG_DIR` overrides the location outright. Otherwise this is
/// `~/.config/blindclock[-dev]/`, with `BLINDCLOCK_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match std::env::var_os("BLINDCLOCK_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BLINDCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("blindclock-dev")
            } else {
                base_dir.join("blindclock")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(data_dir()?.join("config.toml"))
}
