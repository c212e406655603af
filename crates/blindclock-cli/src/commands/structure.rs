use std::path::PathBuf;

use blindclock_core::countdown::SECS_PER_HOUR;
use blindclock_core::{format_remaining, Structure};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StructureAction {
    /// Validate a structure file
    Check {
        /// Structure TOML file
        file: PathBuf,
    },
    /// Print the levels of a structure file
    Show {
        /// Structure TOML file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load(file: &PathBuf) -> Result<Structure, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)?;
    Ok(Structure::from_toml_str(&content)?)
}

pub fn run(action: StructureAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        StructureAction::Check { file } => {
            let structure = load(&file)?;
            let total = u32::try_from(structure.total_duration_secs()).unwrap_or(u32::MAX);
            println!(
                "ok: {} ({} levels, {})",
                structure.name,
                structure.levels.len(),
                format_remaining(total, total > SECS_PER_HOUR)
            );
        }
        StructureAction::Show { file, json } => {
            let structure = load(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&structure)?);
            } else {
                println!("{}", structure.name);
                for (index, level) in structure.levels.iter().enumerate() {
                    println!("{index:>3}  {:<32} {:>8}", level.label(), level.display());
                }
            }
        }
    }
    Ok(())
}
