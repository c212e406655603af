use blindclock_core::countdown::SECS_PER_HOUR;
use blindclock_core::format_remaining;
use clap::Args;

#[derive(Args)]
pub struct FormatArgs {
    /// Remaining seconds
    seconds: u32,
    /// Always include a non-zero hour component
    #[arg(long)]
    show_hours: bool,
    /// Include hours only for values over an hour, as a level would
    #[arg(long, conflicts_with = "show_hours")]
    auto: bool,
}

pub fn run(args: FormatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let show_hours = args.show_hours || (args.auto && args.seconds > SECS_PER_HOUR);
    println!("{}", format_remaining(args.seconds, show_hours));
    Ok(())
}
