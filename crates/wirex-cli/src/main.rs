//! wirex - resolve module repositories from the command line.

mod commands;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "wirex")]
#[command(about = "Resolve module dependencies wired through capabilities", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = commands::execute(cli.command)?;
    std::process::exit(code);
}

/// RUST_LOG wins over the verbosity flags when set
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
