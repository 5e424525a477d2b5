use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "trellis", version, about = "Trellis template CLI")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against JSON data and print the markup.
    Render {
        /// Path to the template fragment
        input: PathBuf,
        /// Path to a JSON data file (defaults to null data)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Directory of partial templates, registered by file stem
        #[arg(long)]
        partials: Option<PathBuf>,
    },
    /// Compile a template and report directive errors without rendering.
    Check {
        /// Path to the template fragment
        input: PathBuf,
        /// Directory of partial templates, registered by file stem
        #[arg(long)]
        partials: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Render {
            input,
            data,
            partials,
        } => {
            let html = trellis_cli::render_cmd(&input, data.as_deref(), partials.as_deref())?;
            println!("{html}");
        }
        Commands::Check { input, partials } => {
            trellis_cli::check_cmd(&input, partials.as_deref())?;
            println!("ok: {}", input.display());
        }
    }
    Ok(())
}
