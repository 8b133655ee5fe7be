//! MetaPak CLI - Command-line interface for APK texture containers

mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "metapak", version)]
#[command(about = "MetaPak: unpack and repack APK texture containers", long_about = None)]
struct Cli {
    /// Archive to unpack, or directory to pack
    input: PathBuf,

    /// Output directory when unpacking, archive path when packing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List archive entries instead of unpacking
    #[arg(long)]
    list: bool,

    /// Print the listing as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Check the archive layout and decode every entry without writing
    #[arg(long, conflicts_with = "list")]
    verify: bool,

    /// Keep unpacking after an entry fails
    #[arg(long)]
    keep_going: bool,

    /// Compress entries on all cores when packing
    #[arg(long)]
    parallel: bool,

    /// Only report warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every entry
    #[arg(short, long)]
    verbose: bool,
}

/// Run the MetaPak CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let input = cli.input.as_path();
    if input.is_file() {
        if cli.list {
            commands::list::execute(input, cli.json)
        } else if cli.verify {
            commands::verify::execute(input, cli.quiet)
        } else {
            commands::unpack::execute(input, cli.output.as_deref(), cli.keep_going, cli.quiet)
        }
    } else if input.is_dir() {
        if cli.list || cli.verify {
            anyhow::bail!(
                "--list and --verify take an archive, but {} is a directory",
                input.display()
            );
        }
        commands::pack::execute(input, cli.output.as_deref(), cli.parallel, cli.quiet)
    } else {
        anyhow::bail!("Input not found: {}", input.display())
    }
}
