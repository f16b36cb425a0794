//! CLI entry point: `sdtrewrite [-v|--verbose] <OBJECTS>...`.

use clap::Parser;
use sdtrewrite::driver;
use sdtrewrite::logging::StderrLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sdtrewrite", about = "Rewrite SDT probe call sites in relocatable ELF objects")]
struct Cli {
    /// Log added sections and rewritten relocations at info level.
    #[arg(short, long)]
    verbose: bool,

    /// Relocatable ELF object files to rewrite in place.
    #[arg(required = true)]
    objects: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let logger = StderrLogger;
    match driver::run_files(&cli.objects, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
