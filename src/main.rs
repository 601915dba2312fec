//! Command-line entry point.

use std::io::{self, Write};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use dupehunt::cli::Cli;
use dupehunt::config::Config;
use dupehunt::engine::{Engine, RunOutcome, ThreadConfig};
use dupehunt::error::ExitCode;
use dupehunt::{logging, output, signal};

fn main() {
    match run() {
        Ok(code) => process::exit(code.as_i32()),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(ExitCode::Error.as_i32());
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version arrive here as "errors" with exit 0;
            // genuine usage errors must exit 1, so clap's own exit codes
            // cannot be used.
            let code = if e.use_stderr() {
                ExitCode::Error
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            return Ok(code);
        }
    };

    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::from_cli(&cli)?;
    let output_format = config.output_format;

    let handler = signal::install_handler();

    let threads = match cli.threads {
        Some(total) => ThreadConfig::balanced(total.max(1)),
        None => ThreadConfig::default(),
    };

    let mut engine = Engine::new(config, threads, handler.get_flag())?;
    engine.start();
    engine.wait_for_finish();

    let stdout = io::stdout();
    let mut writer = io::BufWriter::new(stdout.lock());
    match engine.outcome() {
        RunOutcome::Files(files) => output::write_file_list(&mut writer, &files),
        RunOutcome::Groups(groups) => output::write_groups(&mut writer, output_format, &groups),
    }
    .and_then(|()| writer.flush())
    .context("failed to write results")?;

    Ok(if handler.is_shutdown_requested() {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}
