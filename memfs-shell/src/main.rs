mod cli;
mod command;

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use memfs::FileSystem;

use self::{cli::Cli, command::Command};

const LINE_START: &str = ">> ";

fn main() -> io::Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();
    log::info!("config={config:?}");

    let interactive = cli.script.is_none() && io::stdin().is_terminal();
    let input: Box<dyn BufRead> = match &cli.script {
        Some(script) => Box::new(BufReader::new(File::open(script)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut fs = FileSystem::with_config(config);
    let mut stdout = io::stdout().lock();
    let mut failures = 0usize;

    if interactive {
        write!(stdout, "{LINE_START}")?;
        stdout.flush()?;
    }
    for line in input.lines() {
        let line = line?;

        let outcome = match Command::parse(&line) {
            Ok(None) => Ok(None),
            Ok(Some(Command::Exit)) => break,
            Ok(Some(cmd)) => cmd.execute(&mut fs).map(Some).map_err(|e| {
                log::debug!("{line:?} failed with errno {}", e.errno());
                e.to_string()
            }),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(Some(out)) if !out.is_empty() => writeln!(stdout, "{out}")?,
            Ok(_) => (),
            Err(e) => {
                failures += 1;
                writeln!(stdout, "error: {e}")?;
            }
        }

        if interactive {
            write!(stdout, "{LINE_START}")?;
            stdout.flush()?;
        }
    }

    log::info!("{failures} command(s) failed");
    if cli.strict && failures > 0 {
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
