//! `rotable` — converts between the CT binary table format and XLSX
//! workbooks (`spec.md` §4.6, §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rotable::driver;

/// Convert a `.ct`/`.xlsx` file, or every such file in a directory, to the
/// opposite format.
#[derive(Parser, Debug)]
#[command(name = "rotable", version, about)]
struct Cli {
    /// A `.ct` or `.xlsx` file, or a directory containing such files.
    path: PathBuf,

    /// Recurse into subdirectories (default: only the directory's
    /// immediate entries are converted, `spec.md` §4.6).
    #[arg(short, long)]
    recurse: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.path.exists() {
        eprintln!("rotable: path not found: {}", cli.path.display());
        return ExitCode::from(2);
    }

    let reports = driver::convert_path(&cli.path, cli.recurse);
    if reports.is_empty() {
        eprintln!("rotable: no .ct or .xlsx files found at {}", cli.path.display());
        return ExitCode::from(2);
    }

    let mut failed = false;
    for report in &reports {
        match &report.error {
            None => println!(
                "{} -> {}",
                report.input.display(),
                report.output.as_ref().expect("success report carries an output path").display()
            ),
            Some(error) => {
                eprintln!("{}: {error}", report.input.display());
                failed = true;
            },
        }
    }

    if failed { ExitCode::from(1) } else { ExitCode::from(0) }
}
