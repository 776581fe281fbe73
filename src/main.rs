//! inside-imaging: turn one radiology report into a lay summary record.
//!
//! Usage:
//!   inside-imaging report.txt              Summarize a file, print JSON
//!   inside-imaging - < report.txt          Read the report from stdin
//!   inside-imaging report.txt --offline    Heuristics only, no model call

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use inside_imaging::config::GLOSSARY_ENV;
use inside_imaging::pipeline::processor::DEFAULT_LANGUAGE;
use inside_imaging::{init_tracing, Glossary, ReportProcessor};

#[derive(Error, Debug)]
enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

#[derive(Parser, Debug)]
#[command(name = "inside-imaging", version, about = "Summarize a radiology report in plain language")]
struct Cli {
    /// Report text file. Reads stdin when omitted or `-`.
    report: Option<PathBuf>,

    /// Output language passed to the summary model.
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Two-column CSV of term replacements.
    #[arg(short, long, env = GLOSSARY_ENV)]
    glossary: Option<PathBuf>,

    /// Skip the language model even when a credential is configured.
    #[arg(long)]
    offline: bool,

    /// Pretty-print the JSON record.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let raw = read_report(cli.report.as_deref())?;
    let glossary = cli
        .glossary
        .as_deref()
        .map(Glossary::load)
        .unwrap_or_default();

    let processor = if cli.offline {
        ReportProcessor::new(glossary, None)
    } else {
        ReportProcessor::from_env(glossary)
    };
    tracing::debug!(provider = processor.has_provider(), input_len = raw.len(), "Processing report");

    let report = processor.process(&raw, &cli.language);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

fn read_report(path: Option<&Path>) -> Result<String, AppError> {
    match path {
        None => read_stdin(),
        Some(p) if p.as_os_str() == "-" => read_stdin(),
        Some(p) if p.is_dir() => Err(AppError::Usage(format!(
            "{} is a directory, expected a report text file",
            p.display()
        ))),
        Some(p) => Ok(std::fs::read_to_string(p)?),
    }
}

fn read_stdin() -> Result<String, AppError> {
    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "inside-imaging",
            "report.txt",
            "--language",
            "Kiswahili",
            "--offline",
        ])
        .unwrap();
        assert_eq!(cli.report, Some(PathBuf::from("report.txt")));
        assert_eq!(cli.language, "Kiswahili");
        assert!(cli.offline);
        assert!(!cli.pretty);
    }

    #[test]
    fn reads_report_file_and_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "FINDINGS: Normal.").unwrap();

        assert_eq!(read_report(Some(&path)).unwrap(), "FINDINGS: Normal.");
        assert!(matches!(read_report(Some(dir.path())), Err(AppError::Usage(_))));
        assert!(matches!(
            read_report(Some(&dir.path().join("missing.txt"))),
            Err(AppError::Io(_))
        ));
    }
}
