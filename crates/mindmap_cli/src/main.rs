//! CLI entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mindmap_core` linkage.
//! - Convert an exported map file into any non-rendered export format.
//!
//! Set `MINDMAP_LOG_DIR` to an absolute path to enable core logging.

use clap::{Parser, Subcommand};
use log::{error, info};
use mindmap_core::{
    default_log_level, export_snapshot, import_snapshot, init_logging, CoreConfig, ExportFormat,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "MINDMAP_LOG_DIR";
const CONFIG_ENV: &str = "MINDMAP_CONFIG";

/// Mind-map core companion CLI.
#[derive(Parser, Debug)]
#[command(name = "mindmap_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    // `None` runs `ping`.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the core ping and version
    Ping,

    /// List export formats with their mime types
    Formats,

    /// Convert an exported map file into another data format
    Export {
        /// Exported map (JSON import shape)
        input: PathBuf,

        /// Target format (json, csv, txt, ...)
        format: ExportFormat,

        /// Directory the converted file is written to
        #[arg(default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let result = match cli.command.unwrap_or(Command::Ping) {
        Command::Ping => {
            println!("mindmap_core ping={}", mindmap_core::ping());
            println!("mindmap_core version={}", mindmap_core::core_version());
            Ok(())
        }
        Command::Formats => {
            for format in ExportFormat::ALL {
                let kind = if format.is_rendered() { "rendered" } else { "data" };
                println!("{format}\t{}\t{kind}", format.mime_type());
            }
            Ok(())
        }
        Command::Export {
            input,
            format,
            out_dir,
        } => run_export(&input, format, &out_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<CoreConfig, String> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => CoreConfig::load(&path).map_err(|err| format!("config `{path}`: {err}")),
        Err(_) => Ok(CoreConfig::default()),
    }
}

fn run_export(input: &Path, format: ExportFormat, out_dir: &Path) -> Result<(), String> {
    let config = load_config()?;
    let bytes = std::fs::read(input)
        .map_err(|err| format!("failed to read `{}`: {err}", input.display()))?;
    let snapshot = import_snapshot(&bytes).map_err(|err| err.to_string())?;

    let artifact = export_snapshot(format, &snapshot, &config.export, None).map_err(|err| {
        error!("event=cli_export module=cli status=error format={format}");
        err.to_string()
    })?;

    let target = out_dir.join(&artifact.file_name);
    std::fs::write(&target, &artifact.bytes)
        .map_err(|err| format!("failed to write `{}`: {err}", target.display()))?;
    info!(
        "event=cli_export module=cli status=ok format={} bytes={}",
        format,
        artifact.bytes.len()
    );
    println!("{}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};
    use mindmap_core::ExportFormat;
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["mindmap_cli"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn export_parses_format_aliases_and_default_dir() {
        let cli = Cli::try_parse_from(["mindmap_cli", "export", "map.json", "text"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Export {
                input: PathBuf::from("map.json"),
                format: ExportFormat::Text,
                out_dir: PathBuf::from("."),
            })
        );
    }

    #[test]
    fn export_rejects_unknown_format_and_missing_args() {
        assert!(Cli::try_parse_from(["mindmap_cli", "export", "map.json", "gif"]).is_err());
        assert!(Cli::try_parse_from(["mindmap_cli", "export", "map.json"]).is_err());
        assert!(Cli::try_parse_from(["mindmap_cli", "frobnicate"]).is_err());
    }
}
