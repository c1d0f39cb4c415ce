//! CLI argument parsing and the `check-config` subcommand.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use inquisition_core::ini::read_config;
use inquisition_tuning::redact::redact_section;

/// Inquisition admin console backend.
#[derive(Parser, Debug)]
#[command(name = "inquisition-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Parse the platform config file and print a redacted summary.
    CheckConfig {
        /// Config file to check.
        #[arg(
            long,
            env = "INQUISITION_CONFIG_FILE",
            default_value = inquisition_core::ini::DEFAULT_CONFIG_PATH
        )]
        file: PathBuf,
    },
}

/// Render every section with its keys, sensitive values redacted.
pub fn check_config(path: &Path) -> anyhow::Result<String> {
    let tree = read_config(path)?;
    let mut out = String::new();
    writeln!(out, "{}: {} sections", path.display(), tree.len())?;
    for (name, section) in &tree {
        writeln!(out, "[{}]", name)?;
        for (key, value) in redact_section(section) {
            writeln!(out, "  {} = {}", key, value)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_check_config_redacts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[mysql_database]\ndb_host = 127.0.0.1\ndb_pass = hunter2\n\n[alerting]\nsentry_api_key = abc\n"
        )
        .unwrap();

        let out = check_config(file.path()).unwrap();
        assert!(out.contains("2 sections"));
        assert!(out.contains("db_host = 127.0.0.1"));
        assert!(out.contains("db_pass = <REDACTED>"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("abc"));
    }

    #[test]
    fn test_check_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_config(&dir.path().join("absent.cfg")).is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["inquisition-server"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["inquisition-server", "check-config", "--file", "/tmp/x.cfg"]);
        match cli.command {
            Some(Command::CheckConfig { file }) => assert_eq!(file, PathBuf::from("/tmp/x.cfg")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
