#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use logspool_core::config::{ConfigOverrides, resolve_config};
use logspool_core::{LogConfig, timing};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "logspool: buffered, rotating file logger",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Read settings from this TOML file instead of the user config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Rotate a log file once it would grow past this many KB.
    #[arg(long, global = true, value_name = "KB")]
    max_file_kb: Option<u64>,

    /// Skip writes while the log volume has less than this many KB free.
    #[arg(long, global = true, value_name = "KB")]
    free_space_kb: Option<u64>,

    /// Number of lines buffered before a collect-mode flush.
    #[arg(long, global = true, value_name = "N")]
    collect_size: Option<usize>,

    /// Split console output into chunks of at most this many characters.
    #[arg(long, global = true, value_name = "CHARS")]
    max_line: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }

    /// Settings given on the command line; they win over every file layer.
    const fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_log_file_size_kb: self.max_file_kb,
            write_log_free_space_kb: self.free_space_kb,
            collect_log_size: self.collect_size,
            log_max_length: self.max_line,
        }
    }

    fn resolve_config(&self) -> anyhow::Result<LogConfig> {
        resolve_config(self.config.as_deref(), self.overrides())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Append messages to a log file",
        long_about = "Append one or more messages to a log file, then flush anything still buffered.",
        after_help = "EXAMPLES:\n    # Write one line\n    logspool write /tmp/app.log \"service started\"\n\n    # Batch several lines\n    logspool write /tmp/app.log --mode collect one two three\n\n    # Emit machine-readable output\n    logspool write /tmp/app.log hello --json"
    )]
    Write(cmd::write::WriteArgs),

    #[command(
        about = "Write a burst of generated lines",
        long_about = "Write COUNT generated lines to a log file to exercise batching and rotation.",
        after_help = "EXAMPLES:\n    # 2500 batched lines\n    logspool burst /tmp/app.log --count 2500\n\n    # Small files to force rotation\n    logspool burst /tmp/app.log --count 500 --max-file-kb 4"
    )]
    Burst(cmd::burst::BurstArgs),

    #[command(
        about = "Print a message on the console channel",
        long_about = "Print a message through the console channel, split into chunks of --max-line characters.",
        after_help = "EXAMPLES:\n    # Print at warning level\n    logspool print --level warn \"disk almost full\""
    )]
    Print(cmd::print::PrintArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LOGSPOOL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "logspool=debug,info"
        } else {
            "logspool=info,warn"
        })
    });

    let format = env::var("LOGSPOOL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let config = cli.resolve_config()?;
    debug!(?config, "resolved settings");

    timing::interval("logspool.command", || match cli.command {
        Commands::Write(ref args) => cmd::write::run_write(args, config, output),
        Commands::Burst(ref args) => cmd::burst::run_burst(args, config, output),
        Commands::Print(ref args) => cmd::print::run_print(args, &config, output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["logspool", "--json", "print", "hi"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["logspool", "print", "hi", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn default_output_is_text() {
        let cli = Cli::parse_from(["logspool", "print", "hi"]);
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn setting_flags_become_overrides() {
        let cli = Cli::parse_from([
            "logspool",
            "write",
            "/tmp/a.log",
            "x",
            "--max-file-kb",
            "4",
            "--collect-size",
            "10",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.max_log_file_size_kb, Some(4));
        assert_eq!(overrides.collect_log_size, Some(10));
        assert_eq!(overrides.write_log_free_space_kb, None);
        assert_eq!(overrides.log_max_length, None);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from(["logspool", "burst", "/tmp/a.log", "--count", "5"]);
        assert!(matches!(cli.command, Commands::Burst(_)));
        let cli = Cli::parse_from(["logspool", "write", "/tmp/a.log", "hello"]);
        assert!(matches!(cli.command, Commands::Write(_)));
    }

    #[test]
    fn config_path_flag_parsed() {
        let cli = Cli::parse_from(["logspool", "--config", "/etc/ls.toml", "print", "x"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ls.toml")));
    }
}
