use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Log level for CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages, including every frame
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "conduit")]
#[command(about = "conduit - JSON-RPC 2.0 calls and services over stdio")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/conduit/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Level asked for on the command line. `--log-level` wins over
    /// `--verbose`.
    pub fn log_filter(&self) -> Option<LevelFilter> {
        self.log_level
            .map(LevelFilter::from)
            .or(self.verbose.then_some(LevelFilter::DEBUG))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Spawn a command, call one method on it and print the result
    Call(RemoteArgs),

    /// Spawn a command and send it one notification
    Notify(RemoteArgs),

    /// Serve diagnostic methods (ping, echo, methods) on stdin/stdout
    Serve,
}

#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    /// Method to invoke
    pub method: String,

    /// Parameters as a JSON object or array
    #[arg(value_parser = parse_params_arg)]
    pub params: Option<Value>,

    /// Seconds to wait for a reply (0 waits forever)
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,

    /// Command to spawn and its arguments, after `--`
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

/// Accept only structured params: a JSON object or array.
pub fn parse_params_arg(raw: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(format!("params must be a JSON object or array, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_with_params_and_command() {
        let cli = Cli::try_parse_from([
            "conduit", "call", "add", r#"{"x":1,"y":2}"#, "--", "server", "--stdio",
        ])
        .unwrap();

        let Commands::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.method, "add");
        assert_eq!(args.params, Some(json!({"x": 1, "y": 2})));
        assert_eq!(args.command, vec!["server", "--stdio"]);
    }

    #[test]
    fn test_params_are_optional() {
        let cli = Cli::try_parse_from(["conduit", "notify", "ping", "--", "cat"]).unwrap();
        let Commands::Notify(args) = cli.command else {
            panic!("expected notify");
        };
        assert_eq!(args.params, None);
        assert_eq!(args.timeout, 30);
        assert_eq!(args.command, vec!["cat"]);
    }

    #[test]
    fn test_scalar_params_rejected() {
        assert!(Cli::try_parse_from(["conduit", "call", "m", "42", "--", "cat"]).is_err());
        assert!(Cli::try_parse_from(["conduit", "call", "m", "\"s\"", "--", "cat"]).is_err());
        assert!(Cli::try_parse_from(["conduit", "call", "m", "{oops", "--", "cat"]).is_err());
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["conduit", "call", "m"]).is_err());
    }

    #[test]
    fn test_parse_params_arg() {
        assert_eq!(parse_params_arg("[1, 2]"), Ok(json!([1, 2])));
        assert_eq!(parse_params_arg("{}"), Ok(json!({})));
        assert!(parse_params_arg("null").is_err());
        assert!(parse_params_arg("true").is_err());
    }

    #[test]
    fn test_log_filter() {
        let cli = Cli::try_parse_from(["conduit", "serve"]).unwrap();
        assert_eq!(cli.log_filter(), None);

        let cli = Cli::try_parse_from(["conduit", "-v", "serve"]).unwrap();
        assert_eq!(cli.log_filter(), Some(LevelFilter::DEBUG));

        let cli = Cli::try_parse_from(["conduit", "serve", "-v", "-l", "trace"]).unwrap();
        assert_eq!(cli.log_filter(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["conduit", "serve", "-C", "/tmp/conduit.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/conduit.toml")));
        assert!(matches!(cli.command, Commands::Serve));
    }
}
