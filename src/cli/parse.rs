//! CLI parse: clap types for datatag. No behavior beyond argument parsing.

use crate::config::Environment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Datatag CLI - send analytics beacons and inspect stored identity
#[derive(Parser)]
#[command(name = "datatag")]
#[command(about = "Send analytics beacons to a collection endpoint and inspect stored identity")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Endpoint preset (development, uat, production); falls back to DATATAG_ENV
    #[arg(long)]
    pub env: Option<Environment>,

    /// Identity store directory (defaults to the user data directory)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Platform name sent as `d` (defaults to the host OS)
    #[arg(long)]
    pub platform: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one event
    Event {
        /// Event action (`ea`)
        #[arg(long)]
        action: String,
        /// Element or placement that triggered the event (`l`)
        #[arg(long, default_value = "")]
        location: String,
        /// Event type (`et`)
        #[arg(long = "type", default_value = "click")]
        event_type: String,
        /// Screen path (`ph`)
        #[arg(long)]
        path: String,
        /// Extra params as key=value, repeatable
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Send a page view for a screen
    ScreenView {
        /// Screen path (`ph`)
        path: String,
        /// Extra params as key=value, repeatable
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Assign an experiment id; starts a new session
    Experiment {
        /// Experiment identifier
        id: String,
    },
    /// Store the user id and/or Braze id sent with later events
    Identify {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        braze_id: Option<String>,
    },
    /// Show the stored identity and session state
    Identity {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Decode the creation time embedded in a session identifier
    Decode {
        identifier: String,
    },
}

/// Parse a `key=value` pair. The value may itself contain `=`.
pub(crate) fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
