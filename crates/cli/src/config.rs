//! Command-line configuration for `cmkit`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CMKIT_LOG_LEVEL` | warn | Log level |
//! | `CMKIT_WINDOW_SIZE` | 2048 | Decoder read window (bytes) |
//! | `CMKIT_API_KEY` | | API key written into request envelopes |
//!
//! `RUST_LOG` overrides `CMKIT_LOG_LEVEL` when set.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cmkit_codec::{DecodeOptions, RootScope};
use cmkit_codec::soap::DEFAULT_NAMESPACE;
use cmkit_codec::xml::{DEFAULT_WINDOW_SIZE, is_valid_element_name};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Top-level configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "cmkit", version)]
#[command(about = "Decode, encode and wrap SOAP/XML API payloads")]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "CMKIT_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Size in bytes of the window XML input is read through.
    #[arg(long, global = true, env = "CMKIT_WINDOW_SIZE", default_value = "2048")]
    pub window_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Decode XML and print the tree as JSON.
    Decode(DecodeArgs),
    /// Encode a JSON parameter tree as an XML fragment.
    Encode(EncodeArgs),
    /// Wrap a JSON parameter tree in a full SOAP request body.
    Envelope(EnvelopeArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct DecodeArgs {
    /// Input file; `-` or absent reads stdin.
    pub input: Option<PathBuf>,

    /// Element path where output begins, e.g. `/soap:Envelope/soap:Body`.
    #[arg(long)]
    pub scope: Option<String>,

    /// Decode a SOAP response and print only the result of this action.
    #[arg(long, conflicts_with = "scope")]
    pub soap_action: Option<String>,

    /// Character set of input without an XML declaration, e.g. `iso-8859-1`.
    #[arg(long)]
    pub charset: Option<String>,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct EncodeArgs {
    /// Input JSON file; `-` or absent reads stdin.
    pub input: Option<PathBuf>,

    /// Prefix written before every top-level element.
    #[arg(long, default_value = "")]
    pub indent: String,

    /// Write text values without entity escaping.
    #[arg(long)]
    pub no_escape: bool,
}

#[derive(Debug, Clone, Args)]
pub struct EnvelopeArgs {
    /// Dotted API action, e.g. `Subscriber.Add`.
    #[arg(long)]
    pub action: String,

    /// Service namespace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// API key.
    #[arg(long, env = "CMKIT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Input JSON parameter file; `-` or absent reads stdin.
    pub input: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            command: Command::Decode(DecodeArgs::default()),
        }
    }
}

impl CliConfig {
    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Unknown log level '{}' (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        if self.window_size == 0 {
            errors.push("Window size cannot be 0".to_string());
        }

        match &self.command {
            Command::Decode(args) => {
                if let Some(scope) = &args.scope
                    && let Err(e) = scope.parse::<RootScope>()
                {
                    errors.push(e.to_string());
                }
                if let Some(action) = &args.soap_action
                    && !is_valid_element_name(action)
                {
                    errors.push(format!("Invalid SOAP action '{}'", action));
                }
                if let Some(label) = &args.charset
                    && let Err(e) = DecodeOptions::default().charset(label)
                {
                    errors.push(e.to_string());
                }
            }
            Command::Encode(_) => {}
            Command::Envelope(args) => {
                if !is_valid_element_name(&args.action) {
                    errors.push(format!("Invalid SOAP action '{}'", args.action));
                }
                if args.namespace.is_empty() {
                    errors.push("Namespace cannot be empty".to_string());
                }
                if args.api_key.as_deref().is_none_or(str::is_empty) {
                    errors.push("An API key is required (--api-key or CMKIT_API_KEY)".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
