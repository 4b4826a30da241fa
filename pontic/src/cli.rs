//! # CLI
//!
//! Flags and environment variables of the gateway, defined with `clap`.
//! Every flag has an environment fallback so the binary deploys cleanly in a
//! container without a wrapper script.
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pontic", version, about = "Dynamic gRPC <-> JSON gateway")]
pub struct Cli {
    /// Mapping file for gRPC service names to backend addresses. When
    /// omitted the gateway starts with an empty registry, to be populated by
    /// an external discovery backend.
    #[arg(long, env = "PONTIC_MAPPING_FILE")]
    pub mapping_file: Option<PathBuf>,

    /// Port the HTTP listener binds to
    #[arg(long, env = "PONTIC_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Access token required of callers in the `x-access-token` header.
    /// Unset disables the check.
    #[arg(long, env = "PONTIC_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PONTIC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}
