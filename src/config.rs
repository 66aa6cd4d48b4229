//! Process configuration.
//!
//! Every setting is a flag with a `WT_`-prefixed environment fallback, so the
//! same binary runs unchanged under a shell, docker compose, or k8s.

use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "wt-api")]
#[command(about = "Users and products HTTP API", long_about = None)]
pub struct Config {
    /// Address the API listens on.
    #[arg(long, env = "WT_API_HOST", default_value = "0.0.0.0:3000")]
    pub api_host: String,

    /// Address the debug / probe listener binds.
    #[arg(long, env = "WT_DEBUG_HOST", default_value = "0.0.0.0:4000")]
    pub debug_host: String,

    /// Time allowed for a client to send request headers.
    #[arg(
        long,
        env = "WT_READ_TIMEOUT",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub read_timeout: Duration,

    /// Time allowed for in-flight requests to finish once shutdown starts.
    #[arg(
        long,
        env = "WT_SHUTDOWN_TIMEOUT",
        default_value = "20s",
        value_parser = humantime::parse_duration
    )]
    pub shutdown_timeout: Duration,

    #[arg(long, env = "WT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Build tag reported by the liveness probe.
    #[arg(long, env = "WT_BUILD", default_value = "develop")]
    pub build: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
