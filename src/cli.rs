//! Command-line interface for the `flow-inspector` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config;
use crate::logger::LogLevel;

/// Where packets come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Replay an offline capture file.
    Pcap,
    /// Capture from a network interface in real time.
    Live,
}

/// Verbosity of the diagnostic output on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Debug,
    Info,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "flow-inspector",
    about = "Signature-based network intrusion detection engine",
    after_help = "Additional Information:\n  \
        SIGHUP Signal:        Send SIGHUP to the running process to reload rules\n  \
                              Example: kill -HUP <pid>"
)]
pub struct Args {
    /// Operating mode: 'pcap' for file input or 'live' for real-time capture
    #[arg(short, long, value_enum)]
    pub mode: Mode,

    /// Network interface for live mode capture
    #[arg(short, long, required_if_eq("mode", "live"))]
    pub interface: Option<String>,

    /// Path to the PCAP file for input (pcap mode only)
    #[arg(short, long, required_if_eq("mode", "pcap"))]
    pub file: Option<PathBuf>,

    /// Number of packet worker threads
    #[arg(short = 'j', long, default_value_t = 1)]
    pub cores: usize,

    /// Path to the file for logging output
    #[arg(short = 'o', long, default_value = config::DEFAULT_LOG_OUTPUT)]
    pub log_output: String,

    /// Destination PCAP file for archived packets
    #[arg(short, long, default_value = config::DEFAULT_PCAP_OUTPUT)]
    pub write: String,

    /// Path to the rules file
    #[arg(short, long, default_value = "")]
    pub rules: String,

    /// Interval (in seconds) for printing capture statistics; 0 disables
    #[arg(short, long, default_value_t = 0)]
    pub stat_speed: u64,

    /// Stdout verbosity level
    #[arg(long, value_enum, default_value_t = LogLevelArg::Info)]
    pub log_level: LogLevelArg,
}
