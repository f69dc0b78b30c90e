//! Centralized runtime constants for FlowInspector.
//!
//! All tunable intervals, thresholds, and defaults are collected here so they
//! can be found and adjusted in a single place rather than scattered across
//! modules.

/// Number of buffered log entries that triggers an early rotation.
pub const MAX_LOG_ENTRIES: usize = 2000;

/// Maximum time the log rotator sleeps between rotation checks (seconds).
pub const LOG_ROTATION_TIMEOUT_SECS: u64 = 10;

/// Timestamp format used for serialized log entries.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How long a pool worker parks on an empty queue before re-checking the
/// shutdown flag (milliseconds).
pub const QUEUE_POLL_INTERVAL_MS: u64 = 10;

/// Read timeout handed to libpcap for live captures (milliseconds). This is
/// also the latency bound for noticing a stop request while capturing.
pub const LIVE_READ_TIMEOUT_MS: i32 = 100;

/// Interval at which the control thread services the signal flags
/// (milliseconds).
pub const SIGNAL_POLL_INTERVAL_MS: u64 = 100;

/// Snapshot length for live captures and dead handles used by the writer.
pub const SNAPLEN: i32 = 65535;

/// Network the `$HOME_NET` rule token expands to.
pub const HOME_NET: &str = "192.168.0.0/24";

/// Default path for the rotated log output.
pub const DEFAULT_LOG_OUTPUT: &str = "default.log";

/// Default path for the archived packet capture.
pub const DEFAULT_PCAP_OUTPUT: &str = "default.pcap";
