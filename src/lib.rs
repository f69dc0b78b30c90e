//! FlowInspector: a signature-based network intrusion-detection engine.
//!
//! Packets flow from an [`origin`](crate::origin) (offline capture file or
//! live interface) into a worker [`pool`](crate::pool); each worker matches
//! the packet against the active ruleset in the
//! [`analyzer`](crate::analyzer) and fans matches out through the
//! [`events`](crate::events) dispatcher to the [`logger`](crate::logger) and
//! the [`pcap_writer`](crate::pcap_writer). The
//! [`Inspector`](crate::inspector::Inspector) supervisor owns and wires the
//! whole pipeline.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod inspector;
pub mod logger;
pub mod origin;
pub mod packet;
pub mod pcap_writer;
pub mod pool;
pub mod rules;
pub mod signatures;

#[cfg(test)]
mod testutil;

pub use error::{Error, RuleError};
pub use inspector::Inspector;
