//! Unified error types for the inspection engine.
//!
//! `RuleError` covers everything that can go wrong while compiling a rules
//! file; it is always recoverable and never aborts the process. `Error` is
//! the top-level type returned across the library boundary.

use std::path::PathBuf;

/// A rule line that failed to compile.
///
/// Each variant maps to one stage of the line grammar
/// (`event ';' name (';' signature)*`). Any failure rejects the whole file
/// and leaves the active ruleset untouched.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The line has no event segment.
    #[error("rule line is missing an event type")]
    MissingEvent,

    /// The line has an event but no name segment.
    #[error("rule line is missing a name")]
    MissingName,

    /// The event segment is not a known event type.
    #[error("unknown event type `{0}`")]
    UnknownEvent(String),

    /// A signature segment has no matching `(` … `)` pair.
    #[error("signature `{0}` has malformed brackets")]
    MalformedBrackets(String),

    /// The signature type tag is not registered.
    #[error("unsupported signature type `{0}`")]
    UnknownSignatureType(String),

    /// The init string inside the brackets does not parse for its type.
    #[error("invalid `{kind}` signature: {reason}")]
    InvalidInit {
        kind: &'static str,
        reason: String,
    },
}

impl RuleError {
    /// Shorthand used by the per-type signature parsers.
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        RuleError::InvalidInit {
            kind,
            reason: reason.into(),
        }
    }
}

/// Top-level error for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rules file failed to compile; the previous ruleset stays active.
    #[error("{0}")]
    Rule(#[from] RuleError),

    /// A rules file could not be read at all.
    #[error("cannot read rules file `{path}`: {source}")]
    RulesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The capture backend (file or device) failed.
    #[error("capture error: {0}")]
    Capture(String),
}
