//! Compiles rule-file text into rules and interned signatures.
//!
//! One rule per line: `event ';' name (';' signature)*` where each signature
//! is `type '(' init ')'`. Blank lines and lines whose first non-space byte
//! is `#` are skipped. Any line failure rejects the whole file so a reload
//! can never leave a half-loaded ruleset behind.

use std::fs;
use std::path::Path;

use crate::error::{Error, RuleError};
use crate::rules::{EventType, Rule, RuleStore};
use crate::signatures::SignatureRegistry;

/// Parse a single rule line into `store`.
///
/// The rule and all its signatures are built before the store is touched, so
/// a failed line leaves the store exactly as it was.
pub fn parse_line(
    line: &str,
    registry: &SignatureRegistry,
    store: &mut RuleStore,
) -> Result<(), RuleError> {
    let mut segments = line.split(';');

    let event_token = segments
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RuleError::MissingEvent)?;
    let name = segments
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RuleError::MissingName)?;
    let event_type = EventType::parse(event_token)?;

    let mut signatures = Vec::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let open = segment
            .find('(')
            .ok_or_else(|| RuleError::MalformedBrackets(segment.to_string()))?;
        let close = segment[open..]
            .rfind(')')
            .map(|i| open + i)
            .ok_or_else(|| RuleError::MalformedBrackets(segment.to_string()))?;

        let type_tag = segment[..open].trim();
        let init = &segment[open + 1..close];
        signatures.push(registry.build(type_tag, init)?);
    }

    let mut rule = Rule::new(name, event_type);
    for signature in signatures {
        rule.add_signature(store.intern(signature));
    }
    store.insert_rule(rule);
    Ok(())
}

/// Compile an entire rules file into a fresh store.
pub fn parse_rules_file(
    path: &Path,
    registry: &SignatureRegistry,
) -> Result<RuleStore, Error> {
    tracing::info!("reading rules from {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| Error::RulesIo {
        path: path.to_path_buf(),
        source,
    })?;

    let mut store = RuleStore::new();
    let mut count = 0usize;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        parse_line(line, registry, &mut store).map_err(|err| {
            tracing::warn!("rejected rule line `{line}`: {err}");
            err
        })?;
        count += 1;
    }

    tracing::info!("successfully read {count} rules");
    Ok(store)
}
