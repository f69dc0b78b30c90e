//! Rules, event types, and the interned-signature store.

pub mod parser;

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::RuleError;
use crate::packet::Packet;
use crate::signatures::Signature;

/// What happens when a rule matches.
///
/// The `TestEvent*` variants exist so rule files used by tests can fire
/// events with no default handler attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Alert,
    Notify,
    SaveToPcap,
    TestEvent,
    TestEvent1,
    TestEvent2,
}

impl EventType {
    /// Parse the event token of a rule line. Unknown tokens reject the line.
    pub fn parse(token: &str) -> Result<Self, RuleError> {
        match token {
            "Alert" => Ok(EventType::Alert),
            "Notify" => Ok(EventType::Notify),
            "SaveToPcap" => Ok(EventType::SaveToPcap),
            "TestEvent" => Ok(EventType::TestEvent),
            "TestEvent1" => Ok(EventType::TestEvent1),
            "TestEvent2" => Ok(EventType::TestEvent2),
            other => Err(RuleError::UnknownEvent(other.to_string())),
        }
    }
}

/// A named conjunction of signatures with an associated event type.
///
/// Signatures are kept in rule-file order; evaluation short-circuits on the
/// first failing one. A rule with no signatures matches every packet.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    event_type: EventType,
    signatures: Vec<Arc<Signature>>,
}

impl Rule {
    pub fn new(name: impl Into<String>, event_type: EventType) -> Self {
        Self {
            name: name.into(),
            event_type,
            signatures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn signatures(&self) -> &[Arc<Signature>] {
        &self.signatures
    }

    pub fn add_signature(&mut self, signature: Arc<Signature>) {
        self.signatures.push(signature);
    }

    /// True when every signature matches the packet.
    pub fn check(&self, packet: &Packet) -> bool {
        self.signatures.iter().all(|sig| sig.check(packet))
    }
}

/// Rules compare by name and signature content; the event type is a payload,
/// not part of the identity.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.signatures == other.signatures
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for signature in &self.signatures {
            signature.hash(state);
        }
    }
}

/// The active ruleset plus its deduplicated signatures.
///
/// The store owns every signature once; rules hold `Arc` clones into the same
/// allocations, so equivalent signature text across rules shares storage. On
/// reload the whole store is swapped atomically by the analyzer.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: HashSet<Rule>,
    signatures: HashSet<Arc<Signature>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a signature, returning the canonical handle for its value.
    pub fn intern(&mut self, signature: Signature) -> Arc<Signature> {
        if let Some(existing) = self.signatures.get(&signature) {
            return Arc::clone(existing);
        }
        let handle = Arc::new(signature);
        self.signatures.insert(Arc::clone(&handle));
        handle
    }

    /// Insert a rule. Duplicate rules (same name and signatures) collapse.
    pub fn insert_rule(&mut self, rule: Rule) {
        self.rules.insert(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn rules_count(&self) -> usize {
        self.rules.len()
    }

    pub fn signatures_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
