//! Signature predicates and the registry that builds them from rule text.
//!
//! A signature is one testable condition on a parsed packet. The four
//! variants are closed into a sum type so the matcher never needs dynamic
//! dispatch, and value equality + hashing come straight from the derives;
//! that pair is also the deduplication key used by the rule store.

pub mod content;
pub mod ip;
pub mod raw_bytes;
pub mod tcp;

use std::collections::HashMap;

pub use content::ContentSignature;
pub use ip::IpSignature;
pub use raw_bytes::RawBytesSignature;
pub use tcp::TcpSignature;

use crate::error::RuleError;
use crate::packet::Packet;

/// A single predicate over a captured packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    RawBytes(RawBytesSignature),
    Ip(IpSignature),
    Tcp(TcpSignature),
    Content(ContentSignature),
}

impl Signature {
    /// Evaluate the predicate against one packet.
    pub fn check(&self, packet: &Packet) -> bool {
        match self {
            Signature::RawBytes(sig) => sig.check(packet),
            Signature::Ip(sig) => sig.check(packet),
            Signature::Tcp(sig) => sig.check(packet),
            Signature::Content(sig) => sig.check(packet),
        }
    }
}

/// Builds one signature variant from the init string between its brackets.
pub type SignatureBuilder = fn(&str) -> Result<Signature, RuleError>;

/// Maps rule-file type tags (`raw_bytes`, `ip`, …) to their builders.
///
/// Constructed once during engine setup and read-only afterwards; tests and
/// embedders can register additional types before handing it to the parser.
pub struct SignatureRegistry {
    builders: HashMap<&'static str, SignatureBuilder>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in signature types.
    pub fn with_default_types() -> Self {
        let mut registry = Self::new();
        registry.register("raw_bytes", raw_bytes::build);
        registry.register("ip", ip::build);
        registry.register("tcp", tcp::build);
        registry.register("content", content::build);
        registry
    }

    pub fn register(&mut self, type_tag: &'static str, builder: SignatureBuilder) {
        self.builders.insert(type_tag, builder);
    }

    /// Build a signature of the named type, or fail the rule line.
    pub fn build(&self, type_tag: &str, init: &str) -> Result<Signature, RuleError> {
        let builder = self
            .builders
            .get(type_tag)
            .ok_or_else(|| RuleError::UnknownSignatureType(type_tag.to_string()))?;
        builder(init)
    }
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::with_default_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_knows_builtin_types() {
        let registry = SignatureRegistry::with_default_types();
        assert!(registry.build("raw_bytes", "[1 2 3]").is_ok());
        assert!(registry.build("ip", "[any],[any]").is_ok());
        assert!(registry.build("tcp", "[any],[80]").is_ok());
        assert!(registry.build("content", "tcp, GET").is_ok());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let registry = SignatureRegistry::with_default_types();
        let err = registry.build("icmp", "[]").unwrap_err();
        assert!(matches!(err, RuleError::UnknownSignatureType(tag) if tag == "icmp"));
    }

    #[test]
    fn test_equal_values_hash_alike_across_builds() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let registry = SignatureRegistry::with_default_types();
        let a = registry.build("raw_bytes", "[1 2 3], 4").unwrap();
        let b = registry.build("raw_bytes", "[1 2 3], 4").unwrap();
        assert_eq!(a, b);

        let hash_of = |sig: &Signature| {
            let mut hasher = DefaultHasher::new();
            sig.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_different_variants_never_compare_equal() {
        let registry = SignatureRegistry::with_default_types();
        let raw = registry.build("raw_bytes", "[0]").unwrap();
        let tcp = registry.build("tcp", "[any],[any]").unwrap();
        assert_ne!(raw, tcp);
    }
}
