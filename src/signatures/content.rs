//! L4 payload content signatures.

use std::collections::BTreeSet;

use etherparse::TransportSlice;

use crate::error::RuleError;
use crate::packet::Packet;
use crate::signatures::Signature;

/// Transport protocol a content signature applies to.
///
/// `Http` is accepted by the rule grammar but never produces a match; it is
/// reserved until request-level inspection exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentProtocol {
    Tcp,
    Udp,
    Http,
}

impl ContentProtocol {
    fn parse(token: &str) -> Result<Self, RuleError> {
        match token {
            "tcp" => Ok(ContentProtocol::Tcp),
            "udp" => Ok(ContentProtocol::Udp),
            "http" => Ok(ContentProtocol::Http),
            other => Err(RuleError::invalid(
                "content",
                format!("unknown protocol `{other}`"),
            )),
        }
    }
}

/// Matches when the TCP or UDP payload contains a byte string. The `nocase`
/// flag makes the search ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentSignature {
    protocol: ContentProtocol,
    content: String,
    flags: BTreeSet<String>,
}

impl ContentSignature {
    pub fn new(protocol: ContentProtocol, content: String, flags: BTreeSet<String>) -> Self {
        Self {
            protocol,
            content,
            flags,
        }
    }

    fn nocase(&self) -> bool {
        self.flags.contains("nocase")
    }

    pub fn check(&self, packet: &Packet) -> bool {
        let Some(payload) = self.transport_payload(packet) else {
            return false;
        };
        if self.nocase() {
            contains_nocase(payload, self.content.as_bytes())
        } else {
            contains(payload, self.content.as_bytes())
        }
    }

    fn transport_payload<'a>(&self, packet: &'a Packet) -> Option<&'a [u8]> {
        let sliced = packet.sliced()?;
        match (self.protocol, sliced.transport?) {
            (ContentProtocol::Tcp, TransportSlice::Tcp(_)) => Some(sliced.payload),
            (ContentProtocol::Udp, TransportSlice::Udp(_)) => Some(sliced.payload),
            _ => None,
        }
    }

    /// Parse an init string of the form `protocol, string, flag*`.
    pub fn parse(init: &str) -> Result<Self, RuleError> {
        let mut parts = init.split(',');

        let protocol = ContentProtocol::parse(
            parts
                .next()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| RuleError::invalid("content", "missing protocol"))?,
        )?;

        let content = parts
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RuleError::invalid("content", "missing content string"))?
            .to_string();

        let flags = parts
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self::new(protocol, content, flags))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty()
        || haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

fn contains_nocase(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty()
        || haystack
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
}

pub fn build(init: &str) -> Result<Signature, RuleError> {
    ContentSignature::parse(init).map(Signature::Content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkKind;
    use crate::testutil::{tcp_packet, udp_packet};

    fn tcp_with(payload: &[u8]) -> Packet {
        Packet::new(
            tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 40000, 80, payload),
            LinkKind::RawIp,
        )
    }

    fn udp_with(payload: &[u8]) -> Packet {
        Packet::new(
            udp_packet([10, 0, 0, 1], [10, 0, 0, 2], 40000, 53, payload),
            LinkKind::RawIp,
        )
    }

    #[test]
    fn test_tcp_payload_substring() {
        let sig = ContentSignature::parse("tcp, HelloWorld").unwrap();
        assert!(sig.check(&tcp_with(b"HelloWorld")));
        assert!(sig.check(&tcp_with(b"xxHelloWorldxx")));
        assert!(!sig.check(&tcp_with(b"FooBar")));
    }

    #[test]
    fn test_case_sensitivity_defaults_on() {
        let sig = ContentSignature::parse("tcp, GET").unwrap();
        assert!(sig.check(&tcp_with(b"GET / HTTP/1.1")));
        assert!(!sig.check(&tcp_with(b"get / HTTP/1.1")));
    }

    #[test]
    fn test_nocase_flag() {
        let sig = ContentSignature::parse("tcp, GET, nocase").unwrap();
        assert!(sig.check(&tcp_with(b"get / HTTP/1.1")));
        assert!(sig.check(&tcp_with(b"GeT / HTTP/1.1")));
        assert!(!sig.check(&tcp_with(b"PUT / HTTP/1.1")));
    }

    #[test]
    fn test_protocol_must_match_transport() {
        let tcp_sig = ContentSignature::parse("tcp, query").unwrap();
        let udp_sig = ContentSignature::parse("udp, query").unwrap();

        assert!(!tcp_sig.check(&udp_with(b"query")));
        assert!(udp_sig.check(&udp_with(b"query")));
        assert!(!udp_sig.check(&tcp_with(b"query")));
    }

    #[test]
    fn test_http_protocol_parses_but_never_matches() {
        let sig = ContentSignature::parse("http, GET").unwrap();
        assert!(!sig.check(&tcp_with(b"GET / HTTP/1.1")));
    }

    #[test]
    fn test_flags_distinguish_signatures() {
        let plain = ContentSignature::parse("tcp, GET").unwrap();
        let nocase = ContentSignature::parse("tcp, GET, nocase").unwrap();
        assert_ne!(plain, nocase);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(ContentSignature::parse("smtp, HELO").is_err(), "unknown protocol");
        assert!(ContentSignature::parse("tcp").is_err(), "content is required");
        assert!(ContentSignature::parse("tcp, ").is_err());
        assert!(ContentSignature::parse("").is_err());
    }
}
