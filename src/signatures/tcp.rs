//! TCP port signatures.

use etherparse::TransportSlice;

use crate::error::RuleError;
use crate::packet::Packet;
use crate::signatures::ip::two_bracketed_lists;
use crate::signatures::Signature;

/// Matches the source and destination ports of a TCP packet. A port of `0`
/// leaves that side unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TcpSignature {
    src_port: u16,
    dst_port: u16,
}

impl TcpSignature {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self { src_port, dst_port }
    }

    pub fn check(&self, packet: &Packet) -> bool {
        let Some(sliced) = packet.sliced() else {
            return false;
        };
        let Some(TransportSlice::Tcp(tcp)) = sliced.transport else {
            return false;
        };

        let src_match = self.src_port == 0 || tcp.source_port() == self.src_port;
        let dst_match = self.dst_port == 0 || tcp.destination_port() == self.dst_port;
        src_match && dst_match
    }

    /// Parse an init string of the form `[src_port],[dst_port]` where each
    /// side is a port number, `any`, or empty (both meaning match-any).
    pub fn parse(init: &str) -> Result<Self, RuleError> {
        let (src_segment, dst_segment) = two_bracketed_lists("tcp", init)?;
        Ok(Self::new(parse_port(src_segment)?, parse_port(dst_segment)?))
    }
}

fn parse_port(segment: &str) -> Result<u16, RuleError> {
    let segment = segment.trim();
    if segment.is_empty() || segment == "any" {
        return Ok(0);
    }
    segment
        .parse()
        .map_err(|_| RuleError::invalid("tcp", format!("bad port `{segment}`")))
}

pub fn build(init: &str) -> Result<Signature, RuleError> {
    TcpSignature::parse(init).map(Signature::Tcp)
}
