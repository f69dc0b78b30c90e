//! Raw byte-sequence signatures: match a payload anywhere in the frame or at
//! a fixed offset.

use crate::error::RuleError;
use crate::packet::Packet;
use crate::signatures::Signature;

/// Matches a literal byte sequence against the raw frame buffer.
///
/// With an offset the bytes must sit exactly at `frame[offset..]`; without
/// one the sequence may appear anywhere in the frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawBytesSignature {
    payload: Vec<u8>,
    offset: Option<u32>,
}

impl RawBytesSignature {
    pub fn new(payload: Vec<u8>, offset: Option<u32>) -> Self {
        Self { payload, offset }
    }

    pub fn check(&self, packet: &Packet) -> bool {
        let data = packet.data();
        match self.offset {
            Some(offset) => {
                let start = offset as usize;
                let end = start + self.payload.len();
                end <= data.len() && data[start..end] == self.payload[..]
            }
            None => data
                .windows(self.payload.len().max(1))
                .any(|window| window == self.payload)
                // An empty payload trivially occurs in any frame.
                || self.payload.is_empty(),
        }
    }

    /// Parse an init string of the form `[b1 b2 …]` or `[b1 b2 …], offset`,
    /// with decimal bytes.
    pub fn parse(init: &str) -> Result<Self, RuleError> {
        let open = init
            .find('[')
            .ok_or_else(|| RuleError::invalid("raw_bytes", "missing `[`"))?;
        let close = init[open..]
            .find(']')
            .map(|i| open + i)
            .ok_or_else(|| RuleError::invalid("raw_bytes", "missing `]`"))?;

        let mut payload = Vec::new();
        for token in init[open + 1..close].split_whitespace() {
            let byte: u8 = token
                .parse()
                .map_err(|_| RuleError::invalid("raw_bytes", format!("bad byte `{token}`")))?;
            payload.push(byte);
        }

        let rest = init[close + 1..].trim();
        let offset = match rest.strip_prefix(',') {
            Some(offset_str) => {
                let offset_str = offset_str.trim();
                let offset: u32 = offset_str.parse().map_err(|_| {
                    RuleError::invalid("raw_bytes", format!("bad offset `{offset_str}`"))
                })?;
                Some(offset)
            }
            None if rest.is_empty() => None,
            None => {
                return Err(RuleError::invalid(
                    "raw_bytes",
                    format!("unexpected trailing `{rest}`"),
                ))
            }
        };

        Ok(Self::new(payload, offset))
    }
}

pub fn build(init: &str) -> Result<Signature, RuleError> {
    RawBytesSignature::parse(init).map(Signature::RawBytes)
}
