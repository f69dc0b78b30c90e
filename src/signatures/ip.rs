//! IPv4 address signatures with CIDR masks.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use etherparse::InternetSlice;

use crate::config::HOME_NET;
use crate::error::RuleError;
use crate::packet::Packet;
use crate::signatures::Signature;

/// Matches the source and destination addresses of an IPv4 packet against
/// two lists of `(network, mask)` pairs. An empty list places no constraint
/// on its side; a non-empty list matches when any entry covers the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpSignature {
    // Sorted and deduplicated so equal rule text always builds equal values.
    src_networks: Vec<(u32, u32)>,
    dst_networks: Vec<(u32, u32)>,
}

impl IpSignature {
    pub fn new(src_networks: Vec<(u32, u32)>, dst_networks: Vec<(u32, u32)>) -> Self {
        Self {
            src_networks,
            dst_networks,
        }
    }

    pub fn check(&self, packet: &Packet) -> bool {
        let Some(sliced) = packet.sliced() else {
            return false;
        };
        let Some(InternetSlice::Ipv4(header, _)) = sliced.ip else {
            return false;
        };

        let src = u32::from(header.source_addr());
        let dst = u32::from(header.destination_addr());

        let src_match = self.src_networks.is_empty() || covered(src, &self.src_networks);
        let dst_match = self.dst_networks.is_empty() || covered(dst, &self.dst_networks);
        src_match && dst_match
    }

    /// Parse an init string of the form `[src_list],[dst_list]` where each
    /// list holds comma-separated `addr[/mask]` tokens, `any`, or
    /// `$HOME_NET`. The default mask is /32; `any` contributes no constraint.
    pub fn parse(init: &str) -> Result<Self, RuleError> {
        let (src_segment, dst_segment) = two_bracketed_lists("ip", init)?;
        Ok(Self::new(
            parse_network_list(src_segment)?,
            parse_network_list(dst_segment)?,
        ))
    }
}

fn covered(addr: u32, networks: &[(u32, u32)]) -> bool {
    networks
        .iter()
        .any(|&(network, mask)| addr & mask == network)
}

/// Split `[a],[b]` into its two bracketed segments.
pub(crate) fn two_bracketed_lists<'a>(
    kind: &'static str,
    init: &'a str,
) -> Result<(&'a str, &'a str), RuleError> {
    let mut segments = Vec::with_capacity(2);
    let mut rest = init;
    for _ in 0..2 {
        let open = rest
            .find('[')
            .ok_or_else(|| RuleError::invalid(kind, "expected two `[…]` lists"))?;
        let close = rest[open..]
            .find(']')
            .map(|i| open + i)
            .ok_or_else(|| RuleError::invalid(kind, "unterminated `[…]` list"))?;
        segments.push(&rest[open + 1..close]);
        rest = &rest[close + 1..];
    }
    Ok((segments[0], segments[1]))
}

fn parse_network_list(segment: &str) -> Result<Vec<(u32, u32)>, RuleError> {
    let mut networks = BTreeSet::new();
    for token in segment.split(',') {
        let mut token = token.trim();
        if token.is_empty() || token == "any" {
            continue;
        }
        if token == "$HOME_NET" {
            token = HOME_NET;
        }

        let (addr_part, mask_len) = match token.split_once('/') {
            Some((addr, mask_str)) => {
                let mask_len: u8 = mask_str.trim().parse().map_err(|_| {
                    RuleError::invalid("ip", format!("bad mask length `{mask_str}`"))
                })?;
                if mask_len > 32 {
                    return Err(RuleError::invalid(
                        "ip",
                        format!("mask length `{mask_len}` exceeds 32"),
                    ));
                }
                (addr.trim(), mask_len)
            }
            None => (token, 32),
        };

        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| RuleError::invalid("ip", format!("bad address `{addr_part}`")))?;
        let mask = mask_for_len(mask_len);
        networks.insert((u32::from(addr) & mask, mask));
    }
    Ok(networks.into_iter().collect())
}

fn mask_for_len(len: u8) -> u32 {
    match len {
        0 => 0,
        32 => u32::MAX,
        _ => u32::MAX << (32 - len),
    }
}

pub fn build(init: &str) -> Result<Signature, RuleError> {
    IpSignature::parse(init).map(Signature::Ip)
}
