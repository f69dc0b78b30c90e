//! Raw captured packets and their on-demand parsed views.
//!
//! A `Packet` owns the link-layer bytes and the capture timestamp. The parsed
//! view is a borrow produced by [`Packet::sliced`] each time it is needed;
//! nothing is cached, so the struct stays trivially movable across the worker
//! queue. Cloning performs a full byte copy and is only done when a packet is
//! archived into a log entry.

use etherparse::SlicedPacket;
use pcap::Linktype;

/// Where the raw byte stream starts, recorded by the origin that captured it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Bytes begin with an Ethernet II header.
    Ethernet,
    /// Bytes begin directly with an IP header (DLT_RAW and friends).
    RawIp,
}

impl LinkKind {
    /// Map a libpcap link type onto the two framings the parser understands.
    /// Unrecognized link types are treated as Ethernet, the overwhelmingly
    /// common case.
    pub fn from_linktype(linktype: Linktype) -> Self {
        match linktype.0 {
            // DLT_RAW (BSD value and LINKTYPE_RAW) and LINKTYPE_IPV4.
            12 | 101 | 228 => LinkKind::RawIp,
            _ => LinkKind::Ethernet,
        }
    }
}

/// An owned link-layer record with its capture timestamp.
#[derive(Debug, Clone)]
pub struct Packet {
    data: Vec<u8>,
    ts_sec: i64,
    ts_usec: i64,
    link: LinkKind,
}

impl Packet {
    /// Build a packet stamped with the current wall clock.
    pub fn new(data: Vec<u8>, link: LinkKind) -> Self {
        let now = chrono::Local::now();
        Self {
            data,
            ts_sec: now.timestamp(),
            ts_usec: i64::from(now.timestamp_subsec_micros()),
            link,
        }
    }

    /// Build a packet with an explicit capture timestamp.
    pub fn with_timestamp(data: Vec<u8>, ts_sec: i64, ts_usec: i64, link: LinkKind) -> Self {
        Self {
            data,
            ts_sec,
            ts_usec,
            link,
        }
    }

    /// Copy a packet out of a libpcap capture record.
    pub fn from_capture(captured: &pcap::Packet<'_>, link: LinkKind) -> Self {
        Self {
            data: captured.data.to_vec(),
            ts_sec: captured.header.ts.tv_sec as i64,
            ts_usec: captured.header.ts.tv_usec as i64,
            link,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn ts_sec(&self) -> i64 {
        self.ts_sec
    }

    pub fn ts_usec(&self) -> i64 {
        self.ts_usec
    }

    pub fn link(&self) -> LinkKind {
        self.link
    }

    /// Parse the packet up to the transport layer.
    ///
    /// The view borrows the packet's buffer and is re-created cheaply on each
    /// call. Returns `None` when the bytes do not form a well-shaped packet
    /// for the recorded link kind; signatures that need layers simply fail to
    /// match such packets.
    pub fn sliced(&self) -> Option<SlicedPacket<'_>> {
        let result = match self.link {
            LinkKind::Ethernet => SlicedPacket::from_ethernet(&self.data),
            LinkKind::RawIp => SlicedPacket::from_ip(&self.data),
        };
        match result {
            Ok(sliced) => Some(sliced),
            Err(err) => {
                tracing::trace!("packet did not slice: {err}");
                None
            }
        }
    }

    /// Decimal byte dump, e.g. `[8 0 69 0]`.
    pub fn render(&self) -> String {
        let mut out = String::from("[");
        for (i, byte) in self.data.iter().enumerate() {
            if i != 0 {
                out.push(' ');
            }
            out.push_str(&byte.to_string());
        }
        out.push(']');
        out
    }

    /// Short form used in log entries: the full dump for tiny packets,
    /// nothing for anything 10 bytes or longer.
    pub fn render_short(&self) -> String {
        if self.data.len() < 10 {
            self.render()
        } else {
            String::new()
        }
    }
}

/// Packets compare by content only; timestamps and framing are metadata.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Packet {}
