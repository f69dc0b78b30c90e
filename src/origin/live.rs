//! Live origin capturing packets from a network interface.

use pcap::{Capture, Device, Linktype};

use crate::config;
use crate::error::Error;
use crate::origin::{PacketOrigin, PacketSink, StopHandle};
use crate::packet::{LinkKind, Packet};

/// Captures from a named interface until stopped. Requires the privileges
/// libpcap needs to open the device.
pub struct LiveOrigin {
    interface: String,
    sink: Option<PacketSink>,
    stop: StopHandle,
}

impl LiveOrigin {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            sink: None,
            stop: StopHandle::new(),
        }
    }

    fn open(&self) -> Result<Capture<pcap::Active>, pcap::Error> {
        Capture::from_device(Device::from(self.interface.as_str()))?
            .promisc(true)
            .snaplen(config::SNAPLEN)
            .timeout(config::LIVE_READ_TIMEOUT_MS)
            .open()
    }
}

impl PacketOrigin for LiveOrigin {
    fn set_processor(&mut self, sink: PacketSink) {
        self.sink = Some(sink);
    }

    fn link_type(&self) -> Linktype {
        match self.open() {
            Ok(capture) => capture.get_datalink(),
            Err(err) => {
                eprintln!("Couldn't open device {}: {err}", self.interface);
                Linktype::ETHERNET
            }
        }
    }

    fn start_reading(&mut self) -> Result<(), Error> {
        let mut capture = self.open().map_err(|err| {
            eprintln!("Couldn't open device {}: {err}", self.interface);
            Error::Capture(format!("cannot open device {}: {err}", self.interface))
        })?;
        let link = LinkKind::from_linktype(capture.get_datalink());

        let mut sink = self
            .sink
            .take()
            .expect("set_processor must be called before start_reading");

        tracing::info!("live capture started on {}", self.interface);
        while !self.stop.is_stopped() {
            match capture.next_packet() {
                Ok(captured) => sink(Packet::from_capture(&captured, link)),
                // The read timeout is the poll point for the stop flag.
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(err) => {
                    eprintln!("Error capturing on {}: {err}", self.interface);
                    return Err(Error::Capture(err.to_string()));
                }
            }
        }
        tracing::info!("live capture stopped on {}", self.interface);
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}
