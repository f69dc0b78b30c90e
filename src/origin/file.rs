//! Offline origin reading packets from a `.pcap` capture file.

use std::path::{Path, PathBuf};

use pcap::{Capture, Linktype};

use crate::error::Error;
use crate::origin::{PacketOrigin, PacketSink, StopHandle};
use crate::packet::{LinkKind, Packet};

/// Replays a capture file through the sink, then terminates.
pub struct PcapFileOrigin {
    path: PathBuf,
    sink: Option<PacketSink>,
    stop: StopHandle,
}

impl PcapFileOrigin {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sink: None,
            stop: StopHandle::new(),
        }
    }
}

impl PacketOrigin for PcapFileOrigin {
    fn set_processor(&mut self, sink: PacketSink) {
        self.sink = Some(sink);
    }

    fn link_type(&self) -> Linktype {
        match Capture::from_file(&self.path) {
            Ok(capture) => capture.get_datalink(),
            Err(err) => {
                eprintln!("Error opening pcap file {}: {err}", self.path.display());
                Linktype::ETHERNET
            }
        }
    }

    fn start_reading(&mut self) -> Result<(), Error> {
        let mut capture = Capture::from_file(&self.path).map_err(|err| {
            eprintln!("Error opening pcap file {}: {err}", self.path.display());
            Error::Capture(format!("cannot open {}: {err}", self.path.display()))
        })?;
        let link = LinkKind::from_linktype(capture.get_datalink());

        let mut sink = self
            .sink
            .take()
            .expect("set_processor must be called before start_reading");

        tracing::info!("reading packets from {}", self.path.display());
        loop {
            if self.stop.is_stopped() {
                break;
            }
            match capture.next_packet() {
                Ok(captured) => sink(Packet::from_capture(&captured, link)),
                Err(pcap::Error::NoMorePackets) => break,
                Err(err) => {
                    eprintln!("Error reading pcap file {}: {err}", self.path.display());
                    return Err(Error::Capture(err.to_string()));
                }
            }
        }
        tracing::info!("finished reading {}", self.path.display());
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap_writer::PcapWriter;
    use std::sync::{Arc, Mutex};

    /// Write packets through the production writer so the round trip covers
    /// both ends.
    fn write_capture(path: &Path, packets: &[Packet]) {
        let writer = PcapWriter::new(Linktype(101));
        writer.set_output_filename(path.to_str().unwrap());
        for packet in packets {
            writer.save_packet(packet);
        }
    }

    #[test]
    fn test_round_trip_preserves_bytes_and_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.pcap");

        let originals = vec![
            Packet::with_timestamp(vec![1, 2, 3, 4], 1_700_000_000, 123_456, LinkKind::RawIp),
            Packet::with_timestamp(vec![9, 8, 7], 1_700_000_001, 1, LinkKind::RawIp),
        ];
        write_capture(&path, &originals);

        let mut origin = PcapFileOrigin::new(&path);
        let collected: Arc<Mutex<Vec<Packet>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let collected = Arc::clone(&collected);
            origin.set_processor(Box::new(move |packet| {
                collected.lock().unwrap().push(packet);
            }));
        }
        origin.start_reading().unwrap();

        let collected = collected.lock().unwrap();
        assert_eq!(collected.len(), 2);
        for (read, original) in collected.iter().zip(&originals) {
            assert_eq!(read.data(), original.data());
            assert_eq!(read.ts_sec(), original.ts_sec());
            assert_eq!(read.ts_usec(), original.ts_usec());
        }
    }

    #[test]
    fn test_link_type_survives_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linktype.pcap");
        write_capture(
            &path,
            &[Packet::new(vec![0x45, 0, 0, 20], LinkKind::RawIp)],
        );

        let origin = PcapFileOrigin::new(&path);
        assert_eq!(origin.link_type(), Linktype(101));
    }

    #[test]
    fn test_missing_file_is_a_capture_error() {
        let mut origin = PcapFileOrigin::new("no/such/capture.pcap");
        origin.set_processor(Box::new(|_| {}));
        assert!(matches!(origin.start_reading(), Err(Error::Capture(_))));
    }

    #[test]
    fn test_stop_handle_cuts_the_replay_short() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stopped.pcap");
        let packets: Vec<Packet> = (0..100u8)
            .map(|i| Packet::new(vec![i; 4], LinkKind::RawIp))
            .collect();
        write_capture(&path, &packets);

        let mut origin = PcapFileOrigin::new(&path);
        let stop = origin.stop_handle();
        let count = Arc::new(Mutex::new(0usize));
        {
            let count = Arc::clone(&count);
            origin.set_processor(Box::new(move |_| {
                let mut count = count.lock().unwrap();
                *count += 1;
                if *count == 10 {
                    stop.stop();
                }
            }));
        }
        origin.start_reading().unwrap();

        assert_eq!(
            *count.lock().unwrap(),
            10,
            "reading must stop at the handle, not at end of file"
        );
    }
}
