//! Archival sink writing matched packets to a `.pcap` file.

use std::sync::Mutex;

use pcap::{Capture, Linktype, PacketHeader, Savefile};

use crate::config;
use crate::packet::Packet;

struct WriterState {
    filename: String,
    savefile: Option<Savefile>,
}

/// Single-file append sink. The output is opened lazily on the first
/// `save_packet` so a run that never matches a `SaveToPcap` rule leaves no
/// file behind. Open and write failures are reported and swallowed; archival
/// must never take the engine down.
pub struct PcapWriter {
    link_type: Linktype,
    state: Mutex<WriterState>,
}

impl PcapWriter {
    /// `link_type` must match the origin producing the packets, otherwise
    /// readers will misinterpret the archived frames.
    pub fn new(link_type: Linktype) -> Self {
        Self {
            link_type,
            state: Mutex::new(WriterState {
                filename: config::DEFAULT_PCAP_OUTPUT.to_string(),
                savefile: None,
            }),
        }
    }

    /// Change the output path. If the writer is already open under another
    /// name, the old file is closed and the new one opens lazily on the next
    /// write.
    pub fn set_output_filename(&self, filename: &str) {
        let mut state = self.state.lock().unwrap();
        if state.filename != filename {
            state.filename = filename.to_string();
            if let Some(savefile) = state.savefile.take() {
                drop(savefile);
            }
        }
    }

    /// Append one packet, opening the output file if needed.
    pub fn save_packet(&self, packet: &Packet) {
        let mut state = self.state.lock().unwrap();
        if state.savefile.is_none() {
            state.savefile = match self.open(&state.filename) {
                Ok(savefile) => Some(savefile),
                Err(err) => {
                    eprintln!("Error opening pcap file {}: {err}", state.filename);
                    tracing::error!("cannot open pcap output {}: {err}", state.filename);
                    return;
                }
            };
        }

        let header = PacketHeader {
            ts: libc::timeval {
                tv_sec: packet.ts_sec() as libc::time_t,
                tv_usec: packet.ts_usec() as libc::suseconds_t,
            },
            caplen: packet.data().len() as u32,
            len: packet.data().len() as u32,
        };
        let record = pcap::Packet::new(&header, packet.data());

        if let Some(savefile) = state.savefile.as_mut() {
            savefile.write(&record);
        }
    }

    /// Flush buffered records to disk without closing the file.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(savefile) = state.savefile.as_mut() {
            if let Err(err) = savefile.flush() {
                eprintln!("Error flushing pcap file {}: {err}", state.filename);
            }
        }
    }

    fn open(&self, filename: &str) -> Result<Savefile, pcap::Error> {
        Capture::dead(self.link_type)?.savefile(filename)
    }
}

impl Drop for PcapWriter {
    fn drop(&mut self) {
        self.flush();
    }
}
