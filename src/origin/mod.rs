//! Packet producers: offline capture files and live interfaces.

pub mod file;
pub mod live;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use file::PcapFileOrigin;
pub use live::LiveOrigin;

use crate::error::Error;
use crate::packet::Packet;

/// Sink invoked once per produced packet, receiving it by move.
pub type PacketSink = Box<dyn FnMut(Packet) + Send>;

/// Cooperative cancellation for a running origin. Cloneable so a control
/// thread can stop the read loop running elsewhere.
#[derive(Clone, Default)]
pub struct StopHandle {
    done: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        tracing::debug!("stopping packet origin");
        self.done.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// A source of captured packets.
pub trait PacketOrigin: Send {
    /// Record the sink packets are produced into. Must be called exactly
    /// once, before `start_reading`.
    fn set_processor(&mut self, sink: PacketSink);

    /// Link type of the produced frames, needed by the pcap writer.
    fn link_type(&self) -> pcap::Linktype;

    /// Produce packets into the sink until the input is exhausted or the
    /// stop handle fires. Blocks the calling thread.
    fn start_reading(&mut self) -> Result<(), Error>;

    /// Handle used to stop a read loop in progress.
    fn stop_handle(&self) -> StopHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_is_shared_across_clones() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());

        clone.stop();
        assert!(handle.is_stopped(), "clones must observe the same flag");
    }
}
