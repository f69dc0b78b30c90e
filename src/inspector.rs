//! Engine supervisor: owns and wires every subsystem.
//!
//! Construction order matters: the logger and pcap writer exist first, the
//! dispatcher is wired with its default handlers and frozen, the analyzer is
//! built on top of both, the pool gets the analyzer as its default callback,
//! and finally the origin is pointed at the pool's queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;

use crate::analyzer::Analyzer;
use crate::error::Error;
use crate::events::{Event, EventDispatcher};
use crate::logger::{LogEntry, LogLevel, Logger};
use crate::origin::{PacketOrigin, StopHandle};
use crate::pcap_writer::PcapWriter;
use crate::pool::PacketPool;
use crate::rules::EventType;
use crate::signatures::SignatureRegistry;

/// A fully wired intrusion-detection engine around one packet origin.
pub struct Inspector {
    logger: Arc<Logger>,
    analyzer: Arc<Analyzer>,
    pcap_writer: Arc<PcapWriter>,
    pool: PacketPool,
    origin: Box<dyn PacketOrigin>,
    stop: StopHandle,
}

impl Inspector {
    pub fn new(workers: usize, mut origin: Box<dyn PacketOrigin>) -> Self {
        let logger = Arc::new(Logger::new());
        let pcap_writer = Arc::new(PcapWriter::new(origin.link_type()));

        let mut dispatcher = EventDispatcher::new();
        {
            // Default Alert handler: archive the packet into the log under
            // the rule's name. Bypasses the level filter like any alert.
            let logger = Arc::clone(&logger);
            dispatcher.add_callback(EventType::Alert, move |event: &Event<'_>| {
                logger.log_event(LogEntry {
                    timestamp: Local::now(),
                    packet: Some(event.packet.clone()),
                    alert: Some(event.rule.name().to_string()),
                    message: None,
                });
            });
        }
        {
            // Default SaveToPcap handler: hand the packet to the archiver.
            let writer = Arc::clone(&pcap_writer);
            dispatcher.add_callback(EventType::SaveToPcap, move |event: &Event<'_>| {
                writer.save_packet(event.packet);
            });
        }

        let analyzer = Arc::new(Analyzer::new(
            Arc::clone(&logger),
            Arc::new(dispatcher),
            SignatureRegistry::with_default_types(),
        ));

        let mut pool = PacketPool::new(workers);
        {
            let analyzer = Arc::clone(&analyzer);
            pool.add_callback(move |packet| analyzer.detect_threats(packet));
        }
        pool.start();

        let sender = pool.sender();
        origin.set_processor(Box::new(move |packet| {
            if sender.send(packet).is_err() {
                tracing::debug!("packet pool is shut down; dropping packet");
            }
        }));
        let stop = origin.stop_handle();

        Self {
            logger,
            analyzer,
            pcap_writer,
            pool,
            origin,
            stop,
        }
    }

    /// Run the origin's read loop on the calling thread. Returns when the
    /// input is exhausted or [`Inspector::stop`] is called.
    pub fn start(&mut self) -> Result<(), Error> {
        tracing::info!("starting packet processing");
        self.origin.start_reading()
    }

    /// Request shutdown of the read loop. Safe from any thread.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle for stopping the engine from a control thread while `start`
    /// blocks.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Shared analyzer handle, e.g. for rule reloads from a control thread.
    pub fn analyzer(&self) -> Arc<Analyzer> {
        Arc::clone(&self.analyzer)
    }

    /// Load (or replace) the ruleset from a rules file. On failure the
    /// current ruleset stays active.
    pub fn load_rules(&self, path: &Path) -> Result<(), Error> {
        self.analyzer.update_rules_from_file(path)
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.logger.set_level(level);
    }

    pub fn set_stat_interval(&self, interval_secs: u64) {
        self.analyzer.set_stat_interval(interval_secs);
    }

    pub fn set_log_output(&self, filename: &str) {
        self.logger.set_output_filename(filename);
    }

    pub fn set_pcap_output(&self, filename: &str) {
        self.pcap_writer.set_output_filename(filename);
    }
}

impl Drop for Inspector {
    fn drop(&mut self) {
        // Drain in-flight packets before announcing shutdown so the final
        // log line really is final.
        self.pool.finish();
        self.logger.log_message("Inspector stopped.".to_string());
        // The logger's own Drop performs the closing rotation once the last
        // Arc (held through analyzer and dispatcher) goes away.
    }
}

/// Reload helper shared by the SIGHUP path and embedders: reload rules from
/// a previously recorded path, keeping the old ruleset on failure.
pub struct RuleReloader {
    analyzer: Arc<Analyzer>,
    rules_path: PathBuf,
}

impl RuleReloader {
    pub fn new(analyzer: Arc<Analyzer>, rules_path: impl Into<PathBuf>) -> Self {
        Self {
            analyzer,
            rules_path: rules_path.into(),
        }
    }

    pub fn reload(&self) {
        tracing::info!("reloading rules from {}", self.rules_path.display());
        if let Err(err) = self.analyzer.update_rules_from_file(&self.rules_path) {
            tracing::warn!("rule reload failed, keeping previous ruleset: {err}");
        }
    }
}
