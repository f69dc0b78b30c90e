//! Per-packet rule matching and live ruleset reloads.
//!
//! The analyzer owns the active [`RuleStore`] behind a reader/writer lock:
//! workers take the shared side for every packet, and a reload takes the
//! exclusive side only for the final swap. Parsing the replacement ruleset
//! happens entirely outside the lock, so a bad rules file can never disturb
//! the ruleset that is live.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Error, RuleError};
use crate::events::{Event, EventDispatcher};
use crate::logger::Logger;
use crate::packet::Packet;
use crate::rules::parser;
use crate::rules::{Rule, RuleStore};
use crate::signatures::SignatureRegistry;

struct StatsSignal {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

struct StatsWorker {
    signal: Arc<StatsSignal>,
    handle: JoinHandle<()>,
}

impl StatsWorker {
    fn stop(self) {
        *self.signal.stopped.lock().unwrap() = true;
        self.signal.wakeup.notify_one();
        let _ = self.handle.join();
    }
}

/// Matches packets against the active ruleset and hands hits to the event
/// dispatcher.
pub struct Analyzer {
    store: RwLock<RuleStore>,
    registry: SignatureRegistry,
    logger: Arc<Logger>,
    dispatcher: Arc<EventDispatcher>,
    packets_count: Arc<AtomicU64>,
    stats: Mutex<Option<StatsWorker>>,
}

impl Analyzer {
    pub fn new(
        logger: Arc<Logger>,
        dispatcher: Arc<EventDispatcher>,
        registry: SignatureRegistry,
    ) -> Self {
        Self {
            store: RwLock::new(RuleStore::new()),
            registry,
            logger,
            dispatcher,
            packets_count: Arc::new(AtomicU64::new(0)),
            stats: Mutex::new(None),
        }
    }

    /// Match one packet against every rule, dispatching an event per hit.
    /// This is the worker-thread hot path.
    pub fn detect_threats(&self, packet: &Packet) {
        self.packets_count.fetch_add(1, Ordering::Relaxed);

        let store = self.store.read().unwrap();
        for rule in store.rules() {
            if rule.check(packet) {
                self.dispatcher.dispatch(&Event {
                    event_type: rule.event_type(),
                    rule,
                    packet,
                });
                self.logger.log_debug("Threat detected".to_string());
            }
        }
    }

    /// Return clones of every rule that matches the packet. Used by tests
    /// and embedders that want matches without dispatching events.
    pub fn evaluate(&self, packet: &Packet) -> Vec<Rule> {
        let store = self.store.read().unwrap();
        store
            .rules()
            .filter(|rule| rule.check(packet))
            .cloned()
            .collect()
    }

    /// Insert a single rule line into the live store.
    pub fn parse_rule(&self, line: &str) -> Result<(), RuleError> {
        let mut store = self.store.write().unwrap();
        parser::parse_line(line, &self.registry, &mut store)
    }

    /// Replace the active ruleset from a rules file.
    ///
    /// The file is compiled into a fresh store first; only a fully valid file
    /// is swapped in. On any error the previous ruleset stays active and the
    /// error is returned.
    pub fn update_rules_from_file(&self, path: &Path) -> Result<(), Error> {
        self.logger
            .log_message(format!("Updating rules from file: {}", path.display()));

        let new_store = match parser::parse_rules_file(path, &self.registry) {
            Ok(store) => store,
            Err(err) => {
                self.logger
                    .log_message(format!("Failed to parse rules file: {}", path.display()));
                return Err(err);
            }
        };

        let rules_total = new_store.rules_count();
        {
            let mut store = self.store.write().unwrap();
            *store = new_store;
        }

        self.logger.log_message(format!(
            "Rules successfully updated. Total rules: {rules_total}"
        ));
        Ok(())
    }

    pub fn rules_count(&self) -> usize {
        self.store.read().unwrap().rules_count()
    }

    pub fn signatures_count(&self) -> usize {
        self.store.read().unwrap().signatures_count()
    }

    /// Reconfigure the periodic throughput report. Stops the current stats
    /// thread, then starts a new one unless `interval_secs` is zero.
    pub fn set_stat_interval(&self, interval_secs: u64) {
        let mut stats = self.stats.lock().unwrap();
        if let Some(worker) = stats.take() {
            worker.stop();
        }
        if interval_secs == 0 {
            return;
        }

        let signal = Arc::new(StatsSignal {
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);
        let counter = Arc::clone(&self.packets_count);
        let handle = std::thread::Builder::new()
            .name("stats-printer".into())
            .spawn(move || {
                let mut stopped = thread_signal.stopped.lock().unwrap();
                loop {
                    let (guard, _timeout) = thread_signal
                        .wakeup
                        .wait_timeout_while(
                            stopped,
                            Duration::from_secs(interval_secs),
                            |stop| !*stop,
                        )
                        .unwrap();
                    stopped = guard;
                    if *stopped {
                        return;
                    }
                    let count = counter.swap(0, Ordering::Relaxed);
                    tracing::info!(
                        "Current speed: {} packets per second",
                        count / interval_secs
                    );
                }
            })
            .expect("failed to spawn stats thread");

        *stats = Some(StatsWorker { signal, handle });
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        if let Some(worker) = self.stats.lock().unwrap().take() {
            worker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkKind;
    use crate::rules::EventType;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;

    /// Analyzer whose dispatcher records `(rule name, event type)` per event.
    fn recording_analyzer() -> (Analyzer, Arc<StdMutex<Vec<(String, EventType)>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for event_type in [
            EventType::Alert,
            EventType::Notify,
            EventType::TestEvent1,
            EventType::TestEvent2,
        ] {
            let seen = Arc::clone(&seen);
            dispatcher.add_callback(event_type, move |event: &Event<'_>| {
                seen.lock()
                    .unwrap()
                    .push((event.rule.name().to_string(), event.event_type));
            });
        }

        let logger = Logger::new();
        logger.set_output_filename(
            std::env::temp_dir()
                .join("flow-inspector-analyzer-tests.log")
                .to_str()
                .unwrap(),
        );
        let analyzer = Analyzer::new(
            Arc::new(logger),
            Arc::new(dispatcher),
            SignatureRegistry::with_default_types(),
        );
        (analyzer, seen)
    }

    fn packet(bytes: &[u8]) -> Packet {
        Packet::new(bytes.to_vec(), LinkKind::RawIp)
    }

    #[test]
    fn test_single_rule_fires_once_per_matching_packet() {
        let (analyzer, seen) = recording_analyzer();
        analyzer.parse_rule("Alert; r1; raw_bytes([1 2 3 4])").unwrap();

        analyzer.detect_threats(&packet(&[0, 1, 2, 3, 4, 5, 6]));
        analyzer.detect_threats(&packet(&[0, 1, 2, 4, 5, 6]));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("r1".to_string(), EventType::Alert)],
            "exactly one event for the matching packet, none for the other"
        );
    }

    #[test]
    fn test_disjoint_rules_fire_independently() {
        let (analyzer, seen) = recording_analyzer();
        analyzer
            .parse_rule("TestEvent1; r1; raw_bytes([3 4]); raw_bytes([5 6])")
            .unwrap();
        analyzer
            .parse_rule("TestEvent2; r2; raw_bytes([1 2]); raw_bytes([3 4])")
            .unwrap();

        let hits = |bytes: &[u8]| {
            seen.lock().unwrap().clear();
            analyzer.detect_threats(&packet(bytes));
            let mut names: Vec<String> =
                seen.lock().unwrap().iter().map(|(name, _)| name.clone()).collect();
            names.sort();
            names
        };

        assert_eq!(hits(&[0, 2, 3, 4, 5, 6]), vec!["r1"]);
        assert_eq!(hits(&[1, 2, 3, 4, 6]), vec!["r2"]);
        assert_eq!(hits(&[1, 2, 3, 4, 5, 6]), vec!["r1", "r2"]);
    }

    #[test]
    fn test_evaluate_returns_matching_rules_without_dispatch() {
        let (analyzer, seen) = recording_analyzer();
        analyzer.parse_rule("Alert; hit; raw_bytes([7])").unwrap();
        analyzer.parse_rule("Alert; miss; raw_bytes([8])").unwrap();

        let matches = analyzer.evaluate(&packet(&[7]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name(), "hit");
        assert!(seen.lock().unwrap().is_empty(), "evaluate must not dispatch");
    }

    #[test]
    fn test_update_rules_from_file_swaps_ruleset() {
        let (analyzer, _seen) = recording_analyzer();
        analyzer.parse_rule("Alert; old; raw_bytes([1])").unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Alert; new_a; raw_bytes([2])").unwrap();
        writeln!(file, "Alert; new_b; raw_bytes([3])").unwrap();
        analyzer.update_rules_from_file(file.path()).unwrap();

        assert_eq!(analyzer.rules_count(), 2);
        assert!(analyzer.evaluate(&packet(&[1])).is_empty(), "old rule is gone");
        assert_eq!(analyzer.evaluate(&packet(&[2])).len(), 1);
    }

    #[test]
    fn test_failed_reload_preserves_previous_ruleset() {
        let (analyzer, _seen) = recording_analyzer();

        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "Alert; keeper; raw_bytes([1 2])").unwrap();
        writeln!(good, "Alert; other; tcp([any],[80])").unwrap();
        analyzer.update_rules_from_file(good.path()).unwrap();

        let before_sigs = analyzer.signatures_count();
        let before_matches: Vec<String> = analyzer
            .evaluate(&packet(&[1, 2]))
            .iter()
            .map(|r| r.name().to_string())
            .collect();

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "Alert; fine; raw_bytes([9])").unwrap();
        writeln!(bad, "Garbage; broken; raw_bytes([9])").unwrap();
        assert!(analyzer.update_rules_from_file(bad.path()).is_err());

        assert_eq!(analyzer.signatures_count(), before_sigs);
        let after_matches: Vec<String> = analyzer
            .evaluate(&packet(&[1, 2]))
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(before_matches, after_matches, "failed reload must be a no-op");
        assert!(
            analyzer.evaluate(&packet(&[9])).is_empty(),
            "no rule from the bad file may leak in"
        );
    }

    #[test]
    fn test_reload_races_cleanly_with_evaluation() {
        let (analyzer, _seen) = recording_analyzer();
        let analyzer = Arc::new(analyzer);

        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "Alert; stable; raw_bytes([5 5])").unwrap();
        analyzer.update_rules_from_file(good.path()).unwrap();

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "Nonsense; nope; raw_bytes([5 5])").unwrap();
        let bad_path = bad.path().to_path_buf();

        let reloader = {
            let analyzer = Arc::clone(&analyzer);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    assert!(analyzer.update_rules_from_file(&bad_path).is_err());
                }
            })
        };

        // Every concurrent evaluation must see the intact ruleset A.
        for _ in 0..200 {
            let matches = analyzer.evaluate(&packet(&[5, 5]));
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].name(), "stable");
        }
        reloader.join().unwrap();
        assert_eq!(analyzer.signatures_count(), 1);
    }

    #[test]
    fn test_events_carry_their_rules_event_type() {
        let (analyzer, seen) = recording_analyzer();
        analyzer.parse_rule("Notify; n; raw_bytes([1])").unwrap();
        analyzer.parse_rule("Alert; a; raw_bytes([1])").unwrap();

        analyzer.detect_threats(&packet(&[1]));

        let mut by_name: HashMap<String, EventType> =
            seen.lock().unwrap().iter().cloned().collect();
        assert_eq!(by_name.remove("n"), Some(EventType::Notify));
        assert_eq!(by_name.remove("a"), Some(EventType::Alert));
    }

    #[test]
    fn test_stat_thread_starts_stops_and_restarts() {
        let (analyzer, _seen) = recording_analyzer();
        analyzer.set_stat_interval(1);
        analyzer.set_stat_interval(2);
        analyzer.set_stat_interval(0);
        // Drop must not hang even with a live stats thread.
        analyzer.set_stat_interval(5);
    }
}
