//! Asynchronous, level-filtered alert log with batched rotation to disk.
//!
//! Entries are appended to an in-memory buffer from any thread; a dedicated
//! rotator thread drains the buffer to the output file whenever it grows past
//! [`config::MAX_LOG_ENTRIES`] or ten seconds pass, whichever comes first.
//! The output file is truncated on the first write after a filename is set
//! and appended to afterwards, so a run always starts with a clean log.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config;
use crate::packet::Packet;

/// Verbosity threshold for admitted entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

/// One line of the rotated log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub packet: Option<Packet>,
    pub alert: Option<String>,
    pub message: Option<String>,
}

impl LogEntry {
    fn render(&self) -> String {
        let mut line = format!("{} ", self.timestamp.format(config::LOG_TIMESTAMP_FORMAT));
        if let Some(packet) = &self.packet {
            line.push_str(&format!("Packet: {} ", packet.render_short()));
        }
        if let Some(alert) = &self.alert {
            line.push_str(&format!("Alert: {alert} "));
        }
        if let Some(message) = &self.message {
            line.push_str(&format!("Message: {message} "));
        }
        line.push('\n');
        line
    }
}

struct BufferState {
    entries: Vec<LogEntry>,
    should_rotate: bool,
    done: bool,
}

struct FileState {
    filename: String,
    opened: bool,
}

struct LoggerShared {
    buffer: Mutex<BufferState>,
    rotate_signal: Condvar,
    file: Mutex<FileState>,
    level: AtomicU8,
    max_entries: usize,
}

impl LoggerShared {
    /// Drain the buffer and serialize every entry, preserving append order.
    fn export_logs(&self) -> String {
        let drained = {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.should_rotate = false;
            std::mem::take(&mut buffer.entries)
        };

        let mut out = String::new();
        for entry in &drained {
            out.push_str(&entry.render());
        }
        out
    }

    /// Flush the buffer to the output file. The first write to a filename
    /// truncates; later writes append. Open failures are reported to stderr
    /// once per attempt and the entries are dropped rather than wedging the
    /// buffer.
    fn export_logs_to_file(&self) {
        let mut file_state = self.file.lock().unwrap();
        let text = self.export_logs();

        let open_result = if file_state.opened {
            OpenOptions::new().append(true).open(&file_state.filename)
        } else {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&file_state.filename)
        };

        match open_result {
            Ok(mut file) => {
                file_state.opened = true;
                if let Err(err) = file.write_all(text.as_bytes()) {
                    eprintln!("Error writing log file {}: {err}", file_state.filename);
                }
            }
            Err(err) => {
                eprintln!("Error opening log file {}: {err}", file_state.filename);
            }
        }
    }

    fn rotator_loop(&self) {
        let mut buffer = self.buffer.lock().unwrap();
        while !buffer.done {
            let (guard, _timeout) = self
                .rotate_signal
                .wait_timeout_while(
                    buffer,
                    Duration::from_secs(config::LOG_ROTATION_TIMEOUT_SECS),
                    |state| !state.done && !state.should_rotate,
                )
                .unwrap();
            buffer = guard;

            if buffer.should_rotate || buffer.entries.len() >= self.max_entries {
                drop(buffer);
                self.export_logs_to_file();
                buffer = self.buffer.lock().unwrap();
            }
        }
    }
}

/// Thread-safe alert logger. Dropping it joins the rotator and flushes every
/// remaining entry, so no entry is lost on a clean shutdown.
pub struct Logger {
    shared: Arc<LoggerShared>,
    rotator: Option<JoinHandle<()>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_max_entries(config::MAX_LOG_ENTRIES)
    }

    fn with_max_entries(max_entries: usize) -> Self {
        let shared = Arc::new(LoggerShared {
            buffer: Mutex::new(BufferState {
                entries: Vec::new(),
                should_rotate: false,
                done: false,
            }),
            rotate_signal: Condvar::new(),
            file: Mutex::new(FileState {
                filename: config::DEFAULT_LOG_OUTPUT.to_string(),
                opened: false,
            }),
            level: AtomicU8::new(LogLevel::Debug as u8),
            max_entries,
        });

        let rotator_shared = Arc::clone(&shared);
        let rotator = std::thread::Builder::new()
            .name("log-rotator".into())
            .spawn(move || rotator_shared.rotator_loop())
            .expect("failed to spawn log rotator thread");

        Self {
            shared,
            rotator: Some(rotator),
        }
    }

    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level as u8, Ordering::Relaxed);
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.shared.level.load(Ordering::Relaxed))
    }

    /// Change the output file. The next rotation truncates the new file.
    pub fn set_output_filename(&self, filename: &str) {
        let mut file_state = self.shared.file.lock().unwrap();
        file_state.filename = filename.to_string();
        file_state.opened = false;
    }

    /// Append an entry unconditionally and wake the rotator when the buffer
    /// crosses the rotation threshold.
    pub fn log_event(&self, entry: LogEntry) {
        {
            let mut buffer = self.shared.buffer.lock().unwrap();
            buffer.entries.push(entry);
            if buffer.entries.len() >= self.shared.max_entries {
                buffer.should_rotate = true;
            }
        }
        self.shared.rotate_signal.notify_one();
    }

    /// Record a packet observation (info level).
    pub fn log_packet(&self, packet: Packet) {
        if self.level() <= LogLevel::Info {
            self.log_event(LogEntry {
                timestamp: Local::now(),
                packet: Some(packet),
                alert: None,
                message: None,
            });
        }
    }

    /// Record a triggered alert (warning level).
    pub fn log_alert(&self, alert: String) {
        if self.level() <= LogLevel::Warning {
            self.log_event(LogEntry {
                timestamp: Local::now(),
                packet: None,
                alert: Some(alert),
                message: None,
            });
        }
    }

    /// Record a free-form message (info level).
    pub fn log_message(&self, message: String) {
        if self.level() <= LogLevel::Info {
            tracing::debug!("{message}");
            self.log_event(LogEntry {
                timestamp: Local::now(),
                packet: None,
                alert: None,
                message: Some(message),
            });
        }
    }

    /// Record a message only when debug logging is enabled.
    pub fn log_debug(&self, message: String) {
        if self.level() <= LogLevel::Debug {
            self.log_message(message);
        }
    }

    /// Drain and serialize the buffered entries without touching the file.
    pub fn export_logs(&self) -> String {
        self.shared.export_logs()
    }

    /// Force a flush of the buffered entries to the output file.
    pub fn export_logs_to_file(&self) {
        self.shared.export_logs_to_file()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        {
            let mut buffer = self.shared.buffer.lock().unwrap();
            buffer.done = true;
        }
        self.shared.rotate_signal.notify_one();
        if let Some(rotator) = self.rotator.take() {
            let _ = rotator.join();
        }
        // Final flush of whatever arrived after the last rotation. Skipped
        // entirely for a logger that never admitted an entry, so an idle run
        // does not leave an empty file behind.
        let pending = !self.shared.buffer.lock().unwrap().entries.is_empty();
        let opened = self.shared.file.lock().unwrap().opened;
        if pending || opened {
            self.shared.export_logs_to_file();
        }
    }
}
