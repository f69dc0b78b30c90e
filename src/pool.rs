//! Worker pool that parses and matches packets off a shared queue.
//!
//! A single producer (the packet origin) enqueues raw packets; `n` worker
//! threads dequeue and run every registered callback against each packet.
//! Shutdown is cooperative: the flag is set, workers drain whatever is still
//! queued, then exit, and `finish` joins them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config;
use crate::packet::Packet;

pub type PoolCallback = Box<dyn Fn(&Packet) + Send + Sync>;

/// Multi-worker packet processing queue.
pub struct PacketPool {
    sender: Option<Sender<Packet>>,
    receiver: Option<Receiver<Packet>>,
    callbacks: Vec<PoolCallback>,
    workers: Vec<JoinHandle<()>>,
    num_workers: usize,
    done: Arc<AtomicBool>,
}

impl PacketPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender: Some(sender),
            receiver: Some(receiver),
            callbacks: Vec::new(),
            workers: Vec::new(),
            num_workers: num_workers.max(1),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a callback run against every dequeued packet. Must be called
    /// before `start`.
    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: Fn(&Packet) + Send + Sync + 'static,
    {
        assert!(
            self.workers.is_empty(),
            "pool callbacks must be registered before start"
        );
        self.callbacks.push(Box::new(callback));
    }

    /// Spawn the worker threads.
    pub fn start(&mut self) {
        let callbacks = Arc::new(std::mem::take(&mut self.callbacks));
        let shared_receiver = self
            .receiver
            .as_ref()
            .expect("pool already finished")
            .clone();
        for i in 0..self.num_workers {
            let receiver = shared_receiver.clone();
            let callbacks = Arc::clone(&callbacks);
            let done = Arc::clone(&self.done);
            let worker = std::thread::Builder::new()
                .name(format!("packet-worker-{i}"))
                .spawn(move || worker_loop(receiver, callbacks, done))
                .expect("failed to spawn packet worker thread");
            self.workers.push(worker);
        }
        tracing::debug!("packet pool started with {} workers", self.num_workers);
    }

    /// Producer handle for enqueuing packets. Sends fail (and the packet is
    /// dropped) once the pool has been finished.
    pub fn sender(&self) -> Sender<Packet> {
        self.sender
            .as_ref()
            .expect("pool already finished")
            .clone()
    }

    /// Enqueue one packet directly.
    pub fn add_packet(&self, packet: Packet) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(packet);
        }
    }

    /// Signal shutdown, drain the queue, and join every worker. Idempotent.
    pub fn finish(&mut self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping our producer side lets idle workers observe disconnection
        // as soon as the queue is empty.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        // With the workers gone, dropping our receiver disconnects any sender
        // clones still held by an origin.
        self.receiver.take();
        tracing::debug!("packet pool finished");
    }
}

impl Drop for PacketPool {
    fn drop(&mut self) {
        self.finish();
    }
}

fn worker_loop(receiver: Receiver<Packet>, callbacks: Arc<Vec<PoolCallback>>, done: Arc<AtomicBool>) {
    let poll = Duration::from_millis(config::QUEUE_POLL_INTERVAL_MS);
    loop {
        match receiver.recv_timeout(poll) {
            Ok(packet) => {
                for callback in callbacks.iter() {
                    callback(&packet);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if done.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
