//! Decoupled packet queue
//!
//! Driver callbacks copy their bytes into an `OwnedPacket` and return
//! immediately; a dedicated worker thread decodes off the callback path.
//!
//! - two bounded lock-free queues: realtime (quotes) and other families
//! - full queue drops its oldest packet and counts the drop
//! - each worker round drains all realtime packets, then at most
//!   `other_batch` of the rest
//! - the worker parks when idle and is unparked by `push`

use crate::core::OwnedPacket;
use crate::infrastructure::config::QueueConfig;
use crossbeam_queue::ArrayQueue;
use crossbeam_utils::sync::{Parker, Unparker};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Idle wait between rounds when no push arrives
const IDLE_PARK: Duration = Duration::from_millis(100);

/// Drops between two "queue full" warnings
const DROP_WARN_EVERY: u64 = 1_000;

/// Consumer of dequeued packets
pub trait PacketHandler: Send + Sync + 'static {
    fn handle(&self, packet: &OwnedPacket);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("packet queue is shut down")]
    Stopped,

    #[error("packet worker join failed: {0}")]
    WorkerJoin(String),
}

pub struct PacketQueue {
    realtime: ArrayQueue<OwnedPacket>,
    other: ArrayQueue<OwnedPacket>,
    other_batch: usize,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    running: AtomicBool,
    unparker: Unparker,
}

impl PacketQueue {
    /// Queue plus the parker its worker waits on
    pub fn new(config: &QueueConfig) -> (Arc<Self>, Parker) {
        let parker = Parker::new();
        let queue = Arc::new(Self {
            realtime: ArrayQueue::new(config.realtime_capacity.max(1)),
            other: ArrayQueue::new(config.other_capacity.max(1)),
            other_batch: config.other_batch.max(1),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            running: AtomicBool::new(true),
            unparker: parker.unparker().clone(),
        });
        (queue, parker)
    }

    /// Build the queue and spawn its worker thread
    pub fn start<H: PacketHandler>(
        config: &QueueConfig,
        handler: Arc<H>,
    ) -> std::io::Result<(Arc<Self>, QueueWorker)> {
        let (queue, parker) = Self::new(config);
        let worker = QueueWorker::spawn(queue.clone(), parker, handler)?;
        Ok((queue, worker))
    }

    /// Enqueue a packet, evicting the oldest one if its queue is full
    pub fn push(&self, packet: OwnedPacket) -> Result<(), QueueError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(QueueError::Stopped);
        }

        let family = packet.family;
        let target = if family.is_realtime() {
            &self.realtime
        } else {
            &self.other
        };

        if target.force_push(packet).is_some() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped == 1 || dropped % DROP_WARN_EVERY == 0 {
                crate::log_ingest!(
                    Level::WARN,
                    %family,
                    dropped,
                    capacity = target.capacity(),
                    "packet queue full, oldest packet dropped"
                );
            }
        }
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.unparker.unpark();
        Ok(())
    }

    /// One worker round; returns the number of packets handled
    pub fn drain_round<H: PacketHandler + ?Sized>(&self, handler: &H) -> usize {
        let mut handled = 0;
        while let Some(packet) = self.realtime.pop() {
            handler.handle(&packet);
            handled += 1;
        }
        for _ in 0..self.other_batch {
            match self.other.pop() {
                Some(packet) => {
                    handler.handle(&packet);
                    handled += 1;
                }
                None => break,
            }
        }
        handled
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.realtime.len() + self.other.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.realtime.is_empty() && self.other.is_empty()
    }

    pub fn realtime_len(&self) -> usize {
        self.realtime.len()
    }

    pub fn other_len(&self) -> usize {
        self.other.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.unparker.unpark();
    }
}

/// Handle to the queue's worker thread
pub struct QueueWorker {
    queue: Arc<PacketQueue>,
    handle: Option<JoinHandle<()>>,
}

impl QueueWorker {
    fn spawn<H: PacketHandler>(
        queue: Arc<PacketQueue>,
        parker: Parker,
        handler: Arc<H>,
    ) -> std::io::Result<Self> {
        let worker_queue = queue.clone();
        let handle = thread::Builder::new()
            .name("packet-worker".to_string())
            .spawn(move || {
                crate::log_ingest!(Level::INFO, "packet worker started");
                while worker_queue.is_running() {
                    if worker_queue.drain_round(handler.as_ref()) == 0 {
                        parker.park_timeout(IDLE_PARK);
                    }
                }
                // Finish what was accepted before the stop
                while worker_queue.drain_round(handler.as_ref()) > 0 {}
                crate::log_ingest!(Level::INFO, "packet worker stopped");
            })?;
        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    /// Stop accepting packets, drain what is queued and join the thread
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.queue.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                crate::log_ingest!(Level::ERROR, "packet worker panicked");
            }
        }
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
