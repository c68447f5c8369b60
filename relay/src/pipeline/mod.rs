
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use log::{debug, error, trace};
use shared::error::{Error, Result};
use shared::{MediaKind, PacketBuffer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A rewritten packet waiting to be written to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Kind of the transport the packet was queued for.
    pub media_kind: MediaKind,
    pub data: PacketBuffer,
}

/// Writes packets popped from the send queue.
pub trait PacketWriter: Send + Sync {
    fn write_packet(&self, packet: &OutboundPacket) -> Result<usize>;
}

/// Bounded FIFO between producer threads and the single thread that writes
/// to transports. Enqueueing never blocks: once `capacity` packets are
/// pending (the one being written included) newer packets are dropped.
pub struct SendPipeline {
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    packets: Sender<OutboundPacket>,
    shutdown: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SendPipeline {
    pub fn new(capacity: usize, writer: Arc<dyn PacketWriter>) -> Result<Self> {
        let (packets, packets_rx) = bounded(capacity.max(1));
        let (shutdown, shutdown_rx) = bounded(1);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let in_flight = Arc::clone(&in_flight);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("relay-send".to_owned())
                .spawn(move || send_loop(packets_rx, shutdown_rx, writer, in_flight, running))?
        };

        Ok(SendPipeline {
            capacity,
            in_flight,
            running,
            packets,
            shutdown,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queues `packet`, or drops it with `ErrBufferFull` when the queue is
    /// saturated and `ErrBufferClosed` after shutdown.
    pub fn try_enqueue(&self, packet: OutboundPacket) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::ErrBufferClosed);
        }

        if self.in_flight.fetch_add(1, Ordering::SeqCst) >= self.capacity {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            trace!("send queue full, dropping {} bytes", packet.data.len());
            return Err(Error::ErrBufferFull);
        }

        match self.packets.try_send(packet) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                match err {
                    TrySendError::Full(_) => Err(Error::ErrBufferFull),
                    TrySendError::Disconnected(_) => Err(Error::ErrBufferClosed),
                }
            }
        }
    }

    /// Packets queued or being written.
    pub fn len(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stops the writer thread and waits for it. Pending packets are discarded.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.try_send(());

        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(err) => {
                error!("send pipeline worker: {err}");
                None
            }
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("send pipeline worker panicked");
            }
        }
    }
}

impl Drop for SendPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send_loop(
    packets: Receiver<OutboundPacket>,
    shutdown: Receiver<()>,
    writer: Arc<dyn PacketWriter>,
    in_flight: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
) {
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(packets) -> packet => {
                let Ok(packet) = packet else {
                    break;
                };
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(err) = writer.write_packet(&packet) {
                    debug!("failed to write {} packet: {err}", packet.media_kind);
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
    trace!("send loop exited");
}
