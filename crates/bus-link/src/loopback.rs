//! Loopback Bus Wiring
//!
//! Both roles live on the same controller with their data and clock lines
//! tied together. The responder's handler is owned by a dedicated thread that
//! plays the part of the peripheral interrupt: it runs each event to
//! completion and is the only code that ever touches the handler.

use crate::config::{BusAddress, BusConfig, BusRole};
use crate::error::BusError;
use crate::event::{BusEvent, BusEventHandler, BusTransmitter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

type Reply = Result<Vec<u8>, BusError>;

/// A transfer as it appears on the wire
enum Transfer {
    Write { address: u8, bytes: Vec<u8> },
    Read { address: u8, len: usize },
}

/// One transfer plus the slot its reply goes back through
///
/// Each request carries its own reply slot, so a reply that arrives after
/// the initiator gave up can never be mistaken for a later transfer's.
struct Request {
    transfer: Transfer,
    reply: SyncSender<Reply>,
}

/// Factory for loopback-wired initiator/responder pairs
pub struct LoopbackBus {
    config: BusConfig,
}

impl LoopbackBus {
    /// Create a loopback bus with the given configuration
    pub fn new(config: BusConfig) -> Self {
        Self { config }
    }

    /// Attach a responder handler and get the initiator's transmitter
    ///
    /// The handler moves onto its own thread. Dropping the transmitter stops
    /// that thread; [`LoopbackHandle::join`] then returns the handler.
    pub fn attach<H: BusEventHandler>(
        self,
        handler: H,
    ) -> std::io::Result<(LoopbackTransmitter, LoopbackHandle<H>)> {
        let clock_rate_hz = self.config.clock_rate_hz;
        self.config
            .pins(BusRole::Responder)
            .configure(BusRole::Responder, clock_rate_hz);
        self.config
            .pins(BusRole::Initiator)
            .configure(BusRole::Initiator, clock_rate_hz);

        let (wire_tx, wire_rx) = mpsc::channel::<Request>();
        let address = self.config.responder_address;

        let thread = std::thread::Builder::new()
            .name("bus-responder-irq".into())
            .spawn(move || responder_loop(address, handler, wire_rx))?;

        info!("Loopback bus up, responder listening at {}", address);

        Ok((
            LoopbackTransmitter {
                wire: wire_tx,
                timeout: Duration::from_millis(self.config.transfer_timeout_ms),
            },
            LoopbackHandle { thread },
        ))
    }
}

/// Runs on the interrupt thread until the wire is dropped
fn responder_loop<H: BusEventHandler>(
    address: BusAddress,
    mut handler: H,
    wire: Receiver<Request>,
) -> H {
    for Request { transfer, reply } in wire {
        let result = match transfer {
            Transfer::Write { address: a, .. } | Transfer::Read { address: a, .. }
                if a != address.get() =>
            {
                Err(BusError::Nack(a))
            }
            Transfer::Write { bytes, .. } => {
                for b in &bytes {
                    handler.on_event(BusEvent::ByteReceived(*b));
                }
                handler.on_event(BusEvent::FrameFinished);
                Ok(Vec::new())
            }
            Transfer::Read { len, .. } => {
                let data = (0..len)
                    .map(|_| handler.on_event(BusEvent::DataRequested).unwrap_or(0xFF))
                    .collect();
                handler.on_event(BusEvent::FrameFinished);
                Ok(data)
            }
        };

        // The initiator may have timed out and moved on
        if reply.send(result).is_err() {
            debug!("Reply for an abandoned transfer discarded");
        }
    }
    handler
}

/// Initiator endpoint of a loopback bus
pub struct LoopbackTransmitter {
    wire: Sender<Request>,
    timeout: Duration,
}

impl LoopbackTransmitter {
    fn transfer(&mut self, transfer: Transfer) -> Reply {
        let (reply, replies) = mpsc::sync_channel(1);
        self.wire
            .send(Request { transfer, reply })
            .map_err(|_| BusError::Disconnected)?;
        match replies.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => Err(BusError::Timeout(self.timeout.as_millis() as u64)),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected),
        }
    }
}

impl BusTransmitter for LoopbackTransmitter {
    fn write_blocking(&mut self, address: BusAddress, bytes: &[u8]) -> Result<usize, BusError> {
        debug!("Writing {} bytes to {}", bytes.len(), address);
        self.transfer(Transfer::Write {
            address: address.get(),
            bytes: bytes.to_vec(),
        })?;
        Ok(bytes.len())
    }

    fn read_blocking(&mut self, address: BusAddress, buf: &mut [u8]) -> Result<usize, BusError> {
        debug!("Reading {} bytes from {}", buf.len(), address);
        let data = self.transfer(Transfer::Read {
            address: address.get(),
            len: buf.len(),
        })?;
        if data.len() != buf.len() {
            return Err(BusError::LengthMismatch {
                expected: buf.len(),
                actual: data.len(),
            });
        }
        buf.copy_from_slice(&data);
        Ok(data.len())
    }
}

/// Owner of the interrupt thread
pub struct LoopbackHandle<H> {
    thread: JoinHandle<H>,
}

impl<H> LoopbackHandle<H> {
    /// Wait for the interrupt thread to stop and take the handler back
    ///
    /// Returns once every transmitter for this bus has been dropped.
    pub fn join(self) -> std::thread::Result<H> {
        self.thread.join()
    }
}
