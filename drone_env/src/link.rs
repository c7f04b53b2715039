//! Typed, bounded, single-producer links carrying fixed-size records.
//!
//! A link moves encoded records through a tokio `mpsc` channel. The sending
//! end encodes, the receiving end decodes and discards anything that does
//! not decode cleanly.
//!
//! ```text
//! Producer                   Link (bounded)                Consumer
//!   |                           |                             |
//!   |-- send(record) ---------->| [SIZE bytes] [SIZE bytes]   |
//!   |   (awaits capacity)       |---------------------------->|-- recv() -> record
//!   |                           |                             |-- try_recv() -> Option
//!   |-- drop ------------------>| end of stream               |-- Err(Closed)
//! ```

use crate::error::LinkError;
use crate::types::WireRecord;
use std::marker::PhantomData;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

/// Default number of records a link buffers before the sender blocks.
pub const DEFAULT_LINK_CAPACITY: usize = 64;

/// Creates a bounded link for records of type `T`.
pub fn link<T: WireRecord>(name: &'static str, capacity: usize) -> (LinkSender<T>, LinkReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        LinkSender {
            name,
            tx,
            _record: PhantomData,
        },
        LinkReceiver {
            name,
            rx,
            malformed: 0,
            _record: PhantomData,
        },
    )
}

/// Writing end of a link.
pub struct LinkSender<T> {
    name: &'static str,
    tx: mpsc::Sender<Vec<u8>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: WireRecord> LinkSender<T> {
    /// Encodes and sends a record, waiting for capacity (backpressure).
    ///
    /// # Returns
    /// * `Err(LinkError::SendFailed)` - The receiving end has been dropped
    pub async fn send(&self, record: &T) -> Result<(), LinkError> {
        self.send_raw(record.encode()).await
    }

    /// Sends raw bytes without encoding.
    ///
    /// Used for fault injection; the receiver still validates the length.
    pub async fn send_raw(&self, bytes: Vec<u8>) -> Result<(), LinkError> {
        self.tx
            .send(bytes)
            .await
            .map_err(|_| LinkError::SendFailed { link: self.name })
    }

    /// Returns the link name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the receiving end is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading end of a link.
pub struct LinkReceiver<T> {
    name: &'static str,
    rx: mpsc::Receiver<Vec<u8>>,
    malformed: u64,
    _record: PhantomData<fn() -> T>,
}

impl<T: WireRecord> LinkReceiver<T> {
    /// Waits for the next well-formed record.
    ///
    /// Malformed records are logged and skipped. Cancel safe: a record is
    /// only consumed when it is returned or discarded.
    ///
    /// # Returns
    /// * `Err(LinkError::Closed)` - Every sender has been dropped and the
    ///   buffer is drained
    pub async fn recv(&mut self) -> Result<T, LinkError> {
        loop {
            match self.rx.recv().await {
                Some(bytes) => {
                    if let Some(record) = self.accept(&bytes) {
                        return Ok(record);
                    }
                }
                None => return Err(LinkError::Closed { link: self.name }),
            }
        }
    }

    /// Takes the next well-formed record if one is buffered.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - A record was pending
    /// * `Ok(None)` - Nothing pending right now
    /// * `Err(LinkError::Closed)` - The link is closed and drained
    pub fn try_recv(&mut self) -> Result<Option<T>, LinkError> {
        loop {
            match self.rx.try_recv() {
                Ok(bytes) => {
                    if let Some(record) = self.accept(&bytes) {
                        return Ok(Some(record));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(LinkError::Closed { link: self.name })
                }
            }
        }
    }

    /// Number of records discarded as malformed so far.
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Returns the link name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Closes the receiving end; pending sends fail afterwards.
    pub fn close(&mut self) {
        self.rx.close();
    }

    fn accept(&mut self, bytes: &[u8]) -> Option<T> {
        match T::decode(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                self.malformed += 1;
                warn!(
                    link = self.name,
                    record = T::NAME,
                    discarded = self.malformed,
                    error = %e,
                    "malformed record discarded"
                );
                None
            }
        }
    }
}
