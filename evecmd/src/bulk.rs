//! Hand-off of a completed burst to the bus, possibly asynchronously.
//!
//! [`BulkTransfer`](BulkTransfer) owns the burst buffer and knows how to get
//! its contents onto the bus. [`Blocking`](Blocking) does that synchronously
//! and is the default. Platforms with a DMA engine can implement the trait
//! themselves, using [`TransferState`](TransferState) as the busy flag shared
//! with their completion interrupt:
//!
//! ```ignore
//! static STATE: TransferState = TransferState::new();
//!
//! fn on_dma_complete() {
//!     release_chip_select();
//!     STATE.complete();
//! }
//! ```
//!
//! While a transfer is in flight the bus belongs to it. The command FIFO
//! engine checks [`is_busy`](BulkTransfer::is_busy) before starting any other
//! transaction, and the completion handler must not start one itself.

use crate::interface::Transport;
use core::sync::atomic::{AtomicBool, Ordering};

/// The largest payload a single burst can carry, in bytes. This matches the
/// usable space in an empty command ring, so a full burst can always be
/// accepted once the coprocessor has drained.
pub const BURST_CAPACITY: usize = 4092;

/// The number of bytes reserved at the start of the burst buffer for the
/// address header of the FIFO data port.
pub const BURST_HEADER_LEN: usize = 3;

pub const BURST_BUFFER_LEN: usize = BURST_HEADER_LEN + BURST_CAPACITY;

/// A backing store for burst data, including room for the address header.
pub type BurstBuffer = [u8; BURST_BUFFER_LEN];

/// Owns the burst buffer and moves its contents onto the bus.
pub trait BulkTransfer<T: Transport> {
    /// Returns the buffer the FIFO engine accumulates burst data into.
    ///
    /// The engine only calls this while [`is_busy`](Self::is_busy) is false.
    fn buffer(&mut self) -> &mut BurstBuffer;

    /// Begins sending the first `len` bytes of the buffer as one
    /// transaction: select the device, send the bytes, and deselect.
    ///
    /// An asynchronous implementation may return as soon as the transfer is
    /// under way, reporting busy until its completion notifier has run.
    /// Once started a transfer can't be cancelled.
    fn start_bulk_transfer(&mut self, bus: &mut T, len: usize) -> Result<(), T::Error>;

    fn is_busy(&self) -> bool {
        false
    }
}

/// The synchronous fallback: the transfer has completed by the time
/// `start_bulk_transfer` returns, so the bus is never reported busy.
pub struct Blocking {
    buf: BurstBuffer,
}

impl Blocking {
    pub const fn new() -> Self {
        Self {
            buf: [0; BURST_BUFFER_LEN],
        }
    }
}

impl Default for Blocking {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> BulkTransfer<T> for Blocking {
    fn buffer(&mut self) -> &mut BurstBuffer {
        &mut self.buf
    }

    fn start_bulk_transfer(&mut self, bus: &mut T, len: usize) -> Result<(), T::Error> {
        let len = if len > BURST_BUFFER_LEN {
            BURST_BUFFER_LEN
        } else {
            len
        };
        bus.select()?;
        let result = bus.send_bytes(&self.buf[..len]);
        let deselected = bus.deselect();
        result?;
        deselected
    }
}

/// The busy flag for an asynchronous bulk transfer.
///
/// This is safe to share between the thread issuing commands and an
/// interrupt handler: the issuing side calls [`begin`](Self::begin) when it
/// starts a transfer and the completion handler calls
/// [`complete`](Self::complete).
#[derive(Debug)]
pub struct TransferState {
    busy: AtomicBool,
}

impl TransferState {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Marks a transfer as in flight. Returns `false`, without changing
    /// anything, if one already was.
    pub fn begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the in-flight transfer as finished. Call this from the
    /// completion notifier after the device has been deselected.
    pub fn complete(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for TransferState {
    fn default() -> Self {
        Self::new()
    }
}
