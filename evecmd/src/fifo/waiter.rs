//! Helpers for waiting until the coprocessor has freed enough ring buffer
//! space for a forthcoming command.
//!
//! [`Waiter`](Waiter) is a trait implemented by types that are able to block
//! until there's either a particular amount of buffer space available, until
//! the coprocessor reports a fault, or until they give up.
//!
//! [`PollingWaiter`](PollingWaiter) is a simple built-in implementation of
//! `Waiter` which busy-polls the coprocessor's read pointer a bounded number
//! of times.
//!
//! If you are working with this library on a platform where you are able to
//! listen for and respond to interrupt signals from the EVE chip then you
//! could improve power consumption by implementing a new `Waiter` which can
//! put the host processor to sleep while waiting for a signal that there is
//! either more buffer space or a coprocessor fault.

use super::{free_space, CMD_FIFO_MASK, FAULT_READ_PTR};
use crate::interface::Transport;
use crate::low_level::LowLevel;
use crate::registers::Register;
use log::trace;

/// Knows how to block until the coprocessor ring buffer is at least empty
/// enough to receive a forthcoming message.
pub trait Waiter<T: Transport> {
    /// Blocks until at least `need` bytes are free in the ring, given that
    /// the host has written up to `write_ptr`, and returns the free space
    /// it observed.
    ///
    /// The caller must already have published everything up to `write_ptr`
    /// to the device, or the coprocessor won't make progress.
    fn wait_for_space(
        &mut self,
        ll: &mut LowLevel<T>,
        write_ptr: u16,
        need: u16,
    ) -> Result<u16, WaiterError<T::Error>>;
}

/// Error type returned by a waiter, which distinguishes between communication
/// transport errors, explicit coprocessor faults, and giving up.
#[derive(Debug)]
pub enum WaiterError<E> {
    Comm(E),
    Fault,
    Timeout,
}

/// The default [`Waiter`](Waiter) implementation, which polls the coprocessor
/// read pointer in a busy loop until there's enough available space or its
/// budget of polls is spent.
#[derive(Clone, Copy, Debug)]
pub struct PollingWaiter {
    budget: u32,
}

impl PollingWaiter {
    pub const fn new(budget: u32) -> Self {
        Self { budget: budget }
    }
}

impl<T: Transport> Waiter<T> for PollingWaiter {
    fn wait_for_space(
        &mut self,
        ll: &mut LowLevel<T>,
        write_ptr: u16,
        need: u16,
    ) -> Result<u16, WaiterError<T::Error>> {
        for poll in 0..self.budget {
            let read_ptr = ll
                .rd16(Register::CMD_READ.address())
                .map_err(WaiterError::Comm)?
                & CMD_FIFO_MASK;
            if read_ptr == FAULT_READ_PTR {
                return Err(WaiterError::Fault);
            }
            let space = free_space(write_ptr, read_ptr);
            if space >= need {
                trace!("{} bytes free after {} polls", space, poll + 1);
                return Ok(space);
            }
        }
        Err(WaiterError::Timeout)
    }
}
