//! The coprocessor command FIFO engine.
//!
//! The EVE coprocessor reads commands from a 4KiB ring buffer in `RAM_CMD`.
//! The host owns the write pointer (`REG_CMD_WRITE`) and the coprocessor
//! owns the read pointer (`REG_CMD_READ`). [`CommandFifo`](CommandFifo)
//! keeps a host-side copy of the write pointer, never lets it get within
//! one byte of lapping the read pointer, and decides when to publish it.
//!
//! Commands are written in one of two modes:
//!
//! - **Immediate**: each command goes straight to `RAM_CMD` at the cached
//!   write pointer as soon as it's appended. The device only learns about it
//!   when [`execute`](CommandFifo::execute) publishes the write pointer (or
//!   when the engine has to wait for space, which publishes first so the
//!   coprocessor can make progress).
//! - **Burst**: between [`begin_burst`](CommandFifo::begin_burst) and
//!   [`end_burst`](CommandFifo::end_burst), commands accumulate in the
//!   buffer owned by the [`BulkTransfer`](crate::bulk::BulkTransfer)
//!   implementation, and are then sent as one transaction to the FIFO data
//!   port. The bytes that reach the ring are the same as in immediate mode;
//!   only their timing differs.

pub mod args;
pub mod waiter;

use crate::bulk::{Blocking, BulkTransfer, BURST_CAPACITY, BURST_HEADER_LEN};
use crate::config::PollBudgets;
use crate::error::Error;
use crate::interface::Transport;
use crate::low_level::LowLevel;
use crate::memory::RAM_CMD;
use crate::models::Generation;
use crate::registers::Register;
use log::{debug, error, trace, warn};

#[doc(inline)]
pub use args::{Arg, CommandWord};
#[doc(inline)]
pub use waiter::{PollingWaiter, Waiter, WaiterError};

use self::args::{args_len, command_words_for_bytes, padded_len};

/// The size of the command ring buffer in bytes.
pub const CMD_FIFO_SIZE: u16 = 4096;

/// The most the ring can hold at once. Writes are always whole words and
/// one byte must stay free to tell a full ring from an empty one.
pub const SPACE_WHEN_EMPTY: u16 = CMD_FIFO_SIZE - 4;

pub(crate) const CMD_FIFO_MASK: u16 = CMD_FIFO_SIZE - 1;

/// The value the coprocessor puts in `REG_CMD_READ` when it has faulted.
pub(crate) const FAULT_READ_PTR: u16 = 0xfff;

/// Free space in the ring given the write and read pointers, with one byte
/// reserved to tell a full ring from an empty one.
///
/// The pointers may be anything; only their difference modulo the ring size
/// matters.
pub const fn free_space(write_ptr: u16, read_ptr: u16) -> u16 {
    CMD_FIFO_SIZE - (write_ptr.wrapping_sub(read_ptr) & CMD_FIFO_MASK) - 1
}

/// The result type for FIFO operations, where the error type is always
/// [`Error`](Error) over the transport's error.
pub type Result<T, I> = core::result::Result<T, Error<<I as Transport>::Error>>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WriteMode {
    Immediate,
    Burst,
}

/// Where the engine is in its cycle.
///
/// The normal cycle is `Idle`, then `Writing`, then `Executing` once the
/// write pointer is published, and back to `Idle` once
/// [`is_busy`](CommandFifo::is_busy) sees the coprocessor catch up. A
/// reservation that has to wait passes through `WaitingForSpace`. Running
/// out of patience, or seeing the coprocessor's fault marker, leaves the
/// engine in `Fault` until [`resync`](CommandFifo::resync).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FifoState {
    Idle,
    Writing(WriteMode),
    Executing,
    WaitingForSpace,
    Fault,
}

/// An interface to the command ring buffer for the EVE chip's coprocessor.
///
/// This object consumes the bus, because it will be constantly writing into
/// the command ring buffer and so it isn't safe to do any other concurrent
/// access. Use [`low_level`](Self::low_level) for temporary access to the
/// underlying registers.
pub struct CommandFifo<T, B = Blocking, W = PollingWaiter>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    ll: LowLevel<T>,
    bulk: B,
    wait: W,
    budgets: PollBudgets,
    generation: Option<Generation>,

    // `write_ptr` is our copy of where the next command word goes. It runs
    // ahead of `published`, the value most recently written to
    // REG_CMD_WRITE, by whatever has been appended since the last execute.
    write_ptr: u16,
    published: u16,
    batch_start: u16,

    // `known_space` is a lower bound on the free ring space. The coprocessor
    // consumes asynchronously so there might actually be more, but there is
    // never less because we decrease this as we write. Once it's too low we
    // ask the waiter for a fresh figure.
    known_space: u16,

    // Set while a burst is open, counting the payload bytes accumulated in
    // the bulk transfer's buffer.
    burst_len: Option<usize>,

    // Bytes the current command may still write, and whether an immediate
    // write transaction into RAM_CMD is currently open.
    remaining: usize,
    stream_open: bool,

    state: FifoState,
}

impl<T, B, W> CommandFifo<T, B, W>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    /// Wraps the given low-level interface.
    ///
    /// The new object assumes an empty ring at offset zero; call
    /// [`resync`](Self::resync) to adopt whatever pointers the device
    /// actually has.
    pub fn new(ll: LowLevel<T>, bulk: B, wait: W, budgets: PollBudgets) -> Self {
        Self {
            ll: ll,
            bulk: bulk,
            wait: wait,
            budgets: budgets,
            generation: None,
            write_ptr: 0,
            published: 0,
            batch_start: 0,
            known_space: SPACE_WHEN_EMPTY,
            burst_len: None,
            remaining: 0,
            stream_open: false,
            state: FifoState::Idle,
        }
    }

    /// Consumes the current object and returns a new one that's the same
    /// except that it has a new waiter, which is possibly derived from the
    /// previous one.
    pub fn with_new_waiter<W2, F>(self, f: F) -> CommandFifo<T, B, W2>
    where
        W2: Waiter<T>,
        F: FnOnce(W) -> W2,
    {
        CommandFifo {
            ll: self.ll,
            bulk: self.bulk,
            wait: f(self.wait),
            budgets: self.budgets,
            generation: self.generation,
            write_ptr: self.write_ptr,
            published: self.published,
            batch_start: self.batch_start,
            known_space: self.known_space,
            burst_len: self.burst_len,
            remaining: 0,
            stream_open: false,
            state: self.state,
        }
    }

    /// Appends one command made of raw words.
    ///
    /// If the ring doesn't have room, this publishes whatever is pending and
    /// then blocks using the waiter. If the waiter gives up, nothing is
    /// written and the host write pointer is unchanged.
    pub fn append(&mut self, words: &[u32]) -> Result<(), T> {
        self.write_stream(words.len() * 4, |fifo| {
            for w in words {
                fifo.push_word(*w)?;
            }
            Ok(())
        })
    }

    /// Appends one command described as a list of typed arguments. The whole
    /// command is measured first and reserved as a unit.
    pub fn append_args(&mut self, args: &[Arg<'_>]) -> Result<(), T> {
        self.write_stream(args_len(args), |fifo| {
            for arg in args {
                arg.for_each_word(|w| fifo.push_word(w))?;
            }
            Ok(())
        })
    }

    /// Appends one coprocessor command: its opcode word followed by its
    /// arguments, reserved as a unit.
    pub(crate) fn append_command(&mut self, opcode: u32, args: &[Arg<'_>]) -> Result<(), T> {
        self.write_stream(4 + args_len(args), |fifo| {
            fifo.push_word(opcode)?;
            for arg in args {
                arg.for_each_word(|w| fifo.push_word(w))?;
            }
            Ok(())
        })
    }

    /// Appends an inline data payload that follows a command such as
    /// `CMD_INFLATE` or `CMD_LOADIMAGE`.
    ///
    /// Payloads may be larger than the ring, so outside of a burst they are
    /// written in chunks of whatever space is free, publishing and waiting
    /// in between. The final word is zero-padded.
    pub fn append_data(&mut self, data: &[u8]) -> Result<(), T> {
        if self.in_burst() {
            let len = padded_len(data.len());
            return self.write_stream(len, |fifo| {
                Arg::Bytes(data).for_each_word(|w| fifo.push_word(w))
            });
        }

        let mut words = command_words_for_bytes(data);
        while words.len() > 0 {
            self.ensure_space(4)?;
            let want = words.len() * 4;
            let free = (self.known_space & !3) as usize;
            let chunk = if want < free { want } else { free };
            trace!("streaming {} of {} payload bytes", chunk, want);
            self.write_stream(chunk, |fifo| {
                for _ in 0..(chunk / 4) {
                    match words.next() {
                        Some(w) => fifo.push_word(w.to_raw())?,
                        None => break,
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Writes the cached write pointer to the device, marking the start of a
    /// new batch of commands.
    pub fn start(&mut self) -> Result<(), T> {
        self.wait_bus_idle()?;
        self.publish()?;
        self.batch_start = self.write_ptr;
        self.state = FifoState::Writing(self.write_mode());
        Ok(())
    }

    /// Advances the device write pointer past everything written since the
    /// last `start`, so that the coprocessor begins executing it.
    ///
    /// This doesn't wait for the commands to complete. Use
    /// [`is_busy`](Self::is_busy) or [`wait_idle`](Self::wait_idle) for that.
    pub fn execute(&mut self) -> Result<(), T> {
        self.wait_bus_idle()?;
        trace!(
            "executing {} bytes",
            self.write_ptr.wrapping_sub(self.batch_start) & CMD_FIFO_MASK
        );
        self.publish()?;
        self.batch_start = self.write_ptr;
        Ok(())
    }

    /// Returns whether the coprocessor is still working through published
    /// commands, or a bulk transfer still has the bus.
    ///
    /// Once this has returned `false` after an `execute`, it keeps returning
    /// `false` until the next one. Returns [`Error::Fault`](Error::Fault) if
    /// the coprocessor has faulted.
    pub fn is_busy(&mut self) -> Result<bool, T> {
        if self.bulk.is_busy() {
            return Ok(true);
        }
        let read_ptr = self.read_pointer()?;
        if read_ptr != self.published {
            return Ok(true);
        }
        self.known_space = free_space(self.write_ptr, read_ptr);
        if self.state == FifoState::Executing {
            self.state = FifoState::Idle;
        }
        Ok(false)
    }

    /// Publishes anything pending and then blocks until the coprocessor has
    /// executed all of it, or the drain budget runs out.
    pub fn wait_idle(&mut self) -> Result<(), T> {
        if self.write_ptr != self.published {
            self.execute()?;
        }
        for _ in 0..self.budgets.drain {
            if !self.is_busy()? {
                return Ok(());
            }
        }
        error!("coprocessor did not drain within {} polls", self.budgets.drain);
        self.state = FifoState::Fault;
        Err(Error::Unresponsive)
    }

    /// Begins redirecting commands into the burst buffer.
    ///
    /// Nested bursts aren't supported; a second call while a burst is open
    /// is ignored.
    pub fn begin_burst(&mut self) -> Result<(), T> {
        if self.burst_len.is_some() {
            warn!("burst already open; nested bursts are not supported");
            return Ok(());
        }
        // The buffer belongs to any transfer still in flight.
        self.wait_bus_idle()?;
        debug!("burst opened");
        self.burst_len = Some(0);
        self.state = FifoState::Writing(WriteMode::Burst);
        Ok(())
    }

    /// Sends everything accumulated since `begin_burst` to the FIFO data
    /// port as a single transfer and then executes it.
    ///
    /// With an asynchronous [`BulkTransfer`](BulkTransfer) this returns as
    /// soon as the transfer is under way. The data port advances the device
    /// write pointer by itself, so no separate execute is needed then.
    pub fn end_burst(&mut self) -> Result<(), T> {
        let len = match self.burst_len.take() {
            Some(len) => len,
            None => {
                warn!("end_burst without begin_burst");
                return Ok(());
            }
        };
        if len == 0 {
            self.state = FifoState::Idle;
            return Ok(());
        }

        // On failure the burst stays open with its contents, so the caller
        // can resync or retry `end_burst`.
        if let Err(err) = self.send_burst(len) {
            self.burst_len = Some(len);
            if self.state != FifoState::Fault {
                self.state = FifoState::Writing(WriteMode::Burst);
            }
            return Err(err);
        }

        self.advance(len as u16);
        self.published = self.write_ptr;
        self.state = FifoState::Executing;
        debug!("burst of {} bytes sent", len);

        if !self.bulk.is_busy() {
            self.execute()?;
        }
        Ok(())
    }

    fn send_burst(&mut self, len: usize) -> Result<(), T> {
        self.ensure_space(len as u16)?;
        self.start()?;
        self.bulk.buffer()[..BURST_HEADER_LEN]
            .copy_from_slice(&Register::CMDB_WRITE.address().write_header());
        self.bulk
            .start_bulk_transfer(self.ll.borrow_interface(), BURST_HEADER_LEN + len)?;
        Ok(())
    }

    pub fn in_burst(&self) -> bool {
        self.burst_len.is_some()
    }

    /// Re-reads both device pointers and adopts them as the host's own,
    /// discarding any open burst.
    ///
    /// This is the recovery step after [`Error::Unresponsive`]. It fails
    /// with [`Error::Fault`] if the coprocessor is in its fault state, in
    /// which case the coprocessor itself must be reset first.
    pub fn resync(&mut self) -> Result<(), T> {
        self.wait_bus_idle()?;
        if self.burst_len.take().is_some() {
            warn!("discarding open burst");
        }
        let read_ptr = self.read_pointer()?;
        let write_ptr = self.ll.rd16(Register::CMD_WRITE.address())? & CMD_FIFO_MASK;
        debug!("resync: read {:#05x} write {:#05x}", read_ptr, write_ptr);

        self.write_ptr = write_ptr;
        self.published = write_ptr;
        self.batch_start = write_ptr;
        self.known_space = free_space(write_ptr, read_ptr);
        self.state = if read_ptr == write_ptr {
            FifoState::Idle
        } else {
            FifoState::Executing
        };
        Ok(())
    }

    pub fn state(&self) -> FifoState {
        self.state
    }

    /// The host's cached write pointer, as an offset into the ring.
    pub fn write_pointer(&self) -> u16 {
        self.write_ptr
    }

    /// The free space the engine currently knows about, which is a lower
    /// bound on the real free space.
    pub fn space(&self) -> u16 {
        self.known_space
    }

    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: Option<Generation>) {
        self.generation = generation;
    }

    /// Returns the underlying register interface once the bus is free of any
    /// bulk transfer.
    ///
    /// Writing to the command registers through this will confuse the
    /// engine; call [`resync`](Self::resync) afterwards if you do.
    pub fn low_level(&mut self) -> Result<&mut LowLevel<T>, T> {
        self.wait_bus_idle()?;
        Ok(&mut self.ll)
    }

    /// `take_interface` consumes the FIFO object and returns its underlying
    /// `Transport`.
    pub fn take_interface(self) -> T {
        self.ll.take_interface()
    }

    pub(crate) fn require(&self, min: Generation) -> Result<(), T> {
        match self.generation {
            Some(g) if g >= min => Ok(()),
            _ => Err(Error::Unsupported),
        }
    }

    pub(crate) fn require_immediate(&self) -> Result<(), T> {
        if self.in_burst() {
            warn!("commands that return results can't be used in a burst");
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    /// Reads back a result word that the coprocessor wrote into the most
    /// recent command, counting words back from the end of it.
    ///
    /// Only meaningful after [`wait_idle`](Self::wait_idle).
    pub(crate) fn read_result(&mut self, words_from_end: u16) -> Result<u32, T> {
        let offset = self.write_ptr.wrapping_sub(words_from_end * 4) & CMD_FIFO_MASK;
        Ok(self.ll.rd32(RAM_CMD + offset as u32)?)
    }

    fn write_mode(&self) -> WriteMode {
        if self.in_burst() {
            WriteMode::Burst
        } else {
            WriteMode::Immediate
        }
    }

    // Reserves `len` bytes and then lets `f` write exactly that many with
    // `push_word`. If anything fails part way through, the write pointer is
    // rolled back so the partial command will be overwritten.
    fn write_stream<F>(&mut self, len: usize, f: F) -> Result<(), T>
    where
        F: FnOnce(&mut Self) -> Result<(), T>,
    {
        if self.state == FifoState::Fault {
            return Err(Error::Fault);
        }

        if let Some(used) = self.burst_len {
            if used + len > BURST_CAPACITY {
                warn!(
                    "burst buffer full; dropping {} byte command ({} of {} used)",
                    len, used, BURST_CAPACITY
                );
                return Ok(());
            }
            self.remaining = len;
            let result = f(self);
            if result.is_err() {
                self.burst_len = Some(used);
            }
            return result;
        }

        if len > SPACE_WHEN_EMPTY as usize {
            warn!("{} byte command can never fit in the ring", len);
            return Err(Error::Unsupported);
        }
        self.wait_bus_idle()?;
        self.ensure_space(len as u16)?;

        let saved = (self.write_ptr, self.known_space);
        self.remaining = len;
        self.state = FifoState::Writing(WriteMode::Immediate);
        let result = f(self);
        let closed = self.close_stream();
        debug_assert!(
            result.is_err() || self.remaining == 0,
            "command wrote less than it reserved"
        );
        if result.is_err() || closed.is_err() {
            self.write_ptr = saved.0;
            self.known_space = saved.1;
        }
        result?;
        closed
    }

    fn push_word(&mut self, w: u32) -> Result<(), T> {
        if self.remaining < 4 {
            debug_assert!(false, "command wrote more than it reserved");
            return Ok(());
        }
        self.remaining -= 4;

        if let Some(used) = self.burst_len {
            let at = BURST_HEADER_LEN + used;
            self.bulk.buffer()[at..at + 4].copy_from_slice(&w.to_le_bytes());
            self.burst_len = Some(used + 4);
            return Ok(());
        }

        if !self.stream_open {
            self.ll.begin_write(RAM_CMD + self.write_ptr as u32)?;
            self.stream_open = true;
        }
        self.ll.continue_write(&w.to_le_bytes())?;
        self.advance(4);
        if self.write_ptr == 0 {
            // The ring wrapped, so the next word starts a new transaction
            // back at the beginning of RAM_CMD.
            self.close_stream()?;
        }
        Ok(())
    }

    fn close_stream(&mut self) -> Result<(), T> {
        if self.stream_open {
            self.stream_open = false;
            self.ll.end_write()?;
        }
        Ok(())
    }

    fn advance(&mut self, len: u16) {
        self.write_ptr = self.write_ptr.wrapping_add(len) & CMD_FIFO_MASK;
        self.known_space = self.known_space.saturating_sub(len);
    }

    fn publish(&mut self) -> Result<(), T> {
        self.ll
            .wr16(Register::CMD_WRITE.address(), self.write_ptr)?;
        self.published = self.write_ptr;
        if self.state != FifoState::Fault {
            self.state = FifoState::Executing;
        }
        Ok(())
    }

    fn read_pointer(&mut self) -> Result<u16, T> {
        let read_ptr = self.ll.rd16(Register::CMD_READ.address())? & CMD_FIFO_MASK;
        if read_ptr == FAULT_READ_PTR {
            error!("coprocessor fault reported");
            self.state = FifoState::Fault;
            return Err(Error::Fault);
        }
        Ok(read_ptr)
    }

    // Block using our waiter until there's at least `need` bytes of free
    // space in the ring buffer.
    fn ensure_space(&mut self, need: u16) -> Result<(), T> {
        if self.known_space >= need {
            // Fast path: our local tracking knows there's enough space.
            return Ok(());
        }

        self.wait_bus_idle()?;
        if self.write_ptr != self.published {
            self.publish()?;
        }

        let prev = self.state;
        self.state = FifoState::WaitingForSpace;
        trace!("waiting for {} bytes, {} known free", need, self.known_space);
        match self.wait.wait_for_space(&mut self.ll, self.write_ptr, need) {
            Ok(space) => {
                self.known_space = space;
                self.state = prev;
                Ok(())
            }
            Err(err) => {
                // We don't know how much space we have, so we'll set it
                // to zero to force calling the waiter again next time.
                self.known_space = 0;
                match err {
                    WaiterError::Comm(e) => {
                        self.state = prev;
                        Err(Error::Interface(e))
                    }
                    WaiterError::Fault => {
                        error!("coprocessor fault while waiting for space");
                        self.state = FifoState::Fault;
                        Err(Error::Fault)
                    }
                    WaiterError::Timeout => {
                        error!("no space for {} bytes; coprocessor unresponsive", need);
                        self.state = FifoState::Fault;
                        Err(Error::Unresponsive)
                    }
                }
            }
        }
    }

    fn wait_bus_idle(&mut self) -> Result<(), T> {
        if !self.bulk.is_busy() {
            return Ok(());
        }
        for _ in 0..self.budgets.bus_idle {
            if !self.bulk.is_busy() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        error!("bulk transfer still running after {} checks", self.budgets.bus_idle);
        Err(Error::BusBusy)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::{DrainPolicy, FakeDma, FakeEve};
    use std::vec::Vec;

    type TestFifo = CommandFifo<FakeEve>;

    fn fifo_with(fake: FakeEve, budgets: PollBudgets) -> TestFifo {
        let mut fifo = CommandFifo::new(
            LowLevel::new(fake),
            Blocking::new(),
            PollingWaiter::new(budgets.fifo_space),
            budgets,
        );
        fifo.resync().unwrap();
        fifo
    }

    fn small_budgets() -> PollBudgets {
        PollBudgets {
            fifo_space: 8,
            drain: 8,
            ..PollBudgets::DEFAULT
        }
    }

    fn fake<B: BulkTransfer<FakeEve>>(fifo: &mut CommandFifo<FakeEve, B>) -> &mut FakeEve {
        fifo.ll.borrow_interface()
    }

    // A handful of commands of assorted shapes, including strings of
    // awkward lengths.
    fn issue_sample_commands(fifo: &mut TestFifo) {
        fifo.append(&[0xffffff00]).unwrap();
        fifo.append_args(&[
            Arg::Word(0xffffff0c),
            Arg::word((10i16, 20i16)),
            Arg::word((28u16, 0u16)),
            Arg::Text(b"Hello"),
        ])
        .unwrap();
        fifo.append_args(&[Arg::Word(0xffffff0c), Arg::Word(0), Arg::Word(0), Arg::Text(b"abcd")])
            .unwrap();
        fifo.append(&[0x00000000, 0xffffff01]).unwrap();
    }

    #[test]
    fn test_free_space_formula() {
        assert_eq!(free_space(0, 0), 4095);
        assert_eq!(free_space(4092, 0), 3);
        assert_eq!(free_space(8, 4000), 4095 - 104);
        for &(w, r) in &[(0u16, 0u16), (100, 4000), (4095, 1), (2048, 2048), (12, 16)] {
            let want = 4096 - ((w as i32 - r as i32).rem_euclid(4096)) as u16 - 1;
            assert_eq!(free_space(w, r), want);
            assert_eq!(
                free_space(w.wrapping_add(4096), r.wrapping_add(4096)),
                want
            );
        }
    }

    #[test]
    fn test_immediate_writes_wait_for_execute() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        fifo.append(&[0xffffff00, 0xffffff01]).unwrap();
        assert_eq!(fifo.write_pointer(), 8);
        assert_eq!(fake(&mut fifo).cmd_write(), 0);
        assert!(fake(&mut fifo).consumed().is_empty());

        fifo.execute().unwrap();
        assert_eq!(fake(&mut fifo).cmd_write(), 8);
        assert_eq!(
            fake(&mut fifo).consumed(),
            [0x00, 0xff, 0xff, 0xff, 0x01, 0xff, 0xff, 0xff]
        );
        assert!(!fifo.is_busy().unwrap());
        assert_eq!(fifo.state(), FifoState::Idle);
    }

    #[test]
    fn test_command_split_at_ring_end() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_pointers(4088, 4088);
        let mut fifo = fifo_with(eve, PollBudgets::DEFAULT);
        fifo.append(&[1, 2, 3]).unwrap();
        fifo.execute().unwrap();
        assert_eq!(fifo.write_pointer(), 4);
        let eve = fake(&mut fifo);
        assert_eq!(eve.mem_u32(RAM_CMD + 4088), 1);
        assert_eq!(eve.mem_u32(RAM_CMD + 4092), 2);
        assert_eq!(eve.mem_u32(RAM_CMD + 0), 3);
        assert_eq!(eve.consumed().len(), 12);
    }

    #[test]
    fn test_burst_matches_immediate() {
        let mut immediate = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        issue_sample_commands(&mut immediate);
        immediate.execute().unwrap();

        let mut burst = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        burst.begin_burst().unwrap();
        issue_sample_commands(&mut burst);
        assert!(fake(&mut burst).consumed().is_empty());
        burst.end_burst().unwrap();

        let want: Vec<u8> = fake(&mut immediate).consumed().to_vec();
        assert!(!want.is_empty());
        assert_eq!(fake(&mut burst).consumed(), &want[..]);
        assert_eq!(burst.write_pointer(), immediate.write_pointer());
        assert_eq!(fake(&mut burst).cmd_write(), burst.write_pointer());
        assert!(!burst.in_burst());
    }

    #[test]
    fn test_burst_preserves_pending_immediate_words() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        fifo.append(&[0xaaaaaaaa]).unwrap();
        fifo.begin_burst().unwrap();
        fifo.append(&[0xbbbbbbbb]).unwrap();
        fifo.end_burst().unwrap();
        assert_eq!(
            fake(&mut fifo).consumed(),
            [0xaa, 0xaa, 0xaa, 0xaa, 0xbb, 0xbb, 0xbb, 0xbb]
        );
    }

    #[test]
    fn test_burst_overflow_drops_whole_command() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        fifo.begin_burst().unwrap();
        let filler = [0x11111111u32; 1022];
        fifo.append(&filler).unwrap();
        fifo.append(&[1, 2]).unwrap(); // doesn't fit; dropped
        fifo.append(&[3]).unwrap(); // fills the last word
        fifo.end_burst().unwrap();

        let consumed = fake(&mut fifo).consumed();
        assert_eq!(consumed.len(), BURST_CAPACITY);
        assert_eq!(consumed[BURST_CAPACITY - 4..], [3, 0, 0, 0]);
    }

    #[test]
    fn test_nested_burst_ignored() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        fifo.begin_burst().unwrap();
        fifo.append(&[7]).unwrap();
        fifo.begin_burst().unwrap();
        fifo.append(&[8]).unwrap();
        fifo.end_burst().unwrap();
        fifo.end_burst().unwrap();
        assert_eq!(fake(&mut fifo).consumed(), [7, 0, 0, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn test_stalled_reader_never_overwritten() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_drain(DrainPolicy::Stalled);
        let mut fifo = fifo_with(eve, small_budgets());

        let mut appended = 0;
        let err = loop {
            match fifo.append(&[0x12345678; 16]) {
                Ok(()) => appended += 64,
                Err(e) => break e,
            }
            assert!(appended <= 4092);
        };
        assert!(matches!(err, Error::Unresponsive));
        assert_eq!(appended, 4032);
        // The failed call didn't move the write pointer.
        assert_eq!(fifo.write_pointer(), 4032);
        assert_eq!(fifo.state(), FifoState::Fault);
        // Everything that was written got published before waiting.
        assert_eq!(fake(&mut fifo).cmd_write(), 4032);
        // Nothing was written beyond what the reader allows.
        assert_eq!(fake(&mut fifo).mem_u32(RAM_CMD + 4032), 0);

        // Once the reader catches up, a resync makes the engine usable again.
        fake(&mut fifo).set_drain(DrainPolicy::Immediate);
        fake(&mut fifo).drain_now();
        fifo.resync().unwrap();
        fifo.append(&[0x12345678; 16]).unwrap();
    }

    #[test]
    fn test_waits_for_slow_reader() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_drain(DrainPolicy::PerPoll(256));
        let mut fifo = fifo_with(eve, PollBudgets::DEFAULT);
        for _ in 0..200 {
            fifo.append(&[0x55555555; 16]).unwrap();
        }
        fifo.wait_idle().unwrap();
        assert_eq!(fake(&mut fifo).consumed().len(), 200 * 64);
        assert_eq!(fifo.write_pointer(), ((200 * 64) % 4096) as u16);
    }

    #[test]
    fn test_busy_is_monotonic() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_drain(DrainPolicy::PerPoll(4));
        let mut fifo = fifo_with(eve, PollBudgets::DEFAULT);
        fifo.append(&[1, 2, 3, 4, 5]).unwrap();
        fifo.execute().unwrap();

        let mut seen: Vec<bool> = Vec::new();
        for _ in 0..10 {
            seen.push(fifo.is_busy().unwrap());
        }
        assert_eq!(
            seen,
            [true, true, true, true, false, false, false, false, false, false]
        );
        assert_eq!(fake(&mut fifo).cmd_read(), 20);
    }

    #[test]
    fn test_fault_reported() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_drain(DrainPolicy::Faulted);
        let mut fifo = fifo_with(eve, PollBudgets::DEFAULT);
        fifo.append(&[0xffffff00]).unwrap();
        fifo.execute().unwrap();
        assert!(matches!(fifo.is_busy(), Err(Error::Fault)));
        assert_eq!(fifo.state(), FifoState::Fault);
        assert!(matches!(fifo.append(&[1]), Err(Error::Fault)));
        assert!(matches!(fifo.resync(), Err(Error::Fault)));
    }

    #[test]
    fn test_append_data_larger_than_ring() {
        let mut eve = FakeEve::booted(0x15);
        eve.set_drain(DrainPolicy::PerPoll(512));
        let mut fifo = fifo_with(eve, PollBudgets::DEFAULT);
        let payload: Vec<u8> = (0..10_001u32).map(|i| i as u8).collect();
        fifo.append(&[0xffffff22, 0x1000]).unwrap();
        fifo.append_data(&payload).unwrap();
        fifo.wait_idle().unwrap();

        let consumed = fake(&mut fifo).consumed();
        assert_eq!(consumed.len(), 8 + 10_004);
        assert_eq!(&consumed[8..8 + 10_001], &payload[..]);
        assert_eq!(consumed[8 + 10_001..], [0, 0, 0]);
    }

    #[test]
    fn test_oversized_command_rejected() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        let big = [0u32; 1024];
        assert!(matches!(fifo.append(&big), Err(Error::Unsupported)));
        assert_eq!(fifo.write_pointer(), 0);
    }

    #[test]
    fn test_failed_burst_send_can_be_retried() {
        let mut fifo = fifo_with(FakeEve::booted(0x15), PollBudgets::DEFAULT);
        fifo.begin_burst().unwrap();
        fifo.append(&[0xbbbbbbbb]).unwrap();

        // The next transaction publishes the write pointer and the one after
        // that carries the burst.
        let n = fake(&mut fifo).transactions().len();
        fake(&mut fifo).fail_transaction(n + 1);
        assert!(matches!(fifo.end_burst(), Err(Error::Interface(_))));
        assert!(fifo.in_burst());
        assert_eq!(fifo.state(), FifoState::Writing(WriteMode::Burst));
        assert!(fake(&mut fifo).consumed().is_empty());

        fifo.end_burst().unwrap();
        assert!(!fifo.in_burst());
        assert_eq!(fake(&mut fifo).consumed(), [0xbb, 0xbb, 0xbb, 0xbb]);
        assert_eq!(fifo.write_pointer(), 4);
    }

    #[test]
    fn test_async_burst_holds_bus_until_complete() {
        let budgets = PollBudgets {
            bus_idle: 3,
            ..PollBudgets::DEFAULT
        };
        let (dma, done) = FakeDma::new();
        let mut fifo = CommandFifo::new(
            LowLevel::new(FakeEve::booted(0x15)),
            dma,
            PollingWaiter::new(budgets.fifo_space),
            budgets,
        );
        fifo.resync().unwrap();

        fifo.append(&[0xaaaaaaaa]).unwrap();
        fifo.begin_burst().unwrap();
        fifo.append(&[0xbbbbbbbb]).unwrap();
        fifo.end_burst().unwrap();
        assert_eq!(fifo.bulk.started, [BURST_HEADER_LEN + 4]);

        // The data port moved the device write pointer by itself, so the
        // burst transfer was the last thing on the bus.
        {
            let eve = fake(&mut fifo);
            let last = eve.writes().last().unwrap();
            assert_eq!(last.0, Register::CMDB_WRITE.address().to_raw());
            assert_eq!(eve.cmd_write(), 8);
        }

        assert!(fifo.is_busy().unwrap());
        let before = fake(&mut fifo).transactions().len();
        assert!(matches!(fifo.append(&[0xcccccccc]), Err(Error::BusBusy)));
        assert!(matches!(fifo.low_level(), Err(Error::BusBusy)));
        assert_eq!(fifo.write_pointer(), 8);
        assert_eq!(fake(&mut fifo).transactions().len(), before);

        done.complete();
        fifo.append(&[0xcccccccc]).unwrap();
        fifo.wait_idle().unwrap();
        assert_eq!(
            fake(&mut fifo).consumed(),
            [0xaa, 0xaa, 0xaa, 0xaa, 0xbb, 0xbb, 0xbb, 0xbb, 0xcc, 0xcc, 0xcc, 0xcc]
        );
    }
}
