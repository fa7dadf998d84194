//! A simulated EVE device for unit tests.
//!
//! [`FakeEve`] decodes the raw byte stream it receives as a `Transport`:
//! read and write address headers, data phases and host commands. It keeps
//! a sparse memory image and plays the coprocessor's part of the command
//! ring, consuming published bytes according to a [`DrainPolicy`].

extern crate std;

use crate::bulk::{BulkTransfer, BurstBuffer, TransferState, BURST_BUFFER_LEN};
use crate::interface::{Delay, Transport};
use crate::memory::{Address, RAM_CMD, ROM_CHIPID};
use crate::registers::Register;
use std::collections::HashMap;
use std::rc::Rc;
use std::vec::Vec;

const RING_MASK: u32 = 0xfff;

/// How the simulated coprocessor consumes the command ring.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum DrainPolicy {
    /// Everything is consumed as soon as the write pointer moves.
    Immediate,
    /// Nothing is ever consumed.
    Stalled,
    /// Up to this many bytes are consumed each time the read pointer is
    /// polled.
    PerPoll(u32),
    /// The coprocessor faults as soon as the write pointer moves.
    Faulted,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct FakeBusError;

pub(crate) struct FakeEve {
    mem: HashMap<u32, u8>,
    drain: DrainPolicy,

    txn: Vec<u8>,
    read_pos: u32,
    hide_id: bool,

    transactions: Vec<Vec<u8>>,
    host_cmds: Vec<(u8, u8)>,
    writes: Vec<(u32, Vec<u8>)>,
    consumed: Vec<u8>,
    power_down: Vec<bool>,

    frequency_readback: Option<u32>,
    id_delay: u32,
    results: Vec<(u32, u32)>,
    fail_at: Option<usize>,
}

impl FakeEve {
    /// A device with all-zero memory, as if nothing has booted.
    pub(crate) fn new() -> Self {
        Self {
            mem: HashMap::new(),
            drain: DrainPolicy::Immediate,
            txn: Vec::new(),
            read_pos: 0,
            hide_id: false,
            transactions: Vec::new(),
            host_cmds: Vec::new(),
            writes: Vec::new(),
            consumed: Vec::new(),
            power_down: Vec::new(),
            frequency_readback: None,
            id_delay: 0,
            results: Vec::new(),
            fail_at: None,
        }
    }

    /// A device that has finished booting and identifies as the given
    /// model byte.
    pub(crate) fn booted(model: u8) -> Self {
        let mut eve = Self::new();
        eve.set_mem(Register::ID.address(), &[0x7c]);
        eve.set_mem(Register::CPURESET.address(), &[0]);
        eve.set_mem(ROM_CHIPID, &[0x08, model, 0x01, 0x00]);
        eve
    }

    pub(crate) fn set_drain(&mut self, policy: DrainPolicy) {
        self.drain = policy;
    }

    /// Makes `REG_FREQUENCY` read back as the given value regardless of
    /// what was written.
    pub(crate) fn set_frequency_readback(&mut self, v: u32) {
        self.frequency_readback = Some(v);
    }

    /// `REG_ID` reads as zero this many times before showing its value.
    pub(crate) fn set_id_delay(&mut self, polls: u32) {
        self.id_delay = polls;
    }

    /// Once the coprocessor consumes the word at ring offset `offset`, it
    /// replaces it with `value`, as a command with a result would.
    pub(crate) fn script_result(&mut self, offset: u16, value: u32) {
        self.results.push((offset as u32 & RING_MASK, value));
    }

    /// The transaction with this index, counting from zero, fails to start.
    pub(crate) fn fail_transaction(&mut self, index: usize) {
        self.fail_at = Some(index);
    }

    pub(crate) fn set_mem(&mut self, addr: Address, v: &[u8]) {
        let base = addr.to_raw();
        for (i, b) in v.iter().enumerate() {
            self.mem.insert(base + i as u32, *b);
        }
    }

    pub(crate) fn mem_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        let base = addr.to_raw();
        (0..len as u32).map(|i| self.peek(base + i)).collect()
    }

    pub(crate) fn mem_u32(&self, addr: Address) -> u32 {
        let b = self.mem_bytes(addr, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn reg16(&self, reg: Register) -> u16 {
        let b = self.mem_bytes(reg.address(), 2);
        u16::from_le_bytes([b[0], b[1]])
    }

    fn set_reg16(&mut self, reg: Register, v: u16) {
        self.set_mem(reg.address(), &v.to_le_bytes());
    }

    pub(crate) fn cmd_read(&self) -> u16 {
        self.reg16(Register::CMD_READ)
    }

    pub(crate) fn cmd_write(&self) -> u16 {
        self.reg16(Register::CMD_WRITE)
    }

    pub(crate) fn set_pointers(&mut self, read: u16, write: u16) {
        self.set_reg16(Register::CMD_READ, read);
        self.set_reg16(Register::CMD_WRITE, write);
    }

    /// Every byte the simulated coprocessor has consumed from the ring.
    pub(crate) fn consumed(&self) -> &[u8] {
        &self.consumed
    }

    /// The bytes sent in each transaction, excluding dummy bytes clocked
    /// out while reading.
    pub(crate) fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    pub(crate) fn host_commands(&self) -> &[(u8, u8)] {
        &self.host_cmds
    }

    /// Every memory write in order, as start address and payload.
    pub(crate) fn writes(&self) -> &[(u32, Vec<u8>)] {
        &self.writes
    }

    /// The position in [`writes`](Self::writes) of the first write that
    /// started at the given address.
    pub(crate) fn first_write_to(&self, addr: Address) -> Option<usize> {
        let raw = addr.to_raw();
        self.writes.iter().position(|(a, _)| *a == raw)
    }

    pub(crate) fn last_write_to(&self, addr: Address) -> Option<&[u8]> {
        let raw = addr.to_raw();
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == raw)
            .map(|(_, v)| &v[..])
    }

    pub(crate) fn power_down_log(&self) -> &[bool] {
        &self.power_down
    }

    /// Consumes everything between the read and write pointers.
    pub(crate) fn drain_now(&mut self) {
        self.consume(u32::MAX);
    }

    fn consume(&mut self, limit: u32) {
        let mut r = self.cmd_read() as u32 & RING_MASK;
        let w = self.cmd_write() as u32 & RING_MASK;
        if r == RING_MASK {
            return;
        }
        let mut n = 0;
        while r != w && n < limit {
            let b = self.peek(RAM_CMD.to_raw() + r);
            self.consumed.push(b);
            if let Some(i) = self.results.iter().position(|(o, _)| o + 3 == r) {
                let (offset, value) = self.results.remove(i);
                self.set_mem(RAM_CMD + offset, &value.to_le_bytes());
            }
            r = (r + 1) & RING_MASK;
            n += 1;
        }
        self.set_reg16(Register::CMD_READ, r as u16);
    }

    fn on_publish(&mut self) {
        match self.drain {
            DrainPolicy::Immediate => self.drain_now(),
            DrainPolicy::Faulted => self.set_reg16(Register::CMD_READ, RING_MASK as u16),
            DrainPolicy::Stalled | DrainPolicy::PerPoll(_) => {}
        }
    }

    fn peek(&self, addr: u32) -> u8 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    fn read_byte(&self, addr: u32) -> u8 {
        let freq = Register::FREQUENCY.address().to_raw();
        if let Some(v) = self.frequency_readback {
            if addr >= freq && addr < freq + 4 {
                return v.to_le_bytes()[(addr - freq) as usize];
            }
        }
        if self.hide_id && addr == Register::ID.address().to_raw() {
            return 0;
        }
        self.peek(addr)
    }

    fn begin_read(&mut self, addr: u32) {
        if addr == Register::CMD_READ.address().to_raw() {
            if let DrainPolicy::PerPoll(n) = self.drain {
                self.consume(n);
            }
        }
        if addr == Register::ID.address().to_raw() && self.id_delay > 0 {
            self.id_delay -= 1;
            self.hide_id = true;
        }
    }

    fn apply_write(&mut self, addr: u32, data: &[u8]) {
        self.writes.push((addr, data.to_vec()));

        if addr == Register::CMDB_WRITE.address().to_raw() {
            let mut w = self.cmd_write() as u32 & RING_MASK;
            for b in data {
                self.mem.insert(RAM_CMD.to_raw() + w, *b);
                w = (w + 1) & RING_MASK;
            }
            self.set_reg16(Register::CMD_WRITE, w as u16);
            self.on_publish();
            return;
        }

        for (i, b) in data.iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
        let cmd_write = Register::CMD_WRITE.address().to_raw();
        if addr <= cmd_write && cmd_write < addr + data.len() as u32 {
            self.on_publish();
        }
    }
}

impl Transport for FakeEve {
    type Error = FakeBusError;

    fn select(&mut self) -> Result<(), FakeBusError> {
        if self.fail_at == Some(self.transactions.len()) {
            self.fail_at = None;
            return Err(FakeBusError);
        }
        self.txn.clear();
        self.read_pos = 0;
        self.hide_id = false;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), FakeBusError> {
        let txn = core::mem::take(&mut self.txn);
        if self.read_pos == 0 && txn.len() >= 3 {
            if txn[0] & 0xc0 == 0x80 {
                self.apply_write(header_addr(&txn), &txn[3..]);
            } else if txn.len() == 3 {
                self.host_cmds.push((txn[0], txn[1]));
            }
        }
        self.transactions.push(txn);
        Ok(())
    }

    fn send_byte(&mut self, v: u8) -> Result<(), FakeBusError> {
        self.txn.push(v);
        Ok(())
    }

    fn receive_byte(&mut self, _tx: u8) -> Result<u8, FakeBusError> {
        if self.txn.len() < 4 || self.txn[0] & 0xc0 != 0 {
            return Ok(0);
        }
        let addr = header_addr(&self.txn);
        if self.read_pos == 0 {
            self.begin_read(addr);
        }
        let v = self.read_byte(addr + self.read_pos);
        self.read_pos += 1;
        Ok(v)
    }

    fn set_power_down(&mut self, asserted: bool) -> Result<(), FakeBusError> {
        self.power_down.push(asserted);
        Ok(())
    }
}

fn header_addr(txn: &[u8]) -> u32 {
    (txn[0] as u32 & 0x3f) << 16 | (txn[1] as u32) << 8 | txn[2] as u32
}

/// A [`Delay`] that just records what it was asked for.
#[derive(Default)]
pub(crate) struct FakeDelay {
    pub(crate) calls: Vec<u16>,
}

impl Delay for FakeDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.calls.push(ms);
    }
}

/// A [`BulkTransfer`] that behaves like DMA: the bytes go out when the
/// transfer starts, but the bus stays busy until the test calls
/// [`TransferState::complete`] on the shared state.
pub(crate) struct FakeDma {
    buf: BurstBuffer,
    state: Rc<TransferState>,
    pub(crate) started: Vec<usize>,
}

impl FakeDma {
    /// Returns the transfer and a handle to its busy flag, which plays the
    /// part of the completion interrupt.
    pub(crate) fn new() -> (Self, Rc<TransferState>) {
        let state = Rc::new(TransferState::new());
        let dma = Self {
            buf: [0; BURST_BUFFER_LEN],
            state: Rc::clone(&state),
            started: Vec::new(),
        };
        (dma, state)
    }
}

impl<T: Transport> BulkTransfer<T> for FakeDma {
    fn buffer(&mut self) -> &mut BurstBuffer {
        &mut self.buf
    }

    fn start_bulk_transfer(&mut self, bus: &mut T, len: usize) -> Result<(), T::Error> {
        assert!(self.state.begin(), "transfer started while another was running");
        bus.select()?;
        bus.send_bytes(&self.buf[..len])?;
        bus.deselect()?;
        self.started.push(len);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.state.is_busy()
    }
}
