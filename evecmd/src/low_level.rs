use crate::host_commands::HostCmd;
use crate::interface::Transport;
use crate::memory::Address;

/// `LowLevel` is a low-level interface to EVE controllers which matches
/// the primitive memory-access operations used in Programmers Guides for the
/// various EVE controllers.
///
/// This is slightly higher-level than the `Transport` trait, providing
/// size-specific memory accesses framed with the correct address headers,
/// but doesn't have any special knowledge about the coprocessor command
/// ring. Multi-byte values are always little-endian on the wire.
///
/// None of these methods check whether an asynchronous bulk transfer is
/// still using the bus. Callers that use a non-blocking
/// [`BulkTransfer`](crate::bulk::BulkTransfer) must do that first, which
/// [`CommandFifo`](crate::fifo::CommandFifo) does on their behalf.
pub struct LowLevel<T: Transport> {
    bus: T,
}

impl<T: Transport> LowLevel<T> {
    pub fn new(bus: T) -> Self {
        Self { bus: bus }
    }

    pub fn wr8(&mut self, addr: Address, v: u8) -> Result<(), T::Error> {
        self.wr8s(addr, &[v])
    }

    pub fn wr16(&mut self, addr: Address, v: u16) -> Result<(), T::Error> {
        self.wr8s(addr, &v.to_le_bytes())
    }

    pub fn wr32(&mut self, addr: Address, v: u32) -> Result<(), T::Error> {
        self.wr8s(addr, &v.to_le_bytes())
    }

    /// Writes a whole buffer starting at the given address in a single
    /// transaction. This is the staging path for bulk data such as bitmaps
    /// destined for `RAM_G`.
    pub fn wr8s(&mut self, addr: Address, v: &[u8]) -> Result<(), T::Error> {
        self.write_stream(addr, |bus| bus.send_bytes(v))
    }

    pub fn rd8(&mut self, addr: Address) -> Result<u8, T::Error> {
        let mut data: [u8; 1] = [0; 1];
        self.rd8s(addr, &mut data)?;
        Ok(data[0])
    }

    pub fn rd16(&mut self, addr: Address) -> Result<u16, T::Error> {
        let mut data: [u8; 2] = [0; 2];
        self.rd8s(addr, &mut data)?;
        Ok(u16::from_le_bytes(data))
    }

    pub fn rd32(&mut self, addr: Address) -> Result<u32, T::Error> {
        let mut data: [u8; 4] = [0; 4];
        self.rd8s(addr, &mut data)?;
        Ok(u32::from_le_bytes(data))
    }

    pub fn rd8s(&mut self, addr: Address, into: &mut [u8]) -> Result<(), T::Error> {
        self.with_select(|bus| {
            bus.send_bytes(&addr.read_header())?;
            bus.receive_bytes(into)
        })
    }

    pub fn host_command(&mut self, cmd: HostCmd, param: u8) -> Result<(), T::Error> {
        self.with_select(|bus| bus.send_bytes(&cmd.message(param)))
    }

    /// Opens a write transaction at the given address and then passes the
    /// bus to the given closure so it can send the payload in as many
    /// pieces as it likes, all within a single device-select window.
    pub fn write_stream<F>(&mut self, addr: Address, f: F) -> Result<(), T::Error>
    where
        F: FnOnce(&mut T) -> Result<(), T::Error>,
    {
        self.with_select(|bus| {
            bus.send_bytes(&addr.write_header())?;
            f(bus)
        })
    }

    /// Begins a write transaction that stays open until `end_write`, so
    /// the caller can interleave its own bookkeeping with the payload.
    pub fn begin_write(&mut self, addr: Address) -> Result<(), T::Error> {
        self.bus.select()?;
        self.bus.send_bytes(&addr.write_header())
    }

    pub fn continue_write(&mut self, v: &[u8]) -> Result<(), T::Error> {
        self.bus.send_bytes(v)
    }

    pub fn end_write(&mut self) -> Result<(), T::Error> {
        self.bus.deselect()
    }

    pub fn set_power_down(&mut self, asserted: bool) -> Result<(), T::Error> {
        self.bus.set_power_down(asserted)
    }

    pub fn borrow_interface<'a>(&'a mut self) -> &'a mut T {
        &mut self.bus
    }

    pub fn take_interface(self) -> T {
        self.bus
    }

    // The device is always deselected afterwards, even if the transaction
    // failed part way through, but the first error wins.
    fn with_select<F, R>(&mut self, func: F) -> Result<R, T::Error>
    where
        F: FnOnce(&mut T) -> Result<R, T::Error>,
    {
        self.bus.select()?;
        let result = func(&mut self.bus);
        let deselected = self.bus.deselect();
        let v = result?;
        deselected?;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::memory::{RAM_G, RAM_REG};
    use crate::testing::FakeEve;

    #[test]
    fn test_wr32_is_little_endian() {
        let mut ll = LowLevel::new(FakeEve::new());
        ll.wr32(RAM_G + 8, 0x11223344).unwrap();
        let fake = ll.take_interface();
        assert_eq!(fake.mem_bytes(RAM_G + 8, 4), [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(fake.transactions()[0][..3], [0x80, 0x00, 0x08]);
    }

    #[test]
    fn test_rd16_is_little_endian() {
        let mut fake = FakeEve::new();
        fake.set_mem(RAM_REG + 0x40, &[0x06, 0x01]);
        let mut ll = LowLevel::new(fake);
        assert_eq!(ll.rd16(RAM_REG + 0x40).unwrap(), 0x0106);
    }

    #[test]
    fn test_wr8s_single_transaction() {
        let mut ll = LowLevel::new(FakeEve::new());
        ll.wr8s(RAM_G + 0x100, &[1, 2, 3, 4, 5]).unwrap();
        let fake = ll.take_interface();
        assert_eq!(fake.transactions().len(), 1);
        assert_eq!(fake.mem_bytes(RAM_G + 0x100, 5), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_host_command() {
        let mut ll = LowLevel::new(FakeEve::new());
        ll.host_command(HostCmd::CLKEXT, 0).unwrap();
        ll.host_command(HostCmd::ACTIVE, 0).unwrap();
        let fake = ll.take_interface();
        assert_eq!(
            fake.host_commands(),
            [(HostCmd::CLKEXT as u8, 0), (HostCmd::ACTIVE as u8, 0)]
        );
    }
}
