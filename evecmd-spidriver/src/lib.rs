#![no_std]

use embedded_hal::serial::{Read, Write};
use evecmd::Transport;
use spidriver::SPIDriver;

/// `SPIDriverTransport` is an implementation of `evecmd::Transport` that
/// talks to an EVE chip through an Excamera Labs SPIDriver adapter.
///
/// The adapter has no spare output for the chip's power-down signal, so
/// [`set_power_down`](Transport::set_power_down) does nothing and the chip
/// must be power-cycled by other means.
pub struct SPIDriverTransport<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    sd: SPIDriver<TX, RX>,
}

impl<TX, RX> SPIDriverTransport<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    pub fn new(sd: SPIDriver<TX, RX>) -> Self {
        Self { sd: sd }
    }
}

impl<TX, RX> Transport for SPIDriverTransport<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    type Error = spidriver::Error<TX::Error, RX::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.sd.select()
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.sd.unselect()
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        self.sd.write(&[v])
    }

    fn receive_byte(&mut self, tx: u8) -> Result<u8, Self::Error> {
        let mut buf = [tx];
        self.sd.transfer(&mut buf)?;
        Ok(buf[0])
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.sd.write(v)
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        for b in into.iter_mut() {
            *b = 0;
        }
        self.sd.transfer(into)?;
        Ok(())
    }
}
