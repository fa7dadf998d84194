//! The seams between this crate and the platform it runs on.
//!
//! Implementations of [`Transport`](Transport) serve as adapters between the
//! byte-level bus operations this library expects and a specific physical
//! implementation of that bus, such as an `embedded-hal` SPI peripheral.
//!
//! The main library contains no implementations of these traits, in order to
//! make the library portable across systems big and small. Other crates,
//! including some with the name prefix `evecmd`, take on additional
//! dependencies in order to bind this library to specific systems/hardware.

/// A byte-oriented synchronous serial bus with a device-select signal and
/// (optionally) a power-down signal connected to an EVE chip.
///
/// The only required operations are selecting and deselecting the device,
/// sending a byte, and exchanging a byte. The other methods have default
/// implementations in terms of those, but implementations with access to
/// a more efficient bulk transfer primitive should override them.
pub trait Transport {
    type Error;

    /// Asserts the device-select signal, starting a new transaction.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Deasserts the device-select signal, ending the current transaction.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error>;

    /// Sends `tx` while simultaneously receiving a byte, which is returned.
    fn receive_byte(&mut self, tx: u8) -> Result<u8, Self::Error>;

    /// Sends a 32-bit word in the little-endian byte order EVE expects.
    fn send_word32(&mut self, v: u32) -> Result<(), Self::Error> {
        self.send_bytes(&v.to_le_bytes())
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        for b in v.iter() {
            self.send_byte(*b)?;
        }
        Ok(())
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        for b in into.iter_mut() {
            *b = self.receive_byte(0)?;
        }
        Ok(())
    }

    /// Drives the chip's power-down signal, where `true` means to hold the
    /// chip in reset.
    ///
    /// The default implementation does nothing, for systems where the
    /// power-down signal isn't under software control.
    fn set_power_down(&mut self, asserted: bool) -> Result<(), Self::Error> {
        let _ = asserted;
        Ok(())
    }
}

/// Blocks the calling thread for a number of milliseconds.
///
/// This is used only during initialization and flash bring-up, where the
/// chip needs wall-clock settling time rather than just repeated polling.
pub trait Delay {
    fn delay_ms(&mut self, ms: u16);
}
