#![no_std]

//! Binds `evecmd` to the `embedded-hal` SPI, GPIO and delay traits.

use core::convert::Infallible;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;
use evecmd::{Delay, Transport};
use log::trace;

/// `HalTransport` is an implementation of `evecmd::Transport` that
/// communicates over SPI using the `embedded-hal` SPI and GPIO traits, with
/// GPIO outputs for the chip select and power-down signals.
pub struct HalTransport<SPI, CS, PD> {
    spi: SPI,
    cs: CS,
    pd: PD,
}

impl<SPI, CS, PD> HalTransport<SPI, CS, PD>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    PD: OutputPin,
{
    /// Create a new transport in terms of the given SPI bus and the CS and
    /// PD signal implementations.
    ///
    /// Both pins are active-low, reflecting the physical characteristics of
    /// the EVE IC packages: CS is set low to select the chip, and PD is set
    /// low to hold it in reset. Pass [`NoPowerDown`](NoPowerDown) for boards
    /// where PD isn't wired to a GPIO.
    pub fn new(spi: SPI, cs: CS, pd: PD) -> Self {
        Self {
            spi: spi,
            cs: cs,
            pd: pd,
        }
    }

    /// Consumes the transport and returns the wrapped peripherals.
    pub fn release(self) -> (SPI, CS, PD) {
        (self.spi, self.cs, self.pd)
    }
}

impl<SPI, CS, PD> Transport for HalTransport<SPI, CS, PD>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    PD: OutputPin,
{
    type Error = HalError<
        <SPI as Write<u8>>::Error,
        <SPI as Transfer<u8>>::Error,
        CS::Error,
        PD::Error,
    >;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(HalError::Cs)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(HalError::Cs)
    }

    fn send_byte(&mut self, v: u8) -> Result<(), Self::Error> {
        self.spi.write(&[v]).map_err(HalError::SpiWrite)
    }

    fn receive_byte(&mut self, tx: u8) -> Result<u8, Self::Error> {
        let mut buf = [tx];
        let got = self.spi.transfer(&mut buf).map_err(HalError::SpiTransfer)?;
        Ok(got[0])
    }

    fn send_bytes(&mut self, v: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(v).map_err(HalError::SpiWrite)
    }

    fn receive_bytes(&mut self, into: &mut [u8]) -> Result<(), Self::Error> {
        for b in into.iter_mut() {
            *b = 0;
        }
        self.spi.transfer(into).map_err(HalError::SpiTransfer)?;
        Ok(())
    }

    fn set_power_down(&mut self, asserted: bool) -> Result<(), Self::Error> {
        trace!("power down {}", if asserted { "asserted" } else { "released" });
        if asserted {
            self.pd.set_low().map_err(HalError::Pd)
        } else {
            self.pd.set_high().map_err(HalError::Pd)
        }
    }
}

/// Errors from the peripherals behind a [`HalTransport`](HalTransport).
#[derive(Debug)]
pub enum HalError<SpiWriteError, SpiTransferError, CsError, PdError> {
    SpiWrite(SpiWriteError),
    SpiTransfer(SpiTransferError),
    Cs(CsError),
    Pd(PdError),
}

/// Stands in for the power-down pin on boards where it is tied high.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerDown;

impl OutputPin for NoPowerDown {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Adapts any `embedded-hal` millisecond delay to `evecmd::Delay`.
pub struct HalDelay<D>(pub D);

impl<D: DelayMs<u16>> Delay for HalDelay<D> {
    fn delay_ms(&mut self, ms: u16) {
        self.0.delay_ms(ms)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct FakeSpi {
        written: Vec<u8>,
        reply: u8,
    }

    impl Write<u8> for FakeSpi {
        type Error = ();

        fn write(&mut self, words: &[u8]) -> Result<(), ()> {
            self.written.extend_from_slice(words);
            Ok(())
        }
    }

    impl Transfer<u8> for FakeSpi {
        type Error = ();

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], ()> {
            for w in words.iter_mut() {
                self.written.push(*w);
                *w = self.reply;
                self.reply = self.reply.wrapping_add(1);
            }
            Ok(words)
        }
    }

    #[derive(Default)]
    struct FakePin {
        levels: Vec<bool>,
    }

    impl OutputPin for FakePin {
        type Error = &'static str;

        fn set_low(&mut self) -> Result<(), &'static str> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), &'static str> {
            self.levels.push(true);
            Ok(())
        }
    }

    #[test]
    fn test_select_is_active_low() {
        let mut t = HalTransport::new(FakeSpi::default(), FakePin::default(), NoPowerDown);
        t.select().unwrap();
        t.deselect().unwrap();
        let (_, cs, _) = t.release();
        assert_eq!(cs.levels, [false, true]);
    }

    #[test]
    fn test_power_down_is_active_low() {
        let mut t = HalTransport::new(FakeSpi::default(), FakePin::default(), FakePin::default());
        t.set_power_down(true).unwrap();
        t.set_power_down(false).unwrap();
        let (_, _, pd) = t.release();
        assert_eq!(pd.levels, [false, true]);
    }

    #[test]
    fn test_receive_bytes_clocks_zeroes() {
        let spi = FakeSpi {
            written: Vec::new(),
            reply: 0x10,
        };
        let mut t = HalTransport::new(spi, FakePin::default(), NoPowerDown);
        t.send_bytes(&[0x30, 0x20, 0x00, 0x00]).unwrap();
        let mut into = [0xaa; 2];
        t.receive_bytes(&mut into).unwrap();
        assert_eq!(into, [0x10, 0x11]);
        let (spi, _, _) = t.release();
        assert_eq!(spi.written, [0x30, 0x20, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_delay_forwards() {
        struct Recorder(Vec<u16>);
        impl DelayMs<u16> for Recorder {
            fn delay_ms(&mut self, ms: u16) {
                self.0.push(ms);
            }
        }
        let mut d = HalDelay(Recorder(Vec::new()));
        Delay::delay_ms(&mut d, 21);
        assert_eq!((d.0).0, [21]);
    }
}
