//! The steps of bringing an EVE chip from power-on to showing video.
//!
//! [`Eve::init`](crate::Eve::init) runs these in order, and each one is a
//! gate: a failure stops the sequence before anything that would start the
//! display. `REG_PCLK` in particular is only written once every earlier
//! gate has passed, because that's the write that starts scanning out.

use crate::config::{ClockSource, Config, PollBudgets, DIMENSION_MASK};
use crate::display_list::DLCmd;
use crate::host_commands::HostCmd;
use crate::interface::{Delay, Transport};
use crate::low_level::LowLevel;
use crate::memory::{RAM_DL, ROM_CHIPID};
use crate::models::ChipModel;
use crate::registers::{Register, DLSWAP_FRAME, GPIO_DISP};
use core::convert::TryFrom;
use log::{debug, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[doc(inline)]
pub use crate::error::{InitError, InitFailure};

type Result<T, E> = core::result::Result<T, InitError<E>>;

/// The value `REG_ID` holds once the chip has booted.
const CHIP_ID_READY: u8 = 0x7c;

/// The flash interface states reported in `REG_FLASH_STATUS`.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FlashStatus {
    Init = 0,
    Detached = 1,
    Basic = 2,
    Full = 3,
}

/// The words written to `RAM_DL` before the first swap, so that the panel
/// shows black rather than whatever was in memory.
pub(crate) const INITIAL_DISPLAY_LIST: [DLCmd; 3] = [
    DLCmd::clear_color_rgb(0, 0, 0),
    DLCmd::CLEAR_ALL,
    DLCmd::DISPLAY,
];

// Pulses the power-down signal so that the chip starts from reset.
pub(crate) fn power_cycle<T: Transport, D: Delay>(
    ll: &mut LowLevel<T>,
    delay: &mut D,
) -> Result<(), T::Error> {
    ll.set_power_down(true)?;
    delay.delay_ms(6);
    ll.set_power_down(false)?;
    delay.delay_ms(21);
    Ok(())
}

pub(crate) fn activate_system_clock<T: Transport>(
    ll: &mut LowLevel<T>,
    config: &Config,
) -> Result<(), T::Error> {
    if config.clock_source == ClockSource::External {
        ll.host_command(HostCmd::CLKEXT, 0)?;
    }
    if let Some(freq) = config.system_clock {
        ll.host_command(HostCmd::CLKSEL, freq.clksel_param())?;
    }
    ll.host_command(HostCmd::ACTIVE, 0)?;
    Ok(())
}

// Busy-waits until the chip answers with its ready identity and then until
// the coprocessor has come out of reset, each within its own budget.
pub(crate) fn poll_for_boot<T: Transport, D: Delay>(
    ll: &mut LowLevel<T>,
    delay: &mut D,
    budgets: &PollBudgets,
) -> Result<(), T::Error> {
    // Remembers the last answer that wasn't just a floating bus, so a
    // wrong chip can be told apart from no chip at all.
    let mut seen: Option<u8> = None;
    let mut ready = false;
    for poll in 0..budgets.identity {
        let v = ll.rd8(Register::ID.address())?;
        if v == CHIP_ID_READY {
            trace!("chip id ready after {} polls", poll + 1);
            ready = true;
            break;
        }
        if v != 0x00 && v != 0xff {
            seen = Some(v);
        }
        delay.delay_ms(1);
    }
    if !ready {
        return Err(InitError::Failed(match seen {
            Some(found) => InitFailure::ChipIdWrong { found: found },
            None => InitFailure::NoChipIdData,
        }));
    }

    for poll in 0..budgets.cpu_ready {
        let v = ll.rd8(Register::CPURESET.address())?;
        if v & 0b11 == 0 {
            trace!("coprocessor out of reset after {} polls", poll + 1);
            return Ok(());
        }
        delay.delay_ms(1);
    }
    Err(InitError::Failed(InitFailure::CpuState))
}

pub(crate) fn detect_model<T: Transport>(ll: &mut LowLevel<T>) -> Result<ChipModel, T::Error> {
    let mut raw: [u8; 4] = [0; 4];
    ll.rd8s(ROM_CHIPID, &mut raw)?;
    match ChipModel::from_chip_id(raw) {
        Some(model) => Ok(model),
        None => Err(InitError::Failed(InitFailure::ChipIdWrong { found: raw[1] })),
    }
}

pub(crate) fn program_frequency<T: Transport>(
    ll: &mut LowLevel<T>,
    config: &Config,
) -> Result<(), T::Error> {
    let expected = match config.system_clock {
        Some(freq) => freq.reg_frequency_value(),
        None => return Ok(()),
    };
    ll.wr32(Register::FREQUENCY.address(), expected)?;
    let actual = ll.rd32(Register::FREQUENCY.address())?;
    if actual != expected {
        return Err(InitError::Failed(InitFailure::FrequencySet {
            expected: expected,
            actual: actual,
        }));
    }
    Ok(())
}

// Programs the raster timings and installs a blank display list, leaving
// the pixel clock stopped.
pub(crate) fn configure_display<T: Transport>(
    ll: &mut LowLevel<T>,
    config: &Config,
) -> Result<(), T::Error> {
    use Register::*;
    const DIM_MASK: u16 = DIMENSION_MASK;
    let c = &config.display;

    ll.wr8(PWM_DUTY.address(), 0)?;

    ll.wr16(HCYCLE.address(), c.horiz.total & DIM_MASK)?;
    ll.wr16(HOFFSET.address(), c.horiz.offset & DIM_MASK)?;
    ll.wr16(HSYNC0.address(), c.horiz.sync_start & DIM_MASK)?;
    ll.wr16(HSYNC1.address(), c.horiz.sync_end & DIM_MASK)?;
    ll.wr16(HSIZE.address(), c.horiz.visible & DIM_MASK)?;

    ll.wr16(VCYCLE.address(), c.vert.total & DIM_MASK)?;
    ll.wr16(VOFFSET.address(), c.vert.offset & DIM_MASK)?;
    ll.wr16(VSYNC0.address(), c.vert.sync_start & DIM_MASK)?;
    ll.wr16(VSYNC1.address(), c.vert.sync_end & DIM_MASK)?;
    ll.wr16(VSIZE.address(), c.vert.visible & DIM_MASK)?;

    ll.wr8(SWIZZLE.address(), c.swizzle)?;
    ll.wr8(PCLK_POL.address(), c.pclk_pol.reg_pclk_pol_value())?;
    ll.wr8(CSPREAD.address(), c.cspread as u8)?;

    for (i, cmd) in INITIAL_DISPLAY_LIST.iter().enumerate() {
        ll.wr32(RAM_DL + (i as u32 * DLCmd::LENGTH), cmd.as_raw())?;
    }
    ll.wr8(DLSWAP.address(), DLSWAP_FRAME)?;
    debug!(
        "display configured for {}x{}",
        c.horiz.visible, c.vert.visible
    );
    Ok(())
}

pub(crate) fn enable_display<T: Transport>(
    ll: &mut LowLevel<T>,
    config: &Config,
) -> Result<(), T::Error> {
    use Register::*;

    ll.wr8(GPIO_DIR.address(), GPIO_DISP)?;
    ll.wr8(GPIO.address(), GPIO_DISP)?;

    // This one starts the video output, so nothing may fail after it
    // except the backlight.
    ll.wr8(PCLK.address(), config.display.pclk_div)?;
    ll.wr8(PWM_DUTY.address(), config.backlight)?;
    Ok(())
}

pub(crate) fn read_flash_status<T: Transport>(
    ll: &mut LowLevel<T>,
) -> core::result::Result<FlashStatus, T::Error> {
    let raw = ll.rd8(Register::FLASH_STATUS.address())? & 0b11;
    // All four two-bit values are valid states.
    Ok(FlashStatus::try_from(raw).unwrap_or(FlashStatus::Init))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::{ClockFrequency, DisplayTimings};
    use crate::testing::{FakeDelay, FakeEve};

    #[test]
    fn test_power_cycle_timing() {
        let mut ll = LowLevel::new(FakeEve::new());
        let mut delay = FakeDelay::default();
        power_cycle(&mut ll, &mut delay).unwrap();
        assert_eq!(delay.calls, [6, 21]);
        assert_eq!(ll.take_interface().power_down_log(), [true, false]);
    }

    #[test]
    fn test_clock_host_commands() {
        let config = Config::new(DisplayTimings::R480X272)
            .with_clock_source(ClockSource::External)
            .with_system_clock(Some(ClockFrequency::F72MHz));
        let mut ll = LowLevel::new(FakeEve::new());
        activate_system_clock(&mut ll, &config).unwrap();
        assert_eq!(
            ll.take_interface().host_commands(),
            [(0x44, 0), (0x61, 0x46), (0x00, 0)]
        );
    }

    #[test]
    fn test_poll_for_boot_distinguishes_wrong_chip() {
        let mut eve = FakeEve::new();
        eve.set_mem(Register::ID.address(), &[0xff]);
        let mut ll = LowLevel::new(eve);
        let budgets = PollBudgets {
            identity: 3,
            ..PollBudgets::DEFAULT
        };
        let mut delay = FakeDelay::default();
        let got = poll_for_boot(&mut ll, &mut delay, &budgets);
        assert!(matches!(
            got,
            Err(InitError::Failed(InitFailure::NoChipIdData))
        ));
        assert_eq!(delay.calls, [1, 1, 1]);

        ll.borrow_interface()
            .set_mem(Register::ID.address(), &[0x12]);
        let got = poll_for_boot(&mut ll, &mut delay, &budgets);
        assert!(matches!(
            got,
            Err(InitError::Failed(InitFailure::ChipIdWrong { found: 0x12 }))
        ));
    }

    #[test]
    fn test_initial_display_list() {
        let config = Config::new(DisplayTimings::R320X240);
        let mut ll = LowLevel::new(FakeEve::new());
        configure_display(&mut ll, &config).unwrap();
        let eve = ll.take_interface();
        assert_eq!(eve.mem_u32(RAM_DL), 0x02000000);
        assert_eq!(eve.mem_u32(RAM_DL + 4), 0x26000007);
        assert_eq!(eve.mem_u32(RAM_DL + 8), 0x00000000);
        assert_eq!(
            eve.last_write_to(Register::DLSWAP.address()),
            Some(&[DLSWAP_FRAME][..])
        );
        assert_eq!(eve.first_write_to(Register::PCLK.address()), None);
        assert!(
            eve.first_write_to(RAM_DL).unwrap()
                < eve.first_write_to(Register::DLSWAP.address()).unwrap()
        );
    }

    #[test]
    fn test_flash_status_decoding() {
        let mut eve = FakeEve::new();
        eve.set_mem(Register::FLASH_STATUS.address(), &[0x02]);
        let mut ll = LowLevel::new(eve);
        assert_eq!(read_flash_status(&mut ll).unwrap(), FlashStatus::Basic);
    }
}
