//! A driver core for the command FIFO of FTDI/Bridgetek EVE display
//! controllers (FT81x, BT815/6 and BT817/8).
//!
//! The pieces, from the bottom up:
//!
//! - [`interface::Transport`] is the byte-level bus the host talks to the
//!   chip over. This crate has no implementations; see `evecmd-hal` and
//!   `evecmd-spidriver`.
//! - [`low_level::LowLevel`] frames register and memory accesses.
//! - [`fifo::CommandFifo`] manages the coprocessor's command ring, in either
//!   immediate or burst mode, with [`bulk::BulkTransfer`] handling how a
//!   burst reaches the bus.
//! - [`Eve`] ties those together with the initialization sequence and fault
//!   recovery.
//!
//! ```ignore
//! let mut eve = Eve::new(transport, delay, Config::new(DisplayTimings::R480X272));
//! let model = eve.init()?;
//! let cp = eve.fifo();
//! cp.begin_burst()?;
//! cp.dlstart()?;
//! cp.dl(DLCmd::clear_color_rgb(0, 0, 64))?;
//! cp.dl(DLCmd::CLEAR_ALL)?;
//! cp.text(WidgetPos::new(10, 10), FontRef::new_raw(28), defaults(), eve_format!("%d", 5))?;
//! cp.dl(DLCmd::DISPLAY)?;
//! cp.swap()?;
//! cp.end_burst()?;
//! ```

#![no_std]

pub mod bulk;
pub mod commands;
pub mod config;
pub mod display_list;
pub mod error;
pub mod fifo;
pub mod host_commands;
pub mod init;
pub mod interface;
pub mod low_level;
pub mod memory;
pub mod models;
pub mod registers;
pub mod strfmt;

#[cfg(test)]
pub(crate) mod testing;

pub use evecmd_macros::eve_format;

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use interface::{Delay, Transport};

use bulk::{Blocking, BulkTransfer};
use error::{InitError, InitFailure};
use fifo::{CommandFifo, FifoState, PollingWaiter, Waiter};
use init::FlashStatus;
use log::{debug, error, info, warn};
use low_level::LowLevel;
use memory::{RAM_ERR_REPORT, RAM_ERR_REPORT_LEN};
use models::{ChipModel, Generation};
use registers::Register;

/// Where [`Eve::init`](Eve::init) got to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InitStatus {
    /// Not initialized yet, or the last attempt was cut short by a bus
    /// error.
    Pending,
    Ready(ChipModel),
    Failed(InitFailure),
}

/// The main object of this crate: an EVE chip on the other end of a
/// [`Transport`](Transport).
///
/// `B` decides how bursts reach the bus and `W` how the engine waits for
/// ring space. The defaults do both by blocking.
pub struct Eve<T, D, B = Blocking, W = PollingWaiter>
where
    T: Transport,
    D: Delay,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    fifo: CommandFifo<T, B, W>,
    delay: D,
    config: Config,
    status: InitStatus,
}

impl<T: Transport, D: Delay> Eve<T, D> {
    pub fn new(bus: T, delay: D, config: Config) -> Self {
        Self::with_bulk(bus, delay, config, Blocking::new())
    }
}

impl<T: Transport, D: Delay, B: BulkTransfer<T>> Eve<T, D, B> {
    /// Like [`new`](Eve::new), but with a platform-specific way of
    /// sending bursts, such as DMA.
    pub fn with_bulk(bus: T, delay: D, config: Config, bulk: B) -> Self {
        let fifo = CommandFifo::new(
            LowLevel::new(bus),
            bulk,
            PollingWaiter::new(config.budgets.fifo_space),
            config.budgets,
        );
        Self {
            fifo: fifo,
            delay: delay,
            config: config,
            status: InitStatus::Pending,
        }
    }
}

impl<T, D, B, W> Eve<T, D, B, W>
where
    T: Transport,
    D: Delay,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    /// Replaces the waiter, for example with one that sleeps until the
    /// chip raises its interrupt.
    pub fn with_waiter<W2, F>(self, f: F) -> Eve<T, D, B, W2>
    where
        W2: Waiter<T>,
        F: FnOnce(W) -> W2,
    {
        Eve {
            fifo: self.fifo.with_new_waiter(f),
            delay: self.delay,
            config: self.config,
            status: self.status,
        }
    }

    /// Resets the chip, brings up its clocks, waits for it to boot,
    /// identifies it and starts the display with a blank screen.
    ///
    /// Each step only runs if the ones before it succeeded, and the pixel
    /// clock is only started at the very end, so a failure never leaves
    /// the panel being driven with a half-configured raster.
    pub fn init(&mut self) -> Result<ChipModel, InitError<T::Error>> {
        self.status = InitStatus::Pending;
        self.fifo.set_generation(None);
        match self.run_init() {
            Ok(model) => {
                info!("{:?} ready", model);
                self.status = InitStatus::Ready(model);
                Ok(model)
            }
            Err(err) => {
                if let InitError::Failed(failure) = err {
                    error!("initialization failed: {}", failure);
                    self.status = InitStatus::Failed(failure);
                }
                Err(err)
            }
        }
    }

    fn run_init(&mut self) -> Result<ChipModel, InitError<T::Error>> {
        let config = self.config;
        let delay = &mut self.delay;
        let ll = self.fifo.low_level().map_err(init_error)?;

        init::power_cycle(ll, delay)?;
        init::activate_system_clock(ll, &config)?;
        init::poll_for_boot(ll, delay, &config.budgets)?;
        let model = init::detect_model(ll)?;
        debug!("detected {:?}", model);
        init::program_frequency(ll, &config)?;
        init::configure_display(ll, &config)?;

        self.fifo.set_generation(Some(model.generation()));
        self.fifo.resync().map_err(init_error)?;
        if self.fifo.state() != FifoState::Idle {
            return Err(InitError::Failed(InitFailure::CpuState));
        }

        let ll = self.fifo.low_level().map_err(init_error)?;
        init::enable_display(ll, &config)?;
        Ok(model)
    }

    pub fn status(&self) -> InitStatus {
        self.status
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adopts the device's command ring pointers as the host's own. Use
    /// this to recover from [`Error::Unresponsive`].
    pub fn resync(&mut self) -> fifo::Result<(), T> {
        self.fifo.resync()
    }

    /// Recovers the coprocessor after it has reported [`Error::Fault`].
    ///
    /// The coprocessor is held in reset while the ring pointers are zeroed.
    /// On BT815 and later the coprocessor's patch pointer is saved and
    /// restored around the reset, since the reset would otherwise lose any
    /// ROM patches applied during boot. This library never does this on
    /// its own; the caller decides when.
    pub fn reset_coprocessor(&mut self) -> fifo::Result<(), T> {
        let patched = matches!(self.fifo.generation(), Some(g) if g >= Generation::Eve3);
        let restart_video = matches!(self.status, InitStatus::Ready(_));
        let pclk = self.config.display.pclk_div;
        let ll = self.fifo.low_level()?;

        let patch = if patched {
            Some(ll.rd16(Register::COPRO_PATCH_PTR.address())?)
        } else {
            None
        };
        ll.wr8(Register::CPURESET.address(), 1)?;
        ll.wr16(Register::CMD_READ.address(), 0)?;
        ll.wr16(Register::CMD_WRITE.address(), 0)?;
        ll.wr16(Register::CMD_DL.address(), 0)?;
        ll.wr8(Register::CPURESET.address(), 0)?;
        if let Some(ptr) = patch {
            ll.wr16(Register::COPRO_PATCH_PTR.address(), ptr)?;
        }
        if restart_video {
            ll.wr8(Register::PCLK.address(), pclk)?;
        }
        debug!("coprocessor reset");
        self.fifo.resync()
    }

    /// Brings the attached QSPI flash up to full-speed mode. BT815 and
    /// later.
    ///
    /// Returns the state the flash ended up in, which is
    /// [`FlashStatus::Full`] on success. Other states mean the flash is
    /// present but couldn't be fully initialized, or never left its INIT
    /// state within the configured budget.
    pub fn init_flash(&mut self) -> fifo::Result<FlashStatus, T> {
        self.fifo.require(Generation::Eve3)?;

        let mut status = FlashStatus::Init;
        for _ in 0..self.config.budgets.flash_ready {
            status = init::read_flash_status(self.fifo.low_level()?)?;
            if status != FlashStatus::Init {
                break;
            }
            self.delay.delay_ms(1);
        }
        debug!("flash status {:?}", status);

        if status == FlashStatus::Detached {
            self.fifo.flashattach()?;
            self.fifo.wait_idle()?;
            status = init::read_flash_status(self.fifo.low_level()?)?;
        }
        if status == FlashStatus::Basic {
            let result = self.fifo.flashfast()?;
            if result == 0 {
                status = FlashStatus::Full;
            } else {
                warn!("flash did not enter full mode: error {:#x}", result);
            }
        }
        if status != FlashStatus::Full {
            warn!("flash left in {:?} state", status);
        }
        Ok(status)
    }

    /// Reads the coprocessor's description of its most recent fault.
    /// BT815 and later.
    ///
    /// This is only meaningful straight after an operation has returned
    /// [`Error::Fault`], and before
    /// [`reset_coprocessor`](Self::reset_coprocessor).
    pub fn read_fault_message(&mut self) -> fifo::Result<FaultMessage, T> {
        self.fifo.require(Generation::Eve3)?;
        let mut raw = [0; RAM_ERR_REPORT_LEN];
        self.fifo.low_level()?.rd8s(RAM_ERR_REPORT, &mut raw)?;
        Ok(FaultMessage(raw))
    }

    /// The command FIFO, for issuing coprocessor commands.
    pub fn fifo(&mut self) -> &mut CommandFifo<T, B, W> {
        &mut self.fifo
    }

    /// Direct register and memory access, once any burst still on the bus
    /// has finished.
    pub fn low_level(&mut self) -> fifo::Result<&mut LowLevel<T>, T> {
        self.fifo.low_level()
    }

    pub fn take_interface(self) -> T {
        self.fifo.take_interface()
    }
}

fn init_error<E>(err: Error<E>) -> InitError<E> {
    match err {
        Error::Interface(e) => InitError::Interface(e),
        _ => InitError::Failed(InitFailure::CpuState),
    }
}

/// A coprocessor fault message retrieved from the EVE device.
#[derive(Clone)]
pub struct FaultMessage([u8; RAM_ERR_REPORT_LEN]);

impl FaultMessage {
    /// The message text, up to its null terminator. The format is
    /// determined entirely by the chip, though it is typically ASCII.
    pub fn as_bytes(&self) -> &[u8] {
        let all = &self.0[..];
        match all.iter().position(|b| *b == 0) {
            Some(len) => &all[..len],
            None => all,
        }
    }
}

impl core::fmt::Debug for FaultMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use core::fmt::Write;
        f.write_str("FaultMessage(\"")?;
        for c in self.as_bytes() {
            for c in core::ascii::escape_default(*c) {
                f.write_char(c as char)?;
            }
        }
        f.write_str("\")")
    }
}
