//! Types used during EVE chip initialization.
//!
//! A [`Config`](Config) is plain data: it describes how the chip is wired
//! (clock source), what panel is attached (display timings), and how long
//! the library is willing to busy-wait at each of its polling points.

/// Selects whether the EVE chip should use its internal oscillator or if
/// it should expect an external crystal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockSource {
    Internal,
    External,
}

/// Selects a clock frequency for the system clock.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockFrequency {
    F24MHz,
    F36MHz,
    F48MHz,
    F60MHz,
    F72MHz,
}

impl ClockFrequency {
    /// The parameter byte for the `CLKSEL` host command. Multipliers above
    /// four also need the PLL range bit.
    pub const fn clksel_param(self) -> u8 {
        match self {
            ClockFrequency::F24MHz => 2,
            ClockFrequency::F36MHz => 3,
            ClockFrequency::F48MHz => 4,
            ClockFrequency::F60MHz => 5 | 0x40,
            ClockFrequency::F72MHz => 6 | 0x40,
        }
    }

    pub const fn reg_frequency_value(self) -> u32 {
        match self {
            ClockFrequency::F24MHz => 24000000,
            ClockFrequency::F36MHz => 36000000,
            ClockFrequency::F48MHz => 48000000,
            ClockFrequency::F60MHz => 60000000,
            ClockFrequency::F72MHz => 72000000,
        }
    }
}

/// Selects which clock edge of the pixel clock where video data will be sampled.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockPolarity {
    RisingEdge,
    FallingEdge,
}

impl ClockPolarity {
    pub const fn reg_pclk_pol_value(self) -> u8 {
        match self {
            Self::RisingEdge => 0,
            Self::FallingEdge => 1,
        }
    }
}

/// Represents the period transition cycles for one dimension (horizontal or
/// vertical) of the video raster.
///
/// For horizontal parameters, the values are in pixel clocks. For vertical
/// parameters, the values are in lines.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimingDimension {
    pub total: u16,
    pub visible: u16,
    pub offset: u16,
    pub sync_start: u16,
    pub sync_end: u16,
}

impl TimingDimension {
    /// Calculates a `TimingDimension` from the sizes of the individual
    /// periods in the cycle.
    ///
    /// A `TimingDimension` captures the number of steps _into_ a period where
    /// each event occurs, but panel datasheets usually give the length of
    /// each period on its own, and so this function converts from the latter
    /// to the former.
    pub const fn calculate(active: u16, front_porch: u16, sync: u16, back_porch: u16) -> Self {
        Self {
            total: (active + front_porch + sync + back_porch) & DIMENSION_MASK,
            visible: (active) & DIMENSION_MASK,
            offset: (front_porch + sync + back_porch) & DIMENSION_MASK,
            sync_start: (front_porch) & DIMENSION_MASK,
            sync_end: (front_porch + sync) & DIMENSION_MASK,
        }
    }
}

/// Everything the chip needs to know to drive a particular panel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DisplayTimings {
    pub horiz: TimingDimension,
    pub vert: TimingDimension,
    /// Divisor from the system clock to the pixel clock. Writing this to
    /// `REG_PCLK` is what starts video output.
    pub pclk_div: u8,
    pub pclk_pol: ClockPolarity,
    pub swizzle: u8,
    pub cspread: bool,
}

impl DisplayTimings {
    /// 320x240 QVGA panels.
    pub const R320X240: Self = Self {
        horiz: TimingDimension {
            total: 408,
            visible: 320,
            offset: 70,
            sync_start: 0,
            sync_end: 10,
        },
        vert: TimingDimension {
            total: 262,
            visible: 240,
            offset: 18,
            sync_start: 0,
            sync_end: 2,
        },
        pclk_div: 8,
        pclk_pol: ClockPolarity::RisingEdge,
        swizzle: 2,
        cspread: true,
    };

    /// 480x272 panels, as used on most 4.3" modules.
    pub const R480X272: Self = Self {
        horiz: TimingDimension {
            total: 548,
            visible: 480,
            offset: 43,
            sync_start: 0,
            sync_end: 41,
        },
        vert: TimingDimension {
            total: 292,
            visible: 272,
            offset: 12,
            sync_start: 0,
            sync_end: 10,
        },
        pclk_div: 6,
        pclk_pol: ClockPolarity::FallingEdge,
        swizzle: 0,
        cspread: true,
    };

    /// 800x480 panels, as used on most 5" and 7" modules.
    pub const R800X480: Self = Self {
        horiz: TimingDimension {
            total: 928,
            visible: 800,
            offset: 88,
            sync_start: 0,
            sync_end: 48,
        },
        vert: TimingDimension {
            total: 525,
            visible: 480,
            offset: 32,
            sync_start: 0,
            sync_end: 3,
        },
        pclk_div: 2,
        pclk_pol: ClockPolarity::FallingEdge,
        swizzle: 0,
        cspread: false,
    };
}

/// Bounds for each of the places where the library busy-waits.
///
/// All of these count iterations rather than wall-clock time, so the real
/// duration depends on bus speed. The ones documented as being "1ms apart"
/// call the [`Delay`](crate::interface::Delay) between polls.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PollBudgets {
    /// Polls of `REG_ID` during boot, 1ms apart.
    pub identity: u16,
    /// Polls of `REG_CPURESET` during boot, 1ms apart.
    pub cpu_ready: u16,
    /// Reads of `REG_CMD_READ` while waiting for ring buffer space.
    pub fifo_space: u32,
    /// Reads of `REG_CMD_READ` while waiting for the coprocessor to drain.
    pub drain: u32,
    /// Checks of a bulk transfer's busy flag before giving up on the bus.
    pub bus_idle: u32,
    /// Polls of `REG_FLASH_STATUS` during flash bring-up, 1ms apart.
    pub flash_ready: u16,
}

impl PollBudgets {
    pub const DEFAULT: Self = Self {
        identity: 400,
        cpu_ready: 50,
        fifo_space: 100_000,
        drain: 100_000,
        bus_idle: 1_000_000,
        flash_ready: 100,
    };
}

impl Default for PollBudgets {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The full initialization configuration.
///
/// This behaves as a "builder" type: start from [`Config::new`](Config::new)
/// with the panel timings and then adjust with the `with_` methods.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub clock_source: ClockSource,
    /// When set, the system clock is switched to this frequency with
    /// `CLKSEL` and `REG_FREQUENCY` is programmed and verified. When unset,
    /// the chip's reset default is left alone.
    pub system_clock: Option<ClockFrequency>,
    pub display: DisplayTimings,
    /// PWM duty cycle for the backlight, from 0 to 128.
    pub backlight: u8,
    pub budgets: PollBudgets,
}

impl Config {
    pub const fn new(display: DisplayTimings) -> Self {
        Self {
            clock_source: ClockSource::Internal,
            system_clock: Some(ClockFrequency::F60MHz),
            display: display,
            backlight: 128,
            budgets: PollBudgets::DEFAULT,
        }
    }

    pub const fn with_clock_source(self, v: ClockSource) -> Self {
        Self {
            clock_source: v,
            ..self
        }
    }

    pub const fn with_system_clock(self, v: Option<ClockFrequency>) -> Self {
        Self {
            system_clock: v,
            ..self
        }
    }

    pub const fn with_backlight(self, v: u8) -> Self {
        Self {
            backlight: if v > 128 { 128 } else { v },
            ..self
        }
    }

    pub const fn with_budgets(self, v: PollBudgets) -> Self {
        Self { budgets: v, ..self }
    }
}

/// Returns `true` if and only if the given value is within the valid range
/// for the fields of `TimingDimension`. Out-of-range values are masked
/// when written, and so wrap around in the valid range.
pub const fn dimension_is_valid(v: u16) -> bool {
    (v & !DIMENSION_MASK) == 0
}

pub(crate) const DIMENSION_MASK: u16 = 0b0000111111111111;
