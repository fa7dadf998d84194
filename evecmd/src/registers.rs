use crate::memory::{Address, RAM_REG};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Represents a register within the RAM_REG region on an EVE device.
///
/// The values are offsets from the start of the register region. Registers
/// that exist only on later generations are noted in their documentation;
/// callers must check the detected [`Generation`](crate::models::Generation)
/// before touching them.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum Register {
    ID = 0x00,
    FRAMES = 0x04,
    CLOCK = 0x08,
    FREQUENCY = 0x0c,
    CPURESET = 0x20,
    HCYCLE = 0x2c,
    HOFFSET = 0x30,
    HSIZE = 0x34,
    HSYNC0 = 0x38,
    HSYNC1 = 0x3c,
    VCYCLE = 0x40,
    VOFFSET = 0x44,
    VSIZE = 0x48,
    VSYNC0 = 0x4c,
    VSYNC1 = 0x50,
    DLSWAP = 0x54,
    ROTATE = 0x58,
    OUTBITS = 0x5c,
    DITHER = 0x60,
    SWIZZLE = 0x64,
    CSPREAD = 0x68,
    PCLK_POL = 0x6c,
    PCLK = 0x70,
    GPIO_DIR = 0x90,
    GPIO = 0x94,
    GPIOX_DIR = 0x98,
    GPIOX = 0x9c,
    INT_FLAGS = 0xa8,
    INT_EN = 0xac,
    INT_MASK = 0xb0,
    PWM_HZ = 0xd0,
    PWM_DUTY = 0xd4,
    CMD_READ = 0xf8,
    CMD_WRITE = 0xfc,
    CMD_DL = 0x100,
    CMDB_SPACE = 0x574,
    /// The coprocessor FIFO data port. Every byte written here is appended
    /// to the command ring and advances `CMD_WRITE`.
    CMDB_WRITE = 0x578,
    ADAPTIVE_FRAMERATE = 0x57c,
    /// BT815 and later.
    FLASH_STATUS = 0x5f0,
    /// BT815 and later.
    FLASH_SIZE = 0x7024,
    /// BT815 and later. This one is only 16 bits wide.
    COPRO_PATCH_PTR = 0x7162,
}

impl Register {
    pub const fn address(self) -> Address {
        RAM_REG.offset(self as u32)
    }
}

impl core::convert::From<Register> for Address {
    fn from(reg: Register) -> Self {
        reg.address()
    }
}

/// Value for [`Register::DLSWAP`] requesting a swap at the next frame
/// boundary.
pub const DLSWAP_FRAME: u8 = 2;

/// The bit in [`Register::GPIO`] that drives the panel's DISP signal.
pub const GPIO_DISP: u8 = 0x80;
