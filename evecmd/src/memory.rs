//! Addresses in the EVE memory space, and the fixed regions of its memory map.

use core::convert::TryFrom;

/// `Address` represents a memory address in the memory map of an
/// EVE controller chip.
///
/// An `Address` value is guaranteed to always be in the valid address
/// range for EVE controllers, which is a 22-bit address space and thus
/// the remaining high-order bits will always be zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Address(u32);

impl Address {
    // Mask representing the bits of a u32 that contribute to an Address.
    pub const MASK: u32 = 0x003fffff;

    /// Check whether the given raw address is within the expected
    /// range for a memory address, returning `true` only if so.
    pub const fn is_valid(raw: u32) -> bool {
        (raw >> 22) == 0
    }

    /// Turns the given raw address value into a valid `Address` by masking
    /// out the bits that must always be zero for a valid address.
    ///
    /// This is intended primarily for initializing constants representing
    /// well-known addresses in the memory map. If you're working with a
    /// dynamically-derived address value then better to use the
    /// `TryFrom<u32>` implementation to get an error if the value is out of
    /// range.
    pub const fn force_raw(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Returns the address `offset` bytes after this one, wrapping within
    /// the 22-bit address space.
    pub const fn offset(self, offset: u32) -> Self {
        Self::force_raw(self.0.wrapping_add(offset))
    }

    /// Builds the three bytes that begin a "write memory" transaction for
    /// this address. The two high-order bits of the first byte are `0b10`.
    pub const fn write_header(self) -> [u8; 3] {
        [
            ((self.0 >> 16) as u8 & 0b00111111) | 0b10000000,
            (self.0 >> 8) as u8,
            self.0 as u8,
        ]
    }

    /// Builds the four bytes that begin a "read memory" transaction for this
    /// address: the three address bytes, with `0b00` in the two high-order
    /// bits, followed by the dummy byte the datasheet requires before the
    /// chip begins returning data.
    pub const fn read_header(self) -> [u8; 4] {
        [
            (self.0 >> 16) as u8 & 0b00111111,
            (self.0 >> 8) as u8,
            self.0 as u8,
            0,
        ]
    }
}

/// `Address` can be converted from a `u32` as long as the value is
/// within the 22-bit address space.
impl TryFrom<u32> for Address {
    type Error = ();

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        if Self::is_valid(raw) {
            Ok(Self(raw))
        } else {
            Err(())
        }
    }
}

/// Arithmetic with `Address` is 22-bit modular arithmetic, thus ensuring
/// that the result is still always in the expected address range.
impl core::ops::Add<u32> for Address {
    type Output = Self;

    fn add(self, offset: u32) -> Self {
        self.offset(offset)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.0
    }
}

/// General purpose graphics memory.
pub const RAM_G: Address = Address::force_raw(0x000000);
pub const RAM_G_LEN: u32 = 1024 << 10;

/// The read-only chip identification bytes.
pub const ROM_CHIPID: Address = Address::force_raw(0x0c0000);

pub const RAM_DL: Address = Address::force_raw(0x300000);
pub const RAM_DL_LEN: u32 = 8 << 10;

pub const RAM_REG: Address = Address::force_raw(0x302000);
pub const RAM_REG_LEN: u32 = 4 << 10;

/// The coprocessor command ring buffer.
pub const RAM_CMD: Address = Address::force_raw(0x308000);
pub const RAM_CMD_LEN: u32 = 4 << 10;

/// Where the coprocessor writes a textual description of its most recent
/// fault. Only present on BT815 and later.
pub const RAM_ERR_REPORT: Address = Address::force_raw(0x309800);
pub const RAM_ERR_REPORT_LEN: usize = 128;
