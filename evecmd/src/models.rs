//! Identification of the specific EVE chip on the other end of the bus.
//!
//! Most of this crate's behavior is the same across the whole family, but
//! some registers and commands exist only on later generations. Rather than
//! encoding those differences in the type system, the chip is detected at
//! initialization time and later operations check its
//! [`Generation`](Generation) dynamically, returning
//! [`Error::Unsupported`](crate::error::Error::Unsupported) when a feature
//! isn't available.

/// A chip generation, ordered from oldest to newest so that callers can
/// compare with `>=`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Generation {
    /// FT810, FT811, FT812, FT813.
    Eve2,
    /// BT815, BT816. Adds QSPI flash and coprocessor fault reports.
    Eve3,
    /// BT817, BT818. Adds API levels and a few new commands.
    Eve4,
}

/// A specific supported chip model.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ChipModel {
    FT810,
    FT811,
    FT812,
    FT813,
    BT815,
    BT816,
    BT817,
    BT818,
}

impl ChipModel {
    /// Interprets the four identification bytes found at
    /// [`ROM_CHIPID`](crate::memory::ROM_CHIPID), returning `None` if they
    /// don't describe a supported model.
    ///
    /// The bytes are laid out as `[0x08, model, 0x01, 0x00]`.
    pub fn from_chip_id(raw: [u8; 4]) -> Option<Self> {
        if raw[0] != 0x08 || raw[2] != 0x01 || raw[3] != 0x00 {
            return None;
        }
        Some(match raw[1] {
            0x10 => ChipModel::FT810,
            0x11 => ChipModel::FT811,
            0x12 => ChipModel::FT812,
            0x13 => ChipModel::FT813,
            0x15 => ChipModel::BT815,
            0x16 => ChipModel::BT816,
            0x17 => ChipModel::BT817,
            0x18 => ChipModel::BT818,
            _ => return None,
        })
    }

    pub const fn generation(self) -> Generation {
        match self {
            ChipModel::FT810 | ChipModel::FT811 | ChipModel::FT812 | ChipModel::FT813 => {
                Generation::Eve2
            }
            ChipModel::BT815 | ChipModel::BT816 => Generation::Eve3,
            ChipModel::BT817 | ChipModel::BT818 => Generation::Eve4,
        }
    }
}
