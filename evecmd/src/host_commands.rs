use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Represents a host command, which is sent directly over the bus rather than
/// written into the memory map.
///
/// Each host command is framed as three bytes: the command itself, one
/// parameter byte and a zero byte. The two high-order bits of the command
/// byte are always `0b01`, except for `ACTIVE` which is all zeros and is
/// therefore distinguished from a memory read only by its length.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum HostCmd {
    ACTIVE = 0x00,
    STANDBY = 0x41,
    SLEEP = 0x42,
    PWRDOWN = 0x43,
    CLKEXT = 0x44,
    CLKINT = 0x48,
    CLKSEL = 0x61,
    RST_PULSE = 0x68,
    PINDRIVE = 0x70,
    PIN_PD_STATE = 0x71,
}

impl HostCmd {
    /// Returns the three bytes to send for this command with the given
    /// parameter.
    pub const fn message(self, param: u8) -> [u8; 3] {
        [self as u8, param, 0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message() {
        assert_eq!(HostCmd::CLKSEL.message(0x46), [0x61, 0x46, 0x00]);
        assert_eq!(HostCmd::ACTIVE.message(0), [0, 0, 0]);
    }
}
