//! Representations of display list commands.
//!
//! Only the handful needed to build a minimal screen are here: the initial
//! blank display list written during boot, and the simple shapes the test
//! bed draws. Each one is a single word that can be written straight to
//! `RAM_DL` or passed through the coprocessor with
//! [`CommandFifo::dl`](crate::fifo::CommandFifo::dl).

use core::fmt::Debug;

/// Represents an EVE display list command.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DLCmd(u32);

impl DLCmd {
    // The length of a display list command as stored in the EVE device's
    // display list RAM.
    pub const LENGTH: u32 = 4;

    pub const DISPLAY: Self = OpCode::DISPLAY.build(0);
    pub const END: Self = OpCode::END.build(0);
    pub const CLEAR_ALL: Self = Self::clear(true, true, true);

    /// Creates a command from the raw command word given as a `u32`. It's
    /// the caller's responsibility to ensure that it's a valid encoding of
    /// a real display list command.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    pub const fn begin(prim: Primitive) -> Self {
        OpCode::BEGIN.build(prim as u32)
    }

    pub const fn clear(color: bool, stencil: bool, tag: bool) -> Self {
        OpCode::CLEAR.build(
            if color { 0b100 } else { 0b000 }
                | if stencil { 0b010 } else { 0b000 }
                | if tag { 0b001 } else { 0b000 },
        )
    }

    pub const fn clear_color_rgb(r: u8, g: u8, b: u8) -> Self {
        OpCode::CLEAR_COLOR_RGB.build(rgb(r, g, b))
    }

    pub const fn color_rgb(r: u8, g: u8, b: u8) -> Self {
        OpCode::COLOR_RGB.build(rgb(r, g, b))
    }

    /// Line width in sixteenths of a pixel.
    pub const fn line_width(width: u16) -> Self {
        OpCode::LINE_WIDTH.build(width as u32 & 0xfff)
    }

    /// Point radius in sixteenths of a pixel.
    pub const fn point_size(size: u16) -> Self {
        OpCode::POINT_SIZE.build(size as u32 & 0x1fff)
    }

    pub const fn tag(v: u8) -> Self {
        OpCode::TAG.build(v as u32)
    }

    /// A vertex in sixteenths of a pixel, by default.
    pub const fn vertex2f(x: i16, y: i16) -> Self {
        OpCode::VERTEX2F.build((x as u32 & 0x7fff) << 15 | (y as u32 & 0x7fff))
    }

    /// A vertex in whole pixels, with a bitmap handle and cell for bitmaps.
    pub const fn vertex2ii(x: u16, y: u16, handle: u8, cell: u8) -> Self {
        OpCode::VERTEX2II.build(
            (x as u32 & 0x1ff) << 21
                | (y as u32 & 0x1ff) << 12
                | (handle as u32 & 0x1f) << 7
                | (cell as u32 & 0x7f),
        )
    }
}

impl Debug for DLCmd {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DLCmd({:#010x})", self.0)
    }
}

impl From<DLCmd> for u32 {
    fn from(cmd: DLCmd) -> u32 {
        cmd.0
    }
}

/// The kinds of graphics primitive that [`DLCmd::begin`](DLCmd::begin) can
/// start.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum Primitive {
    Bitmaps = 1,
    Points = 2,
    Lines = 3,
    LineStrip = 4,
    Rects = 9,
}

const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | (b as u32)
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(non_camel_case_types)]
enum OpCode {
    BEGIN = 0x1f,
    CLEAR = 0x26,
    CLEAR_COLOR_RGB = 0x02,
    COLOR_RGB = 0x04,
    DISPLAY = 0x00,
    END = 0x21,
    LINE_WIDTH = 0x0e,
    POINT_SIZE = 0x0d,
    TAG = 0x03,
    VERTEX2F = 0b01000000,  // This opcode is packed into the two MSB
    VERTEX2II = 0b10000000, // This opcode is packed into the two MSB
}

impl OpCode {
    const fn shift(self) -> u32 {
        (self as u32) << 24
    }

    const fn build(self, v: u32) -> DLCmd {
        DLCmd::from_raw(self.shift() | v)
    }
}
