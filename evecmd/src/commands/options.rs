//! Various types used as arguments to coprocessor commands.

pub trait Options: Clone + Copy + PartialEq + Eq {
    fn new() -> Self;
}

pub fn defaults<T: Options>() -> T {
    T::new()
}

/// Where a widget's top left corner goes, in whole pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WidgetPos {
    pub x: i16,
    pub y: i16,
}

impl WidgetPos {
    #[inline]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x: x, y: y }
    }
}

impl From<(i16, i16)> for WidgetPos {
    fn from(coords: (i16, i16)) -> Self {
        Self::new(coords.0, coords.1)
    }
}

/// A widget's bounding box, in whole pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WidgetRect {
    pub x: i16,
    pub y: i16,
    pub w: i16,
    pub h: i16,
}

impl WidgetRect {
    #[inline]
    pub const fn new(x: i16, y: i16, w: i16, h: i16) -> Self {
        Self {
            x: x,
            y: y,
            w: w,
            h: h,
        }
    }

    #[inline]
    pub const fn top_left(self) -> WidgetPos {
        WidgetPos::new(self.x, self.y)
    }
}

impl From<(i16, i16, i16, i16)> for WidgetRect {
    fn from(coords: (i16, i16, i16, i16)) -> Self {
        Self::new(coords.0, coords.1, coords.2, coords.3)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Text(u32);

impl Options for Text {
    fn new() -> Self {
        Self(0)
    }
}

impl Text {
    pub const fn align(self, align: TextAlign) -> Self {
        Self((self.0 & !(OPT_CENTER | OPT_RIGHTX)) | align as u32)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// Options for buttons, keys and toggles, which share the flat/3D choice.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Widget(u32);

impl Options for Widget {
    fn new() -> Self {
        Self(0)
    }
}

impl Widget {
    pub const fn style(self, style: WidgetStyle) -> Self {
        Self((self.0 & !OPT_FLAT) | style as u32)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Number(u32);

impl Options for Number {
    fn new() -> Self {
        Self(0)
    }
}

impl Number {
    pub const fn signed(self) -> Self {
        Self(self.0 | OPT_SIGNED)
    }

    /// Pads with leading zeros to the given number of digits, at most 31.
    pub const fn digits(self, n: u8) -> Self {
        Self((self.0 & !0x1f) | (n as u32 & 0x1f))
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Gauge(u32);

impl Options for Gauge {
    fn new() -> Self {
        Self(0)
    }
}

impl Gauge {
    pub const fn style(self, style: WidgetStyle) -> Self {
        Self((self.0 & !OPT_FLAT) | style as u32)
    }

    pub const fn no_background(self) -> Self {
        Self(self.0 | OPT_NOBACK)
    }

    pub const fn no_ticks(self) -> Self {
        Self(self.0 | OPT_NOTICKS)
    }

    pub const fn no_pointer(self) -> Self {
        Self(self.0 | OPT_NOPOINTER)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoadImage(u32);

impl Options for LoadImage {
    fn new() -> Self {
        Self(0)
    }
}

impl LoadImage {
    pub const fn jpeg_color_mode(self, mode: JPEGColorMode) -> Self {
        Self((self.0 & (!0b1)) | mode as u32)
    }

    pub const fn no_display_list(self) -> Self {
        Self(self.0 | OPT_NODL)
    }

    pub const fn scale_to_screen(self) -> Self {
        Self(self.0 | OPT_FULLSCREEN)
    }

    /// Takes the image data from the media FIFO instead of the command
    /// stream.
    pub const fn from_media_fifo(self) -> Self {
        Self(self.0 | OPT_MEDIAFIFO)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// Rendering style (flat or 3D) for various widgets that can support these
/// two rendering styles.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum WidgetStyle {
    Flat = OPT_FLAT,
    ThreeD = 0,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum TextAlign {
    Left = 0,
    CenterX = OPT_CENTERX,
    CenterY = OPT_CENTERY,
    Center = OPT_CENTER,
    Right = OPT_RIGHTX,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum JPEGColorMode {
    RGB565 = 0,
    Monochrome = OPT_MONO,
}

/// A reference to a font previously registered in the coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontRef(u8);

impl FontRef {
    const MASK: u8 = 0b00011111;

    /// Takes the given value modulo 32 and uses it to construct a font
    /// reference.
    pub const fn new_raw(v: u8) -> Self {
        Self(v & Self::MASK)
    }

    /// Returns the raw representation of the font reference index. Although
    /// returned as a `u8`, the value is always less than 32.
    pub const fn to_raw(self) -> u8 {
        self.0
    }
}

/// Set by the text-drawing commands when their string carries formatting
/// arguments.
pub(crate) const OPT_FORMAT: u32 = 4096;

const OPT_MONO: u32 = 1;
const OPT_NODL: u32 = 2;
const OPT_SIGNED: u32 = 256;
const OPT_FLAT: u32 = 256;
const OPT_CENTERX: u32 = 512;
const OPT_CENTERY: u32 = 1024;
const OPT_CENTER: u32 = OPT_CENTERX | OPT_CENTERY;
const OPT_RIGHTX: u32 = 2048;
const OPT_NOBACK: u32 = 4096;
const OPT_NOTICKS: u32 = 8192;
const OPT_NOPOINTER: u32 = 16384;
const OPT_FULLSCREEN: u32 = 8;
const OPT_MEDIAFIFO: u32 = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image() {
        assert_eq!(LoadImage::new().to_raw(), 0);
        assert_eq!(
            LoadImage::new()
                .jpeg_color_mode(JPEGColorMode::Monochrome)
                .to_raw(),
            OPT_MONO
        );
        assert_eq!(
            LoadImage::new().no_display_list().scale_to_screen().to_raw(),
            0b1010
        );
    }

    #[test]
    fn test_widget_style_replaces() {
        let flat = Widget::new().style(WidgetStyle::Flat);
        assert_eq!(flat.to_raw(), 256);
        assert_eq!(flat.style(WidgetStyle::ThreeD).to_raw(), 0);
    }

    #[test]
    fn test_text_align() {
        let opts = Text::new().align(TextAlign::Center);
        assert_eq!(opts.to_raw(), 0x600);
        assert_eq!(opts.align(TextAlign::Right).to_raw(), 0x800);
    }

    #[test]
    fn test_number_digits() {
        assert_eq!(Number::new().digits(40).signed().to_raw(), 0x108);
    }

    #[test]
    fn test_font_ref_wraps() {
        assert_eq!(FontRef::new_raw(34).to_raw(), 2);
    }
}
