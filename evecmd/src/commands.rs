//! Encoders for individual coprocessor commands.
//!
//! Each method here is a thin wrapper that packs its arguments into words
//! and hands them to [`CommandFifo`](crate::fifo::CommandFifo) as a single
//! reservation. Commands that exist only on later chip generations check the
//! generation detected during initialization and return
//! [`Error::Unsupported`](crate::error::Error::Unsupported) otherwise.
//!
//! Commands that produce a result (`memcrc`, `regread`, `getptr`,
//! `getprops`, `flashfast`) have to wait for the coprocessor to execute them
//! and then read the result back out of the ring, so they can't be used
//! inside a burst.

use crate::bulk::BulkTransfer;
use crate::display_list::DLCmd;
use crate::fifo::{Arg, CommandFifo, Result, Waiter};
use crate::interface::Transport;
use crate::models::Generation;
use crate::strfmt::Message;
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub mod options;

use options::{FontRef, Gauge, LoadImage, Number, Text, Widget, WidgetPos, WidgetRect, OPT_FORMAT};

/// The coprocessor command opcodes this crate knows how to encode.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    DLSTART = 0xffffff00,
    SWAP = 0xffffff01,
    INTERRUPT = 0xffffff02,
    BGCOLOR = 0xffffff09,
    FGCOLOR = 0xffffff0a,
    TEXT = 0xffffff0c,
    BUTTON = 0xffffff0d,
    KEYS = 0xffffff0e,
    PROGRESS = 0xffffff0f,
    SLIDER = 0xffffff10,
    SCROLLBAR = 0xffffff11,
    TOGGLE = 0xffffff12,
    GAUGE = 0xffffff13,
    SPINNER = 0xffffff16,
    STOP = 0xffffff17,
    MEMCRC = 0xffffff18,
    REGREAD = 0xffffff19,
    MEMWRITE = 0xffffff1a,
    MEMSET = 0xffffff1b,
    MEMZERO = 0xffffff1c,
    MEMCPY = 0xffffff1d,
    APPEND = 0xffffff1e,
    INFLATE = 0xffffff22,
    GETPTR = 0xffffff23,
    LOADIMAGE = 0xffffff24,
    GETPROPS = 0xffffff25,
    DIAL = 0xffffff2d,
    NUMBER = 0xffffff2e,
    LOGO = 0xffffff31,
    COLDSTART = 0xffffff32,
    GRADCOLOR = 0xffffff34,
    SETROTATE = 0xffffff36,
    MEDIAFIFO = 0xffffff39,
    FLASHERASE = 0xffffff44,
    FLASHWRITE = 0xffffff45,
    FLASHREAD = 0xffffff46,
    FLASHUPDATE = 0xffffff47,
    FLASHDETACH = 0xffffff48,
    FLASHATTACH = 0xffffff49,
    FLASHFAST = 0xffffff4a,
    TESTCARD = 0xffffff61,
    APILEVEL = 0xffffff63,
    WAIT = 0xffffff65,
}

impl Opcode {
    /// The oldest chip generation whose coprocessor understands this
    /// command.
    pub const fn min_generation(self) -> Generation {
        match self {
            Opcode::FLASHERASE
            | Opcode::FLASHWRITE
            | Opcode::FLASHREAD
            | Opcode::FLASHUPDATE
            | Opcode::FLASHDETACH
            | Opcode::FLASHATTACH
            | Opcode::FLASHFAST => Generation::Eve3,
            Opcode::TESTCARD | Opcode::APILEVEL | Opcode::WAIT => Generation::Eve4,
            _ => Generation::Eve2,
        }
    }
}

/// Display list and system commands.
impl<T, B, W> CommandFifo<T, B, W>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    /// Starts a new display list at the beginning of `RAM_DL`.
    pub fn dlstart(&mut self) -> Result<(), T> {
        self.command(Opcode::DLSTART, &[])
    }

    /// Swaps the display list the coprocessor has built with the one being
    /// shown, at the next frame boundary.
    pub fn swap(&mut self) -> Result<(), T> {
        self.command(Opcode::SWAP, &[])
    }

    /// Returns the coprocessor's graphics state to its defaults.
    pub fn coldstart(&mut self) -> Result<(), T> {
        self.command(Opcode::COLDSTART, &[])
    }

    /// Raises the coprocessor interrupt after `ms` milliseconds.
    pub fn interrupt(&mut self, ms: u32) -> Result<(), T> {
        self.command(Opcode::INTERRUPT, &[Arg::Word(ms)])
    }

    /// Appends `num` bytes of display list commands stored at `ptr` in
    /// `RAM_G`. This is `CMD_APPEND`, not to be confused with
    /// [`append`](Self::append).
    pub fn append_from(&mut self, ptr: u32, num: u32) -> Result<(), T> {
        self.command(Opcode::APPEND, &[Arg::Word(ptr), Arg::Word(num)])
    }

    /// Passes a display list command through to the display list the
    /// coprocessor is building.
    pub fn dl(&mut self, cmd: DLCmd) -> Result<(), T> {
        self.append(&[cmd.as_raw()])
    }

    pub fn setrotate(&mut self, rotation: u32) -> Result<(), T> {
        self.command(Opcode::SETROTATE, &[Arg::Word(rotation)])
    }

    pub fn logo(&mut self) -> Result<(), T> {
        self.command(Opcode::LOGO, &[])
    }

    /// Stops any spinner or other animating widget.
    pub fn stop(&mut self) -> Result<(), T> {
        self.command(Opcode::STOP, &[])
    }

    /// Sets the color used for widget foregrounds, as `0xRRGGBB`.
    pub fn fgcolor(&mut self, rgb: u32) -> Result<(), T> {
        self.command(Opcode::FGCOLOR, &[Arg::Word(rgb & 0xffffff)])
    }

    pub fn bgcolor(&mut self, rgb: u32) -> Result<(), T> {
        self.command(Opcode::BGCOLOR, &[Arg::Word(rgb & 0xffffff)])
    }

    pub fn gradcolor(&mut self, rgb: u32) -> Result<(), T> {
        self.command(Opcode::GRADCOLOR, &[Arg::Word(rgb & 0xffffff)])
    }

    /// Waits for the given number of microseconds before the coprocessor
    /// continues. BT817 and later.
    pub fn wait(&mut self, us: u32) -> Result<(), T> {
        self.command(Opcode::WAIT, &[Arg::Word(us)])
    }

    /// Draws the built-in test card. BT817 and later.
    pub fn testcard(&mut self) -> Result<(), T> {
        self.command(Opcode::TESTCARD, &[])
    }

    /// Selects the coprocessor API level. BT817 and later.
    pub fn apilevel(&mut self, level: u32) -> Result<(), T> {
        self.command(Opcode::APILEVEL, &[Arg::Word(level)])
    }

    // Issues `op` after checking that the detected chip understands it.
    fn command(&mut self, op: Opcode, args: &[Arg<'_>]) -> Result<(), T> {
        let min = op.min_generation();
        if min > Generation::Eve2 {
            self.require(min)?;
        }
        self.append_command(op.into(), args)
    }

    // Issues a command whose trailing arguments are result slots and waits
    // for the coprocessor to fill them in.
    fn command_with_results(&mut self, op: Opcode, args: &[Arg<'_>]) -> Result<(), T> {
        self.require_immediate()?;
        self.command(op, args)?;
        self.wait_idle()
    }
}

/// Widgets.
impl<T, B, W> CommandFifo<T, B, W>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    pub fn text(
        &mut self,
        pos: WidgetPos,
        font: FontRef,
        options: Text,
        msg: Message<'_, '_>,
    ) -> Result<(), T> {
        self.command(
            Opcode::TEXT,
            &[
                Arg::word((pos.x, pos.y)),
                Arg::word((font.to_raw() as u16, with_format(options.to_raw(), &msg))),
                Arg::Text(msg.text()),
                Arg::Format(msg.arguments()),
            ],
        )
    }

    pub fn button(
        &mut self,
        rect: WidgetRect,
        font: FontRef,
        options: Widget,
        msg: Message<'_, '_>,
    ) -> Result<(), T> {
        self.command(
            Opcode::BUTTON,
            &[
                Arg::word((rect.x, rect.y)),
                Arg::word((rect.w, rect.h)),
                Arg::word((font.to_raw() as u16, with_format(options.to_raw(), &msg))),
                Arg::Text(msg.text()),
                Arg::Format(msg.arguments()),
            ],
        )
    }

    /// Draws a row of keys, one for each character of `keys`. The byte
    /// value of a key in the low bits of `options` draws it pressed.
    pub fn keys(
        &mut self,
        rect: WidgetRect,
        font: FontRef,
        options: Widget,
        keys: &[u8],
    ) -> Result<(), T> {
        self.command(
            Opcode::KEYS,
            &[
                Arg::word((rect.x, rect.y)),
                Arg::word((rect.w, rect.h)),
                Arg::word((font.to_raw() as u16, options.to_raw() as u16)),
                Arg::Text(keys),
            ],
        )
    }

    /// Draws a toggle switch. `labels` holds the off and on labels separated
    /// by a `0xff` byte.
    pub fn toggle(
        &mut self,
        pos: WidgetPos,
        width: i16,
        font: FontRef,
        options: Widget,
        on: bool,
        labels: Message<'_, '_>,
    ) -> Result<(), T> {
        let state: u16 = if on { 0xffff } else { 0 };
        self.command(
            Opcode::TOGGLE,
            &[
                Arg::word((pos.x, pos.y)),
                Arg::word((width as u16, font.to_raw() as u16)),
                Arg::word((with_format(options.to_raw(), &labels), state)),
                Arg::Text(labels.text()),
                Arg::Format(labels.arguments()),
            ],
        )
    }

    pub fn number(
        &mut self,
        pos: WidgetPos,
        font: FontRef,
        options: Number,
        n: i32,
    ) -> Result<(), T> {
        self.command(
            Opcode::NUMBER,
            &[
                Arg::word((pos.x, pos.y)),
                Arg::word((font.to_raw() as u16, options.to_raw() as u16)),
                Arg::word(n),
            ],
        )
    }

    pub fn spinner(&mut self, pos: WidgetPos, style: u16, scale: u16) -> Result<(), T> {
        self.command(
            Opcode::SPINNER,
            &[Arg::word((pos.x, pos.y)), Arg::word((style, scale))],
        )
    }

    pub fn progress(
        &mut self,
        rect: WidgetRect,
        options: Widget,
        val: u16,
        range: u16,
    ) -> Result<(), T> {
        self.command(
            Opcode::PROGRESS,
            &[
                Arg::word((rect.x, rect.y)),
                Arg::word((rect.w, rect.h)),
                Arg::word((options.to_raw() as u16, val)),
                Arg::word((range, 0u16)),
            ],
        )
    }

    pub fn slider(
        &mut self,
        rect: WidgetRect,
        options: Widget,
        val: u16,
        range: u16,
    ) -> Result<(), T> {
        self.command(
            Opcode::SLIDER,
            &[
                Arg::word((rect.x, rect.y)),
                Arg::word((rect.w, rect.h)),
                Arg::word((options.to_raw() as u16, val)),
                Arg::word((range, 0u16)),
            ],
        )
    }

    pub fn scrollbar(
        &mut self,
        rect: WidgetRect,
        options: Widget,
        val: u16,
        size: u16,
        range: u16,
    ) -> Result<(), T> {
        self.command(
            Opcode::SCROLLBAR,
            &[
                Arg::word((rect.x, rect.y)),
                Arg::word((rect.w, rect.h)),
                Arg::word((options.to_raw() as u16, val)),
                Arg::word((size, range)),
            ],
        )
    }

    pub fn gauge(
        &mut self,
        center: WidgetPos,
        radius: i16,
        options: Gauge,
        major: u16,
        minor: u16,
        val: u16,
        range: u16,
    ) -> Result<(), T> {
        self.command(
            Opcode::GAUGE,
            &[
                Arg::word((center.x, center.y)),
                Arg::word((radius as u16, options.to_raw() as u16)),
                Arg::word((major, minor)),
                Arg::word((val, range)),
            ],
        )
    }

    /// Draws a rotary dial. `val` is an angle where 0x10000 is a full turn.
    pub fn dial(
        &mut self,
        center: WidgetPos,
        radius: i16,
        options: Widget,
        val: u16,
    ) -> Result<(), T> {
        self.command(
            Opcode::DIAL,
            &[
                Arg::word((center.x, center.y)),
                Arg::word((radius as u16, options.to_raw() as u16)),
                Arg::Word(val as u32),
            ],
        )
    }
}

/// Memory commands.
impl<T, B, W> CommandFifo<T, B, W>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    pub fn memset(&mut self, ptr: u32, value: u8, num: u32) -> Result<(), T> {
        self.command(
            Opcode::MEMSET,
            &[Arg::Word(ptr), Arg::Word(value as u32), Arg::Word(num)],
        )
    }

    pub fn memzero(&mut self, ptr: u32, num: u32) -> Result<(), T> {
        self.command(Opcode::MEMZERO, &[Arg::Word(ptr), Arg::Word(num)])
    }

    pub fn memcpy(&mut self, dest: u32, src: u32, num: u32) -> Result<(), T> {
        self.command(
            Opcode::MEMCPY,
            &[Arg::Word(dest), Arg::Word(src), Arg::Word(num)],
        )
    }

    /// Has the coprocessor copy `data` into `RAM_G` at `ptr`.
    pub fn memwrite(&mut self, ptr: u32, data: &[u8]) -> Result<(), T> {
        self.command(
            Opcode::MEMWRITE,
            &[Arg::Word(ptr), Arg::Word(data.len() as u32)],
        )?;
        self.append_data(data)
    }

    /// Decompresses zlib-compressed `data` into `RAM_G` at `ptr`.
    pub fn inflate(&mut self, ptr: u32, data: &[u8]) -> Result<(), T> {
        self.command(Opcode::INFLATE, &[Arg::Word(ptr)])?;
        self.append_data(data)
    }

    /// Decodes a JPEG or PNG image into `RAM_G` at `ptr`. With
    /// [`from_media_fifo`](LoadImage::from_media_fifo), `data` should be
    /// empty and the image comes from the media FIFO instead.
    pub fn loadimage(&mut self, ptr: u32, options: LoadImage, data: &[u8]) -> Result<(), T> {
        self.command(
            Opcode::LOADIMAGE,
            &[Arg::Word(ptr), Arg::Word(options.to_raw())],
        )?;
        self.append_data(data)
    }

    /// Sets up a media FIFO of `size` bytes at `ptr` in `RAM_G`.
    pub fn mediafifo(&mut self, ptr: u32, size: u32) -> Result<(), T> {
        self.command(Opcode::MEDIAFIFO, &[Arg::Word(ptr), Arg::Word(size)])
    }

    /// Returns the CRC-32 of `num` bytes of memory starting at `ptr`.
    pub fn memcrc(&mut self, ptr: u32, num: u32) -> Result<u32, T> {
        self.command_with_results(
            Opcode::MEMCRC,
            &[Arg::Word(ptr), Arg::Word(num), Arg::Word(0)],
        )?;
        self.read_result(1)
    }

    /// Reads a register by way of the coprocessor, so that the read is
    /// ordered with the commands before it.
    pub fn regread(&mut self, ptr: u32) -> Result<u32, T> {
        self.command_with_results(Opcode::REGREAD, &[Arg::Word(ptr), Arg::Word(0)])?;
        self.read_result(1)
    }

    /// Returns the first free address in `RAM_G` after the most recent
    /// `inflate` or `loadimage`.
    pub fn getptr(&mut self) -> Result<u32, T> {
        self.command_with_results(Opcode::GETPTR, &[Arg::Word(0)])?;
        self.read_result(1)
    }

    /// Returns the address, width and height of the most recently loaded
    /// image.
    pub fn getprops(&mut self) -> Result<(u32, u32, u32), T> {
        self.command_with_results(
            Opcode::GETPROPS,
            &[Arg::Word(0), Arg::Word(0), Arg::Word(0)],
        )?;
        let ptr = self.read_result(3)?;
        let width = self.read_result(2)?;
        let height = self.read_result(1)?;
        Ok((ptr, width, height))
    }
}

/// Flash commands, all of which need a BT815 or later.
impl<T, B, W> CommandFifo<T, B, W>
where
    T: Transport,
    B: BulkTransfer<T>,
    W: Waiter<T>,
{
    pub fn flashattach(&mut self) -> Result<(), T> {
        self.command(Opcode::FLASHATTACH, &[])
    }

    pub fn flashdetach(&mut self) -> Result<(), T> {
        self.command(Opcode::FLASHDETACH, &[])
    }

    pub fn flasherase(&mut self) -> Result<(), T> {
        self.command(Opcode::FLASHERASE, &[])
    }

    /// Switches the flash to full-speed QSPI mode and returns the
    /// coprocessor's result code, where zero means success.
    pub fn flashfast(&mut self) -> Result<u32, T> {
        self.command_with_results(Opcode::FLASHFAST, &[Arg::Word(0)])?;
        self.read_result(1)
    }

    /// Copies `num` bytes from flash at `src` to `RAM_G` at `dest`.
    pub fn flashread(&mut self, dest: u32, src: u32, num: u32) -> Result<(), T> {
        self.command(
            Opcode::FLASHREAD,
            &[Arg::Word(dest), Arg::Word(src), Arg::Word(num)],
        )
    }

    /// Writes `num` bytes from `RAM_G` at `src` to flash at `dest`, erasing
    /// only the sectors that differ.
    pub fn flashupdate(&mut self, dest: u32, src: u32, num: u32) -> Result<(), T> {
        self.command(
            Opcode::FLASHUPDATE,
            &[Arg::Word(dest), Arg::Word(src), Arg::Word(num)],
        )
    }

    /// Writes `data` into already-erased flash at `ptr`.
    pub fn flashwrite(&mut self, ptr: u32, data: &[u8]) -> Result<(), T> {
        self.command(
            Opcode::FLASHWRITE,
            &[Arg::Word(ptr), Arg::Word(data.len() as u32)],
        )?;
        self.append_data(data)
    }
}

fn with_format(given: u32, msg: &Message<'_, '_>) -> u16 {
    let opts = if msg.needs_format() {
        given | OPT_FORMAT
    } else {
        given
    };
    opts as u16
}
