//! Typed arguments for coprocessor commands.
//!
//! Every coprocessor command is a sequence of 32-bit little-endian words.
//! Commands with a variable number of arguments are described as a slice of
//! [`Arg`](Arg) values, which the FIFO engine measures and then writes as one
//! unit so that a command is never split by a failed reservation.

use crate::strfmt;
use log::warn;

/// The longest string, not counting its terminator, that the coprocessor
/// will accept in a single text argument. Longer strings are truncated.
pub const MAX_TEXT_LEN: usize = 249;

/// A single 32-bit word in the command stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CommandWord(u32);

impl CommandWord {
    pub const fn to_raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for CommandWord {
    #[inline]
    fn from(v: u32) -> Self {
        CommandWord(v)
    }
}

impl From<i32> for CommandWord {
    #[inline]
    fn from(v: i32) -> Self {
        CommandWord(v as u32)
    }
}

impl From<(u16, u16)> for CommandWord {
    #[inline]
    fn from(v: (u16, u16)) -> Self {
        CommandWord((v.0 as u32) | (v.1 as u32) << 16)
    }
}

impl From<(i16, i16)> for CommandWord {
    #[inline]
    fn from(v: (i16, i16)) -> Self {
        let a = v.0 as u16;
        let b = v.1 as u16;
        CommandWord((a as u32) | (b as u32) << 16)
    }
}

impl From<(u8, u8, u8, u8)> for CommandWord {
    #[inline]
    fn from(v: (u8, u8, u8, u8)) -> Self {
        CommandWord((v.0 as u32) | (v.1 as u32) << 8 | (v.2 as u32) << 16 | (v.3 as u32) << 24)
    }
}

/// One argument in a command's argument list.
#[derive(Clone, Copy, Debug)]
pub enum Arg<'a> {
    /// A single word, already packed.
    Word(u32),

    /// A string for the coprocessor to render. It ends at its first NUL byte
    /// or after [`MAX_TEXT_LEN`](MAX_TEXT_LEN) bytes, whichever comes first,
    /// and is written with a NUL terminator and zero padding to a word
    /// boundary.
    Text(&'a [u8]),

    /// Raw bytes, written verbatim with zero padding to a word boundary.
    Bytes(&'a [u8]),

    /// The arguments of a formatted [`Message`](strfmt::Message), one word
    /// each.
    Format(&'a [strfmt::Argument]),
}

impl<'a> Arg<'a> {
    /// Packs anything that converts to a command word, such as a pair of
    /// 16-bit coordinates.
    pub fn word<V: Into<CommandWord>>(v: V) -> Self {
        Arg::Word(v.into().to_raw())
    }

    /// The number of bytes this argument occupies in the command stream.
    pub fn encoded_len(&self) -> usize {
        match *self {
            Arg::Word(_) => 4,
            Arg::Text(s) => padded_len(text_len(s) + 1),
            Arg::Bytes(b) => padded_len(b.len()),
            Arg::Format(args) => args.len() * 4,
        }
    }

    /// Calls `emit` once for each word of the encoded argument.
    pub(crate) fn for_each_word<E, F>(&self, mut emit: F) -> Result<(), E>
    where
        F: FnMut(u32) -> Result<(), E>,
    {
        match *self {
            Arg::Word(v) => emit(v),
            Arg::Text(s) => {
                let len = text_len(s);
                if len < s.len() && s[len] != 0 {
                    warn!("truncating {} byte string to {}", s.len(), MAX_TEXT_LEN);
                }
                let s = &s[..len];
                // The terminator is implied by the padding when the string
                // fills its last word exactly, so that case needs an extra
                // zero word.
                for word in command_words_for_bytes(s) {
                    emit(word.to_raw())?;
                }
                if s.len() % 4 == 0 {
                    emit(0)?;
                }
                Ok(())
            }
            Arg::Bytes(b) => {
                for word in command_words_for_bytes(b) {
                    emit(word.to_raw())?;
                }
                Ok(())
            }
            Arg::Format(args) => {
                for arg in args {
                    emit(arg.to_raw())?;
                }
                Ok(())
            }
        }
    }
}

/// The total encoded length of an argument list, in bytes.
pub fn args_len(args: &[Arg<'_>]) -> usize {
    args.iter().map(|a| a.encoded_len()).sum()
}

/// Rounds a byte count up to a whole number of words.
pub const fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn text_len(s: &[u8]) -> usize {
    let len = s.iter().position(|b| *b == 0).unwrap_or(s.len());
    if len > MAX_TEXT_LEN {
        MAX_TEXT_LEN
    } else {
        len
    }
}

pub(crate) fn command_words_for_bytes<'a>(bytes: &'a [u8]) -> ByteToCommandIter<'a> {
    ByteToCommandIter {
        wrapped: bytes.iter(),
    }
}

/// Groups bytes into little-endian words, zero-padding the final one.
pub(crate) struct ByteToCommandIter<'a> {
    wrapped: core::slice::Iter<'a, u8>,
}

impl<'a> Iterator for ByteToCommandIter<'a> {
    type Item = CommandWord;

    fn next(&mut self) -> Option<Self::Item> {
        const SIZE: usize = core::mem::size_of::<u32>();

        let mut raw: u32 = 0;
        for i in 0..SIZE {
            match self.wrapped.next() {
                Some(byte) => {
                    raw = raw | ((*byte as u32) << (i * 8));
                }
                None => {
                    if i == 0 {
                        return None;
                    } else {
                        break;
                    }
                }
            }
        }
        Some(CommandWord(raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for ByteToCommandIter<'a> {
    fn len(&self) -> usize {
        const SIZE: usize = core::mem::size_of::<u32>();

        // This is ceil(len / 4), accounting for us rounding up to include
        // alignment bytes.
        (self.wrapped.len() + (SIZE - 1)) / SIZE
    }
}

impl<'a> core::iter::FusedIterator for ByteToCommandIter<'a> {}
