//! Reads EVE printf-style format strings.
//!
//! The coprocessor interprets the format string itself, so this only needs
//! to understand enough of it to know how many argument words follow the
//! string and how each one should be built.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1, take_while, take_while_m_n};
use nom::combinator::{map, recognize};
use nom::sequence::tuple;
use nom::IResult;

/// The longest format string, in bytes and without its terminator, that the
/// coprocessor accepts in a single text-drawing command.
pub(crate) const MAX_TEXT_LEN: usize = 249;

/// How an argument word is built from the caller's expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum ArgKind {
    Int,
    UInt,
    Char,
}

impl ArgKind {
    fn for_verb(letter: u8) -> Result<Self, FormatError> {
        match letter {
            b'd' | b'i' => Ok(ArgKind::Int),
            b'u' | b'o' | b'x' | b'X' => Ok(ArgKind::UInt),
            b'c' => Ok(ArgKind::Char),
            b's' => Err(FormatError::StringVerb),
            other => Err(FormatError::UnknownVerb(other as char)),
        }
    }
}

/// One argument word of a format, in order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Slot {
    /// Taken from the next expression the caller gave.
    Given(ArgKind),
    /// A zero character standing in for a NUL byte in the source string.
    Zero,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Format {
    /// The bytes to send, including the terminating NUL.
    pub text: Vec<u8>,
    pub slots: Vec<Slot>,
    pub needs_format: bool,
}

impl Format {
    pub fn given_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Given(_)))
            .count()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) enum FormatError {
    StringVerb,
    UnknownVerb(char),
    Unterminated,
    TooLong(usize),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::StringVerb => write!(f, "string verbs (%s) are not supported"),
            FormatError::UnknownVerb(c) => write!(f, "unsupported format verb '%{}'", c),
            FormatError::Unterminated => write!(f, "unterminated format sequence"),
            FormatError::TooLong(len) => write!(
                f,
                "format string is {} bytes but at most {} are allowed",
                len, MAX_TEXT_LEN
            ),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Piece<'a> {
    Text(&'a [u8]),
    Escape,
    Verb { spec: &'a [u8], letter: u8 },
    Null,
}

/// Scans a whole format string, producing the bytes to send and one slot
/// per argument word.
///
/// A NUL in the source would end the string early on the chip, so each one
/// is sent as `%c` with a zero argument instead.
pub(crate) fn parse_format(src: &[u8]) -> Result<Format, FormatError> {
    let mut format = Format {
        text: Vec::with_capacity(src.len() + 1),
        slots: Vec::new(),
        needs_format: false,
    };

    let mut remain = src;
    while !remain.is_empty() {
        // Every byte other than % starts a literal or a NUL, so the only way
        // to fail here is a % that isn't followed by a verb.
        let (rest, p) = piece(remain).map_err(|_| FormatError::Unterminated)?;
        remain = rest;
        match p {
            Piece::Text(bytes) => format.text.extend_from_slice(bytes),
            Piece::Escape => {
                format.needs_format = true;
                format.text.extend_from_slice(b"%%");
            }
            Piece::Verb { spec, letter } => {
                let kind = ArgKind::for_verb(letter)?;
                format.needs_format = true;
                format.text.extend_from_slice(spec);
                format.slots.push(Slot::Given(kind));
            }
            Piece::Null => {
                format.needs_format = true;
                format.text.extend_from_slice(b"%c");
                format.slots.push(Slot::Zero);
            }
        }
    }

    if format.text.len() > MAX_TEXT_LEN {
        return Err(FormatError::TooLong(format.text.len()));
    }
    format.text.push(0);
    Ok(format)
}

fn piece(i: &[u8]) -> IResult<&[u8], Piece<'_>> {
    alt((
        map(tag(b"%%"), |_| Piece::Escape),
        map(verb, |(spec, letter)| Piece::Verb {
            spec: spec,
            letter: letter,
        }),
        map(tag(b"\x00"), |_| Piece::Null),
        map(take_till1(|b| b == b'%' || b == 0), Piece::Text),
    ))(i)
}

// A % then any flags, width and precision, then one letter. Returns the
// whole sequence and the letter.
fn verb(i: &[u8]) -> IResult<&[u8], (&[u8], u8)> {
    let (rest, spec) = recognize(tuple((
        tag(b"%"),
        take_while(is_modifier),
        take_while_m_n(1, 1, |b: u8| b.is_ascii_alphabetic()),
    )))(i)?;
    Ok((rest, (spec, spec[spec.len() - 1])))
}

fn is_modifier(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-' || b == b'+' || b == b' ' || b == b'#' || b == b'.'
}
