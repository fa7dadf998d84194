/// A text message that might contain formatting sequences that correspond with
/// given arguments.
///
/// The main way to construct a `Message` is using the macro
/// [`evecmd::eve_format!`](crate::eve_format), which understands the EVE
/// formatting syntax just enough to automatically infer the argument types
/// and verify that the arguments are compatible with the format string.
///
/// ```rust
/// let val = 5;
/// println!("Message is {:?}", evecmd::eve_format!("The current value is %d", val));
/// ```
///
/// `Message` can also represent messages that won't be formatted at all,
/// although in that case it behaves just as a thin wrapper around a slice
/// of bytes.
#[derive(Clone, Copy)]
pub struct Message<'a, 'b> {
    pub(crate) fmt: &'a [u8],
    pub(crate) args: Option<&'b [Argument]>,
}

impl<'a, 'b> core::fmt::Debug for Message<'a, 'b> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::result::Result<(), core::fmt::Error> {
        use core::fmt::Write;
        write!(f, "Message {{ fmt: b\"")?;
        for c in self.fmt.iter() {
            for c in core::ascii::escape_default(*c) {
                f.write_char(c as char)?;
            }
        }
        write!(f, "\", args: {:?} }}", self.args)
    }
}

/// An argument used as part of a `Message`. Each one occupies a single word
/// after the string in the command stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Argument {
    Int(i32),
    UInt(u32),
    Char(char),
}

impl Argument {
    pub const fn to_raw(&self) -> u32 {
        match *self {
            Argument::Int(v) => v as u32,
            Argument::UInt(v) => v,
            Argument::Char(v) => v as u32,
        }
    }
}

impl<'a, 'b> Message<'a, 'b> {
    /// Construct a message with formatting arguments.
    ///
    /// This function doesn't verify that the format string is compatible with
    /// the given arguments. If the arguments are incompatible then the
    /// generated coprocessor command would be invalid.
    #[inline]
    pub const fn new(fmt: &'a [u8], args: &'b [Argument]) -> Self {
        Self {
            fmt: fmt,
            args: Some(args),
        }
    }

    /// Constructs a message that doesn't use the formatting functionality,
    /// and instead just renders literally.
    ///
    /// The message ends at its first null byte, if any.
    #[inline]
    pub const fn new_literal(lit: &'a [u8]) -> Self {
        Self {
            fmt: lit,
            args: None,
        }
    }

    /// Returns true if the message should be used with the format option.
    pub const fn needs_format(&self) -> bool {
        self.args.is_some()
    }

    /// The string part of the message.
    pub const fn text(&self) -> &'a [u8] {
        self.fmt
    }

    /// The formatting arguments, which are empty for a literal message.
    pub fn arguments(&self) -> &'b [Argument] {
        self.args.unwrap_or(&[])
    }
}
