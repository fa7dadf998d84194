//! Various error types returned by different components in this crate.

use thiserror::Error;

/// A general error type for errors from the command FIFO engine and the
/// main [`Eve`](crate::Eve) type.
///
/// The type parameter is the error type of whichever
/// [`Transport`](crate::interface::Transport) implementation you are using.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// Indicates that the requested operation isn't supported for the
    /// detected chip generation, or isn't possible in the current mode (for
    /// example, a command that returns a result issued inside a burst).
    #[error("operation not supported")]
    Unsupported,

    /// Errors encountered when sending or recieving data from the EVE chip.
    #[error("bus transport error")]
    Interface(E),

    /// The retry budget ran out while waiting for the coprocessor to free
    /// ring buffer space or to drain its queue.
    ///
    /// The coprocessor may be stuck on a long-running command or may have
    /// lost its pointers. The caller should treat the current frame as lost
    /// and re-synchronize before issuing anything else.
    #[error("coprocessor unresponsive")]
    Unresponsive,

    /// Indicates that the coprocessor itself reported a fault.
    ///
    /// The coprocessor typically runs asynchronously from the host processor,
    /// and so a fault error may be returned from some later method call than
    /// the one which caused the fault. This error variant therefore indicates
    /// only that the coprocessor is blocked by being in the fault state, not
    /// that the most recent method call put it in that state.
    ///
    /// Use [`Eve::reset_coprocessor`](crate::Eve::reset_coprocessor) to
    /// recover.
    #[error("coprocessor fault")]
    Fault,

    /// An asynchronous bulk transfer still occupied the bus after the
    /// configured number of checks.
    #[error("bus still busy with a bulk transfer")]
    BusBusy,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Interface(err)
    }
}

/// The reasons initialization can fail. Each one points at a different
/// physical problem.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum InitFailure {
    /// The identity register only ever read back as all-zeros or all-ones,
    /// which usually means nothing is answering on the bus at all.
    #[error("no chip id data")]
    NoChipIdData,

    /// Something answered, but not with a supported EVE identity.
    #[error("chip id wrong: found {found:#04x}")]
    ChipIdWrong { found: u8 },

    /// The coprocessor didn't come out of reset, or its command ring wasn't
    /// idle once it did.
    #[error("coprocessor did not reach the ready state")]
    CpuState,

    /// The system clock frequency register didn't read back as written.
    #[error("frequency set to {expected} but read back {actual}")]
    FrequencySet { expected: u32, actual: u32 },
}

/// Error type for [`Eve::init`](crate::Eve::init).
#[derive(Debug, Error)]
pub enum InitError<E> {
    #[error("initialization failed: {0}")]
    Failed(InitFailure),

    #[error("bus transport error during initialization")]
    Interface(E),
}

impl<E> From<E> for InitError<E> {
    fn from(err: E) -> Self {
        InitError::Interface(err)
    }
}
