//! Error types for bridge operations.  Transport and sequencer failures are
//! wrapped rather than flattened so the caller can always see which layer
//! failed and which scan step was in flight.
use std::fmt;

use thiserror::Error;

use crate::cable::CableError;
use crate::statemachine::SequenceError;

pub type Result<T> = std::result::Result<T, Error>;

/// The scan step a failure occurred in, reported to aid hardware debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reset,
    Instruction,
    Data,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Reset => write!(f, "TAP reset"),
            Stage::Instruction => write!(f, "IR"),
            Stage::Data => write!(f, "DR"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The adapter could not be opened, or the initial chain reset failed.
    /// There is no device to drive.
    #[error("JTAG transport unavailable")]
    TransportUnavailable(#[source] CableError),

    /// A TMS or data shift failed mid-sequence.  The TAP state is unknown
    /// until the chain is reset; retrying without a reset is unsafe.
    #[error("{stage} shift failed; TAP state unknown until the chain is reset")]
    Sequence {
        stage: Stage,
        #[source]
        source: SequenceError,
    },

    /// A value or frame does not match the fixed IR/DR width.  Raised before
    /// any bits are shifted.
    #[error("frame width violation: {actual} bits supplied, field holds exactly {expected}")]
    FrameWidth { expected: usize, actual: usize },

    /// Operation attempted on a session that was already closed.
    #[error("device session is closed")]
    SessionClosed,

    /// Read-back value differs from what was written.  Diagnostic, not a
    /// transport fault: the session remains usable.
    #[error("verification mismatch: wrote {wrote:#03x}, read back {read:#03x}")]
    VerificationMismatch { wrote: u8, read: u8 },
}

impl Error {
    pub(crate) fn sequence(stage: Stage, source: SequenceError) -> Self {
        Error::Sequence { stage, source }
    }
}
