//! Implementations for different JTAG hardware adapters live here.  Hardware
//! adapters should implement the `Cable` trait.
//!
//! Every operation can fail: the adapters are USB devices that may be
//! unplugged or time out mid-transfer.  A failed shift leaves the scan chain
//! in an undefined position, which is why the layers above treat any
//! `CableError` as "TAP state unknown".
use thiserror::Error;

#[cfg(feature = "ftdi")]
pub mod mpsse;

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum CableError {
    /// The requested adapter was not found or could not be claimed.
    #[error("adapter not available: {0}")]
    NotFound(String),
    /// An MPSSE command or transfer failed.
    #[error("MPSSE transfer failed")]
    Mpsse(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Any other transport fault.
    #[error("{0}")]
    Other(String),
}

impl CableError {
    #[cfg(feature = "ftdi")]
    pub(crate) fn mpsse<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CableError::Mpsse(Box::new(err))
    }
}

pub trait Cable {
    /// Clock out a series of TMS values to change the state of the JTAG
    /// chain.  Each element of `tms` determines the value of the TMS line,
    /// zero for low and any other value for high.  `tdo` controls the state
    /// of the TDI line during mode changes.
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError>;

    /// Shift out bits on the TDI line.  `bits` is the number of bits to send
    /// from the last byte.  Should be called with state = ShiftIR or ShiftDR.
    /// State won't change unless `pause_after` is true, in which case it will
    /// be PauseIR or PauseDR on exit.
    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError>;

    /// Same as `write_data` but captures the bits presented on TDO while
    /// shifting, full duplex.  Returns exactly as many bits as were written.
    fn read_write_data(
        &mut self,
        data: &[u8],
        bits: u8,
        pause_after: bool,
    ) -> Result<Vec<u8>, CableError>;
}
