//! This crate drives an FPGA-side JTAG-AXI bridge reached through the Xilinx
//! USER1 instruction, at a few levels of abstraction.  At the lowest level,
//! the `Cable` trait models a JTAG adapter: it can clock TMS sequences to
//! move the TAP state machine and shift bits in and out of the scan chain.
//! An FTDI MPSSE implementation is provided for FT2232H-based adapters such
//! as the Digilent USB-JTAG circuits found on Zynq boards.
//!
//! The next level is `JtagSM`, which tracks the TAP state and gets to any
//! requested state with the fewest TMS clocks.  If a shift fails partway
//! through, the TAP state is unknown and `JtagSM` refuses further scans
//! until the chain is reset.
//!
//! On top of that, `DeviceSession` speaks the bridge protocol: it selects
//! USER1, shifts 96-bit command frames built by the `bridge` codec, and
//! exposes register reads and writes with read-back verification.  A session
//! owns its cable exclusively, so register accesses can never interleave.
//!
//! # Example
//! ```no_run
//! use jtag_axi::cable::mpsse::Digilent;
//! use jtag_axi::session::DeviceSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cable = Digilent::new("Digilent USB Device A", 1_000_000)?;
//! let mut session = DeviceSession::open(Box::new(cable))?;
//! session.write_led(0b1010)?;
//! assert_eq!(session.read_led()?, 0b1010);
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cable;
pub mod error;
pub mod session;
pub mod statemachine;

pub use error::{Error, Result, Stage};
pub use session::DeviceSession;
