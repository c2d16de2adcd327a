//! A `DeviceSession` is the exclusive owner of an open JTAG adapter and
//! speaks the bridge protocol over it: select USER1, shift a 96-bit command
//! frame, return to Run-Test/Idle.
//!
//! Every register access takes `&mut self`, so two accesses on the same
//! session can never interleave their IR and DR shifts — the TAP is a
//! physically shared resource with exactly one logical owner.  Errors name
//! the step that failed (IR vs DR); after a `Sequence` failure the TAP state
//! is unknown and `reset` must succeed before the session is used again.
use core::ops::DerefMut;

use crate::bridge::{self, BridgeCommand, DrFrame};
use crate::cable::Cable;
use crate::error::{Error, Result, Stage};
use crate::statemachine::{JtagSM, JtagState, Register};

pub struct DeviceSession<T> {
    sm: Option<JtagSM<T>>,
}

impl<T, U> DeviceSession<T>
where
    T: DerefMut<Target = U>,
    U: Cable + ?Sized,
{
    /// Open a session on `cable`.  The scan chain is reset and left in
    /// Run-Test/Idle.  Fails with `TransportUnavailable` if the adapter
    /// cannot complete the initial reset.
    pub fn open(cable: T) -> Result<Self> {
        let mut sm = JtagSM::new(cable).map_err(Error::TransportUnavailable)?;
        sm.change_mode(JtagState::Idle)
            .map_err(|e| Error::sequence(Stage::Reset, e))?;
        log::debug!("JTAG session opened");
        Ok(Self { sm: Some(sm) })
    }

    pub fn is_open(&self) -> bool {
        self.sm.is_some()
    }

    /// Close the session and release the adapter.  Safe to call more than
    /// once; only the first call tears anything down.
    pub fn close(&mut self) {
        if self.sm.take().is_some() {
            log::debug!("JTAG session closed");
        }
    }

    /// Reset the TAP and return to Run-Test/Idle.  This is the recovery step
    /// after a `Sequence` failure left the TAP state unknown.
    pub fn reset(&mut self) -> Result<()> {
        let sm = self.sm()?;
        sm.mode_reset()
            .map_err(|e| Error::sequence(Stage::Reset, e))?;
        sm.change_mode(JtagState::Idle)
            .map_err(|e| Error::sequence(Stage::Reset, e))
    }

    /// Write `data` to the AXI register at `addr` through the bridge.
    pub fn write_word(&mut self, addr: u32, data: u32) -> Result<()> {
        log::debug!("bridge write: addr={addr:#010x} data={data:#010x}");
        self.shift_instruction(bridge::USER1)?;
        self.shift_dr_out(&BridgeCommand::write(addr, data).encode())
    }

    /// Read the AXI register at `addr` through the bridge.
    ///
    /// The captured frame is decoded on the assumption that the bridge
    /// presents the register value in the data word position of the command
    /// layout (byte offset 8).  That convention matches the bridge RTL but
    /// is not confirmed by the protocol itself.
    pub fn read_word(&mut self, addr: u32) -> Result<u32> {
        log::debug!("bridge read: addr={addr:#010x}");
        self.shift_instruction(bridge::USER1)?;
        let response = self.shift_dr_exchange(&BridgeCommand::read(addr).encode())?;
        let data = response.data_word();
        log::debug!("bridge read response: data={data:#010x}");
        Ok(data)
    }

    /// Drive the 4-bit LED pattern.  Patterns above 0xF are rejected before
    /// anything is shifted.
    pub fn write_led(&mut self, pattern: u8) -> Result<()> {
        bridge::check_width(pattern.into(), bridge::LED_WIDTH)?;
        self.write_word(bridge::LED_BASE_ADDR, pattern.into())
    }

    /// Read the current LED pattern.
    pub fn read_led(&mut self) -> Result<u8> {
        Ok((self.read_word(bridge::LED_BASE_ADDR)? & bridge::LED_MASK) as u8)
    }

    /// Write `pattern`, read it back, and compare.  A mismatch is reported
    /// as `VerificationMismatch`, which is diagnostic: the session and the
    /// TAP remain fully usable.
    pub fn verify_led(&mut self, pattern: u8) -> Result<()> {
        self.write_led(pattern)?;
        let read = self.read_led()?;
        if read != pattern {
            return Err(Error::VerificationMismatch {
                wrote: pattern,
                read,
            });
        }
        Ok(())
    }

    fn sm(&mut self) -> Result<&mut JtagSM<T>> {
        self.sm.as_mut().ok_or(Error::SessionClosed)
    }

    /// Shift `code` into the instruction register: exactly `IR_LENGTH` bits,
    /// exiting to Idle through Update-IR.
    fn shift_instruction(&mut self, code: u8) -> Result<()> {
        bridge::check_width(code.into(), bridge::IR_LENGTH)?;
        let sm = self.sm()?;
        sm.write_reg(Register::Instruction, &[code], bridge::IR_LENGTH as u8, true)
            .map_err(|e| Error::sequence(Stage::Instruction, e))?;
        sm.change_mode(JtagState::Idle)
            .map_err(|e| Error::sequence(Stage::Instruction, e))
    }

    /// Shift a command frame into the data register, discarding TDO, exiting
    /// to Idle through Update-DR.
    fn shift_dr_out(&mut self, frame: &DrFrame) -> Result<()> {
        let sm = self.sm()?;
        sm.write_reg(Register::Data, frame.as_bytes(), 8, true)
            .map_err(|e| Error::sequence(Stage::Data, e))?;
        sm.change_mode(JtagState::Idle)
            .map_err(|e| Error::sequence(Stage::Data, e))
    }

    /// Full-duplex DR shift: clock the command frame in while capturing the
    /// frame the bridge presents on TDO.
    fn shift_dr_exchange(&mut self, frame: &DrFrame) -> Result<DrFrame> {
        let sm = self.sm()?;
        let captured = sm
            .read_write_reg(Register::Data, frame.as_bytes(), 8, true)
            .map_err(|e| Error::sequence(Stage::Data, e))?;
        sm.change_mode(JtagState::Idle)
            .map_err(|e| Error::sequence(Stage::Data, e))?;
        DrFrame::from_slice(&captured)
    }
}
