//! Codec for the 96-bit command frames understood by the JTAG-AXI bridge
//! sitting behind the USER1 instruction.
//!
//! A frame is three little-endian 32-bit words packed contiguously: opcode,
//! AXI address, data.  Read commands carry a dummy data word.  The bridge is
//! assumed to present its response with the data word at the same offset as
//! the command layout; this matches the deployed bridge RTL but is a
//! protocol convention, not something the decoder can verify.
use crate::error::{Error, Result};

/// USER1 opcode for Xilinx 7-series devices.
pub const USER1: u8 = 0x02;
/// Instruction register length for Xilinx 7-series.
pub const IR_LENGTH: usize = 6;
/// Bridge data register length: three 32-bit words.
pub const DR_LENGTH: usize = 96;
pub const DR_BYTES: usize = DR_LENGTH / 8;

pub const CMD_WRITE: u32 = 0x0000_0001;
pub const CMD_READ: u32 = 0x0000_0002;

/// AXI base address of the LED peripheral register.
pub const LED_BASE_ADDR: u32 = 0x43C0_0000;
/// Only the low nibble of the data word drives LEDs; the high 28 bits are
/// reserved and must be zero on writes.
pub const LED_WIDTH: usize = 4;
pub const LED_MASK: u32 = 0xF;

/// Byte offsets of the three words within a frame.
pub const CMD_OFFSET: usize = 0;
pub const ADDR_OFFSET: usize = 4;
pub const DATA_OFFSET: usize = 8;

/// Reject `value` if it needs more than `width` bits, before anything is
/// shifted onto the chain.
pub fn check_width(value: u64, width: usize) -> Result<()> {
    let actual = 64 - value.leading_zeros() as usize;
    if actual > width {
        return Err(Error::FrameWidth {
            expected: width,
            actual,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOp {
    Write,
    Read,
}

impl BridgeOp {
    fn code(self) -> u32 {
        match self {
            BridgeOp::Write => CMD_WRITE,
            BridgeOp::Read => CMD_READ,
        }
    }
}

/// One bridge transaction: opcode, AXI address, and a data word (payload for
/// writes, dummy for reads).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeCommand {
    pub op: BridgeOp,
    pub addr: u32,
    pub data: u32,
}

impl BridgeCommand {
    pub fn write(addr: u32, data: u32) -> Self {
        Self {
            op: BridgeOp::Write,
            addr,
            data,
        }
    }

    pub fn read(addr: u32) -> Self {
        Self {
            op: BridgeOp::Read,
            addr,
            data: 0,
        }
    }

    /// Pack the command into its fixed 96-bit scan frame.
    pub fn encode(&self) -> DrFrame {
        let mut buf = [0u8; DR_BYTES];
        buf[CMD_OFFSET..CMD_OFFSET + 4].copy_from_slice(&self.op.code().to_le_bytes());
        buf[ADDR_OFFSET..ADDR_OFFSET + 4].copy_from_slice(&self.addr.to_le_bytes());
        buf[DATA_OFFSET..DATA_OFFSET + 4].copy_from_slice(&self.data.to_le_bytes());
        DrFrame(buf)
    }
}

/// A DR scan frame, exactly `DR_LENGTH` bits.  The width is enforced at
/// construction so nothing mis-sized ever reaches the shift layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrFrame([u8; DR_BYTES]);

impl DrFrame {
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        let bytes: [u8; DR_BYTES] = buf.try_into().map_err(|_| Error::FrameWidth {
            expected: DR_LENGTH,
            actual: buf.len() * 8,
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The data word, little-endian at its fixed offset.
    pub fn data_word(&self) -> u32 {
        u32::from_le_bytes([self.0[8], self.0[9], self.0[10], self.0[11]])
    }

    /// The LED pattern carried in the data word.
    pub fn led_pattern(&self) -> u8 {
        (self.data_word() & LED_MASK) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_led_pattern_round_trips() {
        for pattern in 0..16u32 {
            let frame = BridgeCommand::write(LED_BASE_ADDR, pattern).encode();
            assert_eq!(frame.led_pattern(), pattern as u8);
            assert_eq!(frame.data_word(), pattern);
        }
    }

    #[test]
    fn frames_are_exactly_twelve_bytes_with_reserved_bits_clear() {
        let frame = BridgeCommand::write(LED_BASE_ADDR, 0xF).encode();
        assert_eq!(frame.as_bytes().len(), DR_BYTES);
        // High 28 bits of the data word are reserved.
        assert_eq!(frame.as_bytes()[8], 0x0F);
        assert_eq!(&frame.as_bytes()[9..12], &[0, 0, 0]);

        let read = BridgeCommand::read(LED_BASE_ADDR).encode();
        assert_eq!(read.as_bytes().len(), DR_BYTES);
        assert_eq!(&read.as_bytes()[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn field_layout_is_little_endian() {
        let frame = BridgeCommand::write(0x43C0_0000, 0xA).encode();
        assert_eq!(&frame.as_bytes()[0..4], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&frame.as_bytes()[4..8], &[0x00, 0x00, 0xC0, 0x43]);
        assert_eq!(&frame.as_bytes()[8..12], &[0x0A, 0x00, 0x00, 0x00]);

        let read = BridgeCommand::read(0x1000).encode();
        assert_eq!(&read.as_bytes()[0..4], &[0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn mis_sized_frames_are_rejected() {
        let err = DrFrame::from_slice(&[0u8; 11]).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameWidth {
                expected: DR_LENGTH,
                actual: 88
            }
        ));
        assert!(DrFrame::from_slice(&[0u8; 12]).is_ok());
    }

    #[test]
    fn width_check_bounds() {
        assert!(check_width(0x3F, IR_LENGTH).is_ok());
        assert!(check_width(0, LED_WIDTH).is_ok());
        let err = check_width(0x40, IR_LENGTH).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameWidth {
                expected: 6,
                actual: 7
            }
        ));
        assert!(check_width(0x10, LED_WIDTH).is_err());
    }
}
