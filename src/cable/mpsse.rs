//! Implement the `Cable` trait for FTDI MPSSE adapters.  Digilent's on-board
//! USB-JTAG circuits and the HS1/HS2/HS3 pods are all FT2232H based, so one
//! MPSSE engine covers them; `Digilent` wires up the right pins and exposes
//! it as a `Cable`.
use crate::cable::{Cable, CableError};

use ftdi_mpsse::{ClockTMS, ClockTMSOut};
use libftd2xx::{ClockBits, ClockBitsOut, ClockData, ClockDataOut};
use libftd2xx::{Ft2232h, Ftdi, FtdiMpsse, MpsseCmdBuilder, MpsseCmdExecutor};

pub struct Mpsse<T> {
    ft: T,
}

impl<T: FtdiMpsse + MpsseCmdExecutor> Mpsse<T>
where
    <T as MpsseCmdExecutor>::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(mut ft: T, clock: u32) -> Result<Self, CableError> {
        ft.initialize_mpsse_default().map_err(CableError::mpsse)?;
        ft.set_clock(clock).map_err(CableError::mpsse)?;

        let builder = MpsseCmdBuilder::new()
            .disable_3phase_data_clocking()
            .disable_adaptive_data_clocking();
        ft.send(builder.as_slice()).map_err(CableError::mpsse)?;

        Ok(Self { ft })
    }
}

impl<T: FtdiMpsse + MpsseCmdExecutor> Cable for Mpsse<T>
where
    <T as MpsseCmdExecutor>::Error: std::error::Error + Send + Sync + 'static,
{
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        let mut count = 0;
        let mut buf = 0;
        let mut builder = MpsseCmdBuilder::new();

        for x in tms {
            if *x != 0 {
                buf |= 1 << count;
            }
            count += 1;

            if count == 7 {
                builder = builder.clock_tms_out(ClockTMSOut::NegEdge, buf, tdo, count);
                count = 0;
                buf = 0;
            }
        }
        if count > 0 {
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, buf, tdo, count);
        }
        self.ft.send(builder.as_slice()).map_err(CableError::mpsse)
    }

    fn write_data(&mut self, data: &[u8], mut bits: u8, pause_after: bool) -> Result<(), CableError> {
        debug_assert!(bits >= 1 && bits <= 8);
        let mut builder = MpsseCmdBuilder::new();

        // The final bit goes out with the TMS clock so the shift state can
        // be left in the same transfer.
        bits -= 1;

        if data.len() > 1 {
            builder = builder.clock_data_out(ClockDataOut::LsbNeg, &data[..data.len() - 1]);
        }
        let last_byte = data[data.len() - 1];
        if bits >= 1 {
            builder = builder.clock_bits_out(ClockBitsOut::LsbNeg, last_byte, bits);
        }
        let last_bit = last_byte & (1 << bits) != 0;
        if pause_after {
            // TMS 1, 0: Exit1 then Pause.
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, 1, last_bit, 2);
        } else {
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, 0, last_bit, 1);
        }

        self.ft.send(builder.as_slice()).map_err(CableError::mpsse)
    }

    fn read_write_data(
        &mut self,
        data: &[u8],
        mut bits: u8,
        pause_after: bool,
    ) -> Result<Vec<u8>, CableError> {
        debug_assert!(bits >= 1 && bits <= 8);
        let total_bits = (data.len() - 1) * 8 + bits as usize;
        let mut read_bytes = 1;
        let mut builder = MpsseCmdBuilder::new();

        bits -= 1;

        if data.len() > 1 {
            builder = builder.clock_data(ClockData::LsbPosIn, &data[..data.len() - 1]);
            read_bytes += data.len() - 1;
        }
        let last_byte = data[data.len() - 1];
        if bits >= 1 {
            builder = builder.clock_bits(ClockBits::LsbPosIn, last_byte, bits);
            read_bytes += 1;
        }
        let last_bit = last_byte & (1 << bits) != 0;

        if pause_after {
            builder = builder.clock_tms(ClockTMS::NegTMSPosTDO, 1, last_bit, 1);
            read_bytes += 1;
        }
        builder = builder.clock_tms(ClockTMS::NegTMSPosTDO, 0, last_bit, 1);

        let mut buf = vec![0; read_bytes];
        self.ft
            .xfer(builder.as_slice(), &mut buf)
            .map_err(CableError::mpsse)?;

        if pause_after {
            // The Exit1 -> Pause clock captures a bit we never asked for.
            buf.pop();
        }

        // The last data bit arrived via clock_tms and lands in the MSB.
        let len = buf.len();
        buf[len - 1] >>= 7;
        let rem = total_bits - 1;
        if rem >= 1 && rem % 8 != 0 {
            // Bits from clock_bits are MSB-aligned; repack the clock_tms bit
            // on top of them and drop the extra byte.
            buf[len - 2] >>= 8 - (rem % 8);
            let last = buf[len - 1] & 1;
            buf[len - 2] |= last << (rem % 8);
            buf.pop();
        }
        Ok(buf)
    }
}

// ADBUS pin assignments shared by the Digilent FT2232H designs.
const PIN_TCK: u8 = 1;
const PIN_TDI: u8 = 1 << 1;
//const PIN_TDO: u8 = 1 << 2;
const PIN_TMS: u8 = 1 << 3;
const OUTPUT_PINS: u8 = PIN_TCK | PIN_TDI | PIN_TMS;

/// A Digilent USB-JTAG adapter.  Interface A of the FT2232H carries JTAG on
/// these boards; `description` selects the device by its FTDI description
/// string.
pub struct Digilent {
    ft: Mpsse<Ft2232h>,
}

impl Digilent {
    /// Open the adapter described by `description` with TCK running at
    /// `clock` hertz.
    pub fn new(description: &str, clock: u32) -> Result<Self, CableError> {
        let ft = Ftdi::with_description(description)
            .map_err(|e| CableError::NotFound(format!("{description}: {e:?}")))?;
        let ft = Ft2232h::try_from(ft)
            .map_err(|e| CableError::NotFound(format!("{description}: {e:?}")))?;
        let mut ft = Mpsse::new(ft, clock)?;

        // Idle with TMS high so a stray clock can't move the TAP.
        let builder = MpsseCmdBuilder::new().set_gpio_lower(PIN_TMS, OUTPUT_PINS);
        ft.ft.send(builder.as_slice()).map_err(CableError::mpsse)?;

        Ok(Digilent { ft })
    }
}

impl Cable for Digilent {
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        self.ft.change_mode(tms, tdo)
    }

    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError> {
        self.ft.write_data(data, bits, pause_after)
    }

    fn read_write_data(
        &mut self,
        data: &[u8],
        bits: u8,
        pause_after: bool,
    ) -> Result<Vec<u8>, CableError> {
        self.ft.read_write_data(data, bits, pause_after)
    }
}
