//! End-to-end register access against a mock cable that behaves like the
//! bridge peripheral: write commands latch the LED nibble, read commands
//! present it back in the data word of the captured frame.
use jtag_axi::bridge;
use jtag_axi::cable::{Cable, CableError};
use jtag_axi::session::DeviceSession;
use jtag_axi::{Error, Stage};

#[derive(Default)]
struct BridgeCable {
    led: u8,
    /// When set, read commands return this instead of the latched LEDs.
    forced_read: Option<u8>,
    /// Fail the next DR-sized shift once.
    fail_next_dr: bool,
    /// Total bits presented by each IR shift.
    ir_shift_bits: Vec<usize>,
    dr_frames: usize,
}

impl BridgeCable {
    fn exchange(&mut self, data: &[u8], bits: u8) -> Result<Vec<u8>, CableError> {
        let total = (data.len() - 1) * 8 + bits as usize;
        if total != bridge::DR_LENGTH {
            self.ir_shift_bits.push(total);
            return Ok(vec![0; data.len()]);
        }

        if self.fail_next_dr {
            self.fail_next_dr = false;
            return Err(CableError::Other("injected DR fault".into()));
        }

        self.dr_frames += 1;
        let cmd = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut response = data.to_vec();
        match cmd {
            bridge::CMD_WRITE => {
                self.led = data[8] & 0xF;
            }
            bridge::CMD_READ => {
                let value = self.forced_read.unwrap_or(self.led);
                response[8..12].copy_from_slice(&u32::from(value).to_le_bytes());
            }
            _ => {}
        }
        Ok(response)
    }
}

impl Cable for BridgeCable {
    fn change_mode(&mut self, _tms: &[usize], _tdo: bool) -> Result<(), CableError> {
        Ok(())
    }

    fn write_data(&mut self, data: &[u8], bits: u8, _pause: bool) -> Result<(), CableError> {
        self.exchange(data, bits).map(|_| ())
    }

    fn read_write_data(
        &mut self,
        data: &[u8],
        bits: u8,
        _pause: bool,
    ) -> Result<Vec<u8>, CableError> {
        self.exchange(data, bits)
    }
}

#[test]
fn write_then_read_back() {
    let mut cable = BridgeCable::default();
    {
        let mut session = DeviceSession::open(&mut cable).unwrap();
        session.write_led(0xF).unwrap();
        assert_eq!(session.read_led().unwrap(), 0xF);

        session.write_led(0x5).unwrap();
        assert_eq!(session.read_led().unwrap(), 0x5);
    }
    assert_eq!(cable.led, 0x5);
    // Every IR shift presented exactly IR_LENGTH bits.
    assert!(!cable.ir_shift_bits.is_empty());
    assert!(cable.ir_shift_bits.iter().all(|&bits| bits == bridge::IR_LENGTH));
}

#[test]
fn oversized_pattern_is_rejected_before_any_shift() {
    let mut cable = BridgeCable::default();
    {
        let mut session = DeviceSession::open(&mut cable).unwrap();
        let err = session.write_led(0x10).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameWidth {
                expected: 4,
                actual: 5
            }
        ));
    }
    // Nothing reached the chain: no IR shifts, no DR frames.
    assert!(cable.ir_shift_bits.is_empty());
    assert_eq!(cable.dr_frames, 0);
}

#[test]
fn generic_word_access() {
    let mut cable = BridgeCable::default();
    let mut session = DeviceSession::open(&mut cable).unwrap();
    session.write_word(bridge::LED_BASE_ADDR, 0x0000_000A).unwrap();
    assert_eq!(session.read_word(bridge::LED_BASE_ADDR).unwrap(), 0xA);
}

#[test]
fn close_is_idempotent() {
    let mut cable = BridgeCable::default();
    let mut session = DeviceSession::open(&mut cable).unwrap();
    assert!(session.is_open());

    session.close();
    session.close();
    assert!(!session.is_open());

    assert!(matches!(session.read_led(), Err(Error::SessionClosed)));
    assert!(matches!(session.write_led(0x1), Err(Error::SessionClosed)));
}

#[test]
fn dr_fault_reports_data_stage_and_needs_reset() {
    let mut cable = BridgeCable::default();
    cable.fail_next_dr = true;
    let mut session = DeviceSession::open(&mut cable).unwrap();

    let err = session.write_led(0x3).unwrap_err();
    assert!(matches!(
        err,
        Error::Sequence {
            stage: Stage::Data,
            ..
        }
    ));

    // The TAP state is unknown; the next access fails until a reset.
    let err = session.read_led().unwrap_err();
    assert!(matches!(err, Error::Sequence { .. }));

    session.reset().unwrap();
    session.write_led(0x3).unwrap();
    assert_eq!(session.read_led().unwrap(), 0x3);
}

#[test]
fn verification_mismatch_is_diagnostic_not_fatal() {
    let mut cable = BridgeCable::default();
    cable.forced_read = Some(0x3);
    let mut session = DeviceSession::open(&mut cable).unwrap();

    let err = session.verify_led(0x5).unwrap_err();
    assert!(matches!(
        err,
        Error::VerificationMismatch {
            wrote: 0x5,
            read: 0x3
        }
    ));

    // The session is still usable afterwards.
    assert_eq!(session.read_led().unwrap(), 0x3);
    session.write_led(0x7).unwrap();
}
