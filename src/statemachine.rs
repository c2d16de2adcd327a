//! This provides a higher-level interface than the `Cable` trait.
//! Specifically, it keeps track of the state of the JTAG state machine, and
//! allows setting the state to any desired state.  `JtagSM` will get to that
//! state by the most efficient path, based on the current state.
//!
//! If any cable transfer fails, the physical TAP may have stopped partway
//! through a transition, so the tracked state becomes unknown.  Every scan
//! after that fails with `SequenceError::StateUnknown` until `mode_reset`
//! succeeds; there is no way to recover the state locally without a reset.
use thiserror::Error;

use crate::cable::{Cable, CableError};

/// Five TMS-high clocks put the TAP in Test-Logic-Reset from any state.
const RESET_SEQUENCE: [usize; 6] = [1, 1, 1, 1, 1, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Data,
    Instruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JtagState {
    Reset = 0,
    Idle = 1,
    SelectDR = 2,
    CaptureDR = 3,
    ShiftDR = 4,
    Exit1DR = 5,
    PauseDR = 6,
    Exit2DR = 7,
    UpdateDR = 8,
    SelectIR = 9,
    CaptureIR = 10,
    ShiftIR = 11,
    Exit1IR = 12,
    PauseIR = 13,
    Exit2IR = 14,
    UpdateIR = 15,
}

/// Failure while sequencing the TAP.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The cable transfer itself failed.
    #[error(transparent)]
    Cable(#[from] CableError),
    /// The TAP state is unknown after an earlier failure; reset the chain
    /// before shifting anything else.
    #[error("TAP state is unknown; reset the scan chain before shifting")]
    StateUnknown,
}

struct Node {
    /// Successor states for TMS = 0 and TMS = 1, per IEEE 1149.1.
    edges: [usize; 2],
}

#[derive(Clone)]
struct Path {
    path: Vec<usize>,
    state: usize,
}

fn build_graph() -> Vec<Node> {
    use JtagState::*;
    // (TMS = 0 successor, TMS = 1 successor), indexed by JtagState value.
    let edges = [
        (Idle, Reset),         // Reset
        (Idle, SelectDR),      // Idle
        (CaptureDR, SelectIR), // SelectDR
        (ShiftDR, Exit1DR),    // CaptureDR
        (ShiftDR, Exit1DR),    // ShiftDR
        (PauseDR, UpdateDR),   // Exit1DR
        (PauseDR, Exit2DR),    // PauseDR
        (ShiftDR, UpdateDR),   // Exit2DR
        (Idle, SelectDR),      // UpdateDR
        (CaptureIR, Reset),    // SelectIR
        (ShiftIR, Exit1IR),    // CaptureIR
        (ShiftIR, Exit1IR),    // ShiftIR
        (PauseIR, UpdateIR),   // Exit1IR
        (PauseIR, Exit2IR),    // PauseIR
        (ShiftIR, UpdateIR),   // Exit2IR
        (Idle, SelectIR),      // UpdateIR
    ];

    edges
        .iter()
        .map(|&(t0, t1)| Node {
            edges: [t0 as usize, t1 as usize],
        })
        .collect()
}

pub struct JtagSM<T> {
    pub cable: T,
    state: Option<JtagState>,
    graph: Vec<Node>,
}

impl<T, U> JtagSM<T>
where
    T: core::ops::DerefMut<Target = U>,
    U: Cable + ?Sized,
{
    /// Create a JTAG state machine using an existing `Cable`.  The scan
    /// chain is reset so the starting state is known.
    pub fn new(mut cable: T) -> Result<Self, CableError> {
        cable.change_mode(&RESET_SEQUENCE, true)?;

        Ok(Self {
            cable,
            state: Some(JtagState::Reset),
            graph: build_graph(),
        })
    }

    /// The tracked TAP state, or `None` if a failed shift left it unknown.
    pub fn state(&self) -> Option<JtagState> {
        self.state
    }

    /// Reset the scan chain by driving TMS high for 5 clocks.  Valid from
    /// any state, including unknown.
    pub fn mode_reset(&mut self) -> Result<(), SequenceError> {
        if let Err(e) = self.cable.change_mode(&RESET_SEQUENCE, true) {
            self.state = None;
            return Err(e.into());
        }
        self.state = Some(JtagState::Reset);
        Ok(())
    }

    /// Breadth-first search over the state graph; the returned path is the
    /// TMS bit sequence itself.
    fn get_path(&self, from: JtagState, to: JtagState) -> Vec<usize> {
        let mut paths = Vec::new();

        for tms in 0..2 {
            let next = self.graph[from as usize].edges[tms];
            if next == to as usize {
                return vec![tms];
            }
            paths.push(Path {
                state: next,
                path: vec![tms],
            });
        }

        loop {
            let mut newpaths = Vec::new();

            for p in paths {
                for tms in 0..2 {
                    let mut q = p.clone();
                    q.state = self.graph[p.state].edges[tms];
                    q.path.push(tms);

                    if q.state == to as usize {
                        return q.path;
                    }
                    newpaths.push(q);
                }
            }

            paths = newpaths;
        }
    }

    /// Use TMS to get into `state` by the most efficient path.
    pub fn change_mode(&mut self, state: JtagState) -> Result<(), SequenceError> {
        let Some(current) = self.state else {
            return Err(SequenceError::StateUnknown);
        };
        if current == state {
            return Ok(());
        }

        let path = self.get_path(current, state);
        log::trace!("TMS path {current:?} -> {state:?}: {path:?}");
        if let Err(e) = self.cable.change_mode(&path, true) {
            self.state = None;
            return Err(e.into());
        }
        self.state = Some(state);
        Ok(())
    }

    /// Write `data` into either the instruction or data register.  `bits`
    /// indicates how many bits of the last byte should be written (8 writes
    /// the entire byte).  The mode will be ShiftIR / ShiftDR afterwards if
    /// `pause_after` is false, or PauseIR / PauseDR if it is true.
    pub fn write_reg(
        &mut self,
        reg: Register,
        data: &[u8],
        bits: u8,
        pause_after: bool,
    ) -> Result<(), SequenceError> {
        self.change_mode(self.shift_state(reg))?;
        if let Err(e) = self.cable.write_data(data, bits, pause_after) {
            self.state = None;
            return Err(e.into());
        }
        if pause_after {
            self.state = Some(self.pause_state(reg));
        }
        Ok(())
    }

    /// Same as `write_reg` except it returns the bits that were shifted out
    /// on TDO while writing (a full-duplex shift).
    pub fn read_write_reg(
        &mut self,
        reg: Register,
        data: &[u8],
        bits: u8,
        pause_after: bool,
    ) -> Result<Vec<u8>, SequenceError> {
        self.change_mode(self.shift_state(reg))?;
        let out = match self.cable.read_write_data(data, bits, pause_after) {
            Ok(out) => out,
            Err(e) => {
                self.state = None;
                return Err(e.into());
            }
        };
        if pause_after {
            self.state = Some(self.pause_state(reg));
        }
        Ok(out)
    }

    fn shift_state(&self, reg: Register) -> JtagState {
        match reg {
            Register::Data => JtagState::ShiftDR,
            Register::Instruction => JtagState::ShiftIR,
        }
    }

    fn pause_state(&self, reg: Register) -> JtagState {
        match reg {
            Register::Data => JtagState::PauseDR,
            Register::Instruction => JtagState::PauseIR,
        }
    }
}
