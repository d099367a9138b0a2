//! Software stand-in for the adapter, used by the unit tests.
use std::collections::VecDeque;

use super::{JtagPort, PinState, TapState};
use crate::FtdiError;

/// What `read_pins` reports on TDO.
pub(crate) enum Tdo {
    /// Bits served in order, low once exhausted.
    Script(VecDeque<bool>),
    /// The n-th read returns the TDI level of the n-th rising TCK edge.
    Loopback,
}

pub(crate) struct MockPort {
    /// Every byte written, in order.
    pub(crate) writes: Vec<PinState>,
    pub(crate) reads: usize,
    tdo: Tdo,
    /// TDI and TMS sampled on each rising TCK edge.
    edges: Vec<PinState>,
    last: PinState,
    fail_after: Option<usize>,
}

impl MockPort {
    fn with_tdo(tdo: Tdo) -> Self {
        Self {
            writes: Vec::new(),
            reads: 0,
            tdo,
            edges: Vec::new(),
            last: PinState::new(),
            fail_after: None,
        }
    }
    pub(crate) fn new() -> Self {
        Self::with_tdo(Tdo::Script(VecDeque::new()))
    }
    pub(crate) fn loopback() -> Self {
        Self::with_tdo(Tdo::Loopback)
    }
    /// A device that shifts out `value` LSB-first on every read.
    pub(crate) fn serving(value: u32, width: usize) -> Self {
        let bits = (0..width).map(|i| (value >> i) & 1 == 1).collect();
        Self::with_tdo(Tdo::Script(bits))
    }
    /// Fail the write that follows the first `writes` successful ones, once.
    pub(crate) fn failing_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }
    pub(crate) fn edges(&self) -> &[PinState] {
        &self.edges
    }
    /// TMS levels seen on rising edges.
    pub(crate) fn tms(&self) -> Vec<bool> {
        self.edges.iter().map(|pins| pins.tms()).collect()
    }
    /// Run a TAP model over the recorded edges, returning the state before
    /// each edge and the final state.
    pub(crate) fn replay(&self, start: TapState) -> (Vec<TapState>, TapState) {
        let mut state = start;
        let mut before = Vec::with_capacity(self.edges.len());
        for pins in &self.edges {
            before.push(state);
            state = state.next(pins.tms());
        }
        (before, state)
    }
}

impl JtagPort for MockPort {
    fn write_pins(&mut self, pins: PinState) -> Result<usize, FtdiError> {
        if let Some(limit) = self.fail_after {
            if self.writes.len() == limit {
                self.fail_after = None;
                return Err(FtdiError::Usb(std::io::Error::other("unplugged")));
            }
        }
        if pins.tck() && !self.last.tck() {
            self.edges.push(pins);
        }
        self.last = pins;
        self.writes.push(pins);
        Ok(1)
    }

    fn read_pins(&mut self) -> Result<PinState, FtdiError> {
        let tdo = match &mut self.tdo {
            Tdo::Script(bits) => bits.pop_front().unwrap_or(false),
            Tdo::Loopback => self
                .edges
                .get(self.reads)
                .map(|pins| pins.tdi())
                .unwrap_or(false),
        };
        self.reads += 1;
        Ok(self.last.with_tdo(tdo))
    }
}

/// Delay that returns immediately and remembers what was asked for.
#[derive(Default)]
pub(crate) struct NoDelay {
    pub(crate) total_ns: u64,
}

impl eh1::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
