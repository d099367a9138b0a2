use eh1::delay::DelayNs;

use super::tap::{EXIT1_IR_TO_IDLE, IDLE_TO_SHIFT_DR, IDLE_TO_SHIFT_IR, SHIFT_DR_TO_IDLE};
use super::{Device, JtagPort, JtagTap};
use crate::FtdiError;

/// Endless walk over [`Device::pins`], driving one boundary cell high at a
/// time through EXTEST.
///
/// Each call to `next` exercises one pin and yields its index once the
/// settle interval has elapsed. A pass over the pins starts with a TAP reset.
/// If a step fails the error is yielded and the following step starts a new
/// pass from the first pin. Stop by dropping the iterator; the TAP is then
/// left driving the last pattern.
pub struct PinCycle<'a, P, D> {
    tap: &'a mut JtagTap<P, D>,
    device: &'a Device,
    position: usize,
}

pub fn exercise_pins<'a, P: JtagPort, D: DelayNs>(
    tap: &'a mut JtagTap<P, D>,
    device: &'a Device,
) -> PinCycle<'a, P, D> {
    PinCycle {
        tap,
        device,
        position: 0,
    }
}

impl<P: JtagPort, D: DelayNs> PinCycle<'_, P, D> {
    pub fn tap(&self) -> &JtagTap<P, D> {
        self.tap
    }

    fn exercise(&mut self, pin: usize) -> Result<(), FtdiError> {
        let device = self.device;
        if self.position == 0 {
            self.tap.reset()?;
        }
        log::debug!("EXTEST pin {pin}");
        self.tap.tms_sequence(&IDLE_TO_SHIFT_DR)?;
        self.tap
            .shift_boundary_pattern(device.boundary_register_length, pin)?;
        self.tap.tms_sequence(&SHIFT_DR_TO_IDLE)?;
        self.tap.tms_sequence(&IDLE_TO_SHIFT_IR)?;
        self.tap
            .shift_out(device.extest_instruction, device.instruction_length)?;
        self.tap.tms_sequence(&EXIT1_IR_TO_IDLE)?;
        self.tap.settle();
        Ok(())
    }
}

impl<P: JtagPort, D: DelayNs> Iterator for PinCycle<'_, P, D> {
    type Item = Result<usize, FtdiError>;

    /// Never returns `None` unless the device has no pins.
    fn next(&mut self) -> Option<Self::Item> {
        let pin = *self.device.pins.get(self.position)?;
        match self.exercise(pin) {
            Ok(()) => {
                self.position = (self.position + 1) % self.device.pins.len();
                Some(Ok(pin))
            }
            Err(e) => {
                log::warn!("EXTEST pin {pin} failed: {e}");
                self.position = 0;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::Timing;
    use crate::jtag::mock::{MockPort, NoDelay};
    use crate::jtag::tap::RESET;
    use crate::jtag::{TapState, XC2C32A_VQ44, XC2C64A_VQ44};
    use std::borrow::Cow;

    fn tap(port: MockPort) -> JtagTap<MockPort, NoDelay> {
        JtagTap::with_delay(port, NoDelay::default(), Timing::default())
    }

    fn pin_tms(length: usize, instruction_length: usize) -> Vec<bool> {
        let mut tms = IDLE_TO_SHIFT_DR.to_vec();
        tms.extend(std::iter::repeat_n(false, length + 1));
        tms.extend(SHIFT_DR_TO_IDLE);
        tms.extend(IDLE_TO_SHIFT_IR);
        tms.extend(std::iter::repeat_n(false, instruction_length - 1));
        tms.push(true);
        tms.extend(EXIT1_IR_TO_IDLE);
        tms
    }

    #[test]
    fn visits_pins_in_declared_order() {
        let mut tap = tap(MockPort::new());
        let visited: Vec<usize> = exercise_pins(&mut tap, &XC2C32A_VQ44)
            .take(5)
            .map(Result::unwrap)
            .collect();
        assert_eq!(visited, [46, 94, 46, 94, 46]);
    }

    #[test]
    fn one_pass_tms_sequence() {
        let mut tap = tap(MockPort::new());
        let visited: Vec<usize> = exercise_pins(&mut tap, &XC2C32A_VQ44)
            .take(2)
            .map(Result::unwrap)
            .collect();
        assert_eq!(visited, [46, 94]);

        let mut expected = RESET.to_vec();
        expected.extend(pin_tms(97, 8));
        expected.extend(pin_tms(97, 8));
        assert_eq!(tap.port().tms(), expected);
        let (_, end) = tap.port().replay(TapState::ShiftIr);
        assert_eq!(end, TapState::RunTestIdle);
    }

    #[test]
    fn boundary_shift_sets_only_the_target_cell() {
        let mut tap = tap(MockPort::new());
        let mut cycle = exercise_pins(&mut tap, &XC2C64A_VQ44);
        assert_eq!(cycle.next().unwrap().unwrap(), 95);
        assert_eq!(cycle.next().unwrap().unwrap(), 191);

        let port = tap.port();
        let (before, _) = port.replay(TapState::TestLogicReset);
        let shifted: Vec<Vec<bool>> = before
            .iter()
            .zip(port.edges())
            .collect::<Vec<_>>()
            .split(|(state, pins)| **state != TapState::ShiftDr || pins.tms())
            .filter(|run| !run.is_empty())
            .map(|run| run.iter().map(|(_, pins)| pins.tdi()).collect())
            .collect();
        assert_eq!(shifted.len(), 2);
        for (bits, pin) in shifted.iter().zip([95, 191]) {
            // 192 cells, the selected one clocked twice.
            assert_eq!(bits.len(), 193);
            let high: Vec<usize> = (0..bits.len()).filter(|&i| bits[i]).collect();
            assert_eq!(high, [pin, pin + 1]);
        }
    }

    #[test]
    fn extest_opcode_loaded_after_pattern() {
        let mut tap = tap(MockPort::new());
        exercise_pins(&mut tap, &XC2C32A_VQ44)
            .next()
            .unwrap()
            .unwrap();
        let port = tap.port();
        let (before, _) = port.replay(TapState::RunTestIdle);
        let ir: Vec<bool> = before
            .iter()
            .zip(port.edges())
            .filter(|(state, _)| **state == TapState::ShiftIr)
            .map(|(_, pins)| pins.tdi())
            .collect();
        assert_eq!(ir, [false; 8]);
    }

    #[test]
    fn settles_after_each_pin() {
        let timing = Timing {
            half_period: std::time::Duration::ZERO,
            settle: std::time::Duration::from_millis(100),
        };
        let mut tap = JtagTap::with_delay(MockPort::new(), NoDelay::default(), timing);
        let steps = exercise_pins(&mut tap, &XC2C32A_VQ44).take(3).count();
        assert_eq!(steps, 3);
        assert_eq!(tap.delay().total_ns, 300_000_000);
    }

    #[test]
    fn error_restarts_from_first_pin() {
        // Reset, navigation and EXTEST load are 3 writes per TMS pulse, the
        // boundary shift 2 per clock plus the TDI changes.
        let first_pin_writes = 285;
        let mut tap = tap(MockPort::new().failing_after(first_pin_writes + 10));
        let mut cycle = exercise_pins(&mut tap, &XC2C32A_VQ44);
        assert_eq!(cycle.next().unwrap().unwrap(), 46);
        assert!(matches!(cycle.next(), Some(Err(FtdiError::Usb(_)))));
        let edges_before = cycle.tap().port().edges().len();
        assert_eq!(cycle.next().unwrap().unwrap(), 46);
        assert_eq!(cycle.tap().port().tms()[edges_before..][..RESET.len()], RESET);
    }

    #[test]
    fn no_pins_no_steps() {
        let device = Device {
            pins: Cow::Borrowed(&[]),
            ..XC2C32A_VQ44.clone()
        };
        let mut tap = tap(MockPort::new());
        assert!(exercise_pins(&mut tap, &device).next().is_none());
        assert!(tap.port().writes.is_empty());
    }
}
