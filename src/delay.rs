//! Pacing for the bit-banged clock.
//!
//! Every TCK edge is followed by a blocking sleep, so the JTAG clock runs at
//! roughly `1 / (2 * half_period)` no matter how fast the adapter is.
use eh1::delay::DelayNs;
use std::time::Duration;

/// Blocking delay backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;
impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Clock and LED pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time TCK is held after each edge.
    pub half_period: Duration,
    /// Time an EXTEST pattern stays applied before the next pin.
    pub settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            half_period: Duration::from_millis(1),
            settle: Duration::from_millis(100),
        }
    }
}

/// Sleep for `duration` on `delay`, splitting it so no `u32` overflows.
pub(crate) fn wait(delay: &mut impl DelayNs, duration: Duration) {
    let us = duration.as_micros();
    if us == 0 {
        if duration.subsec_nanos() > 0 {
            delay.delay_ns(duration.subsec_nanos());
        }
        return;
    }
    let ms = (us / 1000).min(u32::MAX as u128) as u32;
    if ms > 0 {
        delay.delay_ms(ms);
    }
    let rest = (us % 1000) as u32;
    if rest > 0 {
        delay.delay_us(rest);
    }
}

#[cfg(test)]
mod test {
    use super::{Timing, wait};
    use eh1::delay::DelayNs;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder(Vec<u64>);
    impl DelayNs for Recorder {
        fn delay_ns(&mut self, ns: u32) {
            self.0.push(ns as u64);
        }
    }

    #[test]
    fn wait_splits_into_ms_and_us() {
        let mut delay = Recorder::default();
        wait(&mut delay, Duration::from_micros(2_500));
        assert_eq!(delay.0.iter().sum::<u64>(), 2_500_000);
    }

    #[test]
    fn wait_zero_is_noop() {
        let mut delay = Recorder::default();
        wait(&mut delay, Duration::ZERO);
        assert!(delay.0.is_empty());
    }

    #[test]
    fn default_timing_is_one_ms_clock() {
        let timing = Timing::default();
        assert_eq!(timing.half_period, Duration::from_millis(1));
        assert_eq!(timing.settle, Duration::from_millis(100));
    }
}
