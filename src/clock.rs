use embassy_time::Instant;

/// Free-running microsecond counter that wraps at `u32::MAX`
pub trait Clock {
    fn now_micros(&mut self) -> u32;
}

/// Seconds between two readings of a wrapping microsecond counter.
///
/// `wrapping_sub` keeps the result correct across one wrap of the counter.
pub fn elapsed_secs(earlier: u32, now: u32) -> f32 {
    now.wrapping_sub(earlier) as f32 / 1_000_000.0
}

/// [`Clock`] on top of the embassy time driver
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_micros(&mut self) -> u32 {
        // truncation is the wrap
        Instant::now().as_micros() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_elapsed() {
        assert!((elapsed_secs(1_000, 11_000) - 0.01).abs() < 1e-7);
        assert_eq!(elapsed_secs(5, 5), 0.0);
    }

    #[test]
    fn elapsed_across_wrap() {
        let earlier = u32::MAX - 499;
        let now = 1_500;
        let dt = elapsed_secs(earlier, now);
        assert!(dt > 0.0);
        assert!((dt - 0.002).abs() < 1e-7);
    }

    #[test]
    fn embassy_clock_is_monotonic() {
        let mut clock = EmbassyClock;
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(elapsed_secs(a, b) < 1.0);
    }
}
