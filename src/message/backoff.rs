use std::time::Duration;

/// An infinite stream of wait durations, growing by a constant factor up to
/// some maximum. The TCP transport drains this while trying to reach a peer
/// that has not opened its listening socket yet.
///
pub struct ExponentialBackoff {
    curr: Duration,
    max: Duration,
    factor: u32,
}

impl ExponentialBackoff {
    pub fn new(start: Duration, max: Duration, factor: u32) -> ExponentialBackoff {
        ExponentialBackoff {
            curr: start,
            max,
            factor,
        }
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let wait = self.curr;
        self.curr = (self.curr * self.factor).min(self.max);
        Some(wait)
    }
}
