use crate::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// Clock
///
/// Issues strictly-increasing timestamps. When the wall clock is coarser
/// than the write rate, the next token is bumped one microsecond past the
/// previous issuance, so two successful writes can never share an
/// `updatedAt` value.
///

#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next token; never repeats and never goes backwards.
    pub fn next(&self) -> Timestamp {
        let wall = Timestamp::wall_now().as_micros();
        let issued = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(wall.max(prev.saturating_add(1)))
            })
            .unwrap_or(wall);

        // fetch_update returns the previous value; recompute the stored one.
        Timestamp::from_micros(wall.max(issued.saturating_add(1)))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_strictly_increase() {
        let clock = Clock::new();
        let mut prev = clock.next();
        for _ in 0..10_000 {
            let next = clock.next();
            assert!(next > prev, "{next:?} must exceed {prev:?}");
            prev = next;
        }
    }

    #[test]
    fn tokens_track_the_wall_clock() {
        let clock = Clock::new();
        let wall = Timestamp::wall_now();
        assert!(clock.next() >= wall);
    }
}
