use std::time::Duration;

/// Delays applied after the 1st, 2nd, ... consecutive failed batch.
const BATCH_BACKOFF_SCHEDULE_MS: [u64; 7] = [1_000, 2_000, 5_000, 10_000, 30_000, 60_000, 120_000];
const MAX_BATCH_BACKOFF_MS: u64 = 300_000;

/// Once this many batches in a row have failed, every further failure
/// also waits out [`EXTENDED_COOLDOWN`].
pub const MAX_CONSECUTIVE_ERRORS_BEFORE_COOLDOWN: u32 = 20;
pub const EXTENDED_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// The scheduler reports itself healthy below this many consecutive errors.
pub const HEALTHY_CONSECUTIVE_ERROR_LIMIT: u32 = 5;

pub fn batch_backoff_delay(consecutive_errors: u32) -> Duration {
    let index = consecutive_errors.saturating_sub(1) as usize;
    let delay_ms = BATCH_BACKOFF_SCHEDULE_MS
        .get(index)
        .copied()
        .unwrap_or(MAX_BATCH_BACKOFF_MS);

    Duration::from_millis(delay_ms)
}

pub fn needs_extended_cooldown(consecutive_errors: u32) -> bool {
    consecutive_errors >= MAX_CONSECUTIVE_ERRORS_BEFORE_COOLDOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_progressive_schedule() {
        let delays: Vec<_> = (1..=8).map(|n| batch_backoff_delay(n).as_millis()).collect();

        assert_eq!(
            delays,
            vec![1_000, 2_000, 5_000, 10_000, 30_000, 60_000, 120_000, 300_000]
        );
    }

    #[test]
    fn caps_at_five_minutes() {
        assert_eq!(batch_backoff_delay(9), Duration::from_secs(300));
        assert_eq!(batch_backoff_delay(250), Duration::from_secs(300));
        assert_eq!(batch_backoff_delay(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn cools_down_from_the_twentieth_failure_on() {
        assert!(!needs_extended_cooldown(19));
        assert!(needs_extended_cooldown(20));
        assert!(needs_extended_cooldown(21));
    }
}
