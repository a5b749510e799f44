use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff with additive jitter.
///
/// The wait before retry `attempt` (0-based) is `min(base * 2^attempt, cap)`
/// plus a uniform random amount in `[0, jitter]`. The jitter keeps a batch
/// that hit the same rate limit from retrying in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    jitter: Duration,
}

impl BackoffPolicy {
    pub const fn new(base: Duration, cap: Duration, jitter: Duration) -> Self {
        Self { base, cap, jitter }
    }

    /// Policy used for generateContent calls. The cap covers the free-tier
    /// per-minute quota window.
    pub const fn remote_default() -> Self {
        Self::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
    }

    /// The deterministic part of the delay: `min(base * 2^attempt, cap)`.
    pub fn capped(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Full delay for `attempt`, drawing the jitter term from `rng`.
    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..=jitter_ms))
        };
        self.capped(attempt) + jitter
    }

    /// Full delay for `attempt` using the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn delay_stays_within_jittered_envelope() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..12 {
            let capped = policy.capped(attempt);
            let delay = policy.delay_with(attempt, &mut rng);
            assert!(delay >= capped, "attempt {attempt}: {delay:?} < {capped:?}");
            assert!(
                delay <= capped + Duration::from_secs(1),
                "attempt {attempt}: {delay:?} over the jitter bound"
            );
        }
    }

    #[test]
    fn capped_doubles_until_the_cap() {
        let policy = policy();
        assert_eq!(policy.capped(0), Duration::from_secs(2));
        assert_eq!(policy.capped(1), Duration::from_secs(4));
        assert_eq!(policy.capped(2), Duration::from_secs(8));
        assert_eq!(policy.capped(4), Duration::from_secs(32));
        assert_eq!(policy.capped(5), Duration::from_secs(60));
        assert_eq!(policy.capped(6), Duration::from_secs(60));
    }

    #[test]
    fn capped_is_non_decreasing() {
        let policy = policy();
        for attempt in 1..20 {
            assert!(policy.capped(attempt) >= policy.capped(attempt - 1));
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let policy = BackoffPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Duration::ZERO,
        );
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(policy.delay_with(3, &mut rng), policy.capped(3));
    }

    #[test]
    fn huge_attempt_does_not_overflow() {
        let policy = policy();
        assert_eq!(policy.capped(200), Duration::from_secs(60));
    }
}
