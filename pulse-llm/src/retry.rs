//! Retry bookkeeping for tiered generation.
//!
//! [`RetryState`] walks a tier of `M` models, giving each up to `T` attempts.
//! After a failure it says whether to sleep and retry the same model, move
//! to the next model, or give up. The attempt counter (and so the backoff)
//! restarts at each model. There is no sleep after a model's last attempt.

use std::time::Duration;

/// Exponential backoff: `base × 2^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    /// Create a policy.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Build from millisecond settings.
    #[must_use]
    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay after the `attempt`-th consecutive failure (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Sleep, then call the same model again.
    Retry {
        /// How long to sleep.
        delay: Duration,
    },
    /// Move straight to the next model.
    FallThrough {
        /// Index of the next model in the tier.
        next_model: usize,
    },
    /// No models left.
    Exhausted,
}

/// Position in the `models × attempts` grid.
#[derive(Debug, Clone)]
pub struct RetryState {
    model_count: usize,
    max_tries: u32,
    policy: BackoffPolicy,
    model_index: usize,
    attempt: u32,
    exhausted: bool,
}

impl RetryState {
    /// Start at the first attempt of the first model.
    #[must_use]
    pub fn new(model_count: usize, max_tries: u32, policy: BackoffPolicy) -> Self {
        Self {
            model_count,
            max_tries,
            policy,
            model_index: 0,
            attempt: 1,
            exhausted: model_count == 0 || max_tries == 0,
        }
    }

    /// `(model_index, attempt)` of the call to make next, 1-based attempt.
    #[must_use]
    pub fn current(&self) -> Option<(usize, u32)> {
        (!self.exhausted).then_some((self.model_index, self.attempt))
    }

    /// Record a failure of the current attempt and advance.
    pub fn on_failure(&mut self) -> Transition {
        if self.exhausted {
            return Transition::Exhausted;
        }
        if self.attempt < self.max_tries {
            let delay = self.policy.delay_for(self.attempt);
            self.attempt += 1;
            return Transition::Retry { delay };
        }
        if self.model_index + 1 < self.model_count {
            self.model_index += 1;
            self.attempt = 1;
            return Transition::FallThrough {
                next_model: self.model_index,
            };
        }
        self.exhausted = true;
        Transition::Exhausted
    }

    /// No further attempts remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::from_millis(1000, 60_000)
    }

    #[test]
    fn delay_doubles_and_caps() {
        let p = BackoffPolicy::from_millis(1000, 5000);
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
        assert_eq!(p.delay_for(3), Duration::from_secs(5));
        assert_eq!(p.delay_for(64), Duration::from_secs(5));
    }

    #[test]
    fn walks_every_cell_then_exhausts() {
        let mut state = RetryState::new(2, 3, policy());
        let mut visited = Vec::new();
        while let Some(cell) = state.current() {
            visited.push(cell);
            state.on_failure();
        }
        assert_eq!(visited, vec![(0, 1), (0, 2), (0, 3), (1, 1), (1, 2), (1, 3)]);
        assert!(state.is_exhausted());
        assert_eq!(state.on_failure(), Transition::Exhausted);
    }

    #[test]
    fn backoff_resets_on_fall_through() {
        let mut state = RetryState::new(2, 3, policy());
        assert_eq!(state.on_failure(), Transition::Retry { delay: Duration::from_secs(2) });
        assert_eq!(state.on_failure(), Transition::Retry { delay: Duration::from_secs(4) });
        assert_eq!(state.on_failure(), Transition::FallThrough { next_model: 1 });
        assert_eq!(state.on_failure(), Transition::Retry { delay: Duration::from_secs(2) });
    }

    #[test]
    fn single_try_falls_through_without_sleeping() {
        let mut state = RetryState::new(3, 1, policy());
        assert_eq!(state.on_failure(), Transition::FallThrough { next_model: 1 });
        assert_eq!(state.on_failure(), Transition::FallThrough { next_model: 2 });
        assert_eq!(state.on_failure(), Transition::Exhausted);
    }

    #[test]
    fn empty_tier_is_exhausted_immediately() {
        assert!(RetryState::new(0, 3, policy()).current().is_none());
        assert!(RetryState::new(2, 0, policy()).current().is_none());
    }
}
