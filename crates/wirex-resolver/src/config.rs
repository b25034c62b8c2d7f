use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::ResolutionError;

/// Bounds on the backtracking search.
///
/// Both bounds are unset by default, so the search runs until it either
/// finds a consistent wiring or exhausts its permutations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Maximum number of candidate permutations tried by one resolve call
    pub max_attempts: Option<usize>,

    /// Wall-clock budget for one resolve call
    #[serde(rename = "time-budget-ms", with = "duration_ms")]
    pub time_budget: Option<Duration>,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Tracks consumption of the configured bounds during one resolve call.
#[derive(Debug)]
pub(crate) struct Budget {
    max_attempts: Option<usize>,
    deadline: Option<Instant>,
    attempts: usize,
}

impl Budget {
    pub(crate) fn start(config: &ResolverConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            deadline: config.time_budget.map(|budget| Instant::now() + budget),
            attempts: 0,
        }
    }

    /// Account for one more attempt, failing once a bound is exceeded
    pub(crate) fn next_attempt(&mut self, last: Option<&ResolutionError>) -> Result<(), ResolutionError> {
        let over_attempts = self.max_attempts.map_or(false, |max| self.attempts >= max);
        let over_time = self.deadline.map_or(false, |deadline| Instant::now() >= deadline);

        if over_attempts || over_time {
            return Err(ResolutionError::SearchExhausted {
                attempts: self.attempts,
                last: last.map(|err| Box::new(err.clone())),
            });
        }

        self.attempts += 1;
        Ok(())
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
