//! Tuning knobs for the search and the budget a driver spends on it

use std::time::Duration;

use crate::error::{Error, Result};

/// The exploration constant of the UCB1 formula, roughly sqrt(2)
pub const DEFAULT_EXPLORATION: f64 = 1.414;

/// Time spent per move when no other budget is given
pub const DEFAULT_MOVE_TIME: Duration = Duration::from_millis(95);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Weight of the exploration term in UCB1
    pub exploration: f64,
    /// Expand immediate wins and central columns first
    pub sort_moves: bool,
}

impl SearchConfig {
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_sort_moves(mut self, sort_moves: bool) -> Self {
        self.sort_moves = sort_moves;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "exploration constant must be finite and non-negative, got {}",
                self.exploration
            )));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration: DEFAULT_EXPLORATION,
            sort_moves: true,
        }
    }
}

/// How much search to run before a move is chosen
///
/// The budget is only checked between two simulations, a simulation
/// is never interrupted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Budget {
    Iterations(u64),
    Time(Duration),
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Time(DEFAULT_MOVE_TIME)
    }
}
