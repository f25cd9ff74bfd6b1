//! Environment trait and built-in environments
//!
//! This module defines the interface the training loop needs from a
//! simulated world: reset to an initial observation, step with an action,
//! and report the shapes of the observation and action spaces.

use anyhow::Result;

/// Core trait for RL environments
///
/// Observations are fixed-shape f32 vectors; the action type is chosen by
/// the environment (a discrete index or a continuous vector).
pub trait Environment {
    /// Action type
    type Action;

    /// Reset the environment and return the initial observation
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Step the environment with an action
    fn step(&mut self, action: &Self::Action) -> Result<StepResult>;

    /// Observation dimensionality
    fn observation_dim(&self) -> usize;

    /// Action space of this environment
    fn action_space(&self) -> ActionSpace;
}

/// Result of an environment step
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Vec<f32>,

    /// Reward received for this transition
    pub reward: f32,

    /// Whether the episode reached a true terminal state
    pub done: bool,
}

/// Action space of an environment, resolved once at startup
///
/// The variant picks which concrete learner drives the environment:
/// a categorical policy for `Discrete`, a Gaussian policy for `Continuous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSpace {
    /// Discrete space with `n` actions
    Discrete(usize),

    /// Continuous space with `dim` dimensions
    Continuous(usize),
}

impl ActionSpace {
    /// Width of one action row in the rollout buffer
    pub fn buffer_width(&self) -> usize {
        match self {
            ActionSpace::Discrete(_) => 1,
            ActionSpace::Continuous(dim) => *dim,
        }
    }
}

pub mod cartpole;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_width() {
        assert_eq!(ActionSpace::Discrete(5).buffer_width(), 1);
        assert_eq!(ActionSpace::Continuous(3).buffer_width(), 3);
    }
}
