//! Learner trait and the VPG actor-critic implementation
//!
//! The training loop consumes a learner through three operations: choose an
//! action for an observation (returning the value estimate and action
//! log-probability alongside it), estimate the value of an observation for
//! bootstrapping, and update from one epoch of data.

use anyhow::{anyhow, Result};

use crate::buffer::{EncodeAction, EpochBatch};

pub mod net;
pub mod snapshot;
pub mod vpg;

/// Policy/value function consumed by the training loop
pub trait Learner {
    /// Native action type, convertible to a buffer row
    type Action: EncodeAction + Clone;

    /// Choose an action for `obs`
    ///
    /// Returns `(action, value_estimate, action_log_prob)`.
    fn act(&mut self, obs: &[f32]) -> (Self::Action, f32, f32);

    /// Value estimate for `obs`, used to bootstrap truncated trajectories
    fn value_of(&self, obs: &[f32]) -> f32;

    /// Update the policy and value function from one epoch of data
    fn update(&mut self, batch: &EpochBatch) -> Diagnostics;
}

/// Diagnostics returned by one learner update
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    /// Policy loss before the update
    pub policy_loss: f32,

    /// Value loss before the update
    pub value_loss: f32,

    /// Sample KL-divergence estimate between pre- and post-update policies
    pub kl_estimate: f32,

    /// Sample entropy estimate of the pre-update policy
    pub entropy_estimate: f32,

    /// Change in policy loss over the update
    pub policy_loss_delta: f32,

    /// Change in value loss over the update
    pub value_loss_delta: f32,
}

/// Learner hyperparameters
///
/// A fully-enumerated configuration with defaults matching the classic VPG
/// setup: a 2x64 tanh network, Adam with separate policy/value learning
/// rates, and 80 value-regression iterations per epoch.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    /// Hidden layer width
    pub hidden_dim: usize,

    /// Number of hidden layers
    pub num_layers: usize,

    /// Policy learning rate
    pub pi_lr: f32,

    /// Value function learning rate
    pub vf_lr: f32,

    /// Value-regression gradient steps per update
    pub train_v_iters: usize,

    /// RNG seed for weight initialization and action sampling
    pub seed: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 64,
            num_layers: 2,
            pi_lr: 3e-4,
            vf_lr: 1e-3,
            train_v_iters: 80,
            seed: 0,
        }
    }
}

impl LearnerConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(anyhow!("hidden_dim must be positive"));
        }
        if self.num_layers == 0 {
            return Err(anyhow!("num_layers must be positive"));
        }
        if self.pi_lr <= 0.0 {
            return Err(anyhow!("pi_lr must be positive"));
        }
        if self.vf_lr <= 0.0 {
            return Err(anyhow!("vf_lr must be positive"));
        }
        if self.train_v_iters == 0 {
            return Err(anyhow!("train_v_iters must be positive"));
        }
        Ok(())
    }

    /// Set hidden layer width
    pub fn hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    /// Set number of hidden layers
    pub fn num_layers(mut self, layers: usize) -> Self {
        self.num_layers = layers;
        self
    }

    /// Set policy learning rate
    pub fn pi_lr(mut self, lr: f32) -> Self {
        self.pi_lr = lr;
        self
    }

    /// Set value function learning rate
    pub fn vf_lr(mut self, lr: f32) -> Self {
        self.vf_lr = lr;
        self
    }

    /// Set value-regression iterations per update
    pub fn train_v_iters(mut self, iters: usize) -> Self {
        self.train_v_iters = iters;
        self
    }

    /// Set the RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = LearnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hidden_dim, 64);
        assert_eq!(config.num_layers, 2);
        assert_eq!(config.train_v_iters, 80);
    }

    #[test]
    fn test_config_validation() {
        assert!(LearnerConfig::new().hidden_dim(0).validate().is_err());
        assert!(LearnerConfig::new().num_layers(0).validate().is_err());
        assert!(LearnerConfig::new().pi_lr(-1.0).validate().is_err());
        assert!(LearnerConfig::new().vf_lr(0.0).validate().is_err());
        assert!(LearnerConfig::new().train_v_iters(0).validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = LearnerConfig::new().hidden_dim(32).num_layers(3).seed(9);
        assert_eq!(config.hidden_dim, 32);
        assert_eq!(config.num_layers, 3);
        assert_eq!(config.seed, 9);
        // Untouched fields keep defaults
        assert_eq!(config.pi_lr, 3e-4);
    }
}
