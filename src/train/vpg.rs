//! Vanilla Policy Gradient training loop
//!
//! The trainer drives the environment and learner through the rollout
//! buffer, one epoch at a time:
//!
//! ```text
//! For each epoch:
//!   1. Collect steps_per_epoch timesteps, closing trajectory segments at
//!      terminal states, at the episode length cap, and at the epoch
//!      boundary
//!   2. Drain the buffer (normalizing advantages)
//!   3. One learner update; record diagnostics
//! ```
//!
//! Collection preserves the classic reward offset: the reward stored with a
//! timestep is the one received from the *previous* transition, and the
//! first timestep of a trajectory stores 0. The terminal reward therefore
//! reaches the buffer only through the bootstrap value passed to
//! `finish_path`, which is why a naturally terminated trajectory bootstraps
//! with its final reward rather than 0.
//!
//! # References
//!
//! - [OpenAI Spinning Up: VPG](https://spinningup.openai.com/en/latest/algorithms/vpg.html)

use std::time::Instant;

use anyhow::{anyhow, Result};

use crate::buffer::{EncodeAction, RolloutBuffer};
use crate::env::Environment;
use crate::learner::{Diagnostics, Learner};
use crate::utils::stats::MetricTally;

/// VPG training loop configuration
#[derive(Debug, Clone)]
pub struct VpgConfig {
    /// Timesteps collected per epoch (the rollout buffer capacity)
    pub steps_per_epoch: usize,

    /// Number of epochs to run
    pub epochs: usize,

    /// Discount factor
    pub gamma: f32,

    /// GAE lambda parameter
    pub lam: f32,

    /// Hard cap on episode length; longer episodes are truncated and
    /// bootstrapped
    pub max_episode_len: usize,
}

impl Default for VpgConfig {
    fn default() -> Self {
        Self {
            steps_per_epoch: 4000,
            epochs: 50,
            gamma: 0.99,
            lam: 0.97,
            max_episode_len: 1000,
        }
    }
}

impl VpgConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_epoch == 0 {
            return Err(anyhow!("steps_per_epoch must be positive"));
        }
        if self.epochs == 0 {
            return Err(anyhow!("epochs must be positive"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(anyhow!("gamma must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.lam) {
            return Err(anyhow!("lam must be in [0, 1]"));
        }
        if self.max_episode_len == 0 {
            return Err(anyhow!("max_episode_len must be positive"));
        }
        Ok(())
    }

    /// Set timesteps per epoch
    pub fn steps_per_epoch(mut self, steps: usize) -> Self {
        self.steps_per_epoch = steps;
        self
    }

    /// Set number of epochs
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn lam(mut self, lam: f32) -> Self {
        self.lam = lam;
        self
    }

    /// Set the episode length cap
    pub fn max_episode_len(mut self, len: usize) -> Self {
        self.max_episode_len = len;
        self
    }
}

/// Outcome of one training epoch
#[derive(Debug, Clone)]
pub struct EpochSummary {
    /// Epoch index
    pub epoch: usize,

    /// Learner diagnostics for this epoch's update
    pub diagnostics: Diagnostics,

    /// Trajectories that ended at a terminal state or the length cap
    pub episodes_completed: usize,

    /// Trajectories cut off by the epoch boundary
    pub cutoff_trajectories: usize,
}

/// VPG trainer: the epoch/trajectory orchestrator
///
/// Owns the environment, the learner and the rollout buffer, and is the
/// only component that touches the buffer. Per-epoch metrics are recorded
/// into a caller-supplied [`MetricTally`].
#[derive(Debug)]
pub struct Trainer<E, L> {
    config: VpgConfig,
    env: E,
    learner: L,
    buffer: RolloutBuffer,
    total_steps: usize,
    total_episodes: usize,
}

impl<E, L> Trainer<E, L>
where
    E: Environment,
    E::Action: EncodeAction,
    L: Learner<Action = E::Action>,
{
    /// Create a trainer
    ///
    /// Buffer dimensions are taken from the environment's observation and
    /// action spaces.
    pub fn new(config: VpgConfig, env: E, learner: L) -> Result<Self> {
        config.validate()?;

        let buffer = RolloutBuffer::new(
            env.observation_dim(),
            env.action_space().buffer_width(),
            config.steps_per_epoch,
            config.gamma,
            config.lam,
        );

        Ok(Self { config, env, learner, buffer, total_steps: 0, total_episodes: 0 })
    }

    /// Get the configuration
    pub fn config(&self) -> &VpgConfig {
        &self.config
    }

    /// Reference to the learner
    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Total environment interactions so far
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Total trajectory segments finished so far
    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Run the configured number of epochs
    ///
    /// Returns one [`EpochSummary`] per epoch. Aggregate statistics are
    /// logged through `tally` at the end of each epoch.
    pub fn run(&mut self, tally: &mut MetricTally) -> Result<Vec<EpochSummary>> {
        let start = Instant::now();
        let mut summaries = Vec::with_capacity(self.config.epochs);

        let mut obs = self.env.reset()?;
        let mut reward = 0.0f32;
        let mut ep_ret = 0.0f32;
        let mut ep_len = 0usize;

        for epoch in 0..self.config.epochs {
            let mut episodes_completed = 0;
            let mut cutoff_trajectories = 0;

            while !self.buffer.is_full() {
                let (action, value, log_prob) = self.learner.act(&obs);

                // The reward stored here belongs to the previous
                // transition; it only becomes known after stepping
                self.buffer.store(&obs, &action, reward, value, log_prob);
                tally.record("VVals", value);

                let step = self.env.step(&action)?;
                obs = step.observation;
                reward = step.reward;
                ep_ret += reward;
                ep_len += 1;
                self.total_steps += 1;

                let episode_over = step.done || ep_len == self.config.max_episode_len;
                if episode_over || self.buffer.is_full() {
                    // A trajectory that did not reach a terminal state is
                    // bootstrapped through the learner's value estimate
                    let bootstrap = if step.done {
                        reward
                    } else {
                        self.learner.value_of(&obs)
                    };
                    self.buffer.finish_path(bootstrap);
                    self.total_episodes += 1;

                    if episode_over {
                        tally.record("EpRet", ep_ret);
                        tally.record("EpLen", ep_len as f32);
                        episodes_completed += 1;
                    } else {
                        tracing::warn!(
                            "trajectory cut off by epoch boundary at {} steps",
                            ep_len
                        );
                        cutoff_trajectories += 1;
                    }

                    obs = self.env.reset()?;
                    reward = 0.0;
                    ep_ret = 0.0;
                    ep_len = 0;
                }
            }

            let batch = self.buffer.drain();
            let diagnostics = self.learner.update(&batch);

            tally.record("LossPi", diagnostics.policy_loss);
            tally.record("LossV", diagnostics.value_loss);
            tally.record("dLossPi", diagnostics.policy_loss_delta);
            tally.record("dLossV", diagnostics.value_loss_delta);
            tally.record("Entropy", diagnostics.entropy_estimate);
            tally.record("KL", diagnostics.kl_estimate);

            self.log_epoch(epoch, tally, start);

            summaries.push(EpochSummary {
                epoch,
                diagnostics,
                episodes_completed,
                cutoff_trajectories,
            });
        }

        Ok(summaries)
    }

    /// Print this epoch's aggregate statistics, draining the tally
    fn log_epoch(&self, epoch: usize, tally: &mut MetricTally, start: Instant) {
        tally.log_value("Epoch", epoch as f32);
        tally.log_full("EpRet");
        tally.log_avg("EpLen");
        tally.log_full("VVals");
        tally.log_value("EnvInteracts", self.total_steps as f32);
        tally.log_avg("LossPi");
        tally.log_avg("LossV");
        tally.log_avg("dLossPi");
        tally.log_avg("dLossV");
        tally.log_avg("Entropy");
        tally.log_avg("KL");
        tally.log_value("Time", start.elapsed().as_secs_f32());
    }
}
