//! Rollout buffer for storing trajectories and computing advantages
//!
//! This module implements experience storage for VPG training:
//! - Append-only storage of one epoch of timesteps (observations, actions,
//!   rewards, value estimates, log probabilities)
//! - GAE-Lambda advantage computation per trajectory segment
//! - Discounted reward-to-go targets for the value function
//! - Epoch drain with advantage normalization
//!
//! # Buffer Layout
//!
//! All fields are flat, pre-allocated arrays of length `capacity`
//! (observations and actions use a row stride of `obs_dim` / `act_dim`).
//! A write cursor advances on every `store`; a path-start cursor marks the
//! beginning of the trajectory segment currently being collected. Derived
//! fields (advantage, return) are filled in by [`RolloutBuffer::finish_path`]
//! over the half-open span `[path_start, cursor)` and are undefined before
//! that call.

use crate::buffer::EncodeAction;
use crate::utils::stats::SeriesStats;

/// Discounted cumulative sum over a sequence
///
/// For input `x = [x0, x1, ..., xk]` produces `y` of the same length with
/// `y[i] = x[i] + discount * y[i+1]` and `y[k] = x[k]`, i.e.
///
/// ```text
/// y[i] = sum_{j=i}^{k} discount^(j-i) * x[j]
/// ```
///
/// Computed with a single right-to-left recurrence.
pub fn discount_cumsum(x: &[f32], discount: f32) -> Vec<f32> {
    let mut out = vec![0.0; x.len()];
    let mut running = 0.0;
    for i in (0..x.len()).rev() {
        running = x[i] + discount * running;
        out[i] = running;
    }
    out
}

/// Fixed-capacity store of one epoch of agent-environment interaction
///
/// The buffer is constructed once per training run and filled/drained once
/// per epoch. Trajectory segments are closed with
/// [`RolloutBuffer::finish_path`], which computes GAE-Lambda advantages and
/// reward-to-go returns for the segment; [`RolloutBuffer::drain`] hands the
/// full epoch to the learner with normalized advantages and resets the
/// cursors for reuse.
///
/// # Example
///
/// ```rust
/// use ascent_rl::buffer::RolloutBuffer;
///
/// let mut buffer = RolloutBuffer::new(4, 1, 8, 0.99, 0.95);
/// buffer.store(&[0.1, 0.2, 0.3, 0.4], &1i64, 0.0, 0.5, -0.7);
/// buffer.finish_path(0.0);
/// ```
#[derive(Debug)]
pub struct RolloutBuffer {
    /// Observation row width
    obs_dim: usize,

    /// Action row width
    act_dim: usize,

    /// Number of timesteps per epoch
    capacity: usize,

    /// Discount factor
    gamma: f32,

    /// GAE lambda parameter
    lam: f32,

    /// Observations: [capacity * obs_dim]
    obs_buf: Vec<f32>,

    /// Actions: [capacity * act_dim]
    act_buf: Vec<f32>,

    /// Rewards: [capacity]
    rew_buf: Vec<f32>,

    /// Value estimates: [capacity]
    val_buf: Vec<f32>,

    /// Action log probabilities: [capacity]
    logp_buf: Vec<f32>,

    /// Computed advantages: [capacity]
    adv_buf: Vec<f32>,

    /// Computed returns (reward-to-go): [capacity]
    ret_buf: Vec<f32>,

    /// Write cursor, `0 <= ptr <= capacity`
    ptr: usize,

    /// Start of the trajectory segment being collected,
    /// `0 <= path_start <= ptr`
    path_start: usize,
}

impl RolloutBuffer {
    /// Create a buffer for `capacity` timesteps
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation dimensionality
    /// * `act_dim` - Action row width (1 for discrete actions)
    /// * `capacity` - Timesteps per epoch
    /// * `gamma` - Discount factor
    /// * `lam` - GAE lambda parameter
    pub fn new(obs_dim: usize, act_dim: usize, capacity: usize, gamma: f32, lam: f32) -> Self {
        Self {
            obs_dim,
            act_dim,
            capacity,
            gamma,
            lam,
            obs_buf: vec![0.0; capacity * obs_dim],
            act_buf: vec![0.0; capacity * act_dim],
            rew_buf: vec![0.0; capacity],
            val_buf: vec![0.0; capacity],
            logp_buf: vec![0.0; capacity],
            adv_buf: vec![0.0; capacity],
            ret_buf: vec![0.0; capacity],
            ptr: 0,
            path_start: 0,
        }
    }

    /// Append one timestep of agent-environment interaction
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already full. Storing past capacity is an
    /// orchestration bug, not a recoverable condition.
    pub fn store<A: EncodeAction>(
        &mut self,
        obs: &[f32],
        action: &A,
        reward: f32,
        value: f32,
        log_prob: f32,
    ) {
        assert!(
            self.ptr < self.capacity,
            "rollout buffer full: store called at capacity {}",
            self.capacity
        );
        assert_eq!(obs.len(), self.obs_dim, "observation dimension mismatch");

        let o = self.ptr * self.obs_dim;
        self.obs_buf[o..o + self.obs_dim].copy_from_slice(obs);

        let a = self.ptr * self.act_dim;
        action.encode(&mut self.act_buf[a..a + self.act_dim]);

        self.rew_buf[self.ptr] = reward;
        self.val_buf[self.ptr] = value;
        self.logp_buf[self.ptr] = log_prob;
        self.ptr += 1;
    }

    /// Close the current trajectory segment and compute its targets
    ///
    /// Call at the end of a trajectory: terminal state, max-length cutoff,
    /// or epoch cutoff. Looks back to where the segment started and fills
    /// advantage and return targets for `[path_start, ptr)`:
    ///
    /// ```text
    /// delta[i]  = r[i] + gamma * v[i+1] - v[i]       (v, r bootstrap-extended)
    /// adv[i]    = discount_cumsum(delta, gamma * lam)[i]
    /// ret[i]    = discount_cumsum(r_with_bootstrap, gamma)[i]
    /// ```
    ///
    /// `bootstrap_value` should be 0 when the trajectory reached a true
    /// terminal state, and V(s_T) when it was cut off by a length cap or the
    /// epoch boundary, so the targets account for reward beyond the visible
    /// window.
    pub fn finish_path(&mut self, bootstrap_value: f32) {
        let span = self.path_start..self.ptr;
        let n = span.len();

        // Bootstrap-extended reward and value sequences of length n + 1
        let mut rews = Vec::with_capacity(n + 1);
        rews.extend_from_slice(&self.rew_buf[span.clone()]);
        rews.push(bootstrap_value);

        let mut vals = Vec::with_capacity(n + 1);
        vals.extend_from_slice(&self.val_buf[span.clone()]);
        vals.push(bootstrap_value);

        // GAE-Lambda advantages from the TD residuals
        let deltas: Vec<f32> =
            (0..n).map(|i| rews[i] + self.gamma * vals[i + 1] - vals[i]).collect();
        self.adv_buf[span.clone()]
            .copy_from_slice(&discount_cumsum(&deltas, self.gamma * self.lam));

        // Reward-to-go targets for the value function; the trailing
        // bootstrap entry is dropped after the scan
        let rtg = discount_cumsum(&rews, self.gamma);
        self.ret_buf[span].copy_from_slice(&rtg[..n]);

        self.path_start = self.ptr;
    }

    /// Drain the epoch: normalize advantages, reset cursors, return the data
    ///
    /// Advantages are shifted and scaled to mean 0 / std 1 across the whole
    /// epoch. The returned arrays are index-aligned: index `i` across all
    /// five describes the same timestep.
    ///
    /// # Panics
    ///
    /// Panics unless the buffer is exactly full. Draining a partial epoch is
    /// a caller bug.
    pub fn drain(&mut self) -> EpochBatch {
        assert!(
            self.ptr == self.capacity,
            "rollout buffer drained before full: {} of {} timesteps",
            self.ptr,
            self.capacity
        );
        self.ptr = 0;
        self.path_start = 0;

        let stats = SeriesStats::compute(&self.adv_buf);
        // Epsilon keeps a zero-variance epoch finite instead of producing
        // NaN advantages
        let scale = stats.std + 1e-8;
        let advantages: Vec<f32> = self.adv_buf.iter().map(|a| (a - stats.mean) / scale).collect();

        EpochBatch {
            obs_dim: self.obs_dim,
            act_dim: self.act_dim,
            observations: self.obs_buf.clone(),
            actions: self.act_buf.clone(),
            advantages,
            returns: self.ret_buf.clone(),
            log_probs: self.logp_buf.clone(),
        }
    }

    /// Timesteps per epoch
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of timesteps stored so far this epoch
    pub fn len(&self) -> usize {
        self.ptr
    }

    /// Whether nothing has been stored this epoch
    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }

    /// Whether the epoch is fully collected
    pub fn is_full(&self) -> bool {
        self.ptr == self.capacity
    }
}

/// One epoch of training data, drained from the buffer
///
/// Five index-aligned arrays of `len()` timesteps. Observations and actions
/// are flat with `obs_dim` / `act_dim` row strides; use
/// [`EpochBatch::observation`] and [`EpochBatch::action`] for row access.
#[derive(Debug, Clone)]
pub struct EpochBatch {
    /// Observation row width
    pub obs_dim: usize,

    /// Action row width
    pub act_dim: usize,

    /// Observations: [len * obs_dim]
    pub observations: Vec<f32>,

    /// Actions: [len * act_dim]
    pub actions: Vec<f32>,

    /// Normalized advantages: [len]
    pub advantages: Vec<f32>,

    /// Reward-to-go targets: [len]
    pub returns: Vec<f32>,

    /// Behavior-policy log probabilities: [len]
    pub log_probs: Vec<f32>,
}

impl EpochBatch {
    /// Number of timesteps in the batch
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Observation row at timestep `i`
    pub fn observation(&self, i: usize) -> &[f32] {
        &self.observations[i * self.obs_dim..(i + 1) * self.obs_dim]
    }

    /// Action row at timestep `i`
    pub fn action(&self, i: usize) -> &[f32] {
        &self.actions[i * self.act_dim..(i + 1) * self.act_dim]
    }
}
