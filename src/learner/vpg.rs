//! VPG actor-critic learners
//!
//! Two concrete learners share the same update rule and differ only in the
//! policy head: [`DiscreteVpg`] drives a categorical (softmax) policy over
//! `n` actions, [`GaussianVpg`] a diagonal Gaussian with a state-independent
//! learnable log standard deviation. Which one to build is decided once at
//! startup from the environment's [`ActionSpace`](crate::env::ActionSpace).
//!
//! Per update:
//! - one Adam step on the policy loss `-mean(logp * adv)`
//! - `train_v_iters` Adam steps on the value loss `mean((ret - v)^2)`
//! - diagnostics measured before and after the update (losses, sample
//!   entropy, sample KL against the behavior log-probabilities)

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::buffer::EpochBatch;
use crate::learner::net::{AdamState, Mlp};
use crate::learner::snapshot::{LearnerSnapshot, MlpWeights};
use crate::learner::{Diagnostics, Learner, LearnerConfig};

const HALF_LN_TWO_PI: f32 = 0.918_938_5;

fn hidden_sizes(obs_dim: usize, out_dim: usize, config: &LearnerConfig) -> Vec<usize> {
    let mut sizes = vec![obs_dim];
    sizes.extend(std::iter::repeat(config.hidden_dim).take(config.num_layers));
    sizes.push(out_dim);
    sizes
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits.iter().map(|l| (l - max).exp()).sum::<f32>().ln();
    logits.iter().map(|l| l - max - log_sum).collect()
}

/// Shared per-epoch evaluation of policy loss, value loss and current
/// log-probabilities
struct Evaluation {
    pi_loss: f32,
    v_loss: f32,
    logps: Vec<f32>,
}

fn value_loss(vf: &Mlp, batch: &EpochBatch) -> f32 {
    let n = batch.len() as f32;
    (0..batch.len())
        .map(|i| {
            let v = vf.infer(batch.observation(i))[0];
            (batch.returns[i] - v).powi(2)
        })
        .sum::<f32>()
        / n
}

/// Run `train_v_iters` full-batch Adam steps of value regression
fn fit_value_fn(vf: &mut Mlp, batch: &EpochBatch, iters: usize, lr: f32) {
    let n = batch.len() as f32;
    for _ in 0..iters {
        let mut grads = vf.zero_grads();
        for i in 0..batch.len() {
            let cache = vf.forward(batch.observation(i));
            let err = cache.output()[0] - batch.returns[i];
            vf.backward(&cache, &[2.0 * err / n], &mut grads);
        }
        vf.apply_gradients(&grads, lr);
    }
}

fn diagnostics(before: &Evaluation, after: &Evaluation, batch: &EpochBatch) -> Diagnostics {
    let n = batch.len() as f32;
    let entropy_estimate = before.logps.iter().map(|l| -l).sum::<f32>() / n;
    let kl_estimate = batch
        .log_probs
        .iter()
        .zip(&after.logps)
        .map(|(old, new)| old - new)
        .sum::<f32>()
        / n;

    Diagnostics {
        policy_loss: before.pi_loss,
        value_loss: before.v_loss,
        kl_estimate,
        entropy_estimate,
        policy_loss_delta: after.pi_loss - before.pi_loss,
        value_loss_delta: after.v_loss - before.v_loss,
    }
}

/// VPG learner with a categorical policy over `n` discrete actions
#[derive(Debug)]
pub struct DiscreteVpg {
    pi: Mlp,
    vf: Mlp,
    n_actions: usize,
    config: LearnerConfig,
    rng: StdRng,
}

impl DiscreteVpg {
    /// Create a learner for `obs_dim`-dimensional observations and
    /// `n_actions` discrete actions
    pub fn new(obs_dim: usize, n_actions: usize, config: LearnerConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let pi = Mlp::new(&hidden_sizes(obs_dim, n_actions, &config), &mut rng);
        let vf = Mlp::new(&hidden_sizes(obs_dim, 1, &config), &mut rng);
        Self { pi, vf, n_actions, config, rng }
    }

    fn evaluate(&self, batch: &EpochBatch) -> Evaluation {
        let n = batch.len() as f32;
        let mut pi_loss = 0.0;
        let mut logps = Vec::with_capacity(batch.len());

        for i in 0..batch.len() {
            let logits = self.pi.infer(batch.observation(i));
            let action = batch.action(i)[0] as usize;
            let logp = log_softmax(&logits)[action];
            pi_loss -= logp * batch.advantages[i] / n;
            logps.push(logp);
        }

        Evaluation { pi_loss, v_loss: value_loss(&self.vf, batch), logps }
    }

    /// One Adam step on `-mean(logp * adv)`
    fn policy_gradient_step(&mut self, batch: &EpochBatch) {
        let n = batch.len() as f32;
        let mut grads = self.pi.zero_grads();

        for i in 0..batch.len() {
            let cache = self.pi.forward(batch.observation(i));
            let logp = log_softmax(cache.output());
            let action = batch.action(i)[0] as usize;
            let weight = batch.advantages[i] / n;

            // d(-logp_a * adv)/d(logits) = adv * (softmax - onehot(a))
            let mut d_logits: Vec<f32> =
                logp.iter().map(|l| weight * l.exp()).collect();
            d_logits[action] -= weight;

            self.pi.backward(&cache, &d_logits, &mut grads);
        }
        self.pi.apply_gradients(&grads, self.config.pi_lr);
    }

    /// Snapshot the current weights
    pub fn snapshot(&self) -> LearnerSnapshot {
        LearnerSnapshot {
            policy: MlpWeights::from_net(&self.pi),
            value: MlpWeights::from_net(&self.vf),
            log_std: None,
        }
    }

    /// Restore weights from a snapshot, resetting optimizer state
    pub fn restore(&mut self, snapshot: &LearnerSnapshot) {
        self.pi = snapshot.policy.to_net();
        self.vf = snapshot.value.to_net();
    }
}

impl Learner for DiscreteVpg {
    type Action = i64;

    fn act(&mut self, obs: &[f32]) -> (i64, f32, f32) {
        let logits = self.pi.infer(obs);
        let logp_all = log_softmax(&logits);
        let probs: Vec<f32> = logp_all.iter().map(|l| l.exp()).collect();

        let dist = WeightedIndex::new(&probs).expect("softmax produced invalid weights");
        let action = dist.sample(&mut self.rng);
        debug_assert!(action < self.n_actions);

        let value = self.vf.infer(obs)[0];
        (action as i64, value, logp_all[action])
    }

    fn value_of(&self, obs: &[f32]) -> f32 {
        self.vf.infer(obs)[0]
    }

    fn update(&mut self, batch: &EpochBatch) -> Diagnostics {
        let before = self.evaluate(batch);

        self.policy_gradient_step(batch);
        fit_value_fn(&mut self.vf, batch, self.config.train_v_iters, self.config.vf_lr);

        let after = self.evaluate(batch);
        diagnostics(&before, &after, batch)
    }
}

/// VPG learner with a diagonal Gaussian policy over continuous actions
///
/// The mean is produced by the policy network; the log standard deviation
/// is a state-independent learnable vector initialized at -0.5.
#[derive(Debug)]
pub struct GaussianVpg {
    mu: Mlp,
    vf: Mlp,
    log_std: Vec<f32>,
    log_std_opt: AdamState,
    config: LearnerConfig,
    rng: StdRng,
}

impl GaussianVpg {
    /// Create a learner for `obs_dim`-dimensional observations and
    /// `act_dim`-dimensional continuous actions
    pub fn new(obs_dim: usize, act_dim: usize, config: LearnerConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mu = Mlp::new(&hidden_sizes(obs_dim, act_dim, &config), &mut rng);
        let vf = Mlp::new(&hidden_sizes(obs_dim, 1, &config), &mut rng);
        Self {
            mu,
            vf,
            log_std: vec![-0.5; act_dim],
            log_std_opt: AdamState::new(act_dim),
            config,
            rng,
        }
    }

    fn log_prob(&self, mean: &[f32], action: &[f32]) -> f32 {
        mean.iter()
            .zip(action)
            .zip(&self.log_std)
            .map(|((m, a), ls)| {
                let z = (a - m) / ls.exp();
                -0.5 * z * z - ls - HALF_LN_TWO_PI
            })
            .sum()
    }

    fn evaluate(&self, batch: &EpochBatch) -> Evaluation {
        let n = batch.len() as f32;
        let mut pi_loss = 0.0;
        let mut logps = Vec::with_capacity(batch.len());

        for i in 0..batch.len() {
            let mean = self.mu.infer(batch.observation(i));
            let logp = self.log_prob(&mean, batch.action(i));
            pi_loss -= logp * batch.advantages[i] / n;
            logps.push(logp);
        }

        Evaluation { pi_loss, v_loss: value_loss(&self.vf, batch), logps }
    }

    fn policy_gradient_step(&mut self, batch: &EpochBatch) {
        let n = batch.len() as f32;
        let mut grads = self.mu.zero_grads();
        let mut d_log_std = vec![0.0; self.log_std.len()];

        for i in 0..batch.len() {
            let cache = self.mu.forward(batch.observation(i));
            let mean = cache.output().to_vec();
            let action = batch.action(i);
            let weight = batch.advantages[i] / n;

            // d(-logp * adv)/d(mean_j)    = -adv * (a_j - mu_j) / std_j^2
            // d(-logp * adv)/d(log_std_j) = -adv * (z_j^2 - 1),  z = (a - mu)/std
            let d_mean: Vec<f32> = mean
                .iter()
                .zip(action)
                .zip(&self.log_std)
                .map(|((m, a), ls)| {
                    let var = (2.0 * ls).exp();
                    -weight * (a - m) / var
                })
                .collect();
            for (j, ((m, a), ls)) in mean.iter().zip(action).zip(&self.log_std).enumerate() {
                let z = (a - m) / ls.exp();
                d_log_std[j] -= weight * (z * z - 1.0);
            }

            self.mu.backward(&cache, &d_mean, &mut grads);
        }

        self.mu.apply_gradients(&grads, self.config.pi_lr);
        self.log_std_opt.apply(&mut self.log_std, &d_log_std, self.config.pi_lr);
    }

    /// Snapshot the current weights
    pub fn snapshot(&self) -> LearnerSnapshot {
        LearnerSnapshot {
            policy: MlpWeights::from_net(&self.mu),
            value: MlpWeights::from_net(&self.vf),
            log_std: Some(self.log_std.clone()),
        }
    }

    /// Restore weights from a snapshot, resetting optimizer state
    pub fn restore(&mut self, snapshot: &LearnerSnapshot) {
        self.mu = snapshot.policy.to_net();
        self.vf = snapshot.value.to_net();
        if let Some(log_std) = &snapshot.log_std {
            self.log_std = log_std.clone();
            self.log_std_opt = AdamState::new(self.log_std.len());
        }
    }
}

impl Learner for GaussianVpg {
    type Action = Vec<f32>;

    fn act(&mut self, obs: &[f32]) -> (Vec<f32>, f32, f32) {
        let mean = self.mu.infer(obs);
        let action: Vec<f32> = mean
            .iter()
            .zip(&self.log_std)
            .map(|(m, ls)| m + ls.exp() * self.rng.sample::<f32, _>(StandardNormal))
            .collect();

        let logp = self.log_prob(&mean, &action);
        let value = self.vf.infer(obs)[0];
        (action, value, logp)
    }

    fn value_of(&self, obs: &[f32]) -> f32 {
        self.vf.infer(obs)[0]
    }

    fn update(&mut self, batch: &EpochBatch) -> Diagnostics {
        let before = self.evaluate(batch);

        self.policy_gradient_step(batch);
        fit_value_fn(&mut self.vf, batch, self.config.train_v_iters, self.config.vf_lr);

        let after = self.evaluate(batch);
        diagnostics(&before, &after, batch)
    }
}
