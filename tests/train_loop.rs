//! Orchestration sequencing tests for the VPG training loop
//!
//! Uses scripted environment/learner doubles to pin down the collection
//! protocol: the store-then-step reward offset, trajectory boundary
//! detection, bootstrap selection, and buffer fill/drain per epoch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ascent_rl::buffer::EpochBatch;
use ascent_rl::env::cartpole::CartPole;
use ascent_rl::env::{ActionSpace, Environment, StepResult};
use ascent_rl::learner::vpg::DiscreteVpg;
use ascent_rl::learner::{Diagnostics, Learner, LearnerConfig};
use ascent_rl::train::vpg::{Trainer, VpgConfig};
use ascent_rl::utils::stats::MetricTally;

/// Environment that pays reward `t + 1` at the t-th step of every episode
/// and terminates after `episode_len` steps (never, if `episode_len` is 0)
struct ScriptedEnv {
    episode_len: usize,
    t: usize,
}

impl ScriptedEnv {
    fn new(episode_len: usize) -> Self {
        Self { episode_len, t: 0 }
    }
}

impl Environment for ScriptedEnv {
    type Action = i64;

    fn reset(&mut self) -> anyhow::Result<Vec<f32>> {
        self.t = 0;
        Ok(vec![0.0, 0.0])
    }

    fn step(&mut self, _action: &i64) -> anyhow::Result<StepResult> {
        self.t += 1;
        Ok(StepResult {
            observation: vec![self.t as f32, 0.0],
            reward: self.t as f32,
            done: self.episode_len != 0 && self.t == self.episode_len,
        })
    }

    fn observation_dim(&self) -> usize {
        2
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(2)
    }
}

/// Learner double that records bootstrap queries and captures the batch
#[derive(Default)]
struct ScriptedLearner {
    value_of_calls: Cell<usize>,
    batches: Rc<RefCell<Vec<EpochBatch>>>,
}

impl Learner for ScriptedLearner {
    type Action = i64;

    fn act(&mut self, _obs: &[f32]) -> (i64, f32, f32) {
        (0, 0.0, -0.5)
    }

    fn value_of(&self, _obs: &[f32]) -> f32 {
        self.value_of_calls.set(self.value_of_calls.get() + 1);
        7.0
    }

    fn update(&mut self, batch: &EpochBatch) -> Diagnostics {
        self.batches.borrow_mut().push(batch.clone());
        Diagnostics::default()
    }
}

#[test]
fn stored_rewards_are_shifted_one_step() {
    // gamma = 0 makes each return equal the stored reward, exposing the
    // raw reward sequence through the drained batch
    let batches = Rc::new(RefCell::new(Vec::new()));
    let learner = ScriptedLearner { batches: Rc::clone(&batches), ..Default::default() };
    let config = VpgConfig::new().steps_per_epoch(6).epochs(1).gamma(0.0).lam(0.0);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(3), learner).unwrap();
    trainer.run(&mut MetricTally::new()).unwrap();

    // Episodes pay rewards 1, 2, 3; stored rewards lag by one step, so
    // each trajectory's stored sequence is [0, 1, 2]
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].returns, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
}

#[test]
fn terminal_trajectories_do_not_query_the_value_fn() {
    // Capacity is a multiple of the episode length: every trajectory ends
    // done, so the bootstrap is the final reward and value_of is never used
    let learner = ScriptedLearner::default();
    let config = VpgConfig::new().steps_per_epoch(6).epochs(2).gamma(0.5).lam(0.9);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(3), learner).unwrap();
    let summaries = trainer.run(&mut MetricTally::new()).unwrap();

    assert_eq!(trainer.learner().value_of_calls.get(), 0);
    for summary in &summaries {
        assert_eq!(summary.episodes_completed, 2);
        assert_eq!(summary.cutoff_trajectories, 0);
    }
}

#[test]
fn epoch_boundary_cutoff_bootstraps_through_learner() {
    // Episode length 3 against capacity 4: the second trajectory is cut
    // off after one step and must bootstrap via value_of
    let learner = ScriptedLearner::default();
    let config = VpgConfig::new().steps_per_epoch(4).epochs(1).gamma(0.5).lam(0.9);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(3), learner).unwrap();
    let summaries = trainer.run(&mut MetricTally::new()).unwrap();

    assert_eq!(trainer.learner().value_of_calls.get(), 1);
    assert_eq!(summaries[0].episodes_completed, 1);
    assert_eq!(summaries[0].cutoff_trajectories, 1);
}

#[test]
fn cutoff_bootstrap_value_reaches_the_returns() {
    // Single one-step trajectory cut off at the epoch boundary; with the
    // stored reward 0 the return is exactly gamma * bootstrap
    let batches = Rc::new(RefCell::new(Vec::new()));
    let learner = ScriptedLearner { batches: Rc::clone(&batches), ..Default::default() };
    let config = VpgConfig::new().steps_per_epoch(1).epochs(1).gamma(0.5).lam(0.9);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(0), learner).unwrap();
    trainer.run(&mut MetricTally::new()).unwrap();

    let batches = batches.borrow();
    assert!((batches[0].returns[0] - 0.5 * 7.0).abs() < 1e-6);
}

#[test]
fn length_cap_truncates_and_counts_as_episode() {
    // Environment never terminates; the cap closes trajectories and they
    // still count as completed episodes, bootstrapped through the learner
    let learner = ScriptedLearner::default();
    let config = VpgConfig::new()
        .steps_per_epoch(4)
        .epochs(1)
        .gamma(0.9)
        .lam(0.9)
        .max_episode_len(2);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(0), learner).unwrap();
    let summaries = trainer.run(&mut MetricTally::new()).unwrap();

    assert_eq!(summaries[0].episodes_completed, 2);
    assert_eq!(summaries[0].cutoff_trajectories, 0);
    assert_eq!(trainer.learner().value_of_calls.get(), 2);
}

#[test]
fn episode_statistics_accumulate_in_the_tally() {
    let learner = ScriptedLearner::default();
    let config = VpgConfig::new().steps_per_epoch(6).epochs(1).gamma(0.5).lam(0.9);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(3), learner).unwrap();
    let mut tally = MetricTally::new();

    // Peek mid-run is not possible; instead check the tally drained after
    // the epoch log and the value series was recorded per step
    trainer.run(&mut tally).unwrap();
    assert_eq!(tally.count("EpRet"), 0);
    assert_eq!(tally.count("VVals"), 0);
}

#[test]
fn one_update_per_epoch() {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let learner = ScriptedLearner { batches: Rc::clone(&batches), ..Default::default() };
    let config = VpgConfig::new().steps_per_epoch(3).epochs(4).gamma(0.5).lam(0.5);

    let mut trainer = Trainer::new(config, ScriptedEnv::new(3), learner).unwrap();
    trainer.run(&mut MetricTally::new()).unwrap();

    let batches = batches.borrow();
    assert_eq!(batches.len(), 4);
    for batch in batches.iter() {
        assert_eq!(batch.len(), 3);
    }
    assert_eq!(trainer.total_steps(), 12);
}

#[test]
fn cartpole_end_to_end() {
    let env = CartPole::seeded(0);
    let learner = DiscreteVpg::new(4, 2, LearnerConfig::default().train_v_iters(10).seed(0));
    let config = VpgConfig::new()
        .steps_per_epoch(200)
        .epochs(3)
        .max_episode_len(100);

    let mut trainer = Trainer::new(config, env, learner).unwrap();
    let mut tally = MetricTally::new();
    let summaries = trainer.run(&mut tally).unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(trainer.total_steps(), 600);
    for summary in &summaries {
        let d = &summary.diagnostics;
        for v in [
            d.policy_loss,
            d.value_loss,
            d.kl_estimate,
            d.entropy_estimate,
            d.policy_loss_delta,
            d.value_loss_delta,
        ] {
            assert!(v.is_finite(), "non-finite diagnostic: {:?}", d);
        }
        // Untrained CartPole episodes are short; every epoch should
        // complete at least one
        assert!(summary.episodes_completed >= 1);
    }
}
