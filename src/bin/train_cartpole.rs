//! Train a VPG agent on CartPole-v1
//!
//! ```bash
//! cargo run --release --bin train-cartpole -- --epochs 20 --steps 4000
//! ```

use anyhow::Result;
use clap::Parser;

use ascent_rl::env::cartpole::CartPole;
use ascent_rl::env::{ActionSpace, Environment};
use ascent_rl::learner::vpg::DiscreteVpg;
use ascent_rl::learner::LearnerConfig;
use ascent_rl::train::vpg::{Trainer, VpgConfig};
use ascent_rl::utils::stats::MetricTally;

/// Vanilla Policy Gradient on CartPole
#[derive(Debug, Parser)]
#[command(name = "train-cartpole", version)]
struct Args {
    /// Hidden layer width
    #[arg(long, default_value_t = 64)]
    hidden: usize,

    /// Number of hidden layers
    #[arg(long, default_value_t = 2)]
    layers: usize,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    gamma: f32,

    /// GAE lambda parameter
    #[arg(long, default_value_t = 0.97)]
    lam: f32,

    /// Timesteps per epoch
    #[arg(long, default_value_t = 4000)]
    steps: usize,

    /// Number of epochs
    #[arg(long, default_value_t = 20)]
    epochs: usize,

    /// Episode length cap
    #[arg(long, default_value_t = 1000)]
    max_ep_len: usize,

    /// Policy learning rate
    #[arg(long, default_value_t = 3e-4)]
    pi_lr: f32,

    /// Value function learning rate
    #[arg(long, default_value_t = 1e-3)]
    vf_lr: f32,

    /// RNG seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Save trained weights to this JSON file
    #[arg(long)]
    save: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();

    let env = CartPole::seeded(args.seed);
    let obs_dim = env.observation_dim();
    let n_actions = match env.action_space() {
        ActionSpace::Discrete(n) => n,
        ActionSpace::Continuous(_) => unreachable!("CartPole is discrete"),
    };

    tracing::info!("Environment: CartPole-v1");
    tracing::info!("  Observation dim: {}", obs_dim);
    tracing::info!("  Actions: {}", n_actions);
    tracing::info!("  Steps per epoch: {}", args.steps);
    tracing::info!("  Epochs: {}", args.epochs);

    let learner_config = LearnerConfig::new()
        .hidden_dim(args.hidden)
        .num_layers(args.layers)
        .pi_lr(args.pi_lr)
        .vf_lr(args.vf_lr)
        .seed(args.seed);
    learner_config.validate()?;
    let learner = DiscreteVpg::new(obs_dim, n_actions, learner_config);

    let config = VpgConfig::new()
        .steps_per_epoch(args.steps)
        .epochs(args.epochs)
        .gamma(args.gamma)
        .lam(args.lam)
        .max_episode_len(args.max_ep_len);

    let mut trainer = Trainer::new(config, env, learner)?;
    let mut tally = MetricTally::new();
    trainer.run(&mut tally)?;

    if let Some(path) = &args.save {
        trainer.learner().snapshot().save_json(path)?;
        tracing::info!("Saved weights to {}", path.display());
    }

    Ok(())
}
