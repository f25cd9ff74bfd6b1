//! CartPole-v1 environment
//!
//! A pole is balanced on a cart moving along a frictionless track; the agent
//! applies a fixed left or right force each timestep to keep the pole
//! upright.
//!
//! # Physics
//!
//! - State: `[x, x_dot, theta, theta_dot]` (cart position, cart velocity,
//!   pole angle, pole angular velocity)
//! - Actions: 0 (push left) or 1 (push right)
//! - Reward: +1 per timestep, including the terminating step
//! - Termination: pole angle beyond ±12° or cart position beyond ±2.4
//!
//! Episode length caps are the trainer's job (`max_episode_len`), not the
//! environment's.
//!
//! # Reference
//!
//! Based on OpenAI Gym CartPole-v1:
//! <https://github.com/openai/gym/blob/master/gym/envs/classic_control/cartpole.py>

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::env::{ActionSpace, Environment, StepResult};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
const HALF_POLE_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * HALF_POLE_LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;

/// CartPole-v1 environment with seeded reset noise
#[derive(Debug)]
pub struct CartPole {
    /// [x, x_dot, theta, theta_dot]
    state: [f32; 4],
    theta_threshold: f32,
    rng: StdRng,
}

impl CartPole {
    /// Create a CartPole seeded for reproducible resets
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: [0.0; 4],
            theta_threshold: 12.0f32.to_radians(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One Euler integration step of the cart-pole dynamics
    fn integrate(&mut self, force: f32) {
        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (HALF_POLE_LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
    }

    fn fallen(&self) -> bool {
        let [x, _, theta, _] = self.state;
        x.abs() > X_THRESHOLD || theta.abs() > self.theta_threshold
    }
}

impl Environment for CartPole {
    type Action = i64;

    fn reset(&mut self) -> Result<Vec<f32>> {
        // Small uniform perturbation around equilibrium, as in Gym
        for v in &mut self.state {
            *v = self.rng.gen_range(-0.05..0.05);
        }
        Ok(self.state.to_vec())
    }

    fn step(&mut self, action: &i64) -> Result<StepResult> {
        let force = if *action == 1 { FORCE_MAG } else { -FORCE_MAG };
        self.integrate(force);

        Ok(StepResult {
            observation: self.state.to_vec(),
            reward: 1.0,
            done: self.fallen(),
        })
    }

    fn observation_dim(&self) -> usize {
        4
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_near_equilibrium() {
        let mut env = CartPole::seeded(0);
        let obs = env.reset().unwrap();

        assert_eq!(obs.len(), 4);
        for &v in &obs {
            assert!(v.abs() < 0.05, "initial state should be a small perturbation, got {}", v);
        }
    }

    #[test]
    fn test_seeded_resets_reproduce() {
        let mut a = CartPole::seeded(7);
        let mut b = CartPole::seeded(7);
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
    }

    #[test]
    fn test_step_moves_state() {
        let mut env = CartPole::seeded(1);
        let before = env.reset().unwrap();
        let result = env.step(&1).unwrap();

        assert_eq!(result.observation.len(), 4);
        assert_eq!(result.reward, 1.0);
        assert_ne!(result.observation, before);
    }

    #[test]
    fn test_terminates_past_position_threshold() {
        let mut env = CartPole::seeded(2);
        env.reset().unwrap();
        env.state[0] = 3.0;

        let result = env.step(&0).unwrap();
        assert!(result.done);
        // Gym pays the reward on the terminating step too
        assert_eq!(result.reward, 1.0);
    }

    #[test]
    fn test_terminates_past_angle_threshold() {
        let mut env = CartPole::seeded(3);
        env.reset().unwrap();
        env.state[2] = 0.5;

        assert!(env.step(&0).unwrap().done);
    }

    #[test]
    fn test_spaces() {
        let env = CartPole::seeded(0);
        assert_eq!(env.observation_dim(), 4);
        assert_eq!(env.action_space(), ActionSpace::Discrete(2));
    }

    #[test]
    fn test_random_episode_ends() {
        let mut env = CartPole::seeded(4);
        env.reset().unwrap();

        let mut steps = 0;
        for i in 0..10_000 {
            let result = env.step(&(i % 2)).unwrap();
            steps += 1;
            if result.done {
                break;
            }
        }
        assert!(steps < 10_000, "alternating pushes should eventually drop the pole");
    }
}
