//! Weight snapshots for trained learners
//!
//! Serializes policy and value network parameters to JSON so a trained
//! learner can be saved at the end of a run and restored later. Optimizer
//! state is not persisted; restoring starts Adam fresh.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::learner::net::Mlp;

/// Parameters of one feedforward network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpWeights {
    /// Layer sizes, input first
    pub sizes: Vec<usize>,

    /// Row-major weights per layer
    pub weights: Vec<Vec<f32>>,

    /// Biases per layer
    pub biases: Vec<Vec<f32>>,
}

impl MlpWeights {
    /// Extract the parameters of `net`
    pub fn from_net(net: &Mlp) -> Self {
        let (sizes, weights, biases) = net.parameters();
        Self {
            sizes: sizes.to_vec(),
            weights: weights.to_vec(),
            biases: biases.to_vec(),
        }
    }

    /// Build a network from these parameters with fresh optimizer state
    pub fn to_net(&self) -> Mlp {
        Mlp::from_parameters(self.sizes.clone(), self.weights.clone(), self.biases.clone())
    }
}

/// Snapshot of a VPG learner's weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    /// Policy network (logits head for discrete, mean head for Gaussian)
    pub policy: MlpWeights,

    /// Value network
    pub value: MlpWeights,

    /// Log standard deviations; present only for Gaussian policies
    pub log_std: Option<Vec<f32>>,
}

impl LearnerSnapshot {
    /// Save the snapshot to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Load a snapshot from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::vpg::DiscreteVpg;
    use crate::learner::{Learner, LearnerConfig};
    use tempfile::NamedTempFile;

    #[test]
    fn test_snapshot_round_trip() {
        let learner = DiscreteVpg::new(4, 2, LearnerConfig::default().seed(3));
        let snapshot = learner.snapshot();

        let file = NamedTempFile::new().unwrap();
        snapshot.save_json(file.path()).unwrap();
        let loaded = LearnerSnapshot::load_json(file.path()).unwrap();

        assert_eq!(loaded.policy.sizes, snapshot.policy.sizes);
        assert_eq!(loaded.policy.weights, snapshot.policy.weights);
        assert_eq!(loaded.value.biases, snapshot.value.biases);
        assert!(loaded.log_std.is_none());
    }

    #[test]
    fn test_restore_reproduces_values() {
        let learner = DiscreteVpg::new(4, 2, LearnerConfig::default().seed(5));
        let snapshot = learner.snapshot();

        let mut other = DiscreteVpg::new(4, 2, LearnerConfig::default().seed(99));
        let obs = [0.1, -0.2, 0.3, -0.4];
        assert_ne!(learner.value_of(&obs), other.value_of(&obs));

        other.restore(&snapshot);
        assert_eq!(learner.value_of(&obs), other.value_of(&obs));
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(LearnerSnapshot::load_json("/nonexistent/snapshot.json").is_err());
    }
}
