//! Experience storage for on-policy training

pub mod rollout;

pub use rollout::{EpochBatch, RolloutBuffer};

/// Encoding of actions into fixed-width f32 buffer rows
///
/// The rollout buffer stores every action as a row of `act_dim` floats,
/// whatever the environment's native action type is. Discrete actions
/// occupy a single slot holding the action index; continuous actions
/// occupy one slot per dimension.
pub trait EncodeAction {
    /// Write this action into `row`, which has the buffer's action width
    fn encode(&self, row: &mut [f32]);
}

impl EncodeAction for i64 {
    fn encode(&self, row: &mut [f32]) {
        debug_assert_eq!(row.len(), 1, "discrete actions occupy one slot");
        row[0] = *self as f32;
    }
}

impl EncodeAction for Vec<f32> {
    fn encode(&self, row: &mut [f32]) {
        debug_assert_eq!(row.len(), self.len(), "action dimension mismatch");
        row.copy_from_slice(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_discrete() {
        let mut row = [0.0f32];
        3i64.encode(&mut row);
        assert_eq!(row[0], 3.0);
    }

    #[test]
    fn test_encode_continuous() {
        let mut row = [0.0f32; 3];
        vec![0.5, -1.0, 2.0].encode(&mut row);
        assert_eq!(row, [0.5, -1.0, 2.0]);
    }
}
