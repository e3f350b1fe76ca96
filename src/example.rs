//! The unit of training data flowing from callers into the trainer.

/// A single labeled training example.
///
/// `arrival_seq` is assigned by the owning [`crate::buffer::TrainingBuffer`]
/// at push time and is monotonically increasing per model; it is the sole
/// tiebreaker for training order and never reused.
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    /// Fixed-length ordered feature vector.
    pub features: Vec<f64>,
    /// Target value.
    pub label: f64,
    /// Relative importance of this example during fitting. Defaults to 1.0.
    pub weight: f64,
    /// Monotonically increasing arrival order, assigned on push.
    pub arrival_seq: u64,
}

impl Example {
    /// Construct an example with the default weight of 1.0. `arrival_seq` is
    /// left at 0 and is overwritten by the buffer on push.
    pub fn new(features: Vec<f64>, label: f64) -> Self {
        Self {
            features,
            label,
            weight: 1.0,
            arrival_seq: 0,
        }
    }

    /// Builder-style setter for `weight`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}
