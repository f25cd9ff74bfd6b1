//! Small feedforward networks with manual forward/backward passes
//!
//! The VPG networks are small enough (two or three tanh layers of width
//! ~64) that explicit backpropagation is simpler than pulling in an autograd
//! framework. This module provides the MLP, its gradient accumulator, and a
//! per-tensor Adam optimizer state.
//!
//! # Architecture
//!
//! ```text
//! input -> [Linear -> tanh] * num_layers -> Linear (raw output)
//! ```
//!
//! Weights are stored row-major as `[fan_in * fan_out]` per layer and
//! initialized with Xavier-scaled Gaussian noise.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Adam optimizer state for one parameter tensor
///
/// Keeps first/second moment estimates and a step counter for bias
/// correction. Standard constants: beta1 = 0.9, beta2 = 0.999, eps = 1e-8.
#[derive(Debug, Clone)]
pub struct AdamState {
    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl AdamState {
    /// Zero-initialized state for a tensor of `len` parameters
    pub fn new(len: usize) -> Self {
        Self { m: vec![0.0; len], v: vec![0.0; len], t: 0 }
    }

    /// Apply one Adam step to `params` given `grads`
    pub fn apply(&mut self, params: &mut [f32], grads: &[f32], lr: f32) {
        debug_assert_eq!(params.len(), grads.len());

        const BETA1: f32 = 0.9;
        const BETA2: f32 = 0.999;
        const EPS: f32 = 1e-8;

        self.t += 1;
        let bc1 = 1.0 - BETA1.powi(self.t);
        let bc2 = 1.0 - BETA2.powi(self.t);

        for i in 0..params.len() {
            self.m[i] = BETA1 * self.m[i] + (1.0 - BETA1) * grads[i];
            self.v[i] = BETA2 * self.v[i] + (1.0 - BETA2) * grads[i] * grads[i];
            let m_hat = self.m[i] / bc1;
            let v_hat = self.v[i] / bc2;
            params[i] -= lr * m_hat / (v_hat.sqrt() + EPS);
        }
    }
}

/// Gradients of an [`Mlp`]'s weights and biases, one entry per layer
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Weight gradients: [layer][fan_in * fan_out]
    pub weights: Vec<Vec<f32>>,

    /// Bias gradients: [layer][fan_out]
    pub biases: Vec<Vec<f32>>,
}

/// Activations cached during a forward pass, consumed by backprop
#[derive(Debug)]
pub struct ForwardCache {
    /// Post-activation values per layer; `[0]` is the input, the last entry
    /// is the raw (linear) network output
    activations: Vec<Vec<f32>>,
}

impl ForwardCache {
    /// Raw network output
    pub fn output(&self) -> &[f32] {
        self.activations.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Feedforward network with tanh hidden layers and a linear output layer
#[derive(Debug, Clone)]
pub struct Mlp {
    /// Layer sizes, input first: `[in, hidden..., out]`
    sizes: Vec<usize>,

    /// Row-major weights: [layer][fan_in * fan_out]
    weights: Vec<Vec<f32>>,

    /// Biases: [layer][fan_out]
    biases: Vec<Vec<f32>>,

    /// Adam state per weight tensor
    opt_w: Vec<AdamState>,

    /// Adam state per bias tensor
    opt_b: Vec<AdamState>,
}

impl Mlp {
    /// Create a network with the given layer sizes, input first
    ///
    /// Weights are drawn from `N(0, 2 / (fan_in + fan_out))`; biases start
    /// at zero.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two sizes are given.
    pub fn new(sizes: &[usize], rng: &mut StdRng) -> Self {
        assert!(sizes.len() >= 2, "a network needs at least input and output sizes");

        let mut weights = Vec::new();
        let mut biases = Vec::new();
        let mut opt_w = Vec::new();
        let mut opt_b = Vec::new();

        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let scale = (2.0 / (fan_in + fan_out) as f32).sqrt();
            let w: Vec<f32> = (0..fan_in * fan_out)
                .map(|_| rng.sample::<f32, _>(StandardNormal) * scale)
                .collect();

            opt_w.push(AdamState::new(w.len()));
            opt_b.push(AdamState::new(fan_out));
            weights.push(w);
            biases.push(vec![0.0; fan_out]);
        }

        Self { sizes: sizes.to_vec(), weights, biases, opt_w, opt_b }
    }

    /// Layer sizes, input first
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Input dimensionality
    pub fn input_dim(&self) -> usize {
        self.sizes[0]
    }

    /// Output dimensionality
    pub fn output_dim(&self) -> usize {
        *self.sizes.last().unwrap_or(&0)
    }

    /// Number of layers (linear transforms)
    fn num_layers(&self) -> usize {
        self.weights.len()
    }

    /// Forward pass, caching activations for backprop
    pub fn forward(&self, input: &[f32]) -> ForwardCache {
        debug_assert_eq!(input.len(), self.input_dim(), "input dimension mismatch");

        let mut activations = Vec::with_capacity(self.num_layers() + 1);
        activations.push(input.to_vec());

        for layer in 0..self.num_layers() {
            let fan_in = self.sizes[layer];
            let fan_out = self.sizes[layer + 1];
            let x = &activations[layer];
            let w = &self.weights[layer];
            let b = &self.biases[layer];

            let mut z = vec![0.0; fan_out];
            for (j, zj) in z.iter_mut().enumerate() {
                let mut sum = b[j];
                for i in 0..fan_in {
                    sum += x[i] * w[i * fan_out + j];
                }
                *zj = sum;
            }

            // tanh on hidden layers, raw output on the last
            if layer + 1 < self.num_layers() {
                for zj in &mut z {
                    *zj = zj.tanh();
                }
            }
            activations.push(z);
        }

        ForwardCache { activations }
    }

    /// Forward pass returning only the output
    pub fn infer(&self, input: &[f32]) -> Vec<f32> {
        let mut cache = self.forward(input);
        cache.activations.pop().unwrap_or_default()
    }

    /// Zero gradients shaped like this network
    pub fn zero_grads(&self) -> Gradients {
        Gradients {
            weights: self.weights.iter().map(|w| vec![0.0; w.len()]).collect(),
            biases: self.biases.iter().map(|b| vec![0.0; b.len()]).collect(),
        }
    }

    /// Accumulate gradients for one sample into `grads`
    ///
    /// `d_output` is the loss gradient with respect to the raw network
    /// output for the sample whose activations are in `cache`.
    pub fn backward(&self, cache: &ForwardCache, d_output: &[f32], grads: &mut Gradients) {
        debug_assert_eq!(d_output.len(), self.output_dim());

        let mut delta = d_output.to_vec();

        for layer in (0..self.num_layers()).rev() {
            let fan_in = self.sizes[layer];
            let fan_out = self.sizes[layer + 1];
            let x = &cache.activations[layer];
            let w = &self.weights[layer];

            let dw = &mut grads.weights[layer];
            for i in 0..fan_in {
                for j in 0..fan_out {
                    dw[i * fan_out + j] += x[i] * delta[j];
                }
            }
            let db = &mut grads.biases[layer];
            for j in 0..fan_out {
                db[j] += delta[j];
            }

            if layer == 0 {
                break;
            }

            // Propagate through the weights, then through the tanh of the
            // previous layer (derivative recovered from its output)
            let mut prev = vec![0.0; fan_in];
            for (i, pi) in prev.iter_mut().enumerate() {
                let mut sum = 0.0;
                for j in 0..fan_out {
                    sum += w[i * fan_out + j] * delta[j];
                }
                let a = cache.activations[layer][i];
                *pi = sum * (1.0 - a * a);
            }
            delta = prev;
        }
    }

    /// Apply accumulated gradients with one Adam step per tensor
    pub fn apply_gradients(&mut self, grads: &Gradients, lr: f32) {
        for layer in 0..self.num_layers() {
            self.opt_w[layer].apply(&mut self.weights[layer], &grads.weights[layer], lr);
            self.opt_b[layer].apply(&mut self.biases[layer], &grads.biases[layer], lr);
        }
    }

    /// Raw parameter access for snapshotting: `(sizes, weights, biases)`
    pub(crate) fn parameters(&self) -> (&[usize], &[Vec<f32>], &[Vec<f32>]) {
        (&self.sizes, &self.weights, &self.biases)
    }

    /// Rebuild a network from snapshotted parameters with fresh optimizer
    /// state
    pub(crate) fn from_parameters(
        sizes: Vec<usize>,
        weights: Vec<Vec<f32>>,
        biases: Vec<Vec<f32>>,
    ) -> Self {
        let opt_w = weights.iter().map(|w| AdamState::new(w.len())).collect();
        let opt_b = biases.iter().map(|b| AdamState::new(b.len())).collect();
        Self { sizes, weights, biases, opt_w, opt_b }
    }
}
