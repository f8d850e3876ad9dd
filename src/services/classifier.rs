//! Feed-forward signal classifier.
//!
//! A plain multi-layer perceptron: ReLU hidden layers and a linear output
//! layer producing one logit per label class. Probabilities come from a
//! softmax over the logits.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{linear, ops, Linear, Module, VarBuilder, VarMap};
use std::path::Path;

/// Output classes: buy, hold, sell.
pub const CLASS_COUNT: usize = 3;

/// Hidden layer sizes for `inputs` features: `2n → n → n/2`.
pub fn default_hidden(inputs: usize) -> Vec<usize> {
    vec![(inputs * 2).max(1), inputs.max(1), (inputs / 2).max(1)]
}

pub struct Classifier {
    layers: Vec<Linear>,
    var_map: VarMap,
    topology: Vec<usize>,
    device: Device,
}

impl Classifier {
    /// Build a freshly initialised network `inputs → hidden.. → classes`.
    pub fn new(inputs: usize, hidden: &[usize], classes: usize) -> candle_core::Result<Self> {
        let device = Device::Cpu;
        let mut topology = Vec::with_capacity(hidden.len() + 2);
        topology.push(inputs);
        topology.extend_from_slice(hidden);
        topology.push(classes);

        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, DType::F32, &device);
        let mut layers = Vec::with_capacity(topology.len() - 1);
        for i in 0..(topology.len() - 1) {
            layers.push(linear(topology[i], topology[i + 1], vb.pp(i))?);
        }

        Ok(Self {
            layers,
            var_map,
            topology,
            device,
        })
    }

    /// Rebuild a network and load its weights from a safetensors file.
    pub fn load<P: AsRef<Path>>(
        path: P,
        inputs: usize,
        hidden: &[usize],
        classes: usize,
    ) -> candle_core::Result<Self> {
        let mut classifier = Self::new(inputs, hidden, classes)?;
        classifier.var_map.load(path)?;
        Ok(classifier)
    }

    /// Write weights as safetensors.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> candle_core::Result<()> {
        self.var_map.save(path)
    }

    pub fn var_map(&self) -> &VarMap {
        &self.var_map
    }

    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    pub fn input_width(&self) -> usize {
        self.topology[0]
    }

    pub fn class_count(&self) -> usize {
        self.topology[self.topology.len() - 1]
    }

    /// Row-major feature matrix as an f32 tensor.
    pub fn to_tensor(&self, rows: &[Vec<f64>]) -> candle_core::Result<Tensor> {
        let width = self.input_width();
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                candle_core::bail!("expected {} features, got {}", width, row.len());
            }
            data.extend(row.iter().map(|v| *v as f32));
        }
        Tensor::from_vec(data, (rows.len(), width), &self.device)
    }

    /// Logits for a `(batch, inputs)` tensor.
    pub fn forward(&self, inputs: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = inputs.clone();
        for layer in self.layers.iter().take(self.layers.len() - 1) {
            x = layer.forward(&x)?;
            x = x.relu()?;
        }
        if let Some(last_layer) = self.layers.last() {
            x = last_layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Softmax class probabilities, one vector per input row.
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> candle_core::Result<Vec<Vec<f64>>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let logits = self.forward(&self.to_tensor(rows)?)?;
        let probs = ops::softmax(&logits, D::Minus1)?.to_vec2::<f32>()?;
        Ok(probs
            .into_iter()
            .map(|row| row.into_iter().map(f64::from).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hidden() {
        assert_eq!(default_hidden(20), vec![40, 20, 10]);
        assert_eq!(default_hidden(1), vec![2, 1, 1]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let classifier = Classifier::new(4, &default_hidden(4), CLASS_COUNT).unwrap();
        assert_eq!(classifier.topology(), &[4, 8, 4, 2, 3]);

        let rows = vec![vec![0.1, -0.2, 0.3, 1.0], vec![5.0, 4.0, -3.0, 0.0]];
        let probs = classifier.predict_proba(&rows).unwrap();
        assert_eq!(probs.len(), 2);
        for row in probs {
            assert_eq!(row.len(), CLASS_COUNT);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|p| *p >= 0.0 && *p <= 1.0));
        }
    }

    #[test]
    fn test_width_mismatch_is_an_error() {
        let classifier = Classifier::new(4, &[4], CLASS_COUNT).unwrap();
        assert!(classifier.predict_proba(&[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_save_load_reproduces_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let classifier = Classifier::new(3, &[6, 3], CLASS_COUNT).unwrap();
        classifier.save(&path).unwrap();

        let loaded = Classifier::load(&path, 3, &[6, 3], CLASS_COUNT).unwrap();
        let rows = vec![vec![0.5, -1.5, 2.0]];
        assert_eq!(
            classifier.predict_proba(&rows).unwrap(),
            loaded.predict_proba(&rows).unwrap()
        );
    }
}
