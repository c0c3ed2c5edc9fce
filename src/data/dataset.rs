use std::ops::Range;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{ModelgenError, Result};

/// A finite, indexable collection of labelled examples.
///
/// Only length and random access are required; where the examples live is
/// up to the implementation.
pub trait Dataset {
    fn len(&self) -> usize;

    /// Features and class label of example `index`. Panics if out of range.
    fn get(&self, index: usize) -> (&[f64], usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset + ?Sized> Dataset for &D {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> (&[f64], usize) {
        (**self).get(index)
    }
}

/// Examples held in memory as feature rows plus integer class labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InMemoryDataset {
    inputs: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl InMemoryDataset {
    /// Fails if the row and label counts differ or rows have unequal widths.
    pub fn new(inputs: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(ModelgenError::InvalidInput(format!(
                "{} feature rows but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        if let Some(first) = inputs.first() {
            let width = first.len();
            if let Some(row) = inputs.iter().position(|r| r.len() != width) {
                return Err(ModelgenError::InvalidInput(format!(
                    "row {row} has {} features, expected {width}",
                    inputs[row].len()
                )));
            }
        }
        Ok(InMemoryDataset { inputs, labels })
    }

    /// Number of features per example (0 for an empty dataset).
    pub fn feature_count(&self) -> usize {
        self.inputs.first().map_or(0, Vec::len)
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Reorders the examples with a permutation drawn from `seed`.
    ///
    /// Splitting never shuffles, so callers that want a random train/validation
    /// partition shuffle first.
    pub fn shuffle_with_seed(&mut self, seed: u64) {
        let mut order: Vec<usize> = (0..self.inputs.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let inputs: Vec<Vec<f64>> = order.iter().map(|&i| std::mem::take(&mut self.inputs[i])).collect();
        let labels: Vec<usize> = order.iter().map(|&i| self.labels[i]).collect();
        self.inputs = inputs;
        self.labels = labels;
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn get(&self, index: usize) -> (&[f64], usize) {
        (&self.inputs[index], self.labels[index])
    }
}

/// A contiguous index range of another dataset. Borrows, never copies.
#[derive(Debug)]
pub struct Subset<'a, D: ?Sized> {
    dataset: &'a D,
    start: usize,
    end: usize,
}

impl<D: ?Sized> Clone for Subset<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for Subset<'_, D> {}

impl<'a, D: Dataset + ?Sized> Subset<'a, D> {
    /// Panics if `range` extends past the end of `dataset`.
    pub fn new(dataset: &'a D, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= dataset.len(),
            "subset range {range:?} out of bounds for dataset of length {}",
            dataset.len()
        );
        Subset { dataset, start: range.start, end: range.end }
    }

    /// Indices of the parent dataset covered by this view.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl<D: Dataset + ?Sized> Dataset for Subset<'_, D> {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn get(&self, index: usize) -> (&[f64], usize) {
        assert!(index < self.len(), "index {index} out of bounds for subset of length {}", self.len());
        self.dataset.get(self.start + index)
    }
}
