use crate::data::dataset::{Dataset, Subset};
use crate::error::{ModelgenError, Result};

/// Sizes of a train/validation partition of `n` examples.
///
/// The validation share is `floor(n · validation_fraction)`; training gets
/// the remainder so no example is lost to rounding.
pub fn split_sizes(n: usize, validation_fraction: f64) -> Result<(usize, usize)> {
    if !(0.0..=1.0).contains(&validation_fraction) {
        return Err(ModelgenError::InvalidInput(format!(
            "validation fraction must lie in [0, 1], got {validation_fraction}"
        )));
    }
    let val_size = ((n as f64 * validation_fraction).floor() as usize).min(n);
    Ok((n - val_size, val_size))
}

/// Partitions `dataset` into a training prefix and a validation suffix.
///
/// No shuffling happens here: given the same ordering the split is always
/// the same. Shuffle beforehand (e.g. `InMemoryDataset::shuffle_with_seed`)
/// for a random partition. Both halves are views into `dataset`.
pub fn train_val_split<D: Dataset + ?Sized>(
    dataset: &D,
    validation_fraction: f64,
) -> Result<(Subset<'_, D>, Subset<'_, D>)> {
    let n = dataset.len();
    let (train_size, _) = split_sizes(n, validation_fraction)?;
    Ok((Subset::new(dataset, 0..train_size), Subset::new(dataset, train_size..n)))
}
