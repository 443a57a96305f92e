use ndarray::{Array1, Array2, ArrayView2, Axis};
use crate::signal::{stats, SignalError};
/// Linear decomposition of channel space into components.
///
/// `unmixing` is components x channels, `mixing` channels x components and
/// (pseudo-)inverse to it. `keep[i] == false` marks component `i` for removal.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSet {
    pub unmixing: Array2<f64>,
    pub mixing: Array2<f64>,
    /// Channel means removed before unmixing (zeros when the data is used as-is).
    pub mean: Array1<f64>,
    /// Eigenvalue (GEVD) or source variance (ICA) per component.
    pub importance: Vec<f64>,
    pub keep: Vec<bool>,
}
impl ComponentSet {
    pub fn new(
        unmixing: Array2<f64>,
        mixing: Array2<f64>,
        mean: Array1<f64>,
        importance: Vec<f64>,
    ) -> Result<Self, SignalError> {
        let (k, n) = unmixing.dim();
        if mixing.dim() != (n, k) {
            return Err(SignalError::ChannelMismatch {
                expected: n,
                actual: mixing.nrows(),
            });
        }
        if mean.len() != n || importance.len() != k {
            return Err(SignalError::ChannelMismatch {
                expected: k,
                actual: importance.len(),
            });
        }
        Ok(Self {
            unmixing,
            mixing,
            mean,
            importance,
            keep: vec![true; k],
        })
    }
    pub fn n_components(&self) -> usize {
        self.unmixing.nrows()
    }
    pub fn n_channels(&self) -> usize {
        self.unmixing.ncols()
    }
    pub fn exclude(&mut self, component: usize) {
        if let Some(slot) = self.keep.get_mut(component) {
            *slot = false;
        }
    }
    pub fn excluded(&self) -> Vec<usize> {
        self.keep
            .iter()
            .enumerate()
            .filter(|(_, keep)| !**keep)
            .map(|(idx, _)| idx)
            .collect()
    }
    fn centered(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut centered = data.to_owned();
        for mut column in centered.axis_iter_mut(Axis(1)) {
            column -= &self.mean;
        }
        centered
    }
    /// Component activations (components x samples).
    pub fn sources(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        self.unmixing.dot(&self.centered(data))
    }
    pub fn source_variances(&self, data: ArrayView2<'_, f64>) -> Vec<f64> {
        stats::channel_variances(self.sources(data).view())
    }
    /// Components whose importance exceeds `ratio` times the median, largest
    /// first, at most `max` of them. Returned in ascending index order.
    pub fn high_variance_components(&self, ratio: f64, max: usize) -> Vec<usize> {
        let median = stats::median(&self.importance);
        let mut candidates: Vec<usize> = (0..self.n_components())
            .filter(|&i| self.importance[i] > ratio * median)
            .collect();
        candidates.sort_by(|&a, &b| self.importance[b].total_cmp(&self.importance[a]));
        candidates.truncate(max);
        candidates.sort_unstable();
        candidates
    }
    /// Subtract the back-projection of every excluded component from `data`.
    pub fn remove_excluded(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let excluded = self.excluded();
        if excluded.is_empty() {
            return data.to_owned();
        }
        let sources = self.unmixing.select(Axis(0), &excluded).dot(&self.centered(data));
        let artifacts = self.mixing.select(Axis(1), &excluded).dot(&sources);
        &data - &artifacts
    }
}
