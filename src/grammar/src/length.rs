/// A tabulated transition-length penalty.
///
/// The table maps a distance (in residues) to a penalty; distances beyond the
/// last entry all receive the last entry. The declared multiplier and the
/// global sigma are folded into the table once, when the grammar is
/// finalised, so that `penalty()` is a plain lookup during the sweeps.
#[derive(Debug, Clone)]
pub struct LengthFunction {
    value_map: Vec<f64>,
    multiplier: f64,
}

impl LengthFunction {
    #[must_use]
    pub fn new(value_map: Vec<f64>, multiplier: f64) -> Self {
        Self { value_map, multiplier }
    }

    /// Fold `multiplier * sigma` into the value table. Called exactly once.
    pub(crate) fn scale(&mut self, sigma: f64) {
        let factor = self.multiplier * sigma;
        for value in &mut self.value_map {
            *value *= factor;
        }
    }

    /// Penalty for a transition of `distance` residues. The last table entry
    /// extrapolates to every longer distance.
    #[must_use]
    pub fn penalty(&self, distance: i64) -> f64 {
        let last = self.value_map.len() - 1;
        let idx = usize::try_from(distance.max(0)).map_or(last, |d| d.min(last));
        self.value_map[idx]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }
}
