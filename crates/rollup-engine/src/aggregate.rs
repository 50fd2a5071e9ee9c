//! Aggregator primitives shared by every rollup.

use rollup_model::{Aggregation, FieldValue};

/// Running state for one statistic field within one bucket, group or cell.
///
/// Non-numeric inputs are skipped on update, so `count` is the number of values that actually
/// contributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, value: Option<f64>) {
        let Some(x) = value.filter(|x| x.is_finite()) else {
            return;
        };
        self.count += 1;
        self.sum += x;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
    }

    pub fn update_value(&mut self, value: &FieldValue) {
        self.update(value.as_number());
    }

    pub fn merge(&mut self, other: &Accumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of values that contributed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `Sum`/`Avg` read 0 and `Max`/`Min` read `None` when nothing contributed.
    pub fn finalize(&self, method: Aggregation) -> Option<f64> {
        match method {
            Aggregation::Sum => Some(self.sum),
            Aggregation::Avg => {
                if self.count == 0 {
                    Some(0.0)
                } else {
                    Some(self.sum / self.count as f64)
                }
            }
            Aggregation::Count => Some(self.count as f64),
            Aggregation::Max => (self.count > 0).then_some(self.max),
            Aggregation::Min => (self.count > 0).then_some(self.min),
        }
    }
}

/// Aggregates a sequence of optional numbers, ignoring `None` and non-finite entries.
pub fn aggregate<I>(values: I, method: Aggregation) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut acc = Accumulator::new();
    for value in values {
        acc.update(value);
    }
    acc.finalize(method)
}
