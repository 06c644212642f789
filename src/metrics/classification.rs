use crate::error::*;

/// Pixel-wise confusion counts of a predicted binary mask against the truth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

/// `num / den`, or 0.0 when the denominator vanishes
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl ConfusionMatrix {
    pub fn from_masks(truth: &[bool], predicted: &[bool]) -> Result<Self, MetricsError> {
        Self::from_masks_where(truth, predicted, None)
    }

    /// Count only the pixels where `region` is true
    pub fn from_masks_where(
        truth: &[bool],
        predicted: &[bool],
        region: Option<&[bool]>,
    ) -> Result<Self, MetricsError> {
        if truth.len() != predicted.len() {
            return Err(MetricsError::MaskLength(truth.len(), predicted.len()));
        }
        if let Some(region) = region {
            if region.len() != truth.len() {
                return Err(MetricsError::MaskLength(truth.len(), region.len()));
            }
        }

        let mut matrix = ConfusionMatrix::default();
        for (i, (&t, &p)) in truth.iter().zip(predicted).enumerate() {
            if let Some(region) = region {
                if !region[i] {
                    continue;
                }
            }
            match (t, p) {
                (true, true) => matrix.true_positive += 1,
                (false, true) => matrix.false_positive += 1,
                (false, false) => matrix.true_negative += 1,
                (true, false) => matrix.false_negative += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn precision(&self) -> f64 {
        let tp = self.true_positive as f64;
        ratio(tp, tp + self.false_positive as f64)
    }

    pub fn recall(&self) -> f64 {
        let tp = self.true_positive as f64;
        ratio(tp, tp + self.false_negative as f64)
    }

    /// F-beta from the counts: (1 + β²)·tp / ((1 + β²)·tp + β²·fn + fp)
    pub fn fbeta(&self, beta: f64) -> f64 {
        let b2 = beta * beta;
        let tp = self.true_positive as f64;
        ratio(
            (1.0 + b2) * tp,
            (1.0 + b2) * tp + b2 * self.false_negative as f64 + self.false_positive as f64,
        )
    }

    pub fn f2(&self) -> f64 {
        self.fbeta(2.0)
    }

    /// Matthews correlation coefficient
    pub fn mcc(&self) -> f64 {
        let tp = self.true_positive as f64;
        let fp = self.false_positive as f64;
        let tn = self.true_negative as f64;
        let fn_ = self.false_negative as f64;
        let den = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        ratio(tp * tn - fp * fn_, den).clamp(-1.0, 1.0)
    }

    pub fn jaccard(&self) -> f64 {
        let tp = self.true_positive as f64;
        ratio(tp, tp + self.false_positive as f64 + self.false_negative as f64)
    }

    /// Intersection over union of the positive class
    pub fn iou(&self) -> f64 {
        self.jaccard()
    }
}
