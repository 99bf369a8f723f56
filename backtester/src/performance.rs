//! Return statistics over an equity curve.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Simple per-step returns; not written to the summary.
    #[serde(skip)]
    pub returns: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of `returns`.
    pub stdev: f64,
    /// `mean / stdev * sqrt(annualization_factor)`; `None` when undefined.
    pub ratio: Option<f64>,
    pub annualization_factor: f64,
    pub total_return: f64,
    /// Largest peak-to-trough fall as a fraction of the peak.
    pub max_drawdown: f64,
}

pub fn evaluate(equity: &[f64], annualization_factor: f64) -> PerformanceReport {
    let returns: Vec<f64> = equity.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();

    let (mean, stdev) = if returns.is_empty() {
        (0.0, 0.0)
    } else {
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    };

    let ratio = (stdev > 0.0)
        .then(|| mean / stdev * annualization_factor.sqrt())
        .filter(|r| r.is_finite());

    let total_return = match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => last / first - 1.0,
        _ => 0.0,
    };

    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown: f64 = 0.0;
    for &e in equity {
        peak = peak.max(e);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - e) / peak);
        }
    }

    PerformanceReport {
        returns,
        mean,
        stdev,
        ratio,
        annualization_factor,
        total_return,
        max_drawdown,
    }
}
