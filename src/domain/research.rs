//! Next-day direction prototype.
//!
//! A logistic regression over moving-average features predicting whether the
//! next close is above today's. Training uses the earliest 75% of rows and
//! evaluates on the remainder in date order (no shuffling).

use crate::domain::indicator::simple_moving_average;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;
use tracing::debug;

/// Fewer usable rows than this and the prototype is skipped.
pub const MIN_ROWS: usize = 100;
/// Share of samples held out, taken from the end and rounded up.
pub const TEST_FRACTION: f64 = 0.25;
const PROBABILITY_TAIL: usize = 200;
const N_FEATURES: usize = 4;

/// fast MA, slow MA, crossover flag, one-day return
pub type Features = [f64; N_FEATURES];

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub date: NaiveDate,
    pub features: Features,
    pub up_next_day: bool,
}

pub fn build_samples(prices: &PriceSeries, fast_window: usize, slow_window: usize) -> Vec<Sample> {
    let fast = simple_moving_average(prices, fast_window);
    let slow = simple_moving_average(prices, slow_window);
    let closes = prices.values();

    (1..closes.len().saturating_sub(1))
        .filter_map(|i| {
            let f = fast.values()[i]?;
            let s = slow.values()[i]?;
            let ret1 = closes[i] / closes[i - 1] - 1.0;
            let xover = if f > s { 1.0 } else { 0.0 };
            Some(Sample {
                date: prices.index()[i],
                features: [f, s, xover, ret1],
                up_next_day: closes[i + 1] > closes[i],
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    max_iter: usize,
    tolerance: f64,
    weights: Features,
    bias: f64,
    mean: Features,
    scale: Features,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(0.1, 200, 1e-6)
    }
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize, tolerance: f64) -> Self {
        Self {
            learning_rate,
            max_iter,
            tolerance,
            weights: [0.0; N_FEATURES],
            bias: 0.0,
            mean: [0.0; N_FEATURES],
            scale: [1.0; N_FEATURES],
        }
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    fn log_loss(targets: &[f64], predictions: &[f64]) -> f64 {
        let eps = 1e-15;
        -targets
            .iter()
            .zip(predictions)
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                y * p.ln() + (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>()
            / targets.len() as f64
    }

    fn standardize(&self, x: &Features) -> Features {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (x[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    fn linear(&self, z: &Features) -> f64 {
        self.weights.iter().zip(z).map(|(w, x)| w * x).sum::<f64>() + self.bias
    }

    /// Batch gradient descent on standardised features. Returns iterations run.
    pub fn fit(&mut self, x: &[Features], y: &[bool]) -> usize {
        if x.is_empty() {
            return 0;
        }
        let n = x.len() as f64;

        for j in 0..N_FEATURES {
            let mean = x.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = x.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            self.mean[j] = mean;
            self.scale[j] = if var > 0.0 { var.sqrt() } else { 1.0 };
        }

        let xs: Vec<Features> = x.iter().map(|r| self.standardize(r)).collect();
        let targets: Vec<f64> = y.iter().map(|&up| if up { 1.0 } else { 0.0 }).collect();
        self.weights = [0.0; N_FEATURES];
        self.bias = 0.0;

        let mut previous_cost = f64::INFINITY;
        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;
            let predictions: Vec<f64> = xs.iter().map(|z| Self::sigmoid(self.linear(z))).collect();

            let mut dw = [0.0; N_FEATURES];
            let mut db = 0.0;
            for ((z, p), t) in xs.iter().zip(&predictions).zip(&targets) {
                let err = p - t;
                for j in 0..N_FEATURES {
                    dw[j] += err * z[j];
                }
                db += err;
            }
            for j in 0..N_FEATURES {
                self.weights[j] -= self.learning_rate * dw[j] / n;
            }
            self.bias -= self.learning_rate * db / n;

            let cost = Self::log_loss(&targets, &predictions);
            if (previous_cost - cost).abs() < self.tolerance {
                debug!(iterations, cost, "logistic regression converged");
                break;
            }
            previous_cost = cost;
        }
        iterations
    }

    pub fn predict_proba(&self, x: &Features) -> f64 {
        Self::sigmoid(self.linear(&self.standardize(x)))
    }

    pub fn score(&self, x: &[Features], y: &[bool]) -> Option<f64> {
        if x.is_empty() {
            return None;
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, up)| (self.predict_proba(row) >= 0.5) == **up)
            .count();
        Some(correct as f64 / x.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchResult {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Holdout accuracy in [0, 1].
    pub accuracy: f64,
    /// P(up next day) over the most recent holdout dates.
    pub probabilities: Vec<(NaiveDate, f64)>,
}

/// Number of leading samples used for training; the holdout gets the rest.
pub fn train_len(samples: usize) -> usize {
    let test = (samples as f64 * TEST_FRACTION).ceil() as usize;
    samples - test.min(samples)
}

/// `None` when there are not enough usable rows.
pub fn next_day_direction(
    prices: &PriceSeries,
    fast_window: usize,
    slow_window: usize,
) -> Option<ResearchResult> {
    let samples = build_samples(prices, fast_window, slow_window);
    if samples.len() <= MIN_ROWS {
        return None;
    }

    let (train, test) = samples.split_at(train_len(samples.len()));
    let x_train: Vec<Features> = train.iter().map(|s| s.features).collect();
    let y_train: Vec<bool> = train.iter().map(|s| s.up_next_day).collect();
    let x_test: Vec<Features> = test.iter().map(|s| s.features).collect();
    let y_test: Vec<bool> = test.iter().map(|s| s.up_next_day).collect();

    let mut model = LogisticRegression::default();
    model.fit(&x_train, &y_train);
    let accuracy = model.score(&x_test, &y_test)?;

    let tail = test.len().saturating_sub(PROBABILITY_TAIL);
    let probabilities = test[tail..]
        .iter()
        .map(|s| (s.date, model.predict_proba(&s.features)))
        .collect();

    Some(ResearchResult {
        train_rows: train.len(),
        test_rows: test.len(),
        accuracy,
        probabilities,
    })
}
