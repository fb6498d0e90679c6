//! Gaussian Process for Bayesian Optimization
//!
//! GP regression over the unit cube of the search space, used by
//! [`GPSampler`] to rank random candidates by an acquisition function.

use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::search_space::{SearchSpace, TrialParams};
use super::Sampler;
use crate::error::{FraudError, Result};

/// Matern 5/2 kernel over unit-cube coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matern52 {
    pub length_scale: f64,
}

impl Default for Matern52 {
    fn default() -> Self {
        Self { length_scale: 0.5 }
    }
}

impl Matern52 {
    fn value(&self, x1: ArrayView1<f64>, x2: ArrayView1<f64>) -> f64 {
        let dist_sq: f64 = x1.iter().zip(x2.iter()).map(|(a, b)| (a - b).powi(2)).sum();
        let sqrt5 = 5.0_f64.sqrt();
        let r = dist_sq.sqrt() / self.length_scale;
        (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
    }

    fn matrix(&self, x1: &Array2<f64>, x2: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((x1.nrows(), x2.nrows()), |(i, j)| {
            self.value(x1.row(i), x2.row(j))
        })
    }
}

#[derive(Debug, Clone)]
struct FittedGP {
    x_train: Array2<f64>,
    l_chol: Array2<f64>,
    alpha: Array1<f64>,
    y_mean: f64,
    y_std: f64,
}

/// Gaussian Process model for regression
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: Matern52,
    noise: f64,
    fitted: Option<FittedGP>,
}

impl GaussianProcess {
    pub fn new(kernel: Matern52) -> Self {
        Self {
            kernel,
            noise: 1e-6,
            fitted: None,
        }
    }

    pub fn fit(&mut self, x: Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() || y.is_empty() {
            return Err(FraudError::ShapeError {
                expected: format!("{} observations", x.nrows()),
                actual: format!("{} observations", y.len()),
            });
        }

        let y_mean = y.mean().unwrap_or(0.0);
        let mut y_std = y.std(0.0);
        if y_std < 1e-10 {
            y_std = 1.0;
        }
        let y_normalized = y.mapv(|yi| (yi - y_mean) / y_std);

        let mut k = self.kernel.matrix(&x, &x);
        for i in 0..k.nrows() {
            k[[i, i]] += self.noise;
        }

        let l_chol = cholesky(&k);
        let alpha = solve_cholesky(&l_chol, &y_normalized);

        self.fitted = Some(FittedGP {
            x_train: x,
            l_chol,
            alpha,
            y_mean,
            y_std,
        });
        Ok(())
    }

    /// Posterior mean and variance at test points
    pub fn predict(&self, x_test: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let gp = self.fitted.as_ref().ok_or(FraudError::ModelNotFitted)?;

        let k_star = self.kernel.matrix(x_test, &gp.x_train);
        let mean = k_star.dot(&gp.alpha).mapv(|m| m * gp.y_std + gp.y_mean);

        let var = Array1::from_shape_fn(x_test.nrows(), |i| {
            let k_self = self.kernel.value(x_test.row(i), x_test.row(i));
            let v = solve_lower_triangular(&gp.l_chol, &k_star.row(i).to_owned());
            (k_self - v.dot(&v)).max(1e-10) * gp.y_std * gp.y_std
        });

        Ok((mean, var))
    }
}

fn cholesky(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                l[[j, j]] = (a[[j, j]] - sum).max(1e-10).sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    l
}

/// Solve L @ x = b for lower triangular L
fn solve_lower_triangular(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * x[j]).sum();
        x[i] = (b[i] - sum) / l[[i, i]];
    }
    x
}

/// Solve L @ L^T @ x = b
fn solve_cholesky(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = solve_lower_triangular(l, b);
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Standard normal CDF approximation
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Error function approximation (Abramowitz and Stegun)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Gaussian Process based Bayesian Optimization sampler, maximizing
#[derive(Debug)]
pub struct GPSampler {
    rng: Xoshiro256PlusPlus,
    gp: GaussianProcess,
    /// Random trials before the GP takes over
    n_startup_trials: usize,
    /// Random candidates scored per suggestion
    n_candidates: usize,
}

impl GPSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self {
            rng,
            gp: GaussianProcess::new(Matern52::default()),
            n_startup_trials: 10,
            n_candidates: 1000,
        }
    }

    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    pub fn with_n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }
}

/// Expected improvement over `best_y` of a GP posterior
fn expected_improvement(mean: f64, var: f64, best_y: f64) -> f64 {
    let std = var.sqrt().max(1e-10);
    let improvement = mean - best_y;
    let z = improvement / std;
    improvement * normal_cdf(z) + std * normal_pdf(z)
}

impl Sampler for GPSampler {
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> Result<TrialParams> {
        if history.len() < self.n_startup_trials || history.is_empty() {
            return Ok(space.sample(&mut self.rng));
        }

        let n_params = space.len();
        let x_data: Vec<f64> = history
            .iter()
            .flat_map(|(params, _)| space.to_unit_vec(params))
            .collect();
        let x_train = Array2::from_shape_vec((history.len(), n_params), x_data)?;
        let y_train: Array1<f64> = history.iter().map(|(_, y)| *y).collect();
        let best_y = y_train.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        self.gp.fit(x_train, &y_train)?;

        let mut candidates: Vec<TrialParams> =
            (0..self.n_candidates).map(|_| space.sample(&mut self.rng)).collect();
        let x_cand = Array2::from_shape_vec(
            (candidates.len(), n_params),
            candidates.iter().flat_map(|c| space.to_unit_vec(c)).collect(),
        )?;
        let (mean, var) = self.gp.predict(&x_cand)?;

        let best = (0..candidates.len())
            .map(|i| (i, expected_improvement(mean[i], var[i], best_y)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);

        Ok(candidates.swap_remove(best))
    }
}
