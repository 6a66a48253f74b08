//! Summary statistics behind the distribution plots.
//!
//! All functions skip non-finite values: they stay in the table but cannot be placed on an axis.

use crate::linspace::Linspace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const BOOTSTRAP_SAMPLES: usize = 1000;
pub const BOOTSTRAP_SEED: u64 = 0x5eed;

/// finite values of `v`, sorted ascending
pub fn sorted_finite(v: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = v.iter().copied().filter(|x| x.is_finite()).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// quantile of an ascending slice with linear interpolation between the closest ranks
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.max(0.).min(1.) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub fn median(v: &[f64]) -> f64 {
    quantile(&sorted_finite(v), 0.5)
}

/// sample standard deviation (n - 1 in the denominator)
pub fn std_dev(v: &[f64]) -> f64 {
    let n = v.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = v.iter().sum::<f64>() / n as f64;
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Tukey box: quartiles, whiskers at the most extreme data within 1.5 IQR, and the fliers beyond.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
    pub fliers: Vec<f64>,
}

impl BoxStats {
    pub fn new(v: &[f64]) -> Option<BoxStats> {
        let s = sorted_finite(v);
        if s.is_empty() {
            return None;
        }
        let q1 = quantile(&s, 0.25);
        let q3 = quantile(&s, 0.75);
        let iqr = q3 - q1;
        let lo_fence = q1 - 1.5 * iqr;
        let hi_fence = q3 + 1.5 * iqr;
        let inside: Vec<f64> = s
            .iter()
            .copied()
            .filter(|x| *x >= lo_fence && *x <= hi_fence)
            .collect();
        let whisker_lo = inside.first().copied().unwrap_or(q1);
        let whisker_hi = inside.last().copied().unwrap_or(q3);
        let fliers = s
            .iter()
            .copied()
            .filter(|x| *x < lo_fence || *x > hi_fence)
            .collect();
        Some(BoxStats {
            q1,
            median: quantile(&s, 0.5),
            q3,
            whisker_lo,
            whisker_hi,
            fliers,
        })
    }
}

/// Letter-value summary for boxen plots.
/// `boxes[0]` spans the fourths, `boxes[1]` the eighths and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterValues {
    pub median: f64,
    pub boxes: Vec<(f64, f64)>,
    pub outliers: Vec<f64>,
}

/// number of letter values by Tukey's rule, at least one box
pub fn letter_depth(n: usize) -> usize {
    if n < 2 {
        return 1;
    }
    let k = (n as f64).log2().floor() as i64 - 3;
    k.max(1) as usize
}

impl LetterValues {
    pub fn new(v: &[f64]) -> Option<LetterValues> {
        let s = sorted_finite(v);
        if s.is_empty() {
            return None;
        }
        let boxes: Vec<(f64, f64)> = (0..letter_depth(s.len()))
            .map(|i| {
                let p = 0.5f64.powi(i as i32 + 2);
                (quantile(&s, p), quantile(&s, 1. - p))
            })
            .collect();
        let (lo, hi) = boxes[boxes.len() - 1];
        let outliers = s.iter().copied().filter(|x| *x < lo || *x > hi).collect();
        Some(LetterValues {
            median: quantile(&s, 0.5),
            boxes,
            outliers,
        })
    }
}

/// Scott's rule bandwidth for a one dimensional Gaussian KDE.
/// `None` when the data cannot support a density (fewer than two values or no spread).
pub fn scott_bandwidth(v: &[f64]) -> Option<f64> {
    bandwidth(v, -1. / 5.)
}

fn bandwidth(v: &[f64], exponent: f64) -> Option<f64> {
    let s = sorted_finite(v);
    let sd = std_dev(&s);
    if !sd.is_finite() || sd <= 0. {
        return None;
    }
    Some((s.len() as f64).powf(exponent) * sd)
}

fn gauss(u: f64) -> f64 {
    (-0.5 * u * u).exp() / (2. * std::f64::consts::PI).sqrt()
}

/// density of a Gaussian KDE with bandwidth `bw` at `x`
pub fn kde_at(v: &[f64], bw: f64, x: f64) -> f64 {
    let n = v.len() as f64;
    v.iter().map(|xi| gauss((x - xi) / bw)).sum::<f64>() / (n * bw)
}

/// Density curve over `[min - cut*bw, max + cut*bw]` sampled at `gridsize` points.
#[derive(Debug, Clone)]
pub struct DensityCurve {
    pub support: Vec<f64>,
    pub density: Vec<f64>,
}

impl DensityCurve {
    pub fn new(v: &[f64], cut: f64, gridsize: usize) -> Option<DensityCurve> {
        let s = sorted_finite(v);
        let bw = scott_bandwidth(&s)?;
        let lo = s[0] - cut * bw;
        let hi = s[s.len() - 1] + cut * bw;
        let support: Vec<f64> = Linspace::new(lo, hi, gridsize).collect();
        let density = support.iter().map(|x| kde_at(&s, bw, *x)).collect();
        Some(DensityCurve { support, density })
    }

    pub fn max_density(&self) -> f64 {
        self.density.iter().copied().fold(0., f64::max)
    }
}

/// Bivariate product-kernel KDE evaluated on a regular grid.
/// `density[i][j]` belongs to the cell centred at `(xs[i], ys[j])`.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub density: Vec<Vec<f64>>,
}

impl DensityGrid {
    /// Scott's factor for two dimensions applied per axis; pairs with a non-finite member are skipped.
    pub fn new(
        x: &[f64],
        y: &[f64],
        xrange: (f64, f64),
        yrange: (f64, f64),
        gridsize: usize,
    ) -> Option<DensityGrid> {
        let (px, py): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(a, b)| (*a, *b))
            .unzip();
        let bwx = bandwidth(&px, -1. / 6.)?;
        let bwy = bandwidth(&py, -1. / 6.)?;
        let n = px.len() as f64;
        let xs: Vec<f64> = Linspace::new(xrange.0, xrange.1, gridsize).collect();
        let ys: Vec<f64> = Linspace::new(yrange.0, yrange.1, gridsize).collect();
        let density = xs
            .iter()
            .map(|gx| {
                ys.iter()
                    .map(|gy| {
                        px.iter()
                            .zip(py.iter())
                            .map(|(xi, yi)| gauss((gx - xi) / bwx) * gauss((gy - yi) / bwy))
                            .sum::<f64>()
                            / (n * bwx * bwy)
                    })
                    .collect()
            })
            .collect();
        Some(DensityGrid { xs, ys, density })
    }

    pub fn max_density(&self) -> f64 {
        self.density
            .iter()
            .flat_map(|col| col.iter().copied())
            .fold(0., f64::max)
    }
}

/// Median with a percentile bootstrap confidence interval at `level` (e.g. 95).
/// The generator is seeded so repeated runs draw the same error bars.
pub fn median_with_ci(v: &[f64], level: f64) -> Option<(f64, f64, f64)> {
    let s = sorted_finite(v);
    if s.is_empty() {
        return None;
    }
    let m = quantile(&s, 0.5);
    let mut rng = StdRng::seed_from_u64(BOOTSTRAP_SEED);
    let mut resample = vec![0.; s.len()];
    let mut medians: Vec<f64> = Vec::with_capacity(BOOTSTRAP_SAMPLES);
    for _ in 0..BOOTSTRAP_SAMPLES {
        for r in resample.iter_mut() {
            *r = s[rng.gen_range(0..s.len())];
        }
        medians.push(median(&resample));
    }
    let medians = sorted_finite(&medians);
    let tail = (100. - level) / 200.;
    Some((m, quantile(&medians, tail), quantile(&medians, 1. - tail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantiles_interpolate_linearly() {
        let s = [1., 2., 3., 4.];
        assert_abs_diff_eq!(quantile(&s, 0.5), 2.5);
        assert_abs_diff_eq!(quantile(&s, 0.25), 1.75);
        assert_abs_diff_eq!(quantile(&s, 1.), 4.);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn median_ignores_non_finite() {
        assert_abs_diff_eq!(median(&[3., f64::INFINITY, 1., f64::NAN, 2.]), 2.);
    }

    #[test]
    fn box_stats_flag_outliers() {
        let v = [1., 2., 3., 4., 5., 6., 7., 8., 100.];
        let b = BoxStats::new(&v).unwrap();
        assert_abs_diff_eq!(b.q1, 3.);
        assert_abs_diff_eq!(b.median, 5.);
        assert_abs_diff_eq!(b.q3, 7.);
        assert_abs_diff_eq!(b.whisker_lo, 1.);
        assert_abs_diff_eq!(b.whisker_hi, 8.);
        assert_eq!(b.fliers, vec![100.]);
        assert!(BoxStats::new(&[f64::NAN]).is_none());
    }

    #[test]
    fn letter_depth_follows_tukey() {
        assert_eq!(letter_depth(1), 1);
        assert_eq!(letter_depth(10), 1);
        assert_eq!(letter_depth(32), 2);
        assert_eq!(letter_depth(1000), 6);
    }

    #[test]
    fn letter_values_nest() {
        let v: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let lv = LetterValues::new(&v).unwrap();
        assert_eq!(lv.boxes.len(), 3);
        for w in lv.boxes.windows(2) {
            assert!(w[1].0 <= w[0].0 && w[1].1 >= w[0].1);
        }
        assert_abs_diff_eq!(lv.median, 31.5);
        assert!(lv.outliers.iter().all(|x| *x < lv.boxes[2].0 || *x > lv.boxes[2].1));
    }

    #[test]
    fn bandwidth_needs_spread() {
        assert!(scott_bandwidth(&[1., 1., 1.]).is_none());
        assert!(scott_bandwidth(&[1.]).is_none());
        let bw = scott_bandwidth(&[0., 1., 2., 3.]).unwrap();
        assert_abs_diff_eq!(bw, 4f64.powf(-0.2) * std_dev(&[0., 1., 2., 3.]), epsilon = 1e-12);
    }

    #[test]
    fn density_curve_integrates_to_about_one() {
        let v = [1., 2., 2.5, 3., 7.];
        let c = DensityCurve::new(&v, 3., 400).unwrap();
        let dx = c.support[1] - c.support[0];
        let area: f64 = c.density.iter().sum::<f64>() * dx;
        assert_abs_diff_eq!(area, 1., epsilon = 0.02);
        assert!(c.max_density() > 0.);
    }

    #[test]
    fn density_grid_peaks_near_the_data() {
        let x = [0.1, 0.2, 0.15, 0.12];
        let y = [10., 11., 10.5, 10.2];
        let g = DensityGrid::new(&x, &y, (0., 1.), (0., 20.), 21).unwrap();
        let (mut bi, mut bj, mut best) = (0, 0, 0.);
        for (i, col) in g.density.iter().enumerate() {
            for (j, d) in col.iter().enumerate() {
                if *d > best {
                    best = *d;
                    bi = i;
                    bj = j;
                }
            }
        }
        assert!(g.xs[bi] < 0.3);
        assert!((g.ys[bj] - 10.5).abs() < 2.);
        assert_abs_diff_eq!(best, g.max_density());
    }

    #[test]
    fn bootstrap_interval_brackets_median_and_is_reproducible() {
        let v: Vec<f64> = (1..=25).map(|i| i as f64).collect();
        let (m, lo, hi) = median_with_ci(&v, 95.).unwrap();
        assert_abs_diff_eq!(m, 13.);
        assert!(lo <= m && m <= hi);
        assert_eq!(median_with_ci(&v, 95.), Some((m, lo, hi)));
        assert!(median_with_ci(&[], 95.).is_none());
    }
}
