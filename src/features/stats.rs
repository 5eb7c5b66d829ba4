//! Numeric building blocks for window features.
//!
//! Every function is total: empty or degenerate input yields 0.0 rather
//! than NaN, matching how the training pipeline filled missing statistics.

/// Replace NaN and infinities with 0.0
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// The trailing `n` elements of `items` (all of them when fewer exist)
#[inline]
pub fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator); 0.0 below two points
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    finite_or_zero(ss / (n - 1) as f64)
}

/// Sample standard deviation; 0.0 below two points
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .reduce(f64::min)
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

pub fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .reduce(f64::max)
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Exponential moving average, seeded with the first value.
///
/// Smoothing factor is `2 / (span + 1)`; returns the final smoothed value.
pub fn ema(values: &[f64], span: usize) -> f64 {
    let Some((&first, rest)) = values.split_first() else {
        return 0.0;
    };
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let smoothed = rest
        .iter()
        .fold(first, |acc, v| alpha * v + (1.0 - alpha) * acc);
    finite_or_zero(smoothed)
}

/// Slope of the least-squares line through `(i, values[i])`
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den == 0.0 {
        return 0.0;
    }
    finite_or_zero(num / den)
}

/// Standard score with the denominator floored at 1.0 when the deviation is zero
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    let denom = if std_dev == 0.0 { 1.0 } else { std_dev };
    finite_or_zero((value - mean) / denom)
}

/// `num / den`, or 0.0 when the denominator is zero
pub fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    finite_or_zero(num / den)
}

/// Share of `true` flags
pub fn fraction(flags: impl ExactSizeIterator<Item = bool>) -> f64 {
    let n = flags.len();
    if n == 0 {
        return 0.0;
    }
    flags.filter(|f| *f).count() as f64 / n as f64
}

/// Mean distance between consecutive positions; 0.0 below two positions
pub fn mean_gap(positions: &[usize]) -> f64 {
    if positions.len() < 2 {
        return 0.0;
    }
    let gaps: Vec<f64> = positions
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .collect();
    mean(&gaps)
}

/// Index of the first maximum
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().copied().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
