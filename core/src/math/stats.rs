pub struct StatsHelper;

impl StatsHelper {
    /// Mean over the finite samples; NaN when there are none.
    pub fn nanmean(samples: &[f64]) -> f64 {
        let (sum, count) = samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Largest finite sample and the index of its first occurrence.
    pub fn nanmax_index(samples: &[f64]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &value) in samples.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((idx, value)),
            }
        }
        best
    }

    /// Piecewise-linear interpolation of `fp(xp)` at `x`, clamped to the end
    /// values outside `xp`. `xp` must be increasing.
    pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
        let n = xp.len().min(fp.len());
        if n == 0 || !x.is_finite() {
            return f64::NAN;
        }
        if x <= xp[0] {
            return fp[0];
        }
        if x >= xp[n - 1] {
            return fp[n - 1];
        }
        let upper = xp[..n].partition_point(|&v| v <= x);
        let lower = upper - 1;
        let span = xp[upper] - xp[lower];
        if span == 0.0 {
            return fp[lower];
        }
        fp[lower] + (x - xp[lower]) / span * (fp[upper] - fp[lower])
    }

    /// `n` evenly spaced values from `start` to `stop` inclusive.
    pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (n - 1) as f64;
                (0..n).map(|i| start + step * i as f64).collect()
            }
        }
    }

    /// Centred moving average over `window` samples; the window shrinks at
    /// the edges.
    pub fn boxcar(samples: &[f64], window: usize) -> Vec<f64> {
        let half = window / 2;
        let mut prefix = Vec::with_capacity(samples.len() + 1);
        prefix.push(0.0);
        for value in samples {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + value);
        }
        (0..samples.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(samples.len());
                (prefix[hi] - prefix[lo]) / (hi - lo) as f64
            })
            .collect()
    }
}
