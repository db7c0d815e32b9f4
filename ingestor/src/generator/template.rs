/// Diffuse echo normalised to a unit peak: thermal noise floor, logistic
/// leading edge centred on `centre`, exponential trailing-edge decay.
pub fn diffuse_echo(bins: usize, centre: f64) -> Vec<f64> {
    let raw: Vec<f64> = (0..bins)
        .map(|k| {
            let x = k as f64 - centre;
            let edge = 1.0 / (1.0 + (-x / 1.5).exp());
            let decay = if x > 0.0 { (-x / 40.0).exp() } else { 1.0 };
            0.02 + edge * decay
        })
        .collect();
    let peak = raw.iter().cloned().fold(f64::MIN, f64::max);
    raw.into_iter().map(|v| v / peak).collect()
}

/// Specular echo off calm water: a narrow Gaussian peaking at one.
pub fn specular_echo(bins: usize, centre: f64) -> Vec<f64> {
    (0..bins)
        .map(|k| {
            let x = k as f64 - centre;
            0.005 + 0.995 * (-x * x / 2.0).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_peak_near_centre() {
        let diffuse = diffuse_echo(128, 64.0);
        let peak = diffuse.iter().cloned().fold(f64::MIN, f64::max);
        assert!((peak - 1.0).abs() < 1e-12);
        assert!(diffuse[10] < 0.05);
        let specular = specular_echo(128, 64.0);
        assert!((specular[64] - 1.0).abs() < 1e-12);
        assert!(specular[70] < 0.01);
    }
}
