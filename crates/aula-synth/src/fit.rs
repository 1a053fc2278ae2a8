//! Log-linear least-squares fit of exponential decays.

/// Floor applied to magnitudes before taking their logarithm.
pub const MAGNITUDE_FLOOR: f32 = 1e-9;

/// `A · exp(b · x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFit {
    /// Value at `x = 0`.
    pub amplitude: f32,
    /// Exponential rate per unit of `x` (negative for a decay).
    pub rate: f32,
}

impl ExponentialFit {
    /// Constant curve at `amplitude`.
    pub fn flat(amplitude: f32) -> Self {
        Self {
            amplitude,
            rate: 0.0,
        }
    }

    /// Fit `values[x] ≈ A · exp(b · x)` over `x = 0, 1, ...`.
    ///
    /// Values are floored to [`MAGNITUDE_FLOOR`] before the logarithm. With
    /// fewer than two points the rate is zero. Non-finite results collapse
    /// to zero rate and the floor amplitude.
    pub fn fit(values: &[f32]) -> Self {
        Self::fit_points(values.iter().enumerate().map(|(x, &y)| (x as f64, y)))
    }

    /// Fit arbitrary `(x, y)` points.
    pub fn fit_points(points: impl IntoIterator<Item = (f64, f32)>) -> Self {
        let mut n = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut sum_xy = 0.0f64;
        let mut sum_xx = 0.0f64;

        for (x, value) in points {
            let y = f64::from(value.max(MAGNITUDE_FLOOR)).ln();
            n += 1.0;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        if n == 0.0 {
            return Self::flat(MAGNITUDE_FLOOR);
        }

        let denominator = n * sum_xx - sum_x * sum_x;
        let slope = if n < 2.0 || denominator.abs() < f64::EPSILON {
            0.0
        } else {
            (n * sum_xy - sum_x * sum_y) / denominator
        };
        let intercept = (sum_y - slope * sum_x) / n;

        let amplitude = intercept.exp() as f32;
        let rate = slope as f32;
        if !amplitude.is_finite() || !rate.is_finite() {
            return Self::flat(MAGNITUDE_FLOOR);
        }
        Self { amplitude, rate }
    }

    /// Curve value at `x`.
    #[inline]
    pub fn at(&self, x: f32) -> f32 {
        self.amplitude * (self.rate * x).exp()
    }

    /// Largest value over `x ∈ [0, last]`.
    pub fn peak(&self, last: f32) -> f32 {
        if self.rate > 0.0 {
            self.at(last)
        } else {
            self.amplitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_exponential() {
        let values: Vec<f32> = (0..64).map(|x| 0.8 * (-0.05 * x as f32).exp()).collect();
        let fit = ExponentialFit::fit(&values);
        assert!((fit.amplitude - 0.8).abs() < 1e-4);
        assert!((fit.rate + 0.05).abs() < 1e-5);
    }

    #[test]
    fn zeros_are_floored() {
        let fit = ExponentialFit::fit(&[0.0; 16]);
        assert!(fit.amplitude.is_finite());
        assert!((fit.amplitude - MAGNITUDE_FLOOR).abs() < 1e-12);
        assert_eq!(fit.rate, 0.0);
    }

    #[test]
    fn single_point_is_flat() {
        let fit = ExponentialFit::fit(&[0.25]);
        assert!((fit.amplitude - 0.25).abs() < 1e-6);
        assert_eq!(fit.rate, 0.0);
    }

    #[test]
    fn empty_input_is_floor() {
        assert_eq!(ExponentialFit::fit(&[]), ExponentialFit::flat(MAGNITUDE_FLOOR));
    }

    #[test]
    fn peak_of_rising_curve_is_at_end() {
        let fit = ExponentialFit {
            amplitude: 1.0,
            rate: 0.1,
        };
        assert!((fit.peak(10.0) - 1.0f32.exp()).abs() < 1e-5);
        assert_eq!(ExponentialFit::flat(2.0).peak(10.0), 2.0);
    }
}
