/// Represents a first-order lowpass filter for discrete time signals.
///
/// The smoothing factor is derived from a time constant `tau`, so a larger
/// `tau` tracks the input more slowly. Used to take the edge off noisy
/// sensor samples before they reach a controller.
///
/// # Examples
///
/// ```rust
/// use hoverpilot::common::filters::FirstOrderFilter;
///
/// let tau = 0.1; // Time constant in seconds
/// let dt = 0.02; // Time step in seconds
/// let mut filter = FirstOrderFilter::new(tau, dt, 0.0);
///
/// let noisy_altitude = 10.0;
/// let smoothed = filter.apply(noisy_altitude);
/// assert!(smoothed > 0.0 && smoothed < noisy_altitude);
/// ```
#[derive(Clone, Debug)]
pub struct FirstOrderFilter {
    /// Filter constant
    kf: f64,
    /// State variable
    x1: f64,
}

impl FirstOrderFilter {
    /// Creates a new `FirstOrderFilter` instance.
    ///
    /// # Arguments
    ///
    /// * `tau` - Time constant in seconds.
    /// * `dt` - Time step in seconds.
    /// * `x1` - Initial state.
    ///
    /// # Returns
    ///
    /// A new `FirstOrderFilter` instance.
    pub fn new(tau: f64, dt: f64, x1: f64) -> Self {
        let kf = dt / (tau + dt);
        Self { kf, x1 }
    }

    /// Applies the lowpass filter to the input signal.
    ///
    /// # Arguments
    ///
    /// * `x` - Input signal value.
    ///
    /// # Returns
    ///
    /// The filtered output signal value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::filters::FirstOrderFilter;
    ///
    /// let mut filter = FirstOrderFilter::new(0.1, 0.02, 0.0);
    ///
    /// let first = filter.apply(10.0);
    /// let second = filter.apply(10.0);
    /// assert!(second > first); // State moves toward the input
    /// ```
    pub fn apply(&mut self, x: f64) -> f64 {
        self.x1 = (1.0 - self.kf) * self.x1 + self.kf * x;

        // If previous or current is NaN, reset filter.
        if self.x1.is_nan() {
            self.x1 = 0.0;
        }

        self.x1
    }

    /// Resets the filter state to the given value.
    ///
    /// # Arguments
    ///
    /// * `x1` - New filter state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::filters::FirstOrderFilter;
    ///
    /// let mut filter = FirstOrderFilter::new(0.1, 0.02, 0.0);
    /// filter.apply(10.0);
    /// filter.reset(0.0);
    /// assert_eq!(filter.apply(0.0), 0.0);
    /// ```
    pub fn reset(&mut self, x1: f64) {
        self.x1 = x1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_filter_creation() {
        let filter = FirstOrderFilter::new(0.1, 0.02, 0.0);

        assert_abs_diff_eq!(filter.kf, 1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(filter.x1, 0.0);
    }

    #[test]
    fn test_filter_application() {
        let mut filter = FirstOrderFilter::new(0.1, 0.02, 0.0);

        let filtered_output = filter.apply(10.0);
        assert_abs_diff_eq!(filtered_output, 5.0 / 3.0, epsilon = 1e-12);

        // Applying again to test state persistence
        let filtered_output2 = filter.apply(15.0);
        assert_abs_diff_eq!(filtered_output2, 35.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_filter_converges_to_constant_input() {
        let mut filter = FirstOrderFilter::new(0.05, 0.1, 0.0);

        let mut out = 0.0;
        for _ in 0..100 {
            out = filter.apply(10.0);
        }
        assert_abs_diff_eq!(out, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_filter_nan_reset() {
        let mut filter = FirstOrderFilter::new(0.1, 0.02, 0.0);

        // Apply with NaN to trigger reset
        let filtered_output = filter.apply(f64::NAN);
        assert_eq!(filtered_output, 0.0);

        // Apply again with a valid value
        let filtered_output2 = filter.apply(15.0);
        assert_abs_diff_eq!(filtered_output2, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_filter_reset() {
        let mut filter = FirstOrderFilter::new(0.1, 0.02, 0.0);
        filter.apply(10.0);
        filter.reset(3.0);

        let out = filter.apply(3.0);
        assert_abs_diff_eq!(out, 3.0, epsilon = 1e-12);
    }
}
