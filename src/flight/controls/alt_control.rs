use thiserror::Error;

/// Errors reported by the altitude controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The time step passed to a compute step was zero, negative, or not
    /// finite, which leaves the derivative term undefined.
    #[error("non-positive time step: {0}")]
    NonPositiveDt(f64),
}

/// Computes one step of the PID thrust law and returns the control output
/// together with the advanced integral accumulator.
///
/// The integral accumulates without bound unless `integral_limit` is given,
/// in which case it is clamped to `±integral_limit` before it contributes to
/// the output. The output itself is never saturated here; actuator-range
/// clamping belongs to the plant side.
///
/// # Arguments
///
/// * `kp` - Proportional gain.
/// * `ki` - Integral gain.
/// * `kd` - Derivative gain.
/// * `error` - Setpoint minus measured value for this step.
/// * `integral` - Integral accumulator carried from the previous step.
/// * `previous_error` - Error recorded on the previous step.
/// * `dt` - Time step in seconds; must be finite and positive.
/// * `integral_limit` - Optional symmetric clamp on the accumulator.
///
/// # Returns
///
/// (`Result<(f64, f64), ControlError>`): Tuple containing the control output
/// and the new integral accumulator, or
/// [`ControlError::NonPositiveDt`] for a non-positive or non-finite `dt`.
///
/// # Examples
///
/// ```rust
/// use hoverpilot::flight::controls::alt_control::pid_thrust_control;
///
/// let (output, integral) =
///     pid_thrust_control(2.0, 0.0, 0.0, 10.0, 0.0, 10.0, 0.1, None).unwrap();
/// assert_eq!(output, 20.0);
/// assert_eq!(integral, 1.0);
///
/// assert!(pid_thrust_control(2.0, 0.0, 0.0, 10.0, 0.0, 10.0, 0.0, None).is_err());
/// ```
#[allow(clippy::too_many_arguments)]
pub fn pid_thrust_control(
    kp: f64,
    ki: f64,
    kd: f64,
    error: f64,
    integral: f64,
    previous_error: f64,
    dt: f64,
    integral_limit: Option<f64>,
) -> Result<(f64, f64), ControlError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(ControlError::NonPositiveDt(dt));
    }

    let new_integral = match integral_limit {
        Some(limit) => (integral + error * dt).max(-limit).min(limit),
        None => integral + error * dt,
    };
    let derivative = (error - previous_error) / dt;

    let output = kp * error + ki * new_integral + kd * derivative;
    Ok((output, new_integral))
}

/// Represents altitude control logic.
///
/// A PID controller driving a measured altitude toward a fixed setpoint.
/// `compute` must be called exactly once per simulated time step, in step
/// order; skipped or reordered calls desynchronize `previous_error` and
/// `integral` from simulation time.
#[derive(Debug, Clone)]
pub struct AltControl {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Desired altitude.
    pub setpoint: f64,
    /// Error recorded on the previous compute call.
    pub previous_error: f64,
    /// Integral accumulator.
    pub integral: f64,
    /// Optional symmetric clamp on the integral accumulator.
    integral_limit: Option<f64>,
}

impl AltControl {
    /// Creates a new `AltControl` instance with an unbounded integral
    /// accumulator.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain.
    /// * `ki` - Integral gain.
    /// * `kd` - Derivative gain.
    /// * `setpoint` - Desired altitude.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    ///
    /// let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// assert_eq!(control.integral, 0.0);
    /// assert_eq!(control.previous_error, 0.0);
    /// ```
    pub fn new(kp: f64, ki: f64, kd: f64, setpoint: f64) -> Self {
        AltControl {
            kp,
            ki,
            kd,
            setpoint,
            previous_error: 0.0,
            integral: 0.0,
            integral_limit: None,
        }
    }

    /// Enables a symmetric anti-windup clamp on the integral accumulator,
    /// consuming and returning the controller.
    ///
    /// The accumulator runs unbounded by default; enabling the clamp is a
    /// deliberate deviation from that behavior for plants where sustained
    /// error would otherwise wind the integral up without limit.
    ///
    /// # Arguments
    ///
    /// * `limit` - Clamp bound; the accumulator stays within `±limit`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    ///
    /// let mut control = AltControl::new(0.0, 1.0, 0.0, 10.0).with_integral_limit(2.0);
    /// for _ in 0..100 {
    ///     control.compute(0.0, 1.0).unwrap();
    /// }
    /// assert_eq!(control.integral, 2.0);
    /// ```
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// Computes the control signal for the current measurement.
    ///
    /// # Arguments
    ///
    /// * `measured_value` - The current measured altitude.
    /// * `dt` - Time step in seconds; must be finite and positive.
    ///
    /// # Returns
    ///
    /// (`Result<f64, ControlError>`): The control signal, or
    /// [`ControlError::NonPositiveDt`] for a non-positive or non-finite
    /// `dt`; the controller state is untouched on error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    ///
    /// let mut control = AltControl::new(2.0, 0.0, 0.0, 10.0);
    /// let thrust = control.compute(0.0, 0.1).unwrap();
    /// assert_eq!(thrust, 20.0);
    /// ```
    pub fn compute(&mut self, measured_value: f64, dt: f64) -> Result<f64, ControlError> {
        let error = self.setpoint - measured_value;
        let (output, integral) = pid_thrust_control(
            self.kp,
            self.ki,
            self.kd,
            error,
            self.integral,
            self.previous_error,
            dt,
            self.integral_limit,
        )?;

        self.integral = integral;
        self.previous_error = error;
        Ok(output)
    }

    /// Resets the integral accumulator and the previous error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    ///
    /// let mut control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// control.compute(0.0, 0.1).unwrap();
    /// control.reset();
    /// assert_eq!(control.integral, 0.0);
    /// assert_eq!(control.previous_error, 0.0);
    /// ```
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
    }
}
