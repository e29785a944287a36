use ndarray::{arr1, arr2, Array1, Array2};
use thiserror::Error;

/// Default tolerance on `|det S|` below which the innovation covariance is
/// treated as singular during an update.
pub const DEFAULT_SINGULAR_TOL: f64 = 1e-12;

/// Errors reported by the fusion core.
///
/// Every fallible operation leaves the filter untouched when it returns an
/// error, so the caller decides whether to skip the step or abort the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KalmanError {
    /// The time step passed to a predict step was zero, negative, or not
    /// finite. Integrating over such a step is non-physical.
    #[error("non-positive time step: {0}")]
    NonPositiveDt(f64),
    /// A measurement vector does not match the observation dimension of its
    /// sensor modality.
    #[error("measurement has {got} elements, expected {expected}")]
    DimensionMismatch {
        /// Observation dimension the sensor expects.
        expected: usize,
        /// Number of elements actually supplied.
        got: usize,
    },
    /// The innovation covariance `S = H·P·Hᵀ + R` cannot be inverted.
    #[error("innovation covariance is singular (|det| = {det:e})")]
    SingularInnovation {
        /// Determinant of the offending matrix.
        det: f64,
    },
}

/// Represents a sensor reading, including observed data, observation model, and covariance matrix.
#[derive(Debug, Clone)]
pub struct SensorReading {
    /// Observed data associated with the sensor reading.
    pub data: Array1<f64>,
    /// Observation model matrix for the sensor reading.
    pub obs_model: Array2<f64>,
    /// Covariance matrix for the sensor reading.
    pub covar: Array2<f64>,
}

impl SensorReading {
    /// Creates a new `SensorReading` instance.
    ///
    /// # Arguments
    ///
    /// * `data` - Observed data associated with the sensor reading.
    /// * `obs_model` - Observation model matrix mapping state space to
    ///   observation space.
    /// * `covar` - Measurement noise covariance matrix.
    ///
    /// # Returns
    ///
    /// (`SensorReading`): A new `SensorReading` instance.
    ///
    /// # Panics
    ///
    /// Panics if the observation model row count does not agree with the
    /// data length and the covariance dimensions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndarray::{arr1, arr2};
    /// use hoverpilot::common::ext_kal_fltr::SensorReading;
    ///
    /// let data = arr1(&[3.0, 4.0]);
    /// let obs_model = arr2(&[[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]);
    /// let covar = arr2(&[[0.5, 0.0], [0.0, 0.5]]);
    /// let reading = SensorReading::new(data, obs_model, covar);
    ///
    /// assert_eq!(reading.data.len(), 2);
    /// ```
    pub fn new(data: Array1<f64>, obs_model: Array2<f64>, covar: Array2<f64>) -> Self {
        assert!(
            data.len() == obs_model.nrows()
                && covar.nrows() == obs_model.nrows()
                && covar.ncols() == obs_model.nrows(),
            "Observation model, data, and covariance dimensions do not match"
        );
        SensorReading {
            data,
            obs_model,
            covar,
        }
    }
}

/// Represents a GPS-like position sensor observing `[x, y]` of the planar
/// kinematic state.
#[derive(Debug, Clone)]
pub struct Gps {
    /// Observation model matrix for the position sensor.
    pub obs_model: Array2<f64>,
    /// Measurement noise covariance matrix for the position sensor.
    pub covar: Array2<f64>,
}

impl Gps {
    /// Creates a new `Gps` instance.
    ///
    /// # Arguments
    ///
    /// * `var` - Measurement noise variance applied to both position axes.
    ///
    /// # Returns
    ///
    /// (`Gps`): A new `Gps` instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::Gps;
    ///
    /// let gps = Gps::new(0.5);
    /// assert_eq!(gps.obs_model[[0, 0]], 1.0);
    /// assert_eq!(gps.covar[[1, 1]], 0.5);
    /// ```
    pub fn new(var: f64) -> Self {
        let obs_model = arr2(&[[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]);
        let covar = Array2::eye(2) * var;
        Gps { obs_model, covar }
    }

    /// Reads a position sample and returns a `SensorReading` instance.
    ///
    /// # Arguments
    ///
    /// * `xy` - Position sample `[x, y]`.
    ///
    /// # Returns
    ///
    /// (`Result<SensorReading, KalmanError>`): The reading, or
    /// [`KalmanError::DimensionMismatch`] if `xy` is not a 2-vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::Gps;
    ///
    /// let gps = Gps::new(0.5);
    /// let reading = gps.read(&[3.0, 4.0]).unwrap();
    /// assert_eq!(reading.data[0], 3.0);
    ///
    /// assert!(gps.read(&[3.0]).is_err());
    /// ```
    pub fn read(&self, xy: &[f64]) -> Result<SensorReading, KalmanError> {
        if xy.len() != 2 {
            return Err(KalmanError::DimensionMismatch {
                expected: 2,
                got: xy.len(),
            });
        }
        Ok(SensorReading::new(
            arr1(xy),
            self.obs_model.clone(),
            self.covar.clone(),
        ))
    }
}

/// Represents an IMU-like velocity sensor observing `[vx, vy]` of the planar
/// kinematic state.
#[derive(Debug, Clone)]
pub struct Imu {
    /// Observation model matrix for the velocity sensor.
    pub obs_model: Array2<f64>,
    /// Measurement noise covariance matrix for the velocity sensor.
    pub covar: Array2<f64>,
}

impl Imu {
    /// Creates a new `Imu` instance.
    ///
    /// # Arguments
    ///
    /// * `var` - Measurement noise variance applied to both velocity axes.
    ///
    /// # Returns
    ///
    /// (`Imu`): A new `Imu` instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::Imu;
    ///
    /// let imu = Imu::new(0.1);
    /// assert_eq!(imu.obs_model[[0, 2]], 1.0);
    /// assert_eq!(imu.covar[[0, 0]], 0.1);
    /// ```
    pub fn new(var: f64) -> Self {
        let obs_model = arr2(&[[0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]]);
        let covar = Array2::eye(2) * var;
        Imu { obs_model, covar }
    }

    /// Reads a velocity sample and returns a `SensorReading` instance.
    ///
    /// # Arguments
    ///
    /// * `vxvy` - Velocity sample `[vx, vy]`.
    ///
    /// # Returns
    ///
    /// (`Result<SensorReading, KalmanError>`): The reading, or
    /// [`KalmanError::DimensionMismatch`] if `vxvy` is not a 2-vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::Imu;
    ///
    /// let imu = Imu::new(0.1);
    /// let reading = imu.read(&[1.0, -1.0]).unwrap();
    /// assert_eq!(reading.data[1], -1.0);
    /// ```
    pub fn read(&self, vxvy: &[f64]) -> Result<SensorReading, KalmanError> {
        if vxvy.len() != 2 {
            return Err(KalmanError::DimensionMismatch {
                expected: 2,
                got: vxvy.len(),
            });
        }
        Ok(SensorReading::new(
            arr1(vxvy),
            self.obs_model.clone(),
            self.covar.clone(),
        ))
    }
}

/// Represents a trait for Extended Kalman Filter (EKF) functionality.
pub trait EKF {
    /// Updates the EKF with the given sensor reading.
    fn update(&mut self, reading: &SensorReading) -> Result<(), KalmanError>;

    /// Predicts the state of the EKF for the given time step.
    fn predict(&mut self, dt: f64) -> Result<(), KalmanError>;

    /// Calculates the transfer function matrices for the given time step.
    fn calc_transfer_fun(&self, dt: f64) -> (Array2<f64>, Array2<f64>);
}

/// Inverts a 2x2 matrix through the adjugate formula, rejecting matrices
/// whose determinant magnitude is at or below `tol`.
fn invert_2x2(m: &Array2<f64>, tol: f64) -> Result<Array2<f64>, KalmanError> {
    let det = m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]];
    if !det.is_finite() || det.abs() <= tol {
        return Err(KalmanError::SingularInnovation { det });
    }
    Ok(arr2(&[[m[[1, 1]], -m[[0, 1]]], [-m[[1, 0]], m[[0, 0]]]]) / det)
}

/// Represents a planar position/velocity Extended Kalman Filter (EKF).
///
/// The state vector is `[x, y, vx, vy]` under a constant-velocity motion
/// model. Position and velocity observations arrive through independent
/// GPS-like and IMU-like channels; within one time step both channels
/// sequentially refine the same post-predict state, so applying them in
/// either order is valid.
#[derive(Debug, Clone)]
pub struct PosVelEKF {
    /// State vector `[x, y, vx, vy]` of the EKF.
    pub state: Array1<f64>,
    /// Covariance matrix of the EKF.
    pub covar: Array2<f64>,
    /// Process noise covariance added on every predict step.
    pub process_noise: Array2<f64>,
    /// Position sensor channel.
    pub gps: Gps,
    /// Velocity sensor channel.
    pub imu: Imu,
    /// Tolerance on `|det S|` below which an update is rejected as singular.
    pub singular_tol: f64,
}

impl PosVelEKF {
    /// Creates a new `PosVelEKF` instance with a zero state and diagonal
    /// covariance matrices.
    ///
    /// # Arguments
    ///
    /// * `var_init` - Initial variance for every state component.
    /// * `q` - Process noise variance for every state component.
    /// * `r_gps` - Position measurement noise variance.
    /// * `r_imu` - Velocity measurement noise variance.
    ///
    /// # Returns
    ///
    /// (`PosVelEKF`): A new `PosVelEKF` instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::PosVelEKF;
    ///
    /// let ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
    /// assert_eq!(ekf.state.len(), 4);
    /// assert_eq!(ekf.covar[[0, 0]], 1.0);
    /// ```
    pub fn new(var_init: f64, q: f64, r_gps: f64, r_imu: f64) -> Self {
        PosVelEKF {
            state: Array1::zeros(4),
            covar: Array2::eye(4) * var_init,
            process_noise: Array2::eye(4) * q,
            gps: Gps::new(r_gps),
            imu: Imu::new(r_imu),
            singular_tol: DEFAULT_SINGULAR_TOL,
        }
    }

    /// Replaces the initial state, consuming and returning the filter.
    ///
    /// # Arguments
    ///
    /// * `state` - Initial state `[x, y, vx, vy]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::PosVelEKF;
    ///
    /// let ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1).with_state([2.0, 0.0, 1.0, 1.0]);
    /// assert_eq!(ekf.state[0], 2.0);
    /// ```
    pub fn with_state(mut self, state: [f64; 4]) -> Self {
        self.state = arr1(&state);
        self
    }

    /// Replaces the singularity tolerance, consuming and returning the
    /// filter.
    ///
    /// # Arguments
    ///
    /// * `tol` - Tolerance on `|det S|`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::PosVelEKF;
    ///
    /// let ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1).with_singular_tol(1e-9);
    /// assert_eq!(ekf.singular_tol, 1e-9);
    /// ```
    pub fn with_singular_tol(mut self, tol: f64) -> Self {
        self.singular_tol = tol;
        self
    }

    /// Updates the filter with a position sample from the GPS channel.
    ///
    /// # Arguments
    ///
    /// * `z` - Position measurement `[x, y]`.
    ///
    /// # Returns
    ///
    /// (`Result<(), KalmanError>`): `Ok` on success;
    /// [`KalmanError::DimensionMismatch`] if `z` is not a 2-vector,
    /// [`KalmanError::SingularInnovation`] if `S` cannot be inverted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
    ///
    /// let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
    /// ekf.predict(0.1).unwrap();
    /// ekf.update_gps(&[0.1, 0.1]).unwrap();
    /// assert!(ekf.state[0] > 0.0);
    /// ```
    pub fn update_gps(&mut self, z: &[f64]) -> Result<(), KalmanError> {
        let reading = self.gps.read(z)?;
        self.update(&reading)
    }

    /// Updates the filter with a velocity sample from the IMU channel.
    ///
    /// # Arguments
    ///
    /// * `z` - Velocity measurement `[vx, vy]`.
    ///
    /// # Returns
    ///
    /// (`Result<(), KalmanError>`): `Ok` on success;
    /// [`KalmanError::DimensionMismatch`] if `z` is not a 2-vector,
    /// [`KalmanError::SingularInnovation`] if `S` cannot be inverted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
    ///
    /// let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
    /// ekf.predict(0.1).unwrap();
    /// ekf.update_imu(&[1.0, 1.0]).unwrap();
    /// assert!(ekf.state[2] > 0.5);
    /// ```
    pub fn update_imu(&mut self, z: &[f64]) -> Result<(), KalmanError> {
        let reading = self.imu.read(z)?;
        self.update(&reading)
    }
}

impl EKF for PosVelEKF {
    /// Updates the filter with the given sensor reading.
    ///
    /// Computes the innovation `y = z - H·x`, innovation covariance
    /// `S = H·P·Hᵀ + R`, Kalman gain `K = P·Hᵀ·S⁻¹`, then applies
    /// `x += K·y` and `P = (I - K·H)·P`. A singular `S` is reported, never
    /// regularized, and the filter is left untouched.
    ///
    /// # Arguments
    ///
    /// * `reading` - Sensor reading with a 2-dimensional observation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
    ///
    /// let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
    /// ekf.predict(0.1).unwrap();
    /// let reading = ekf.gps.read(&[1.0, 2.0]).unwrap();
    /// ekf.update(&reading).unwrap();
    /// assert!(ekf.covar[[0, 0]] < 1.11);
    /// ```
    fn update(&mut self, reading: &SensorReading) -> Result<(), KalmanError> {
        if reading.data.len() != 2 {
            return Err(KalmanError::DimensionMismatch {
                expected: 2,
                got: reading.data.len(),
            });
        }

        let h = &reading.obs_model;
        let innovation = &reading.data - &h.dot(&self.state);
        let innovation_covar = h.dot(&self.covar).dot(&h.t()) + &reading.covar;
        let inv = invert_2x2(&innovation_covar, self.singular_tol)?;
        let gain = self.covar.dot(&h.t()).dot(&inv);

        self.state = &self.state + &gain.dot(&innovation);
        let identity: Array2<f64> = Array2::eye(self.state.len());
        self.covar = (identity - gain.dot(h)).dot(&self.covar);
        Ok(())
    }

    /// Predicts the state of the filter for the given time step.
    ///
    /// Advances the state under the constant-velocity model and the
    /// covariance via `P' = F·P·Fᵀ + Q`.
    ///
    /// # Arguments
    ///
    /// * `dt` - Time step for prediction; must be finite and positive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
    ///
    /// let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1).with_state([0.0, 0.0, 1.0, 1.0]);
    /// ekf.predict(0.1).unwrap();
    /// assert!((ekf.state[0] - 0.1).abs() < 1e-12);
    ///
    /// assert!(ekf.predict(0.0).is_err());
    /// ```
    fn predict(&mut self, dt: f64) -> Result<(), KalmanError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(KalmanError::NonPositiveDt(dt));
        }

        let (tf, tfj) = self.calc_transfer_fun(dt);
        self.state = tf.dot(&self.state);
        self.covar = tfj.dot(&self.covar).dot(&tfj.t()) + &self.process_noise;
        Ok(())
    }

    /// Calculates the transfer function matrices for the given time step.
    ///
    /// The motion model is linear, so the state transition matrix and its
    /// Jacobian coincide: identity plus `dt` coupling position to velocity.
    ///
    /// # Arguments
    ///
    /// * `dt` - Time step for prediction.
    ///
    /// # Returns
    ///
    /// (`(Array2<f64>, Array2<f64>)`): Tuple containing the state transition
    /// matrix and its Jacobian.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
    ///
    /// let ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
    /// let (tf, tfj) = ekf.calc_transfer_fun(0.1);
    /// assert_eq!(tf[[0, 2]], 0.1);
    /// assert_eq!(tf, tfj);
    /// ```
    fn calc_transfer_fun(&self, dt: f64) -> (Array2<f64>, Array2<f64>) {
        let mut tf: Array2<f64> = Array2::eye(4);
        tf[[0, 2]] = dt;
        tf[[1, 3]] = dt;

        let tfj = tf.clone();
        (tf, tfj)
    }
}
