use ndarray::{arr1, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::common::ext_kal_fltr::{KalmanError, PosVelEKF, EKF};
use crate::common::filters::FirstOrderFilter;
use crate::flight::controls::alt_control::{AltControl, ControlError};

/// Represents a point-mass vertical-motion plant driven by a thrust command.
#[derive(Debug, Clone)]
pub struct Plant {
    /// Mass of the vehicle in kilograms.
    pub mass: f64,
    /// Gravitational acceleration in m/s^2.
    pub gravity: f64,
    /// Current altitude in meters.
    pub altitude: f64,
    /// Current vertical velocity in m/s.
    pub velocity: f64,
}

impl Plant {
    /// Creates a new `Plant` instance at rest on the ground.
    ///
    /// # Arguments
    ///
    /// * `mass` - Mass of the vehicle in kilograms.
    /// * `gravity` - Gravitational acceleration in m/s^2.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::Plant;
    ///
    /// let plant = Plant::new(1.0, 9.81);
    /// assert_eq!(plant.altitude, 0.0);
    /// assert_eq!(plant.velocity, 0.0);
    /// ```
    pub fn new(mass: f64, gravity: f64) -> Self {
        Plant {
            mass,
            gravity,
            altitude: 0.0,
            velocity: 0.0,
        }
    }

    /// Advances the plant one step under the given thrust.
    ///
    /// The update order is fixed: net force, then acceleration, then
    /// velocity, then altitude, all within the single step and with no
    /// sub-stepping. Closed-loop results are only reproducible against this
    /// exact order. `dt` is assumed positive; the controller driving the
    /// loop validates it.
    ///
    /// # Arguments
    ///
    /// * `thrust` - Thrust command in newtons.
    /// * `dt` - Time step in seconds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::Plant;
    ///
    /// let mut plant = Plant::new(1.0, 9.81);
    /// plant.apply_thrust(10.81, 0.1);
    /// assert!((plant.velocity - 0.1).abs() < 1e-9);
    /// assert!((plant.altitude - 0.01).abs() < 1e-9);
    /// ```
    pub fn apply_thrust(&mut self, thrust: f64, dt: f64) {
        let net_force = thrust - self.mass * self.gravity;
        let acceleration = net_force / self.mass;
        self.velocity += acceleration * dt;
        self.altitude += self.velocity * dt;
    }
}

/// Telemetry produced by one closed-loop step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Simulation time at the end of the step, in seconds.
    pub time: f64,
    /// Plant altitude after the step, in meters.
    pub altitude: f64,
    /// Plant vertical velocity after the step, in m/s.
    pub velocity: f64,
    /// Thrust commanded during the step, in newtons.
    pub thrust: f64,
}

/// Represents the altitude control loop: a controller wired to a plant and
/// stepped in fixed increments of simulated time.
///
/// Each step reads the plant altitude, optionally smooths it through a
/// first-order lowpass, asks the controller for a thrust command, applies
/// it to the plant, and advances time.
#[derive(Debug, Clone)]
pub struct ClosedLoop {
    /// Plant under control.
    pub plant: Plant,
    /// Altitude controller.
    pub control: AltControl,
    /// Fixed time step in seconds.
    pub dt: f64,
    /// Optional lowpass on the measured altitude.
    alt_filter: Option<FirstOrderFilter>,
    /// Simulation time in seconds.
    time: f64,
}

impl ClosedLoop {
    /// Creates a new `ClosedLoop` instance.
    ///
    /// # Arguments
    ///
    /// * `plant` - Plant under control.
    /// * `control` - Altitude controller.
    /// * `dt` - Fixed time step in seconds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    /// use hoverpilot::flight::sim::{ClosedLoop, Plant};
    ///
    /// let plant = Plant::new(1.0, 9.81);
    /// let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// let sim = ClosedLoop::new(plant, control, 0.1);
    /// assert_eq!(sim.dt, 0.1);
    /// ```
    pub fn new(plant: Plant, control: AltControl, dt: f64) -> Self {
        ClosedLoop {
            plant,
            control,
            dt,
            alt_filter: None,
            time: 0.0,
        }
    }

    /// Enables a first-order lowpass on the measured altitude, consuming
    /// and returning the loop. The filter starts at the plant's current
    /// altitude so the first step sees no artificial transient.
    ///
    /// # Arguments
    ///
    /// * `tau` - Filter time constant in seconds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    /// use hoverpilot::flight::sim::{ClosedLoop, Plant};
    ///
    /// let plant = Plant::new(1.0, 9.81);
    /// let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// let sim = ClosedLoop::new(plant, control, 0.1).with_altitude_filter(0.05);
    /// ```
    pub fn with_altitude_filter(mut self, tau: f64) -> Self {
        self.alt_filter = Some(FirstOrderFilter::new(tau, self.dt, self.plant.altitude));
        self
    }

    /// Runs one control step and returns its telemetry.
    ///
    /// # Returns
    ///
    /// (`Result<StepRecord, ControlError>`): Telemetry for the step, or the
    /// controller fault; the plant is untouched when the controller fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    /// use hoverpilot::flight::sim::{ClosedLoop, Plant};
    ///
    /// let plant = Plant::new(1.0, 9.81);
    /// let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// let mut sim = ClosedLoop::new(plant, control, 0.1);
    ///
    /// let record = sim.step().unwrap();
    /// assert!(record.thrust > 0.0);
    /// ```
    pub fn step(&mut self) -> Result<StepRecord, ControlError> {
        let measured = match self.alt_filter.as_mut() {
            Some(filter) => filter.apply(self.plant.altitude),
            None => self.plant.altitude,
        };

        let thrust = self.control.compute(measured, self.dt)?;
        self.plant.apply_thrust(thrust, self.dt);
        self.time += self.dt;

        Ok(StepRecord {
            time: self.time,
            altitude: self.plant.altitude,
            velocity: self.plant.velocity,
            thrust,
        })
    }

    /// Runs the loop for the given number of steps, collecting telemetry.
    ///
    /// # Arguments
    ///
    /// * `steps` - Number of control steps to run.
    ///
    /// # Returns
    ///
    /// (`Result<Vec<StepRecord>, ControlError>`): One record per step, or
    /// the first controller fault encountered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::controls::alt_control::AltControl;
    /// use hoverpilot::flight::sim::{ClosedLoop, Plant};
    ///
    /// let plant = Plant::new(1.0, 9.81);
    /// let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
    /// let mut sim = ClosedLoop::new(plant, control, 0.1);
    ///
    /// let records = sim.run(100).unwrap();
    /// assert_eq!(records.len(), 100);
    /// assert!(records.last().unwrap().altitude > 0.0);
    /// ```
    pub fn run(&mut self, steps: usize) -> Result<Vec<StepRecord>, ControlError> {
        let mut records = Vec::with_capacity(steps);
        for _ in 0..steps {
            records.push(self.step()?);
        }
        Ok(records)
    }
}

/// Represents a synthetic constant-velocity trajectory with noisy GPS and
/// IMU observations of it.
///
/// The generator is seeded, so a fixed seed reproduces the exact same
/// measurement stream run after run.
#[derive(Debug, Clone)]
pub struct TrajectorySim {
    /// True state `[x, y, vx, vy]`.
    pub state: Array1<f64>,
    /// Gaussian noise applied to position samples.
    gps_noise: Normal<f64>,
    /// Gaussian noise applied to velocity samples.
    imu_noise: Normal<f64>,
    /// Seeded random source.
    rng: StdRng,
}

impl TrajectorySim {
    /// Creates a new `TrajectorySim` instance.
    ///
    /// # Arguments
    ///
    /// * `initial` - True initial state `[x, y, vx, vy]`.
    /// * `gps_sigma` - Standard deviation of position sample noise.
    /// * `imu_sigma` - Standard deviation of velocity sample noise.
    /// * `seed` - Seed for the noise source.
    ///
    /// # Panics
    ///
    /// Panics if either standard deviation is negative or NaN.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::TrajectorySim;
    ///
    /// let sim = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);
    /// assert_eq!(sim.state[2], 1.0);
    /// ```
    pub fn new(initial: [f64; 4], gps_sigma: f64, imu_sigma: f64, seed: u64) -> Self {
        assert!(
            gps_sigma >= 0.0 && imu_sigma >= 0.0,
            "Noise standard deviations must be non-negative"
        );
        TrajectorySim {
            state: arr1(&initial),
            gps_noise: Normal::new(0.0, gps_sigma).unwrap(),
            imu_noise: Normal::new(0.0, imu_sigma).unwrap(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advances the true state one step under the constant-velocity model.
    ///
    /// # Arguments
    ///
    /// * `dt` - Time step in seconds; assumed positive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::TrajectorySim;
    ///
    /// let mut sim = TrajectorySim::new([0.0, 0.0, 1.0, -1.0], 0.0, 0.0, 42);
    /// sim.advance(0.1);
    /// assert!((sim.state[0] - 0.1).abs() < 1e-12);
    /// assert!((sim.state[1] + 0.1).abs() < 1e-12);
    /// ```
    pub fn advance(&mut self, dt: f64) {
        self.state = arr1(&[
            self.state[0] + self.state[2] * dt,
            self.state[1] + self.state[3] * dt,
            self.state[2],
            self.state[3],
        ]);
    }

    /// Draws a noisy position sample of the current true state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::TrajectorySim;
    ///
    /// let mut sim = TrajectorySim::new([3.0, 4.0, 1.0, 1.0], 0.0, 0.0, 42);
    /// assert_eq!(sim.gps_sample(), [3.0, 4.0]);
    /// ```
    pub fn gps_sample(&mut self) -> [f64; 2] {
        [
            self.state[0] + self.gps_noise.sample(&mut self.rng),
            self.state[1] + self.gps_noise.sample(&mut self.rng),
        ]
    }

    /// Draws a noisy velocity sample of the current true state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hoverpilot::flight::sim::TrajectorySim;
    ///
    /// let mut sim = TrajectorySim::new([3.0, 4.0, 1.0, -1.0], 0.0, 0.0, 42);
    /// assert_eq!(sim.imu_sample(), [1.0, -1.0]);
    /// ```
    pub fn imu_sample(&mut self) -> [f64; 2] {
        [
            self.state[2] + self.imu_noise.sample(&mut self.rng),
            self.state[3] + self.imu_noise.sample(&mut self.rng),
        ]
    }
}

/// Drives the filter over a synthetic trajectory: each step advances the
/// truth, samples both sensors, predicts, and applies the GPS and IMU
/// corrections in sequence.
///
/// # Arguments
///
/// * `ekf` - Filter to drive.
/// * `sim` - Trajectory and measurement source.
/// * `steps` - Number of fusion steps to run.
/// * `dt` - Fixed time step in seconds.
///
/// # Returns
///
/// (`Result<Vec<Array1<f64>>, KalmanError>`): The state estimate after each
/// step, or the first filter fault encountered.
///
/// # Examples
///
/// ```rust
/// use hoverpilot::common::ext_kal_fltr::PosVelEKF;
/// use hoverpilot::flight::sim::{fuse_trajectory, TrajectorySim};
///
/// let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
/// let mut sim = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);
///
/// let estimates = fuse_trajectory(&mut ekf, &mut sim, 100, 0.1).unwrap();
/// assert_eq!(estimates.len(), 100);
/// ```
pub fn fuse_trajectory(
    ekf: &mut PosVelEKF,
    sim: &mut TrajectorySim,
    steps: usize,
    dt: f64,
) -> Result<Vec<Array1<f64>>, KalmanError> {
    let mut estimates = Vec::with_capacity(steps);
    for _ in 0..steps {
        sim.advance(dt);
        let gps = sim.gps_sample();
        let imu = sim.imu_sample();

        ekf.predict(dt)?;
        ekf.update_gps(&gps)?;
        ekf.update_imu(&imu)?;
        estimates.push(ekf.state.clone());
    }
    Ok(estimates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_plant_single_step() {
        let mut plant = Plant::new(1.0, 9.81);
        plant.apply_thrust(10.81, 0.1);

        assert_abs_diff_eq!(plant.velocity, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(plant.altitude, 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_plant_update_order() {
        // Altitude integrates the already-updated velocity, so two equal
        // steps give 0.01 then 0.03, not 0.0 then 0.02.
        let mut plant = Plant::new(1.0, 9.81);
        plant.apply_thrust(10.81, 0.1);
        assert_abs_diff_eq!(plant.altitude, 0.01, epsilon = 1e-9);

        plant.apply_thrust(10.81, 0.1);
        assert_abs_diff_eq!(plant.velocity, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(plant.altitude, 0.03, epsilon = 1e-9);
    }

    #[test]
    fn test_plant_hover_thrust_is_equilibrium() {
        let mut plant = Plant::new(2.0, 9.81);
        plant.apply_thrust(2.0 * 9.81, 0.1);

        assert_abs_diff_eq!(plant.velocity, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(plant.altitude, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closed_loop_reaches_setpoint() {
        let plant = Plant::new(1.0, 9.81);
        let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
        let mut sim = ClosedLoop::new(plant, control, 0.1);

        let records = sim.run(500).unwrap();

        // Bounded throughout, near the setpoint at the end.
        assert!(records.iter().all(|r| r.altitude.abs() < 30.0));
        let last = records.last().unwrap();
        assert!((last.altitude - 10.0).abs() <= 1.0);
        assert_abs_diff_eq!(last.time, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closed_loop_approaches_from_below() {
        let plant = Plant::new(1.0, 9.81);
        let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
        let mut sim = ClosedLoop::new(plant, control, 0.1);

        let records = sim.run(500).unwrap();

        // The climb starts toward the setpoint, not away from it.
        assert!(records[20].altitude > records[0].altitude);
    }

    #[test]
    fn test_closed_loop_filtered_measurement_still_converges() {
        let plant = Plant::new(1.0, 9.81);
        let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
        let mut sim = ClosedLoop::new(plant, control, 0.1).with_altitude_filter(0.05);

        let records = sim.run(500).unwrap();

        assert!(records.iter().all(|r| r.altitude.abs() < 40.0));
        let last = records.last().unwrap();
        assert!((last.altitude - 10.0).abs() <= 1.5);
    }

    #[test]
    fn test_closed_loop_propagates_controller_fault() {
        let plant = Plant::new(1.0, 9.81);
        let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
        let mut sim = ClosedLoop::new(plant, control, 0.0);

        let before = sim.plant.clone();
        let err = sim.step().unwrap_err();
        assert!(matches!(err, ControlError::NonPositiveDt(_)));
        assert_eq!(sim.plant.altitude, before.altitude);
        assert_eq!(sim.plant.velocity, before.velocity);
    }

    #[test]
    fn test_trajectory_sim_deterministic() {
        let mut a = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);
        let mut b = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);

        for _ in 0..20 {
            a.advance(0.1);
            b.advance(0.1);
            assert_eq!(a.gps_sample(), b.gps_sample());
            assert_eq!(a.imu_sample(), b.imu_sample());
        }
    }

    #[test]
    fn test_trajectory_sim_seeds_differ() {
        let mut a = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);
        let mut b = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 43);

        assert_ne!(a.gps_sample(), b.gps_sample());
    }

    #[test]
    fn test_trajectory_sim_zero_noise_matches_truth() {
        let mut sim = TrajectorySim::new([0.0, 0.0, 1.0, -2.0], 0.0, 0.0, 7);
        sim.advance(0.5);

        assert_eq!(sim.gps_sample(), [0.5, -1.0]);
        assert_eq!(sim.imu_sample(), [1.0, -2.0]);
    }

    #[test]
    fn test_fuse_trajectory_noise_free_tracks_truth() {
        let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
        let mut sim = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.0, 0.0, 42);

        let estimates = fuse_trajectory(&mut ekf, &mut sim, 20, 0.1).unwrap();
        let last = estimates.last().unwrap();

        for i in 0..4 {
            assert_abs_diff_eq!(last[i], sim.state[i], epsilon = 0.05);
        }
    }

    #[test]
    fn test_fuse_trajectory_noisy_estimate_stays_near_truth() {
        let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
        let mut sim = TrajectorySim::new([0.0, 0.0, 1.0, 1.0], 0.5, 0.1, 42);

        let estimates = fuse_trajectory(&mut ekf, &mut sim, 100, 0.1).unwrap();
        let last = estimates.last().unwrap();

        // Truth position after 100 steps is (10, 10); the filtered estimate
        // should sit well inside the raw GPS noise band.
        assert_abs_diff_eq!(last[0], sim.state[0], epsilon = 1.0);
        assert_abs_diff_eq!(last[1], sim.state[1], epsilon = 1.0);
        assert_abs_diff_eq!(last[2], sim.state[2], epsilon = 0.3);
        assert_abs_diff_eq!(last[3], sim.state[3], epsilon = 0.3);
    }
}
