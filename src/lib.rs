//! # hoverpilot
//!
//! `hoverpilot` is a Rust crate that provides functionalities related to autonomous flight and sensor fusion.
//! This crate includes modules for fusing GPS and IMU readings through an Extended Kalman Filter (EKF),
//! a PID altitude controller, and a small simulation harness for validating both against a point-mass
//! vertical-motion plant. These components are designed to be used in the development of drone
//! flight stacks and sensor fusion applications.
//!
//! ## Modules
//!
//! `hoverpilot` is organized into several modules, each serving a specific purpose:
//!
//! - [SensorReading](common/ext_kal_fltr/struct.SensorReading.html): Represents a sensor reading with observed data, observation model,
//!   and covariance matrix.
//!
//! - [Gps](common/ext_kal_fltr/struct.Gps.html) / [Imu](common/ext_kal_fltr/struct.Imu.html): Position and velocity sensor channels
//!   producing readings for the filter.
//!
//! - [EKF Trait](common/ext_kal_fltr/trait.EKF.html): Defines a trait for Extended Kalman Filter (EKF) functionality.
//!
//! - [PosVelEKF](common/ext_kal_fltr/struct.PosVelEKF.html): A planar position/velocity Extended Kalman Filter (EKF) fusing
//!   both sensor channels.
//!
//! - [FirstOrderFilter](common/filters/struct.FirstOrderFilter.html): A first-order lowpass for smoothing noisy samples.
//!
//! - [AltControl](flight/controls/alt_control/struct.AltControl.html): A PID controller driving a measured altitude toward a setpoint.
//!
//! - [Plant](flight/sim/struct.Plant.html) / [ClosedLoop](flight/sim/struct.ClosedLoop.html) /
//!   [TrajectorySim](flight/sim/struct.TrajectorySim.html): The simulation harness used to exercise the controller and the filter.
//!
//! ## Usage
//!
//! To use the `hoverpilot` crate in your project, add the following line to your `Cargo.toml` file:
//!
//! ```toml
//! [dependencies]
//! hoverpilot = "0.1.0"
//! ```
//!
//! Then, you can import the necessary modules and use the provided functionalities in your code.
//!
//! ## Example
//!
//! ```rust
//! use hoverpilot::common::ext_kal_fltr::{PosVelEKF, EKF};
//! use hoverpilot::flight::controls::alt_control::AltControl;
//! use hoverpilot::flight::sim::{ClosedLoop, Plant};
//!
//! // Fuse one step of GPS and IMU data
//! let mut ekf = PosVelEKF::new(1.0, 0.1, 0.5, 0.1);
//! ekf.predict(0.1).unwrap();
//! ekf.update_gps(&[0.1, 0.1]).unwrap();
//! ekf.update_imu(&[1.0, 1.0]).unwrap();
//!
//! // Access the updated state and covariance
//! let updated_state = &ekf.state;
//! let updated_covar = &ekf.covar;
//!
//! // Drive a plant toward a 10 m setpoint
//! let plant = Plant::new(1.0, 9.81);
//! let control = AltControl::new(2.0, 0.1, 0.5, 10.0);
//! let mut sim = ClosedLoop::new(plant, control, 0.1);
//! let records = sim.run(100).unwrap();
//! assert!(records.last().unwrap().altitude > 0.0);
//!
//! // Perform other operations as needed
//! // ...
//! ```
//!
//! ## Contributing
//!
//! Contributions and feedback are welcome! If you'd like to contribute, report an issue, or suggest an enhancement,
//! please engage with the project on [GitHub](https://github.com/wiseaidev/hoverpilot).
//! Your contributions help improve this crate for the community.
//!
//! ## License
//!
//! This project is licensed under the [MIT License](LICENSE).

pub mod common;
pub mod flight;
