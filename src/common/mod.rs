//! Shared numerical building blocks: the sensor-fusion core and signal
//! filters.

pub mod ext_kal_fltr;
pub mod filters;
