//! Constant-velocity Kalman filter bank with gated nearest-neighbor
//! association and track lifecycle management: predict, associate, update,
//! spawn, retire, emit, once per detection frame.

mod association;
mod kalman;
mod tracker;

pub use kalman::{KalmanConfig, KalmanFilter};
pub use tracker::{Tracker, TrackerConfig};
