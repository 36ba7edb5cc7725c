//! BME280 temperature / pressure / humidity reader for the Raspberry Pi.
//!
//! Calibration is read once and decoded into a [`CalibrationSet`]. Each acquisition
//! triggers a forced-mode conversion through [`SensorController`], and the raw sample
//! is turned into a [`Reading`] by [`compensate_configured`] using the datasheet's
//! fixed-point formulas.
//!
//! ```ignore
//! let i2c = rppal::i2c::I2c::with_bus(1)?;
//! let mut ctrl = SensorController::new(i2c, Settings::default());
//! let cal = ctrl.read_calibration()?;
//! ctrl.initialize()?;
//! let sample = ctrl.acquire_once()?;
//! let reading = compensate_configured(&sample, &cal, ctrl.settings());
//! ```

pub mod bus;
pub mod calibration;
pub mod compensation;
pub mod controller;
pub mod error;
pub mod registers;
pub mod settings;
pub mod structs;

pub use bus::BusPort;
pub use compensation::{compensate, compensate_configured};
pub use controller::{ControllerState, SensorController};
pub use error::{Error, Quantity, Result};
pub use settings::{IIRFilter, Oversampling, Settings, Standby};
pub use structs::{CalibrationSet, RawSample, Reading, TFine};
