use std::convert::Infallible;
use std::fmt;

use crate::controller::ControllerState;
use crate::registers::Register;

/// Physical quantity a compensation step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Pressure,
    Humidity,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Temperature => write!(f, "temperature"),
            Quantity::Pressure => write!(f, "pressure"),
            Quantity::Humidity => write!(f, "humidity"),
        }
    }
}

/// Errors raised while talking to or compensating a BME280.
///
/// `E` is the error type of the underlying bus. Pure decoding and compensation
/// never touch a bus and use the default `Infallible`.
#[derive(Debug, Clone, PartialEq)]
pub enum Error<E = Infallible> {
    /// The bus transaction itself failed.
    Bus(E),
    /// A calibration block came back shorter than the decoder needs.
    IncompleteCalibration {
        block: Register,
        expected: usize,
        actual: usize,
    },
    /// A key/value calibration mapping lacks one of the 18 coefficients.
    MissingCoefficient(&'static str),
    /// A key/value calibration entry does not fit the coefficient's width.
    CoefficientOutOfRange { key: &'static str, value: i64 },
    /// `ctrl_meas` reported a non-sleep mode right after reset.
    ModeVerification { ctrl_meas: u8 },
    /// TFine left the rated -40..85 degC envelope.
    OutOfRange(Quantity),
    /// The pressure formula's denominator came out zero.
    DivisionGuard,
    /// The controller is not in a state that allows the requested operation.
    NotReady(ControllerState),
}

impl Error {
    /// Re-types a bus-free error into the caller's bus error type.
    pub fn lift<F>(self) -> Error<F> {
        match self {
            Error::Bus(never) => match never {},
            Error::IncompleteCalibration {
                block,
                expected,
                actual,
            } => Error::IncompleteCalibration {
                block,
                expected,
                actual,
            },
            Error::MissingCoefficient(key) => Error::MissingCoefficient(key),
            Error::CoefficientOutOfRange { key, value } => {
                Error::CoefficientOutOfRange { key, value }
            }
            Error::ModeVerification { ctrl_meas } => Error::ModeVerification { ctrl_meas },
            Error::OutOfRange(q) => Error::OutOfRange(q),
            Error::DivisionGuard => Error::DivisionGuard,
            Error::NotReady(state) => Error::NotReady(state),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "I2C error: {}", e),
            Error::IncompleteCalibration {
                block,
                expected,
                actual,
            } => write!(
                f,
                "Calibration block 0x{:02X} too short: expected {} bytes, got {}",
                block.addr(),
                expected,
                actual
            ),
            Error::MissingCoefficient(key) => write!(f, "Calibration coefficient {} missing", key),
            Error::CoefficientOutOfRange { key, value } => {
                write!(f, "Calibration coefficient {}={} out of range", key, value)
            }
            Error::ModeVerification { ctrl_meas } => write!(
                f,
                "Sensor not in sleep mode after reset (ctrl_meas=0x{:02X})",
                ctrl_meas
            ),
            Error::OutOfRange(q) => write!(f, "Compensated {} out of rated range", q),
            Error::DivisionGuard => write!(f, "Pressure compensation denominator is zero"),
            Error::NotReady(state) => write!(f, "Controller not ready (state: {:?})", state),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

impl From<rppal::i2c::Error> for Error<rppal::i2c::Error> {
    fn from(e: rppal::i2c::Error) -> Self {
        Error::Bus(e)
    }
}

/// Result type alias for BME280 operations.
pub type Result<T, E = Infallible> = std::result::Result<T, Error<E>>;
