/// H4 and H5 are 12-bit values held in `i16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSet {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

// 0xF7 - 0xFE: press_msb .. hum_lsb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample(pub [u8; 8]);

impl RawSample {
    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// Only built by `compensation::compute_t_fine`, which rejects values outside the
/// rated envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TFine(pub(crate) i32);

impl TFine {
    pub fn value(self) -> i32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,      // degC
    pub pressure: Option<f64>, // hPa
    pub humidity: Option<f64>, // %RH
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
