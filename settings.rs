use std::time::Duration;

use crate::registers::{ADDR_BME280, MODE_FORCED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Oversampling {
    Skipped = 0,
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            5 => Oversampling::X16,
            _ => Oversampling::Skipped,
        }
    }

    pub fn factor(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IIRFilter {
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// Inactive time between conversions in normal mode (`t_sb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Standby {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    #[default]
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub bus: u8,
    pub address: u16,
    pub osrs_t: Oversampling,
    pub osrs_p: Oversampling,
    pub osrs_h: Oversampling,
    pub filter: IIRFilter,
    // normal mode only
    pub standby: Standby,
    pub spi3w_en: bool,
    pub reset_delay: Duration,
    // between trigger and data read
    pub acquisition_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let mut settings = Settings {
            bus: 1,
            address: ADDR_BME280,
            osrs_t: Oversampling::X1,
            osrs_p: Oversampling::X1,
            osrs_h: Oversampling::X1,
            filter: IIRFilter::Off,
            standby: Standby::default(),
            spi3w_en: false,
            reset_delay: Duration::from_millis(2),
            acquisition_delay: Duration::from_millis(0),
        };
        settings.acquisition_delay = settings.max_measurement_time();
        settings
    }
}

impl Settings {
    pub fn ctrl_hum(&self) -> u8 {
        self.osrs_h as u8
    }

    // always forced mode
    pub fn ctrl_meas(&self) -> u8 {
        ((self.osrs_t as u8) << 5) | ((self.osrs_p as u8) << 2) | MODE_FORCED
    }

    pub fn config(&self) -> u8 {
        ((self.standby as u8) << 5) | ((self.filter as u8) << 2) | (self.spi3w_en as u8)
    }

    /// Datasheet maximum measurement time for the configured oversampling,
    /// rounded up to whole milliseconds.
    pub fn max_measurement_time(&self) -> Duration {
        let channel = |osrs: Oversampling, overhead: u32| match osrs.factor() {
            0 => 0,
            n => 2300 * n + overhead,
        };
        let micros = 1250
            + channel(self.osrs_t, 0)
            + channel(self.osrs_p, 575)
            + channel(self.osrs_h, 575);
        Duration::from_millis(u64::from((micros + 999) / 1000))
    }
}
