use std::env;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use log::{info, warn};
use rppal::i2c::{self, I2c};

use rpbme280_tph::registers::{ADDR_BME280, ADDR_BME280_ALT, CHIP_ID_BME280};
use rpbme280_tph::{
    compensate_configured, Error, Oversampling, Reading, Result, SensorController, Settings,
};

fn parse_number<T: FromStr>(raw: &str, from_hex: fn(&str) -> Option<T>) -> Option<T> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => from_hex(hex),
        None => raw.parse().ok(),
    }
}

fn env_override<T: FromStr>(name: &str, from_hex: fn(&str) -> Option<T>) -> Option<T> {
    let raw = env::var(name).ok()?;
    let value = parse_number(&raw, from_hex);
    if value.is_none() {
        warn!("ignoring {}={:?}", name, raw);
    }
    value
}

// "primary" (SDO high) and "alt" (SDO low) name the two strap addresses.
fn parse_address(raw: &str) -> Option<u16> {
    match raw.trim() {
        "primary" => Some(ADDR_BME280),
        "alt" => Some(ADDR_BME280_ALT),
        other => parse_number(other, |h| u16::from_str_radix(h, 16).ok()),
    }
}

// 0 skips the channel, 1..5 select x1..x16.
fn env_oversampling(name: &str) -> Option<Oversampling> {
    let raw = env_override(name, |h| u8::from_str_radix(h, 16).ok())?;
    if raw > 5 {
        warn!("ignoring {}={}", name, raw);
        return None;
    }
    Some(Oversampling::from_u8(raw))
}

fn load_settings() -> (Settings, u32, Duration) {
    let mut settings = Settings::default();
    if let Some(bus) = env_override("BME280_I2C_BUS", |h| u8::from_str_radix(h, 16).ok()) {
        settings.bus = bus;
    }
    if let Ok(raw) = env::var("BME280_I2C_ADDR") {
        match parse_address(&raw) {
            Some(addr) => settings.address = addr,
            None => warn!("ignoring BME280_I2C_ADDR={:?}", raw),
        }
    }
    if let Some(osrs) = env_oversampling("BME280_OSRS_T") {
        settings.osrs_t = osrs;
    }
    if let Some(osrs) = env_oversampling("BME280_OSRS_P") {
        settings.osrs_p = osrs;
    }
    if let Some(osrs) = env_oversampling("BME280_OSRS_H") {
        settings.osrs_h = osrs;
    }
    settings.acquisition_delay = settings.max_measurement_time();
    if let Some(ms) = env_override("BME280_ACQ_DELAY_MS", |h| u64::from_str_radix(h, 16).ok()) {
        settings.acquisition_delay = Duration::from_millis(ms);
    }
    let samples = env_override("BME280_SAMPLES", |h| u32::from_str_radix(h, 16).ok()).unwrap_or(1);
    let interval = env_override("BME280_INTERVAL_MS", |h| u64::from_str_radix(h, 16).ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(1));
    (settings, samples, interval)
}

fn print_reading(reading: &Reading) {
    let or_dashes = |v: Option<f64>| match v {
        Some(v) => format!("{:.2}", v),
        None => "--".to_string(),
    };
    println!("Temperature: {:.2} C", reading.temperature);
    println!("Humidity: {} %", or_dashes(reading.humidity));
    println!("Pressure: {} hPa", or_dashes(reading.pressure));
}

fn run(settings: Settings, samples: u32, interval: Duration) -> Result<(), i2c::Error> {
    let i2c = I2c::with_bus(settings.bus)?;
    let mut ctrl = SensorController::new(i2c, settings);

    let chip_id = ctrl.chip_id()?;
    if chip_id != CHIP_ID_BME280 {
        warn!("unexpected chip id 0x{:02X}", chip_id);
    }

    let calib_data = ctrl.read_calibration()?;

    match ctrl.initialize() {
        Err(Error::ModeVerification { .. }) => {
            warn!("retrying initialization");
            ctrl.initialize()?;
        }
        other => other?,
    }

    for n in 0..samples {
        if n > 0 {
            thread::sleep(interval);
        }
        let raw_data = ctrl.acquire_once()?;
        match compensate_configured(&raw_data, &calib_data, ctrl.settings()) {
            Ok(reading) => print_reading(&reading),
            Err(e) => warn!("sample {} dropped: {}", n, e),
        }
    }

    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (settings, samples, interval) = load_settings();
    info!("{:?}", settings);
    run(settings, samples, interval)?;
    Ok(())
}
