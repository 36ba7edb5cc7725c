//! Fixed-point compensation of raw ADC samples.
//!
//! All three formulas hang off a single [`TFine`]: compute it once per sample with
//! [`compute_t_fine`] and hand the same value to the pressure and humidity steps.
//! [`compensate`] does exactly that.
//!
//! The formula functions are pure. Only [`compensate`] and [`compensate_configured`] log.

use log::{debug, warn};

use crate::error::{Error, Quantity, Result};
use crate::settings::{Oversampling, Settings};
use crate::structs::{round2, CalibrationSet, RawSample, Reading, TFine};

/// TFine at -40 degC, the bottom of the rated envelope.
pub const T_FINE_MIN: i32 = -204_826;
/// TFine at 85 degC, the top of the rated envelope.
pub const T_FINE_MAX: i32 = 435_174;

/// Upper clamp of the humidity accumulator, 100 %RH in Q22.10 << 12.
const HUMIDITY_ACC_MAX: i64 = 419_430_400;

fn raw20(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xlsb) >> 4)
}

/// 20-bit raw temperature from bytes 3..6.
pub fn extract_raw_temperature(sample: &RawSample) -> u32 {
    let d = sample.bytes();
    raw20(d[3], d[4], d[5])
}

/// 20-bit raw pressure from bytes 0..3.
pub fn extract_raw_pressure(sample: &RawSample) -> u32 {
    let d = sample.bytes();
    raw20(d[0], d[1], d[2])
}

/// 16-bit raw humidity from bytes 6..8.
pub fn extract_raw_humidity(sample: &RawSample) -> u32 {
    let d = sample.bytes();
    (u32::from(d[6]) << 8) | u32::from(d[7])
}

/// Fine temperature, rejected with [`Error::OutOfRange`] outside -40..85 degC.
pub fn compute_t_fine(raw_temperature: u32, cal: &CalibrationSet) -> Result<TFine> {
    let adc = i64::from(raw_temperature);
    let t1 = i64::from(cal.t1);
    let t2 = i64::from(cal.t2);
    let t3 = i64::from(cal.t3);

    let var1 = (((adc >> 3) - (t1 << 1)) * t2) >> 11;
    let var2 = (((((adc >> 4) - t1) * ((adc >> 4) - t1)) >> 12) * t3) >> 14;
    let t_fine = var1 + var2;

    if t_fine < i64::from(T_FINE_MIN) || t_fine > i64::from(T_FINE_MAX) {
        return Err(Error::OutOfRange(Quantity::Temperature));
    }
    Ok(TFine(t_fine as i32))
}

/// Temperature in degC.
pub fn temperature_from_t_fine(t_fine: TFine) -> f64 {
    f64::from((t_fine.0 * 5) >> 8) / 100.0
}

/// Pressure in hPa.
///
/// Intermediates are carried in `i128` so that no coefficient combination can
/// overflow; for real parts the results equal the datasheet's 64-bit pipeline.
pub fn pressure_from_t_fine(
    raw_pressure: u32,
    t_fine: TFine,
    cal: &CalibrationSet,
) -> Result<f64> {
    let p1 = i128::from(cal.p1);
    let p2 = i128::from(cal.p2);
    let p3 = i128::from(cal.p3);
    let p4 = i128::from(cal.p4);
    let p5 = i128::from(cal.p5);
    let p6 = i128::from(cal.p6);
    let p7 = i128::from(cal.p7);
    let p8 = i128::from(cal.p8);
    let p9 = i128::from(cal.p9);

    let mut var1 = i128::from(t_fine.0) - 128_000;
    let mut var2 = var1 * var1 * p6;
    var2 += (var1 * p5) << 17;
    var2 += p4 << 35;
    var1 = ((var1 * var1 * p3) >> 8) + ((var1 * p2) << 12);
    var1 = (((1_i128 << 47) + var1) * p1) >> 33;
    if var1 == 0 {
        return Err(Error::DivisionGuard);
    }

    let mut p = 1_048_576 - i128::from(raw_pressure);
    p = (((p << 31) - var2) * 3125) / var1;
    var1 = (p9 * (p >> 13) * (p >> 13)) >> 25;
    var2 = (p8 * p) >> 19;
    p = ((p + var1 + var2) >> 8) + (p7 << 4);

    // p is Pa in Q24.8
    Ok(p as f64 / 25600.0)
}

/// Relative humidity in %RH, saturated to 0..100.
pub fn humidity_from_t_fine(raw_humidity: u32, t_fine: TFine, cal: &CalibrationSet) -> f64 {
    let adc = i64::from(raw_humidity);
    let h1 = i64::from(cal.h1);
    let h2 = i64::from(cal.h2);
    let h3 = i64::from(cal.h3);
    let h4 = i64::from(cal.h4);
    let h5 = i64::from(cal.h5);
    let h6 = i64::from(cal.h6);

    let mut acc = i64::from(t_fine.0) - 76_800;
    acc = ((((adc << 14) - (h4 << 20) - (h5 * acc)) + 16_384) >> 15)
        * (((((((acc * h6) >> 10) * (((acc * h3) >> 11) + 32_768)) >> 10) + 2_097_152) * h2
            + 8_192)
            >> 14);
    acc -= ((((acc >> 15) * (acc >> 15)) >> 7) * h1) >> 4;
    let acc = acc.max(0).min(HUMIDITY_ACC_MAX);

    // Q22.10
    let q = acc >> 12;
    (q >> 10) as f64 + (q & 0x3FF) as f64 / 1024.0
}

/// Compensates one sample, all three channels.
///
/// Fails only if the temperature is out of range. Pressure degrades to `None` on a
/// zero denominator.
pub fn compensate(sample: &RawSample, cal: &CalibrationSet) -> Result<Reading> {
    let raw_t = extract_raw_temperature(sample);
    let raw_p = extract_raw_pressure(sample);
    let raw_h = extract_raw_humidity(sample);
    debug!("raw T={} P={} H={}", raw_t, raw_p, raw_h);

    let t_fine = compute_t_fine(raw_t, cal).map_err(|e| {
        warn!("t_fine outside rated range (raw {})", raw_t);
        e
    })?;

    let pressure = match pressure_from_t_fine(raw_p, t_fine, cal) {
        Ok(p) => Some(round2(p)),
        Err(_) => {
            warn!("pressure denominator is zero (t_fine {})", t_fine.0);
            None
        }
    };

    Ok(Reading {
        temperature: round2(temperature_from_t_fine(t_fine)),
        pressure,
        humidity: Some(round2(humidity_from_t_fine(raw_h, t_fine, cal))),
    })
}

/// Like [`compensate`], but channels whose oversampling is `Skipped` in `settings`
/// are reported absent. The part leaves a placeholder in their data registers.
pub fn compensate_configured(
    sample: &RawSample,
    cal: &CalibrationSet,
    settings: &Settings,
) -> Result<Reading> {
    let mut reading = compensate(sample, cal)?;
    if settings.osrs_p == Oversampling::Skipped {
        debug!("pressure skipped");
        reading.pressure = None;
    }
    if settings.osrs_h == Oversampling::Skipped {
        debug!("humidity skipped");
        reading.humidity = None;
    }
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::tests::datasheet_set;

    /// adc_P = 415148, adc_T = 519888, adc_H = 0x6E9A.
    const DATASHEET_SAMPLE: RawSample =
        RawSample([0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x6E, 0x9A]);

    fn rel_err(actual: f64, expected: f64) -> f64 {
        ((actual - expected) / expected).abs()
    }

    /// Floating-point humidity formula from the datasheet, used as reference.
    fn humidity_reference(raw: u32, t_fine: i32, cal: &CalibrationSet) -> f64 {
        let (h1, h2, h3) = (f64::from(cal.h1), f64::from(cal.h2), f64::from(cal.h3));
        let (h4, h5, h6) = (f64::from(cal.h4), f64::from(cal.h5), f64::from(cal.h6));
        let mut h = f64::from(t_fine) - 76800.0;
        h = (f64::from(raw) - (h4 * 64.0 + h5 / 16384.0 * h))
            * (h2 / 65536.0 * (1.0 + h6 / 67108864.0 * h * (1.0 + h3 / 67108864.0 * h)));
        h * (1.0 - h1 * h / 524288.0)
    }

    #[test]
    fn extracts_raw_channels() {
        assert_eq!(extract_raw_pressure(&DATASHEET_SAMPLE), 415_148);
        assert_eq!(extract_raw_temperature(&DATASHEET_SAMPLE), 519_888);
        assert_eq!(extract_raw_humidity(&DATASHEET_SAMPLE), 0x6E9A);

        let sample = RawSample([0xFF; 8]);
        assert_eq!(extract_raw_pressure(&sample), 0xFFFFF);
        assert_eq!(extract_raw_temperature(&sample), 0xFFFFF);
        assert_eq!(extract_raw_humidity(&sample), 0xFFFF);
    }

    #[test]
    fn datasheet_worked_example() {
        let cal = datasheet_set();
        let t_fine = compute_t_fine(519_888, &cal).unwrap();
        assert_eq!(t_fine.value(), 128_422);
        assert_eq!(temperature_from_t_fine(t_fine), 25.08);

        let pressure = pressure_from_t_fine(415_148, t_fine, &cal).unwrap();
        assert!(rel_err(pressure, 1006.5327) < 0.001, "{}", pressure);

        let humidity = humidity_from_t_fine(0x6E9A, t_fine, &cal);
        let reference = humidity_reference(0x6E9A, t_fine.value(), &cal);
        assert!(rel_err(humidity, reference) < 0.001, "{} vs {}", humidity, reference);
    }

    #[test]
    fn compensate_datasheet_sample() {
        let reading = compensate(&DATASHEET_SAMPLE, &datasheet_set()).unwrap();
        assert_eq!(reading.temperature, 25.08);
        assert_eq!(reading.pressure, Some(1006.53));
        assert_eq!(reading.humidity, Some(46.61));
    }

    #[test]
    fn compensate_shares_one_t_fine() {
        let cal = datasheet_set();
        let t_fine = compute_t_fine(extract_raw_temperature(&DATASHEET_SAMPLE), &cal).unwrap();
        let reading = compensate(&DATASHEET_SAMPLE, &cal).unwrap();
        assert_eq!(
            reading.pressure,
            Some(round2(pressure_from_t_fine(415_148, t_fine, &cal).unwrap()))
        );
        assert_eq!(
            reading.humidity,
            Some(round2(humidity_from_t_fine(0x6E9A, t_fine, &cal)))
        );
    }

    #[test]
    fn t_fine_range_guard() {
        let cal = datasheet_set();
        // t_fine -721301
        assert_eq!(
            compute_t_fine(0, &cal),
            Err(Error::OutOfRange(Quantity::Temperature))
        );
        // t_fine 960246
        assert_eq!(
            compute_t_fine(0xFFFFF, &cal),
            Err(Error::OutOfRange(Quantity::Temperature))
        );

        let mut sample = DATASHEET_SAMPLE;
        sample.0[3] = 0xFF;
        sample.0[4] = 0xFF;
        sample.0[5] = 0xF0;
        assert_eq!(
            compensate(&sample, &cal),
            Err(Error::OutOfRange(Quantity::Temperature))
        );
    }

    #[test]
    fn t_fine_guard_never_yields_out_of_range_value() {
        let cal = datasheet_set();
        for raw in (0..=0xFFFFFu32).step_by(97) {
            if let Ok(t_fine) = compute_t_fine(raw, &cal) {
                assert!(t_fine.value() >= T_FINE_MIN && t_fine.value() <= T_FINE_MAX);
                let t = temperature_from_t_fine(t_fine);
                assert!((-40.01..=85.0).contains(&t), "{}", t);
            }
        }
    }

    #[test]
    fn temperature_at_envelope_edges() {
        assert_eq!(temperature_from_t_fine(TFine(T_FINE_MAX)), 84.99);
        assert_eq!(temperature_from_t_fine(TFine(T_FINE_MIN)), -40.01);
        assert_eq!(temperature_from_t_fine(TFine(0)), 0.0);
    }

    #[test]
    fn pressure_division_guard() {
        let mut cal = datasheet_set();
        cal.p1 = 0;
        let t_fine = compute_t_fine(519_888, &cal).unwrap();
        assert_eq!(
            pressure_from_t_fine(415_148, t_fine, &cal),
            Err(Error::DivisionGuard)
        );

        let reading = compensate(&DATASHEET_SAMPLE, &cal).unwrap();
        assert_eq!(reading.pressure, None);
        assert_eq!(reading.temperature, 25.08);
        assert_eq!(reading.humidity, Some(46.61));
    }

    #[test]
    fn pressure_extremes_do_not_overflow() {
        let extremes = [i16::MIN + 1, -1, 0, 1, i16::MAX];
        let mut cal = datasheet_set();
        for &t_fine in &[T_FINE_MIN, 0, T_FINE_MAX] {
            for &raw in &[0u32, 415_148, 0xFFFFF] {
                for &p1 in &[1u16, u16::MAX] {
                    for &c in &extremes {
                        cal.p1 = p1;
                        cal.p2 = c;
                        cal.p3 = c;
                        cal.p4 = c;
                        cal.p5 = c;
                        cal.p6 = c;
                        cal.p7 = c;
                        cal.p8 = c;
                        cal.p9 = c;
                        if let Ok(p) = pressure_from_t_fine(raw, TFine(t_fine), &cal) {
                            assert!(p.is_finite());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn humidity_saturates_high() {
        let mut cal = datasheet_set();
        cal.h1 = 0;
        cal.h2 = i16::MAX;
        cal.h3 = 0;
        cal.h4 = 0;
        cal.h5 = 0;
        cal.h6 = 0;
        let t_fine = compute_t_fine(519_888, &cal).unwrap();
        assert_eq!(humidity_from_t_fine(0xFFFF, t_fine, &cal), 100.0);
    }

    #[test]
    fn humidity_saturates_low() {
        let mut cal = datasheet_set();
        cal.h4 = 2047;
        let t_fine = compute_t_fine(519_888, &cal).unwrap();
        assert_eq!(humidity_from_t_fine(0, t_fine, &cal), 0.0);
    }

    #[test]
    fn humidity_stays_in_range_for_adversarial_coefficients() {
        let mut cal = datasheet_set();
        for &h1 in &[0u8, 75, 255] {
            for &h2 in &[-32767i16, 0, 370, 32767] {
                for &h3 in &[0u8, 255] {
                    for &h45 in &[-2047i16, 0, 2047] {
                        for &h6 in &[-127i8, 0, 127] {
                            for &raw in &[0u32, 0x6E9A, 0xFFFF] {
                                for &t_fine in &[T_FINE_MIN, 128_422, T_FINE_MAX] {
                                    cal.h1 = h1;
                                    cal.h2 = h2;
                                    cal.h3 = h3;
                                    cal.h4 = h45;
                                    cal.h5 = -h45;
                                    cal.h6 = h6;
                                    let h = humidity_from_t_fine(raw, TFine(t_fine), &cal);
                                    assert!((0.0..=100.0).contains(&h), "{}", h);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn sample_with_placeholders() -> RawSample {
        let mut sample = DATASHEET_SAMPLE;
        // pressure 0x80000
        sample.0[0] = 0x80;
        sample.0[1] = 0x00;
        sample.0[2] = 0x00;
        // humidity 0x8000
        sample.0[6] = 0x80;
        sample.0[7] = 0x00;
        sample
    }

    #[test]
    fn placeholder_codes_on_enabled_channels_are_readings() {
        let sample = sample_with_placeholders();
        assert_eq!(extract_raw_pressure(&sample), 0x80000);
        assert_eq!(extract_raw_humidity(&sample), 0x8000);

        let cal = datasheet_set();
        // 818.746875 hPa, 71.8955078125 %RH
        let reading = compensate(&sample, &cal).unwrap();
        assert_eq!(reading.pressure, Some(818.75));
        assert_eq!(reading.humidity, Some(71.9));

        let reading = compensate_configured(&sample, &cal, &Settings::default()).unwrap();
        assert_eq!(reading.pressure, Some(818.75));
        assert_eq!(reading.humidity, Some(71.9));
    }

    #[test]
    fn skipped_channels_are_absent() {
        let settings = Settings {
            osrs_p: Oversampling::Skipped,
            osrs_h: Oversampling::Skipped,
            ..Settings::default()
        };
        let cal = datasheet_set();
        let sample = sample_with_placeholders();
        let reading = compensate_configured(&sample, &cal, &settings).unwrap();
        assert_eq!(reading.temperature, 25.08);
        assert_eq!(reading.pressure, None);
        assert_eq!(reading.humidity, None);

        let settings = Settings {
            osrs_h: Oversampling::Skipped,
            ..Settings::default()
        };
        let reading = compensate_configured(&DATASHEET_SAMPLE, &cal, &settings).unwrap();
        assert_eq!(reading.pressure, Some(1006.53));
        assert_eq!(reading.humidity, None);
    }
}
