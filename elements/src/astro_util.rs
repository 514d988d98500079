// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::{f64::consts::PI, time::SystemTime};

use astro::{
    angle::{anglr_sepr, limit_to_two_PI},
    coords::{alt_frm_eq, az_frm_eq},
    time::{julian_day, mn_sidr, CalType, Date},
};
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Sidereal hours elapsed per solar hour. A mount tracking at the sidereal
/// rate advances its right ascension by this many hours every hour.
pub const SIDEREAL_RATIO: f64 = 1.00273790935;

/// Wraps an angle in degrees into 0..360.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid() can round tiny negative inputs up to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Returns the signed difference `to - from` (degrees) taking the shorter way
/// around the circle. Range is -180..=180.
pub fn wrap_delta_degrees(from: f64, to: f64) -> f64 {
    let delta = normalize_degrees(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Clamps a declination or latitude (degrees) into -90..=90.
pub fn clamp_declination(degrees: f64) -> f64 {
    degrees.clamp(-90.0, 90.0)
}

/// Converts a longitude in degrees to -180..=180, positive east.
pub fn normalize_longitude(degrees: f64) -> f64 {
    let wrapped = normalize_degrees(degrees);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Returns the separation, in radians, between the given celestial coordinates
/// (in radians).
pub fn angular_separation(
    p0_ra: f64,
    p0_dec: f64,
    p1_ra: f64,
    p1_dec: f64,
) -> f64 {
    anglr_sepr(p0_ra, p0_dec, p1_ra, p1_dec)
}

/// Returns (alt, az, ha) in radians. Returned azimuth is clockwise from north.
/// Returned hour angle is -PI..PI.
/// ra: right ascension in radians.
/// dec: declination in radians.
/// lat: observer latitude in radians.
/// long: observer longitude in radians.
pub fn alt_az_from_equatorial(
    ra: f64,
    dec: f64,
    lat: f64,
    long: f64,
    time: &SystemTime,
) -> (/* alt */ f64, /* az */ f64, /* ha */ f64) {
    let gmst = greenwich_mean_sidereal_time_from_system_time(time);

    // Note that astro::coords::hr_angl_frm_observer_long() has a bug.
    // Fortunately the correct relation is trivial.
    let hour_angle = gmst + long - ra;

    let meeus_az = az_frm_eq(hour_angle, dec, lat);
    let az = limit_to_two_PI(meeus_az + PI);
    let mut ha = limit_to_two_PI(hour_angle);
    if ha > PI {
        ha -= 2.0 * PI;
    }

    (alt_frm_eq(hour_angle, dec, lat), az, ha)
}

/// Local mean sidereal time in radians (0..2PI) for an observer at `long`
/// (radians, positive east).
pub fn local_sidereal_time(long: f64, time: &SystemTime) -> f64 {
    limit_to_two_PI(greenwich_mean_sidereal_time_from_system_time(time) + long)
}

/// Greenwich mean sidereal time in radians (0..2PI).
pub fn greenwich_mean_sidereal_time_from_system_time(time: &SystemTime) -> f64 {
    let dt_utc = DateTime::<Utc>::from(*time);
    let date = Date {
        year: dt_utc.date_naive().year() as i16,
        month: dt_utc.date_naive().month() as u8,
        decimal_day: dt_utc.date_naive().day() as f64,
        cal_type: CalType::Gregorian,
    };
    let jd = julian_day(&date);

    let utc_seconds = dt_utc.time().num_seconds_from_midnight() as f64
        + dt_utc.time().nanosecond() as f64 / 1e9;
    let utc_hours = utc_seconds / 3600.0;
    let gmst_hours =
        mn_sidr(jd).to_degrees() / 15.0 + utc_hours * SIDEREAL_RATIO;

    limit_to_two_PI((gmst_hours * 15.0).to_radians())
}

/// Granularity of the last field of a sexagesimal rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// units:minutes:seconds
    Seconds,
    /// units:minutes.tenths
    TenthMinutes,
    /// units:minutes
    Minutes,
}

/// The magnitude of a value split into whole units (hours or degrees),
/// minutes and a final field whose meaning depends on the Resolution used:
/// seconds, tenths of a minute, or always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sexagesimal {
    pub negative: bool,
    pub units: i64,
    pub minutes: i64,
    pub fraction: i64,
}

/// Splits `value` into sexagesimal fields, rounding to the nearest step of
/// `resolution`. Rounding carries into minutes and units, so 23.999999 with
/// Resolution::Seconds yields 24:00:00; callers wrap or clamp as needed.
pub fn to_sexagesimal(value: f64, resolution: Resolution) -> Sexagesimal {
    let steps_per_unit: i64 = match resolution {
        Resolution::Seconds => 3600,
        Resolution::TenthMinutes => 600,
        Resolution::Minutes => 60,
    };
    let steps_per_minute = steps_per_unit / 60;
    let steps = (value.abs() * steps_per_unit as f64).round() as i64;
    Sexagesimal {
        negative: value < 0.0 && steps != 0,
        units: steps / steps_per_unit,
        minutes: (steps / steps_per_minute) % 60,
        fraction: steps % steps_per_minute,
    }
}

/// Combines sexagesimal fields into a single value.
pub fn from_sexagesimal(
    negative: bool,
    units: u32,
    minutes: u32,
    seconds: f64,
) -> f64 {
    let magnitude = units as f64 + minutes as f64 / 60.0 + seconds / 3600.0;
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use astro::angle::{deg_frm_dms, deg_frm_hms};
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    fn system_time(dt: DateTime<FixedOffset>) -> SystemTime {
        SystemTime::UNIX_EPOCH
            .checked_add(Duration::from_secs_f64(
                dt.timestamp_millis() as f64 / 1000.0,
            ))
            .unwrap()
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(365.0), 5.0);
        assert_eq!(normalize_degrees(-15.0), 345.0);
        assert_eq!(normalize_degrees(-1e-18), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn test_wrap_delta_degrees() {
        assert_eq!(wrap_delta_degrees(10.0, 20.0), 10.0);
        assert_eq!(wrap_delta_degrees(350.0, 10.0), 20.0);
        assert_eq!(wrap_delta_degrees(10.0, 350.0), -20.0);
        assert_eq!(wrap_delta_degrees(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(60.0), 60.0);
        assert_eq!(normalize_longitude(300.0), -60.0);
        assert_eq!(normalize_longitude(-122.5), -122.5);
        assert_eq!(normalize_longitude(180.0), 180.0);
    }

    #[test]
    fn test_to_sexagesimal() {
        let s = to_sexagesimal(1.5, Resolution::Seconds);
        assert_eq!((s.negative, s.units, s.minutes, s.fraction),
                   (false, 1, 30, 0));
        let s = to_sexagesimal(-10.5083, Resolution::Seconds);
        assert_eq!((s.negative, s.units, s.minutes, s.fraction),
                   (true, 10, 30, 30));
        // Floating point math is hard
        let s = to_sexagesimal(10.1, Resolution::Seconds);
        assert_eq!((s.units, s.minutes, s.fraction), (10, 6, 0));
        // Make sure we don't end up with 60 minutes or seconds
        let s = to_sexagesimal(23.999859, Resolution::Seconds);
        assert_eq!((s.units, s.minutes, s.fraction), (23, 59, 59));
        let s = to_sexagesimal(23.999862, Resolution::Seconds);
        assert_eq!((s.units, s.minutes, s.fraction), (24, 0, 0));

        let s = to_sexagesimal(10.51, Resolution::TenthMinutes);
        assert_eq!((s.units, s.minutes, s.fraction), (10, 30, 6));
        let s = to_sexagesimal(45.9999, Resolution::Minutes);
        assert_eq!((s.units, s.minutes, s.fraction), (46, 0, 0));

        // Values that round to zero are never negative.
        assert!(!to_sexagesimal(-0.00001, Resolution::Seconds).negative);
    }

    #[test]
    fn test_from_sexagesimal() {
        assert_abs_diff_eq!(from_sexagesimal(false, 1, 30, 0.0), 1.5);
        assert_abs_diff_eq!(from_sexagesimal(false, 10, 30, 30.0), 10.5083,
                            epsilon = 0.0001);
        assert_abs_diff_eq!(from_sexagesimal(true, 15, 30, 45.0), -15.5125,
                            epsilon = 0.0001);
    }

    #[test]
    fn test_angular_separation() {
        let p0_ra = PI;
        let p0_dec = 0.0;

        let p1_ra = PI + 1.0;
        let p1_dec = 1.0;

        let sep = angular_separation(p0_ra, p0_dec, p1_ra, p1_dec);
        assert_abs_diff_eq!(sep, 1.27, epsilon = 0.01);

        // Pole to equator is a right angle regardless of ra.
        let sep = angular_separation(0.0, PI / 2.0, 2.5, 0.0);
        assert_abs_diff_eq!(sep, PI / 2.0, epsilon = 0.0001);
    }

    #[test]
    fn test_greenwich_sidereal_time() {
        // GMST at J2000.0 (2000-01-01 12:00 UT) is 280.46 degrees.
        let dt = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2000, 1, 1, 12, 0, 0)
            .unwrap();
        let gmst = greenwich_mean_sidereal_time_from_system_time(
            &system_time(dt));
        assert_abs_diff_eq!(gmst.to_degrees(), 280.4606, epsilon = 0.01);

        // Local sidereal time adds east longitude.
        let lst = local_sidereal_time(30_f64.to_radians(), &system_time(dt));
        assert_abs_diff_eq!(lst.to_degrees(), 310.4606, epsilon = 0.01);
    }

    #[test]
    fn test_alt_az_from_equatorial() {
        let mizar_ra = deg_frm_hms(13, 23, 55.5).to_radians();
        let mizar_dec = deg_frm_dms(54, 55, 31.3).to_radians();

        let dt = FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 7, 23, 56, 0)
            .unwrap();
        let time = system_time(dt);

        let lat = 37_f64.to_radians();
        let long = -122_f64.to_radians();

        let (alt, az, ha) =
            alt_az_from_equatorial(mizar_ra, mizar_dec, lat, long, &time);

        // Expected values obtained from SkySafari.
        assert_abs_diff_eq!(
            alt,
            deg_frm_dms(58, 52, 14.3).to_radians(),
            epsilon = 0.01
        );
        assert_abs_diff_eq!(
            az,
            deg_frm_dms(42, 59, 36.7).to_radians(),
            epsilon = 0.01
        );
        assert_abs_diff_eq!(
            ha,
            -deg_frm_hms(2, 29, 50.9).to_radians(),
            epsilon = 0.01
        );
    }

    #[test]
    fn test_pole_altitude_is_latitude() {
        let dt = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 1, 3, 0, 0)
            .unwrap();
        let (alt, _az, _ha) = alt_az_from_equatorial(
            1.0, PI / 2.0, 40_f64.to_radians(), 0.0, &system_time(dt));
        assert_abs_diff_eq!(alt.to_degrees(), 40.0, epsilon = 0.001);
    }
} // mod tests.
