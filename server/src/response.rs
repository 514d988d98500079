// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Renders responses in the exact LX200 wire format.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use lx200_elements::astro_util::{
    clamp_declination, normalize_degrees, to_sexagesimal, Resolution, Sexagesimal,
};
use serde::Serialize;

use crate::command::MountType;

/// Coordinate display precision, toggled by `:U#` and `:P#`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Precision {
    High,
    Low,
}

impl Precision {
    pub fn toggled(self) -> Self {
        match self {
            Precision::High => Precision::Low,
            Precision::Low => Precision::High,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SlewOutcome {
    Started,
    BelowHorizon,
    AboveHighLimit,
}

/// A reply to one command. Angles are in degrees.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// The command has no reply.
    None,
    /// Status digit `1` or `0`.
    Bool(bool),
    /// Reply to the bare ACK byte: the mount type letter.
    Ack(MountType),
    RightAscension(f64, Precision),
    /// Declination, also used for altitude.
    Declination(f64, Precision),
    Azimuth(f64, Precision),
    SiderealTime(f64),
    Latitude(f64),
    /// East-positive longitude; sent west-positive.
    Longitude(f64),
    Time(NaiveTime),
    Time12(NaiveTime),
    /// Handbox clock format; true for 24 hour.
    ClockFormat(bool),
    Date(NaiveDate),
    UtcOffset(f64),
    /// Hz.
    TrackingRate(f64),
    /// Elevation limit in whole degrees.
    Limit(i32),
    AlignmentStatus { mount_type: MountType, tracking: bool, stars: u8, parked: bool },
    /// Free text, terminated with `#`.
    Text(String),
    /// A single raw byte, no terminator.
    Echo(u8),
    SlewResult(SlewOutcome),
    TrackingRateAccepted,
    DateAccepted,
    SyncInfo,
    /// Distance bars; a bar is shown while slewing.
    DistanceBars(bool),
    PrecisionReport(Precision),
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::None => Vec::new(),
            Response::Bool(true) => b"1".to_vec(),
            Response::Bool(false) => b"0".to_vec(),
            Response::Ack(mount_type) => vec![match mount_type {
                MountType::AltAz => b'A',
                MountType::Land => b'L',
                MountType::Polar => b'P',
            }],
            Response::RightAscension(degrees, precision) => {
                let hours = normalize_degrees(*degrees) / 15.0;
                match precision {
                    Precision::High => hms(hours),
                    Precision::Low => {
                        let s = to_sexagesimal(hours, Resolution::TenthMinutes);
                        format!("{:02}:{:02}.{}#", s.units % 24, s.minutes, s.fraction)
                            .into_bytes()
                    }
                }
            }
            Response::Declination(degrees, precision) => {
                let degrees = clamp_declination(*degrees);
                match precision {
                    Precision::High => {
                        let s = saturate(to_sexagesimal(degrees, Resolution::Seconds));
                        format!("{}{:02}*{:02}'{:02}#",
                                sign(&s), s.units, s.minutes, s.fraction).into_bytes()
                    }
                    Precision::Low => signed_degrees_minutes(degrees),
                }
            }
            Response::Azimuth(degrees, precision) => {
                let degrees = normalize_degrees(*degrees);
                match precision {
                    Precision::High => {
                        let s = to_sexagesimal(degrees, Resolution::Seconds);
                        format!("{:03}*{:02}'{:02}#",
                                s.units % 360, s.minutes, s.fraction).into_bytes()
                    }
                    Precision::Low => degrees_minutes(degrees),
                }
            }
            Response::SiderealTime(degrees) => hms(normalize_degrees(*degrees) / 15.0),
            Response::Latitude(degrees) => signed_degrees_minutes(clamp_declination(*degrees)),
            Response::Longitude(east) => degrees_minutes(normalize_degrees(-east)),
            Response::Time(time) => format!("{:02}:{:02}:{:02}#",
                                            time.hour(), time.minute(), time.second())
                .into_bytes(),
            Response::Time12(time) => {
                let hour = match time.hour() % 12 {
                    0 => 12,
                    h => h,
                };
                format!("{:02}:{:02}:{:02}#", hour, time.minute(), time.second()).into_bytes()
            }
            Response::ClockFormat(true) => b"24#".to_vec(),
            Response::ClockFormat(false) => b"12#".to_vec(),
            Response::Date(date) => format!("{:02}/{:02}/{:02}#",
                                            date.month(), date.day(), date.year() % 100)
                .into_bytes(),
            Response::UtcOffset(hours) => {
                // Avoid "-00.0".
                let hours = if *hours == 0.0 { 0.0 } else { *hours };
                format!("{:+05.1}#", hours).into_bytes()
            }
            Response::TrackingRate(hz) => format!("{:04.1}#", hz).into_bytes(),
            Response::Limit(degrees) => format!("{:+03}*#", degrees).into_bytes(),
            Response::AlignmentStatus { mount_type, tracking, stars, parked } => {
                let mount = match mount_type {
                    MountType::AltAz | MountType::Land => 'A',
                    MountType::Polar => 'P',
                };
                let tracking = if *tracking { 'T' } else { 'N' };
                let stars = if *parked {
                    'P'
                } else {
                    char::from(b'0' + (*stars).min(3))
                };
                format!("{}{}{}#", mount, tracking, stars).into_bytes()
            }
            Response::Text(text) => format!("{}#", text).into_bytes(),
            Response::Echo(c) => vec![*c],
            Response::SlewResult(SlewOutcome::Started) => b"0".to_vec(),
            Response::SlewResult(SlewOutcome::BelowHorizon) => {
                b"1 Object is below horizon#".to_vec()
            }
            Response::SlewResult(SlewOutcome::AboveHighLimit) => {
                b"2 Object is above higher limit#".to_vec()
            }
            Response::TrackingRateAccepted => b"2".to_vec(),
            Response::DateAccepted => b"1Updating Planetary Data# #".to_vec(),
            Response::SyncInfo => b" M31 EX GAL MAG 3.5 SZ178.0'#".to_vec(),
            Response::DistanceBars(true) => b"\x7f#".to_vec(),
            Response::DistanceBars(false) => b"#".to_vec(),
            Response::PrecisionReport(Precision::High) => b"HIGH PRECISION#".to_vec(),
            Response::PrecisionReport(Precision::Low) => b"LOW PRECISION#".to_vec(),
        }
    }
}

pub fn encode(response: &Response) -> Vec<u8> {
    response.encode()
}

// HH:MM:SS#, wrapping 24:00:00 to 00:00:00.
fn hms(hours: f64) -> Vec<u8> {
    let s = to_sexagesimal(hours, Resolution::Seconds);
    format!("{:02}:{:02}:{:02}#", s.units % 24, s.minutes, s.fraction).into_bytes()
}

// sDD*MM#
fn signed_degrees_minutes(degrees: f64) -> Vec<u8> {
    let s = saturate(to_sexagesimal(degrees, Resolution::Minutes));
    format!("{}{:02}*{:02}#", sign(&s), s.units, s.minutes).into_bytes()
}

// DDD*MM#, 0 through 359.
fn degrees_minutes(degrees: f64) -> Vec<u8> {
    let s = to_sexagesimal(degrees, Resolution::Minutes);
    format!("{:03}*{:02}#", s.units % 360, s.minutes).into_bytes()
}

fn sign(s: &Sexagesimal) -> char {
    if s.negative {
        '-'
    } else {
        '+'
    }
}

// Rounding can't take a declination past the pole.
fn saturate(s: Sexagesimal) -> Sexagesimal {
    if s.units >= 90 {
        Sexagesimal { units: 90, minutes: 0, fraction: 0, ..s }
    } else {
        s
    }
}
