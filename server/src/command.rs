// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Decodes LX200 frames into typed commands.
//!
//! Parameters are validated here, so the mount only ever sees in-range
//! values. Angles are converted to degrees; right ascension arrives in hours
//! and longitude arrives west-positive, both are normalized on the way in.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use lx200_elements::astro_util::{from_sexagesimal, normalize_longitude};
use serde::Serialize;
use thiserror::Error;

use crate::frame_reader::{Frame, ACK, EOT};
use crate::response::Response;

/// Tracking rate change for one `:T+#` or `:T-#`, in Hz.
pub const TRACKING_RATE_STEP_HZ: f64 = 0.1;

/// Highest tracking rate accepted by `:ST`, in Hz.
pub const MAX_TRACKING_RATE_HZ: f64 = 120.0;

/// Number of named sites the handbox stores.
pub const SITE_COUNT: usize = 4;

/// Longest site name accepted by `:SM` through `:SP`.
pub const MAX_SITE_NAME_LEN: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MountType {
    AltAz,
    Polar,
    Land,
}

/// Speed used by the manual move commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MotionRate {
    Guide,
    Centering,
    Find,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TrackingRate {
    Sidereal,
    Lunar,
    Solar,
    Custom,
}

/// One LX200 command with validated parameters. Angles are in degrees:
/// right ascension 0..360, declination and latitude -90..=90, longitude
/// -180..=180 positive east.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Ack,
    FirmwareDownload,
    SetAlignmentMode(MountType),
    AutomaticAlignment,
    SyncToTarget,
    SyncSelenographic,
    GetDistanceBars,
    Echo(u8),

    GetRightAscension,
    GetDeclination,
    GetTargetRightAscension,
    GetTargetDeclination,
    GetAltitude,
    GetAzimuth,
    GetSiderealTime,
    GetLocalTime24,
    GetLocalTime12,
    GetClockFormat,
    GetDate,
    GetUtcOffset,
    GetSiteLatitude,
    GetSiteLongitude,
    /// Site number, 1 through SITE_COUNT.
    GetSiteName(u8),
    GetTrackingRate,
    GetHighLimit,
    GetLowerLimit,
    GetAlignmentStatus,
    GetProductName,
    GetFirmwareNumber,
    GetFirmwareDate,
    GetFirmwareTime,

    SetTargetRightAscension(f64),
    SetTargetDeclination(f64),
    SetSiteLatitude(f64),
    SetSiteLongitude(f64),
    SetSiteName(u8, String),
    /// Hours to add to local time to get UTC.
    SetUtcOffset(f64),
    SetLocalTime(NaiveTime),
    SetDate(NaiveDate),
    /// Custom tracking rate in Hz; 60.1 is sidereal.
    SetTrackingRate(f64),
    SetLowerLimit(i32),
    SetHighLimit(i32),

    SlewToTarget,
    Move(Direction),
    PulseGuide(Direction, Duration),
    StopSlewing,
    Halt(Direction),
    SetMotionRate(MotionRate),
    SelectTrackingRate(TrackingRate),
    /// Signed change of the tracking rate, in Hz.
    AdjustTrackingRate(f64),
    SetTracking(bool),
    ToggleTimeFormat,
    TogglePrecision,
    TogglePrecisionReport,
    Park,

    /// Well-formed but unsupported command; holds the whole frame.
    Unknown(Vec<u8>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("not a command frame: {0:?}")]
    NotAFrame(Vec<u8>),

    #[error("malformed parameters for command '{code}': {param:?}")]
    Malformed { code: String, param: String },

    #[error("command '{code}': {field} out of range: {value}")]
    OutOfRange { code: String, field: &'static str, value: String },
}

impl DecodeError {
    /// The command code the error refers to, e.g. "Sr". Empty if the frame
    /// had none.
    pub fn code(&self) -> &str {
        match self {
            DecodeError::NotAFrame(_) => "",
            DecodeError::Malformed { code, .. } => code,
            DecodeError::OutOfRange { code, .. } => code,
        }
    }

    /// What a real mount answers when it cannot accept the command: setters
    /// with a status digit reply `0`, everything else is silently dropped.
    pub fn negative_ack(&self) -> Response {
        match self.code() {
            "Sr" | "Sd" | "St" | "Sg" | "SG" | "SL" | "SC" | "ST" | "So" | "Sh"
            | "SM" | "SN" | "SO" | "SP" => {
                Response::Bool(false)
            }
            _ => Response::None,
        }
    }
}

pub fn decode(frame: &Frame) -> Result<Command, DecodeError> {
    match frame.as_bytes() {
        [ACK] => return Ok(Command::Ack),
        [EOT] => return Ok(Command::FirmwareDownload),
        _ => {}
    }
    let body = frame
        .body()
        .ok_or_else(|| DecodeError::NotAFrame(frame.as_bytes().to_vec()))?;

    let command = match body {
        b"AA" => Command::SetAlignmentMode(MountType::AltAz),
        b"AP" => Command::SetAlignmentMode(MountType::Polar),
        b"AL" => Command::SetAlignmentMode(MountType::Land),
        b"Aa" => Command::AutomaticAlignment,
        b"CM" => Command::SyncToTarget,
        b"CL" => Command::SyncSelenographic,
        b"D" => Command::GetDistanceBars,
        [b'E', b'C', c] => Command::Echo(*c),

        b"GR" => Command::GetRightAscension,
        b"GD" => Command::GetDeclination,
        b"Gr" => Command::GetTargetRightAscension,
        b"Gd" => Command::GetTargetDeclination,
        b"GA" => Command::GetAltitude,
        b"GZ" => Command::GetAzimuth,
        b"GS" => Command::GetSiderealTime,
        b"GL" => Command::GetLocalTime24,
        b"Ga" => Command::GetLocalTime12,
        b"Gc" => Command::GetClockFormat,
        b"GC" => Command::GetDate,
        b"GG" => Command::GetUtcOffset,
        b"Gt" => Command::GetSiteLatitude,
        b"Gg" => Command::GetSiteLongitude,
        b"GM" => Command::GetSiteName(1),
        b"GN" => Command::GetSiteName(2),
        b"GO" => Command::GetSiteName(3),
        b"GP" => Command::GetSiteName(4),
        b"GT" => Command::GetTrackingRate,
        b"Gh" => Command::GetHighLimit,
        b"Go" => Command::GetLowerLimit,
        b"GW" => Command::GetAlignmentStatus,
        b"GVP" => Command::GetProductName,
        b"GVN" => Command::GetFirmwareNumber,
        b"GVD" => Command::GetFirmwareDate,
        b"GVT" => Command::GetFirmwareTime,

        [b'S', b'r', rest @ ..] => {
            Command::SetTargetRightAscension(Fields::new("Sr", rest).right_ascension()?)
        }
        [b'S', b'd', rest @ ..] => {
            Command::SetTargetDeclination(Fields::new("Sd", rest).declination()?)
        }
        [b'S', b't', rest @ ..] => {
            Command::SetSiteLatitude(Fields::new("St", rest).latitude()?)
        }
        [b'S', b'g', rest @ ..] => {
            Command::SetSiteLongitude(Fields::new("Sg", rest).longitude()?)
        }
        [b'S', b'G', rest @ ..] => {
            Command::SetUtcOffset(Fields::new("SG", rest).utc_offset()?)
        }
        [b'S', b'L', rest @ ..] => {
            Command::SetLocalTime(Fields::new("SL", rest).time()?)
        }
        [b'S', b'C', rest @ ..] => Command::SetDate(Fields::new("SC", rest).date()?),
        [b'S', b'T', rest @ ..] => {
            Command::SetTrackingRate(Fields::new("ST", rest).tracking_rate()?)
        }
        [b'S', b'o', rest @ ..] => {
            Command::SetLowerLimit(Fields::new("So", rest).limit(true)?)
        }
        [b'S', b'h', rest @ ..] => {
            Command::SetHighLimit(Fields::new("Sh", rest).limit(false)?)
        }
        [b'S', b'M', rest @ ..] => Command::SetSiteName(1, Fields::new("SM", rest).site_name()?),
        [b'S', b'N', rest @ ..] => Command::SetSiteName(2, Fields::new("SN", rest).site_name()?),
        [b'S', b'O', rest @ ..] => Command::SetSiteName(3, Fields::new("SO", rest).site_name()?),
        [b'S', b'P', rest @ ..] => Command::SetSiteName(4, Fields::new("SP", rest).site_name()?),

        b"MS" => Command::SlewToTarget,
        b"Mn" => Command::Move(Direction::North),
        b"Ms" => Command::Move(Direction::South),
        b"Me" => Command::Move(Direction::East),
        b"Mw" => Command::Move(Direction::West),
        [b'M', b'g', rest @ ..] => {
            let (direction, duration) = Fields::new("Mg", rest).pulse_guide()?;
            Command::PulseGuide(direction, duration)
        }
        b"Q" => Command::StopSlewing,
        b"Qn" => Command::Halt(Direction::North),
        b"Qs" => Command::Halt(Direction::South),
        b"Qe" => Command::Halt(Direction::East),
        b"Qw" => Command::Halt(Direction::West),

        b"RG" => Command::SetMotionRate(MotionRate::Guide),
        b"RC" => Command::SetMotionRate(MotionRate::Centering),
        b"RM" => Command::SetMotionRate(MotionRate::Find),
        b"RS" => Command::SetMotionRate(MotionRate::Max),

        b"TQ" => Command::SelectTrackingRate(TrackingRate::Sidereal),
        b"TL" => Command::SelectTrackingRate(TrackingRate::Lunar),
        b"TS" => Command::SelectTrackingRate(TrackingRate::Solar),
        b"TM" => Command::SelectTrackingRate(TrackingRate::Custom),
        b"T+" => Command::AdjustTrackingRate(TRACKING_RATE_STEP_HZ),
        b"T-" => Command::AdjustTrackingRate(-TRACKING_RATE_STEP_HZ),
        b"Te" => Command::SetTracking(true),
        b"Td" => Command::SetTracking(false),

        b"H" => Command::ToggleTimeFormat,
        b"U" => Command::TogglePrecision,
        b"P" => Command::TogglePrecisionReport,
        b"hP" => Command::Park,

        [first, ..] if first.is_ascii_alphabetic() || *first == b'$' => {
            Command::Unknown(frame.as_bytes().to_vec())
        }
        _ => {
            return Err(DecodeError::Malformed {
                code: String::new(),
                param: String::from_utf8_lossy(body).into_owned(),
            })
        }
    };
    Ok(command)
}

// Strict cursor over the parameter bytes of a setter command.
struct Fields<'a> {
    code: &'static str,
    param: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(code: &'static str, param: &'a [u8]) -> Self {
        // Some planetarium programs put a space between code and parameter.
        let param = param.strip_prefix(b" ").unwrap_or(param);
        Fields { code, param, pos: 0 }
    }

    fn malformed(&self) -> DecodeError {
        DecodeError::Malformed {
            code: self.code.to_string(),
            param: String::from_utf8_lossy(self.param).into_owned(),
        }
    }

    fn out_of_range(&self, field: &'static str, value: impl ToString) -> DecodeError {
        DecodeError::OutOfRange {
            code: self.code.to_string(),
            field,
            value: value.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.param.get(self.pos).copied()
    }

    // Consumes the next byte if it is one of `accepted`.
    fn accept(&mut self, accepted: &[u8]) -> Option<u8> {
        let b = self.peek().filter(|b| accepted.contains(b))?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, accepted: &[u8]) -> Result<u8, DecodeError> {
        self.accept(accepted).ok_or_else(|| self.malformed())
    }

    // Exactly `count` decimal digits.
    fn digits(&mut self, count: usize) -> Result<u32, DecodeError> {
        let end = self.pos + count;
        let field = self.param.get(self.pos..end).ok_or_else(|| self.malformed())?;
        if !field.iter().all(u8::is_ascii_digit) {
            return Err(self.malformed());
        }
        self.pos = end;
        Ok(field.iter().fold(0, |acc, d| acc * 10 + (d - b'0') as u32))
    }

    // Optional '+' or '-'; true if negative.
    fn sign(&mut self) -> bool {
        self.accept(b"+-") == Some(b'-')
    }

    fn required_sign(&mut self) -> Result<bool, DecodeError> {
        Ok(self.expect(b"+-")? == b'-')
    }

    fn bounded(
        &self,
        field: &'static str,
        value: u32,
        max: u32,
    ) -> Result<u32, DecodeError> {
        if value > max {
            return Err(self.out_of_range(field, value));
        }
        Ok(value)
    }

    fn finish(&self) -> Result<(), DecodeError> {
        if self.pos != self.param.len() {
            return Err(self.malformed());
        }
        Ok(())
    }

    // HH:MM:SS or HH:MM.T
    fn right_ascension(mut self) -> Result<f64, DecodeError> {
        let hours = self.digits(2)?;
        self.bounded("hours", hours, 23)?;
        self.expect(b":")?;
        let minutes = self.digits(2)?;
        self.bounded("minutes", minutes, 59)?;
        let seconds = match self.expect(b":.")? {
            b':' => {
                let seconds = self.digits(2)?;
                self.bounded("seconds", seconds, 59)? as f64
            }
            _ => self.digits(1)? as f64 * 6.0,
        };
        self.finish()?;
        Ok(from_sexagesimal(false, hours, minutes, seconds) * 15.0)
    }

    // sDD*MM or sDD*MM:SS. The degree separator varies by client: '*' is
    // the documented one, 0xDF is the Autostar degree glyph.
    fn declination(mut self) -> Result<f64, DecodeError> {
        let negative = self.required_sign()?;
        let degrees = self.digits(2)?;
        self.expect(b"*:\xdf")?;
        let minutes = self.digits(2)?;
        self.bounded("minutes", minutes, 59)?;
        let seconds = if self.accept(b":'").is_some() {
            let seconds = self.digits(2)?;
            self.bounded("seconds", seconds, 59)?
        } else {
            0
        };
        self.finish()?;
        let value = from_sexagesimal(negative, degrees, minutes, seconds as f64);
        if value.abs() > 90.0 {
            return Err(self.out_of_range("degrees", value));
        }
        Ok(value)
    }

    // sDD*MM
    fn latitude(mut self) -> Result<f64, DecodeError> {
        let negative = self.required_sign()?;
        let degrees = self.digits(2)?;
        self.expect(b"*:\xdf")?;
        let minutes = self.digits(2)?;
        self.bounded("minutes", minutes, 59)?;
        self.finish()?;
        let value = from_sexagesimal(negative, degrees, minutes, 0.0);
        if value.abs() > 90.0 {
            return Err(self.out_of_range("degrees", value));
        }
        Ok(value)
    }

    // sDDD*MM, west-positive. The sign is optional.
    fn longitude(mut self) -> Result<f64, DecodeError> {
        let negative = self.sign();
        let degrees = self.digits(3)?;
        self.expect(b"*:\xdf")?;
        let minutes = self.digits(2)?;
        self.bounded("minutes", minutes, 59)?;
        self.finish()?;
        let west = from_sexagesimal(negative, degrees, minutes, 0.0);
        if west.abs() > 360.0 {
            return Err(self.out_of_range("degrees", west));
        }
        Ok(normalize_longitude(-west))
    }

    // sHH.H, or sHH on older firmware.
    fn utc_offset(mut self) -> Result<f64, DecodeError> {
        let negative = self.sign();
        let hours = self.digits(2)?;
        let tenths = if self.accept(b".").is_some() { self.digits(1)? } else { 0 };
        self.finish()?;
        let magnitude = hours as f64 + tenths as f64 / 10.0;
        let value = if negative { -magnitude } else { magnitude };
        if !(-12.0..=14.0).contains(&value) {
            return Err(self.out_of_range("hours", value));
        }
        Ok(value)
    }

    // HH:MM:SS
    fn time(mut self) -> Result<NaiveTime, DecodeError> {
        let hours = self.digits(2)?;
        self.expect(b":")?;
        let minutes = self.digits(2)?;
        self.expect(b":")?;
        let seconds = self.digits(2)?;
        self.finish()?;
        NaiveTime::from_hms_opt(hours, minutes, seconds).ok_or_else(|| {
            self.out_of_range("time", format!("{:02}:{:02}:{:02}", hours, minutes, seconds))
        })
    }

    // MM/DD/YY, years 2000 through 2099.
    fn date(mut self) -> Result<NaiveDate, DecodeError> {
        let month = self.digits(2)?;
        self.expect(b"/")?;
        let day = self.digits(2)?;
        self.expect(b"/")?;
        let year = self.digits(2)?;
        self.finish()?;
        NaiveDate::from_ymd_opt(2000 + year as i32, month, day).ok_or_else(|| {
            self.out_of_range("date", format!("{:02}/{:02}/{:02}", month, day, year))
        })
    }

    // TT.T or TTT.T, in Hz.
    fn tracking_rate(mut self) -> Result<f64, DecodeError> {
        let integral_len = self.param[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if !(2..=3).contains(&integral_len) {
            return Err(self.malformed());
        }
        let integral = self.digits(integral_len)?;
        self.expect(b".")?;
        let tenths = self.digits(1)?;
        self.finish()?;
        let hz = integral as f64 + tenths as f64 / 10.0;
        if hz > MAX_TRACKING_RATE_HZ {
            return Err(self.out_of_range("rate", hz));
        }
        Ok(hz)
    }

    // sDD* for the lower limit, DD for the high limit.
    fn limit(mut self, with_degree_mark: bool) -> Result<i32, DecodeError> {
        let negative = self.sign();
        let degrees = self.digits(2)?;
        self.bounded("degrees", degrees, 90)?;
        if with_degree_mark {
            self.expect(b"*\xdf")?;
        }
        self.finish()?;
        Ok(if negative { -(degrees as i32) } else { degrees as i32 })
    }

    // Printable ASCII, 1 through MAX_SITE_NAME_LEN bytes.
    fn site_name(self) -> Result<String, DecodeError> {
        let param = self.param;
        let name = &param[self.pos..];
        if name.is_empty() || !name.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(self.malformed());
        }
        if name.len() > MAX_SITE_NAME_LEN {
            return Err(self.out_of_range("name length", name.len()));
        }
        Ok(String::from_utf8_lossy(name).into_owned())
    }

    // dDDDD: direction letter then milliseconds.
    fn pulse_guide(mut self) -> Result<(Direction, Duration), DecodeError> {
        let direction = match self.expect(b"nsew")? {
            b'n' => Direction::North,
            b's' => Direction::South,
            b'e' => Direction::East,
            _ => Direction::West,
        };
        let millis = self.digits(4)?;
        self.finish()?;
        Ok((direction, Duration::from_millis(millis as u64)))
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;

    use super::*;

    fn decode_bytes(bytes: &[u8]) -> Result<Command, DecodeError> {
        decode(&Frame::new(bytes.to_vec()))
    }

    fn decode_ok(bytes: &[u8]) -> Command {
        decode_bytes(bytes).unwrap()
    }

    fn decode_value(bytes: &[u8]) -> f64 {
        match decode_ok(bytes) {
            Command::SetTargetRightAscension(v)
            | Command::SetTargetDeclination(v)
            | Command::SetSiteLatitude(v)
            | Command::SetSiteLongitude(v)
            | Command::SetUtcOffset(v)
            | Command::SetTrackingRate(v) => v,
            other => panic!("no value in {:?}", other),
        }
    }

    #[test]
    fn test_control_frames() {
        assert_eq!(decode_ok(b"\x06"), Command::Ack);
        assert_eq!(decode_ok(b"\x04"), Command::FirmwareDownload);
    }

    #[test]
    fn test_simple_commands() {
        let cases: &[(&str, Command)] = &[
            (":GR#", Command::GetRightAscension),
            (":GD#", Command::GetDeclination),
            (":Gr#", Command::GetTargetRightAscension),
            (":Gd#", Command::GetTargetDeclination),
            (":GA#", Command::GetAltitude),
            (":GZ#", Command::GetAzimuth),
            (":GS#", Command::GetSiderealTime),
            (":GL#", Command::GetLocalTime24),
            (":Ga#", Command::GetLocalTime12),
            (":GC#", Command::GetDate),
            (":GG#", Command::GetUtcOffset),
            (":Gt#", Command::GetSiteLatitude),
            (":Gg#", Command::GetSiteLongitude),
            (":GT#", Command::GetTrackingRate),
            (":Gh#", Command::GetHighLimit),
            (":Go#", Command::GetLowerLimit),
            (":GW#", Command::GetAlignmentStatus),
            (":GVP#", Command::GetProductName),
            (":GVN#", Command::GetFirmwareNumber),
            (":GVD#", Command::GetFirmwareDate),
            (":GVT#", Command::GetFirmwareTime),
            (":AA#", Command::SetAlignmentMode(MountType::AltAz)),
            (":AP#", Command::SetAlignmentMode(MountType::Polar)),
            (":AL#", Command::SetAlignmentMode(MountType::Land)),
            (":Aa#", Command::AutomaticAlignment),
            (":CM#", Command::SyncToTarget),
            (":CL#", Command::SyncSelenographic),
            (":Gc#", Command::GetClockFormat),
            (":H#", Command::ToggleTimeFormat),
            (":GM#", Command::GetSiteName(1)),
            (":GN#", Command::GetSiteName(2)),
            (":GO#", Command::GetSiteName(3)),
            (":GP#", Command::GetSiteName(4)),
            (":D#", Command::GetDistanceBars),
            (":ECx#", Command::Echo(b'x')),
            (":MS#", Command::SlewToTarget),
            (":Me#", Command::Move(Direction::East)),
            (":Mw#", Command::Move(Direction::West)),
            (":Mn#", Command::Move(Direction::North)),
            (":Ms#", Command::Move(Direction::South)),
            (":Q#", Command::StopSlewing),
            (":Qe#", Command::Halt(Direction::East)),
            (":Qs#", Command::Halt(Direction::South)),
            (":RS#", Command::SetMotionRate(MotionRate::Max)),
            (":RM#", Command::SetMotionRate(MotionRate::Find)),
            (":RC#", Command::SetMotionRate(MotionRate::Centering)),
            (":RG#", Command::SetMotionRate(MotionRate::Guide)),
            (":TQ#", Command::SelectTrackingRate(TrackingRate::Sidereal)),
            (":TL#", Command::SelectTrackingRate(TrackingRate::Lunar)),
            (":TS#", Command::SelectTrackingRate(TrackingRate::Solar)),
            (":TM#", Command::SelectTrackingRate(TrackingRate::Custom)),
            (":T+#", Command::AdjustTrackingRate(0.1)),
            (":T-#", Command::AdjustTrackingRate(-0.1)),
            (":Te#", Command::SetTracking(true)),
            (":Td#", Command::SetTracking(false)),
            (":U#", Command::TogglePrecision),
            (":P#", Command::TogglePrecisionReport),
            (":hP#", Command::Park),
        ];
        for (wire, command) in cases {
            assert_eq!(&decode_ok(wire.as_bytes()), command, "{}", wire);
        }
    }

    #[test]
    fn test_right_ascension() {
        assert_eq!(decode_ok(b":Sr10:00:00#"), Command::SetTargetRightAscension(150.0));
        assert_abs_diff_eq!(decode_value(b":Sr05:34:32#"),
                            (5.0 + 34.0 / 60.0 + 32.0 / 3600.0) * 15.0,
                            epsilon = 1e-9);
        // Low precision form, tenths of a minute.
        assert_abs_diff_eq!(decode_value(b":Sr05:34.5#"),
                            (5.0 + 34.5 / 60.0) * 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(decode_value(b":Sr 23:59:59#"),
                            (24.0 - 1.0 / 3600.0) * 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_right_ascension_errors() {
        assert!(matches!(decode_bytes(b":Sr24:00:00#"),
                         Err(DecodeError::OutOfRange { field: "hours", .. })));
        assert!(matches!(decode_bytes(b":Sr10:60:00#"),
                         Err(DecodeError::OutOfRange { field: "minutes", .. })));
        assert!(matches!(decode_bytes(b":Sr10:00:60#"),
                         Err(DecodeError::OutOfRange { field: "seconds", .. })));
        // Strict digit counts; no truncation.
        for bad in [":Sr1:00:00#", ":Sr10:00:0#", ":Sr10:00:000#",
                    ":Sr10-00-00#", ":Sr#", ":Sr10:0a:00#", ":Sr  10:00:00#"] {
            assert!(matches!(decode_bytes(bad.as_bytes()),
                             Err(DecodeError::Malformed { .. })), "{}", bad);
        }
    }

    #[test]
    fn test_declination() {
        assert_eq!(decode_ok(b":Sd+45*00#"), Command::SetTargetDeclination(45.0));
        assert_eq!(decode_ok(b":Sd-45*30:00#"), Command::SetTargetDeclination(-45.5));
        assert_eq!(decode_ok(b":Sd+90*00:00#"), Command::SetTargetDeclination(90.0));
        assert_abs_diff_eq!(decode_value(b":Sd-05\xdf30'36#"),
                            -(5.0 + 30.0 / 60.0 + 36.0 / 3600.0), epsilon = 1e-9);
        assert_abs_diff_eq!(decode_value(b":Sd +12:15#"), 12.25, epsilon = 1e-9);

        assert!(matches!(decode_bytes(b":Sd+90*00:01#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":Sd-91*00#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":Sd45*00#"),
                         Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode_bytes(b":Sd+45*60#"),
                         Err(DecodeError::OutOfRange { field: "minutes", .. })));
    }

    #[test]
    fn test_site() {
        assert_eq!(decode_ok(b":St+37*30#"), Command::SetSiteLatitude(37.5));
        assert_eq!(decode_ok(b":St-33*52#"), Command::SetSiteLatitude(-(33.0 + 52.0 / 60.0)));
        assert!(decode_bytes(b":St+37*30:00#").is_err());

        // West-positive on the wire, east-positive in the command.
        assert_eq!(decode_ok(b":Sg122*00#"), Command::SetSiteLongitude(-122.0));
        assert_eq!(decode_ok(b":Sg+122*30#"), Command::SetSiteLongitude(-122.5));
        assert_eq!(decode_ok(b":Sg-002*00#"), Command::SetSiteLongitude(2.0));
        assert_eq!(decode_ok(b":Sg358*00#"), Command::SetSiteLongitude(2.0));
        assert_eq!(decode_ok(b":Sg000*00#"), Command::SetSiteLongitude(0.0));
        assert!(matches!(decode_bytes(b":Sg361*00#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":Sg22*00#"),
                         Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_time_and_date() {
        assert_eq!(decode_ok(b":SL22:15:07#"),
                   Command::SetLocalTime(NaiveTime::from_hms_opt(22, 15, 7).unwrap()));
        assert!(matches!(decode_bytes(b":SL24:00:00#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert_eq!(decode_ok(b":SC11/14/25#"),
                   Command::SetDate(NaiveDate::from_ymd_opt(2025, 11, 14).unwrap()));
        assert!(matches!(decode_bytes(b":SC02/30/25#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":SC2/3/25#"),
                         Err(DecodeError::Malformed { .. })));

        assert_eq!(decode_ok(b":SG+05.0#"), Command::SetUtcOffset(5.0));
        assert_eq!(decode_ok(b":SG-03.5#"), Command::SetUtcOffset(-3.5));
        assert_eq!(decode_ok(b":SG08#"), Command::SetUtcOffset(8.0));
        assert!(matches!(decode_bytes(b":SG+15.0#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":SG-12.5#"),
                         Err(DecodeError::OutOfRange { .. })));
    }

    #[test]
    fn test_rates_limits_and_guiding() {
        assert_eq!(decode_ok(b":ST60.1#"), Command::SetTrackingRate(60.1));
        assert_eq!(decode_ok(b":ST100.0#"), Command::SetTrackingRate(100.0));
        assert!(matches!(decode_bytes(b":ST120.5#"),
                         Err(DecodeError::OutOfRange { .. })));
        assert!(matches!(decode_bytes(b":ST6.0#"),
                         Err(DecodeError::Malformed { .. })));

        assert_eq!(decode_ok(b":So-05*#"), Command::SetLowerLimit(-5));
        assert_eq!(decode_ok(b":So10*#"), Command::SetLowerLimit(10));
        assert_eq!(decode_ok(b":Sh85#"), Command::SetHighLimit(85));
        assert!(matches!(decode_bytes(b":Sh91#"),
                         Err(DecodeError::OutOfRange { .. })));

        assert_eq!(decode_ok(b":Mgn0250#"),
                   Command::PulseGuide(Direction::North, Duration::from_millis(250)));
        assert_eq!(decode_ok(b":Mgw9999#"),
                   Command::PulseGuide(Direction::West, Duration::from_millis(9999)));
        assert!(matches!(decode_bytes(b":Mgx0250#"),
                         Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode_bytes(b":Mgn250#"),
                         Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_site_names() {
        assert_eq!(decode_ok(b":SMBackyard#"), Command::SetSiteName(1, "Backyard".to_string()));
        assert_eq!(decode_ok(b":SN Dark Site#"), Command::SetSiteName(2, "Dark Site".to_string()));
        assert_eq!(decode_ok(b":SOabc#"), Command::SetSiteName(3, "abc".to_string()));
        assert_eq!(decode_ok(b":SPFifteen chars!!#"),
                   Command::SetSiteName(4, "Fifteen chars!!".to_string()));

        let err = decode_bytes(b":SMSixteen chars!!!#").unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { field: "name length", .. }));
        assert_eq!(err.negative_ack(), Response::Bool(false));
        let err = decode_bytes(b":SM#").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert_eq!(err.negative_ack(), Response::Bool(false));
        assert!(decode_bytes(b":SPbad\x01name#").is_err());
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert_eq!(decode_ok(b":XYZ#"), Command::Unknown(b":XYZ#".to_vec()));
        assert_eq!(decode_ok(b":$BDG#"), Command::Unknown(b":$BDG#".to_vec()));
        assert_eq!(decode_ok(b":GX#"), Command::Unknown(b":GX#".to_vec()));
        assert!(matches!(decode_bytes(b":#"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode_bytes(b":12#"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode_bytes(b"GR"), Err(DecodeError::NotAFrame(_))));
    }

    #[test]
    fn test_negative_ack() {
        let err = decode_bytes(b":Sr99:00:00#").unwrap_err();
        assert_eq!(err.code(), "Sr");
        assert_eq!(err.negative_ack(), Response::Bool(false));

        let err = decode_bytes(b":SC13/01/25#").unwrap_err();
        assert_eq!(err.negative_ack(), Response::Bool(false));

        let err = decode_bytes(b":Mgn12#").unwrap_err();
        assert_eq!(err.code(), "Mg");
        assert_eq!(err.negative_ack(), Response::None);

        let err = decode_bytes(b":#").unwrap_err();
        assert_eq!(err.negative_ack(), Response::None);
    }
}
