// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Simulated LX200 mount.
//!
//! The mount holds the believed pointing position, the commanded target, the
//! site and clock settings, and the current motion. It never looks at the
//! wall clock itself: every mutation takes `now`, and `tick()` advances slews,
//! guide pulses, manual moves and tracking up to that instant. `apply()` ticks
//! first, so replies always reflect elapsed time.

use std::time::{Duration, SystemTime};

use canonical_error::{invalid_argument_error, CanonicalError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use lx200_elements::astro_util::{
    alt_az_from_equatorial, angular_separation, clamp_declination,
    local_sidereal_time, normalize_degrees, normalize_longitude,
    wrap_delta_degrees, SIDEREAL_RATIO,
};
use serde::Serialize;

use crate::command::{
    Command, Direction, MotionRate, MountType, TrackingRate, MAX_TRACKING_RATE_HZ,
    SITE_COUNT,
};
use crate::response::{Precision, Response, SlewOutcome};

/// Drive frequencies of the classic LX200 tracking rates. The mount's
/// tracking speed is proportional to the frequency, with SIDEREAL_HZ
/// corresponding to the configured sidereal rate.
pub const SIDEREAL_HZ: f64 = 60.1;
pub const LUNAR_HZ: f64 = 57.9;
pub const SOLAR_HZ: f64 = 60.0;

// Manual motion rates as multiples of sidereal.
const CENTERING_RATE: f64 = 8.0;
const FIND_RATE: f64 = 64.0;

const MAX_ALIGNMENT_STARS: u8 = 3;

/// Slowest accepted slew rate, degrees per second. A half-circle slew at
/// this rate takes five hours.
pub const MIN_SLEW_RATE: f64 = 0.01;

const DEFAULT_SITE_NAMES: [&str; SITE_COUNT] = ["Home", "Site 2", "Site 3", "Site 4"];

const FIRMWARE_NUMBER: &str = "01.0";
const FIRMWARE_DATE: &str = "Nov 14 2025";
const FIRMWARE_TIME: &str = "23:00:00";

/// Startup settings of the simulated mount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MountConfig {
    /// Park position, degrees. The mount starts here.
    pub park_ra: f64,
    pub park_dec: f64,

    /// Initial site, degrees. Longitude is positive east.
    pub latitude: f64,
    pub longitude: f64,

    /// Slews to targets whose altitude is outside of these limits (degrees)
    /// are refused.
    pub lower_limit: f64,
    pub high_limit: f64,

    /// Degrees per second.
    pub slew_rate: f64,

    /// Guide rate as a multiple of the sidereal rate.
    pub guide_rate: f64,

    /// Right ascension hours tracked per elapsed hour at the sidereal rate.
    pub sidereal_rate: f64,

    pub mount_type: MountType,
    pub product_name: String,
}

impl Default for MountConfig {
    fn default() -> Self {
        MountConfig {
            park_ra: 0.0,
            park_dec: 90.0,
            latitude: 45.0,
            longitude: 0.0,
            lower_limit: 0.0,
            high_limit: 90.0,
            slew_rate: 4.0,
            guide_rate: 0.5,
            sidereal_rate: SIDEREAL_RATIO,
            mount_type: MountType::Polar,
            product_name: "LX200 Simulator".to_string(),
        }
    }
}

impl MountConfig {
    pub fn validate(&self) -> Result<(), CanonicalError> {
        let values = [
            self.park_ra, self.park_dec, self.latitude, self.longitude,
            self.lower_limit, self.high_limit, self.slew_rate,
            self.guide_rate, self.sidereal_rate,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid_argument_error(
                &format!("Non-finite value in mount config: {:?}", self)));
        }
        if !(0.0..360.0).contains(&self.park_ra) {
            return Err(invalid_argument_error(
                &format!("park_ra {} must be in [0, 360) degrees", self.park_ra)));
        }
        for (name, value) in [("park_dec", self.park_dec),
                              ("latitude", self.latitude),
                              ("lower_limit", self.lower_limit),
                              ("high_limit", self.high_limit)] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(invalid_argument_error(
                    &format!("{} {} must be in [-90, 90] degrees", name, value)));
            }
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid_argument_error(
                &format!("longitude {} must be in [-180, 180] degrees", self.longitude)));
        }
        if self.lower_limit >= self.high_limit {
            return Err(invalid_argument_error(
                &format!("lower_limit {} must be below high_limit {}",
                         self.lower_limit, self.high_limit)));
        }
        if self.slew_rate < MIN_SLEW_RATE {
            return Err(invalid_argument_error(
                &format!("slew_rate {} must be at least {} degrees/second",
                         self.slew_rate, MIN_SLEW_RATE)));
        }
        for (name, value) in [("guide_rate", self.guide_rate),
                              ("sidereal_rate", self.sidereal_rate)] {
            if value <= 0.0 {
                return Err(invalid_argument_error(
                    &format!("{} {} must be positive", name, value)));
            }
        }
        Ok(())
    }
}

/// A slew in progress. Position is interpolated linearly in time; right
/// ascension goes the shorter way around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slew {
    pub start: SystemTime,
    pub duration: Duration,
    pub from_ra: f64,
    pub from_dec: f64,
    pub to_ra: f64,
    pub to_dec: f64,
    // Signed, -180..=180.
    pub ra_delta: f64,
    // The mount becomes parked when this slew completes.
    pub parking: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Guide {
    pub direction: Direction,
    pub remaining: Duration,
}

/// Manual motion on either or both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualMove {
    pub ra: Option<Direction>,
    pub dec: Option<Direction>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Idle,
    Slewing(Slew),
    Guiding(Guide),
    Moving(ManualMove),
}

/// Coarse summary of Motion plus the tracking flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MotionMode {
    Idle,
    Tracking,
    Slewing,
    Guiding,
    Moving,
}

#[derive(Clone, Debug)]
pub struct MountState {
    // Degrees; ra in [0, 360), dec in [-90, 90].
    pub ra: f64,
    pub dec: f64,
    pub target_ra: f64,
    pub target_dec: f64,

    pub tracking: bool,
    pub tracking_rate: TrackingRate,
    // Hz, used when tracking_rate is Custom.
    pub custom_rate_hz: f64,

    pub motion: Motion,
    pub motion_rate: MotionRate,

    pub latitude: f64,
    // Positive east.
    pub longitude: f64,
    // Hours to add to local time to get UTC.
    pub utc_offset: f64,
    // Simulated UTC minus the wall clock.
    pub clock_offset: chrono::Duration,

    pub precision: Precision,
    // Handbox clock format, reported by `:Gc#`.
    pub time_format_24h: bool,
    pub site_names: [String; SITE_COUNT],
    pub mount_type: MountType,
    pub aligned_stars: u8,
    pub parked: bool,
    pub lower_limit: f64,
    pub high_limit: f64,

    // Instant up to which the motion has been advanced.
    pub last_update: SystemTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SlewProgress {
    pub duration: Duration,
    pub elapsed: Duration,
    pub fraction: f64,
}

/// Read-only view of the mount, as of its last update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MountSnapshot {
    pub ra_degrees: f64,
    pub ra_hours: f64,
    pub dec_degrees: f64,
    pub target_ra_degrees: f64,
    pub target_ra_hours: f64,
    pub target_dec_degrees: f64,
    pub altitude_degrees: f64,
    pub azimuth_degrees: f64,
    pub motion: MotionMode,
    pub slew: Option<SlewProgress>,
    pub tracking: bool,
    pub tracking_rate: TrackingRate,
    pub tracking_rate_hz: f64,
    pub motion_rate: MotionRate,
    pub precision: Precision,
    pub mount_type: MountType,
    pub aligned_stars: u8,
    pub parked: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset_hours: f64,
    pub utc_time: String,
    pub time_format_24h: bool,
    pub site_names: [String; SITE_COUNT],
    pub lower_limit: f64,
    pub high_limit: f64,
}

pub struct Mount {
    config: MountConfig,
    state: MountState,
}

impl Mount {
    pub fn new(config: MountConfig, now: SystemTime) -> Self {
        let park_ra = normalize_degrees(config.park_ra);
        let park_dec = clamp_declination(config.park_dec);
        let state = MountState {
            ra: park_ra,
            dec: park_dec,
            target_ra: park_ra,
            target_dec: park_dec,
            tracking: false,
            tracking_rate: TrackingRate::Sidereal,
            custom_rate_hz: SIDEREAL_HZ,
            motion: Motion::Idle,
            motion_rate: MotionRate::Max,
            latitude: clamp_declination(config.latitude),
            longitude: normalize_longitude(config.longitude),
            utc_offset: 0.0,
            clock_offset: chrono::Duration::zero(),
            precision: Precision::High,
            time_format_24h: true,
            site_names: DEFAULT_SITE_NAMES.map(String::from),
            mount_type: config.mount_type,
            aligned_stars: 0,
            parked: false,
            lower_limit: config.lower_limit,
            high_limit: config.high_limit,
            last_update: now,
        };
        Mount { config, state }
    }

    pub fn state(&self) -> &MountState {
        &self.state
    }

    pub fn motion_mode(&self) -> MotionMode {
        match self.state.motion {
            Motion::Idle if self.state.tracking => MotionMode::Tracking,
            Motion::Idle => MotionMode::Idle,
            Motion::Slewing(_) => MotionMode::Slewing,
            Motion::Guiding(_) => MotionMode::Guiding,
            Motion::Moving(_) => MotionMode::Moving,
        }
    }

    /// Advances the mount to `now`, then carries out `command`.
    pub fn apply(&mut self, command: &Command, now: SystemTime) -> Response {
        self.tick(now);
        let precision = self.state.precision;
        match command {
            Command::Ack => Response::Ack(self.state.mount_type),
            Command::FirmwareDownload => Response::None,
            Command::SetAlignmentMode(mount_type) => {
                self.state.mount_type = *mount_type;
                Response::None
            }
            Command::AutomaticAlignment => {
                self.state.aligned_stars = MAX_ALIGNMENT_STARS;
                Response::Bool(true)
            }
            Command::SyncToTarget => {
                self.sync();
                Response::SyncInfo
            }
            Command::SyncSelenographic => {
                debug!("Ignoring selenographic sync");
                Response::None
            }
            Command::GetDistanceBars => {
                Response::DistanceBars(matches!(self.state.motion, Motion::Slewing(_)))
            }
            Command::Echo(c) => Response::Echo(*c),

            Command::GetRightAscension => Response::RightAscension(self.state.ra, precision),
            Command::GetDeclination => Response::Declination(self.state.dec, precision),
            Command::GetTargetRightAscension => {
                Response::RightAscension(self.state.target_ra, precision)
            }
            Command::GetTargetDeclination => {
                Response::Declination(self.state.target_dec, precision)
            }
            Command::GetAltitude => {
                let (alt, _az) = self.horizon(self.state.ra, self.state.dec, now);
                Response::Declination(alt, precision)
            }
            Command::GetAzimuth => {
                let (_alt, az) = self.horizon(self.state.ra, self.state.dec, now);
                Response::Azimuth(az, precision)
            }
            Command::GetSiderealTime => Response::SiderealTime(self.sidereal_time(now)),
            Command::GetLocalTime24 => Response::Time(self.local_time(now).time()),
            Command::GetLocalTime12 => Response::Time12(self.local_time(now).time()),
            Command::GetClockFormat => Response::ClockFormat(self.state.time_format_24h),
            Command::GetDate => Response::Date(self.local_time(now).date()),
            Command::GetUtcOffset => Response::UtcOffset(self.state.utc_offset),
            Command::GetSiteLatitude => Response::Latitude(self.state.latitude),
            Command::GetSiteLongitude => Response::Longitude(self.state.longitude),
            Command::GetSiteName(site) => match self.site_name_mut(*site) {
                Some(name) => Response::Text(name.clone()),
                None => Response::None,
            },
            Command::GetTrackingRate => Response::TrackingRate(self.tracking_rate_hz()),
            Command::GetHighLimit => Response::Limit(self.state.high_limit.round() as i32),
            Command::GetLowerLimit => Response::Limit(self.state.lower_limit.round() as i32),
            Command::GetAlignmentStatus => Response::AlignmentStatus {
                mount_type: self.state.mount_type,
                tracking: self.state.tracking,
                stars: self.state.aligned_stars,
                parked: self.state.parked,
            },
            Command::GetProductName => Response::Text(self.config.product_name.clone()),
            Command::GetFirmwareNumber => Response::Text(FIRMWARE_NUMBER.to_string()),
            Command::GetFirmwareDate => Response::Text(FIRMWARE_DATE.to_string()),
            Command::GetFirmwareTime => Response::Text(FIRMWARE_TIME.to_string()),

            Command::SetTargetRightAscension(ra) => {
                self.state.target_ra = normalize_degrees(*ra);
                Response::Bool(true)
            }
            Command::SetTargetDeclination(dec) => {
                self.state.target_dec = clamp_declination(*dec);
                Response::Bool(true)
            }
            Command::SetSiteLatitude(latitude) => {
                self.state.latitude = clamp_declination(*latitude);
                Response::Bool(true)
            }
            Command::SetSiteLongitude(longitude) => {
                self.state.longitude = normalize_longitude(*longitude);
                Response::Bool(true)
            }
            Command::SetSiteName(site, new_name) => match self.site_name_mut(*site) {
                Some(name) => {
                    *name = new_name.clone();
                    Response::Bool(true)
                }
                None => Response::Bool(false),
            },
            Command::SetUtcOffset(hours) => {
                // Keeps UTC; the local time shifts.
                self.state.utc_offset = *hours;
                Response::Bool(true)
            }
            Command::SetLocalTime(time) => {
                let date = self.local_time(now).date();
                self.set_local_time(date.and_time(*time), now);
                Response::Bool(true)
            }
            Command::SetDate(date) => {
                let time = self.local_time(now).time();
                self.set_local_time(date.and_time(time), now);
                Response::DateAccepted
            }
            Command::SetTrackingRate(hz) => {
                self.state.custom_rate_hz = *hz;
                self.state.tracking_rate = TrackingRate::Custom;
                Response::TrackingRateAccepted
            }
            Command::SetLowerLimit(degrees) => {
                let degrees = *degrees as f64;
                if degrees >= self.state.high_limit {
                    return Response::Bool(false);
                }
                self.state.lower_limit = degrees;
                Response::Bool(true)
            }
            Command::SetHighLimit(degrees) => {
                let degrees = *degrees as f64;
                if degrees <= self.state.lower_limit {
                    return Response::Bool(false);
                }
                self.state.high_limit = degrees;
                Response::Bool(true)
            }

            Command::SlewToTarget => Response::SlewResult(self.slew_to_target(now)),
            Command::Move(direction) => {
                self.start_move(*direction);
                Response::None
            }
            Command::PulseGuide(direction, duration) => {
                if !duration.is_zero() {
                    self.state.motion = Motion::Guiding(Guide {
                        direction: *direction,
                        remaining: *duration,
                    });
                    self.state.parked = false;
                }
                Response::None
            }
            Command::StopSlewing => {
                if self.state.motion != Motion::Idle {
                    info!("Stopping {:?}", self.motion_mode());
                }
                self.state.motion = Motion::Idle;
                Response::None
            }
            Command::Halt(direction) => {
                self.halt(*direction);
                Response::None
            }
            Command::SetMotionRate(rate) => {
                self.state.motion_rate = *rate;
                Response::None
            }
            Command::SelectTrackingRate(rate) => {
                self.state.tracking_rate = *rate;
                Response::None
            }
            Command::AdjustTrackingRate(delta) => {
                let hz = (self.tracking_rate_hz() + delta).clamp(0.0, MAX_TRACKING_RATE_HZ);
                self.state.custom_rate_hz = hz;
                self.state.tracking_rate = TrackingRate::Custom;
                Response::None
            }
            Command::SetTracking(enabled) => {
                self.state.tracking = *enabled;
                if *enabled {
                    self.state.parked = false;
                }
                Response::Bool(true)
            }
            Command::ToggleTimeFormat => {
                self.state.time_format_24h = !self.state.time_format_24h;
                Response::None
            }
            Command::TogglePrecision => {
                self.state.precision = precision.toggled();
                Response::None
            }
            Command::TogglePrecisionReport => {
                self.state.precision = precision.toggled();
                Response::PrecisionReport(self.state.precision)
            }
            Command::Park => {
                self.park(now);
                Response::None
            }
            Command::Unknown(_) => Response::None,
        }
    }

    /// Advances slewing, guiding, manual motion and tracking to `now`. A
    /// `now` earlier than the last update is ignored.
    pub fn tick(&mut self, now: SystemTime) {
        let last = self.state.last_update;
        let elapsed = match now.duration_since(last) {
            Ok(elapsed) if !elapsed.is_zero() => elapsed,
            _ => return,
        };
        let tracking_time = match self.state.motion {
            Motion::Idle => elapsed,
            Motion::Slewing(slew) => self.advance_slew(&slew, last, now),
            Motion::Guiding(guide) => {
                self.advance_guide(guide, elapsed);
                elapsed
            }
            Motion::Moving(manual) => {
                let degrees = self.motion_degrees_per_sec() * elapsed.as_secs_f64();
                for direction in [manual.ra, manual.dec].into_iter().flatten() {
                    self.shift(direction, degrees);
                }
                elapsed
            }
        };
        if self.state.tracking && !tracking_time.is_zero() {
            let degrees = self.tracking_degrees_per_sec() * tracking_time.as_secs_f64();
            self.state.ra = normalize_degrees(self.state.ra + degrees);
        }
        self.state.last_update = now;
    }

    pub fn snapshot(&self) -> MountSnapshot {
        let state = &self.state;
        let (altitude, azimuth) = self.horizon(state.ra, state.dec, state.last_update);
        let slew = match state.motion {
            Motion::Slewing(slew) => {
                let elapsed = state.last_update.duration_since(slew.start)
                    .unwrap_or_default()
                    .min(slew.duration);
                let fraction = if slew.duration.is_zero() {
                    1.0
                } else {
                    elapsed.as_secs_f64() / slew.duration.as_secs_f64()
                };
                Some(SlewProgress { duration: slew.duration, elapsed, fraction })
            }
            _ => None,
        };
        MountSnapshot {
            ra_degrees: state.ra,
            ra_hours: state.ra / 15.0,
            dec_degrees: state.dec,
            target_ra_degrees: state.target_ra,
            target_ra_hours: state.target_ra / 15.0,
            target_dec_degrees: state.target_dec,
            altitude_degrees: altitude,
            azimuth_degrees: azimuth,
            motion: self.motion_mode(),
            slew,
            tracking: state.tracking,
            tracking_rate: state.tracking_rate,
            tracking_rate_hz: self.tracking_rate_hz(),
            motion_rate: state.motion_rate,
            precision: state.precision,
            mount_type: state.mount_type,
            aligned_stars: state.aligned_stars,
            parked: state.parked,
            latitude: state.latitude,
            longitude: state.longitude,
            utc_offset_hours: state.utc_offset,
            utc_time: self.utc_time(state.last_update).to_rfc3339(),
            time_format_24h: state.time_format_24h,
            site_names: state.site_names.clone(),
            lower_limit: state.lower_limit,
            high_limit: state.high_limit,
        }
    }

    pub fn tracking_rate_hz(&self) -> f64 {
        match self.state.tracking_rate {
            TrackingRate::Sidereal => SIDEREAL_HZ,
            TrackingRate::Lunar => LUNAR_HZ,
            TrackingRate::Solar => SOLAR_HZ,
            TrackingRate::Custom => self.state.custom_rate_hz,
        }
    }

    // Returns how much of the interval remained after the slew finished.
    fn advance_slew(&mut self, slew: &Slew, last: SystemTime, now: SystemTime) -> Duration {
        // An end past the representable time is never reached.
        let end = slew.start.checked_add(slew.duration).filter(|end| now >= *end);
        if let Some(end) = end {
            self.state.ra = slew.to_ra;
            self.state.dec = slew.to_dec;
            self.state.motion = Motion::Idle;
            if slew.parking {
                self.state.parked = true;
                info!("Mount parked");
            } else {
                debug!("Slew complete");
            }
            return now.duration_since(end.max(last)).unwrap_or_default();
        }
        let fraction = now.duration_since(slew.start).unwrap_or_default().as_secs_f64()
            / slew.duration.as_secs_f64();
        self.state.ra = normalize_degrees(slew.from_ra + slew.ra_delta * fraction);
        self.state.dec = clamp_declination(
            slew.from_dec + (slew.to_dec - slew.from_dec) * fraction);
        Duration::ZERO
    }

    fn advance_guide(&mut self, guide: Guide, elapsed: Duration) {
        let step = elapsed.min(guide.remaining);
        let degrees = self.config.guide_rate * self.sidereal_degrees_per_sec()
            * step.as_secs_f64();
        self.shift(guide.direction, degrees);
        let remaining = guide.remaining - step;
        self.state.motion = if remaining.is_zero() {
            Motion::Idle
        } else {
            Motion::Guiding(Guide { remaining, ..guide })
        };
    }

    // East increases right ascension, north increases declination.
    fn shift(&mut self, direction: Direction, degrees: f64) {
        let state = &mut self.state;
        match direction {
            Direction::East => state.ra = normalize_degrees(state.ra + degrees),
            Direction::West => state.ra = normalize_degrees(state.ra - degrees),
            Direction::North => state.dec = clamp_declination(state.dec + degrees),
            Direction::South => state.dec = clamp_declination(state.dec - degrees),
        }
    }

    fn sidereal_degrees_per_sec(&self) -> f64 {
        self.config.sidereal_rate * 15.0 / 3600.0
    }

    fn tracking_degrees_per_sec(&self) -> f64 {
        self.sidereal_degrees_per_sec() * self.tracking_rate_hz() / SIDEREAL_HZ
    }

    fn motion_degrees_per_sec(&self) -> f64 {
        let sidereal = self.sidereal_degrees_per_sec();
        match self.state.motion_rate {
            MotionRate::Guide => self.config.guide_rate * sidereal,
            MotionRate::Centering => CENTERING_RATE * sidereal,
            MotionRate::Find => FIND_RATE * sidereal,
            MotionRate::Max => self.config.slew_rate,
        }
    }

    fn slew_to_target(&mut self, now: SystemTime) -> SlewOutcome {
        let (target_ra, target_dec) = (self.state.target_ra, self.state.target_dec);
        let (altitude, _az) = self.horizon(target_ra, target_dec, now);
        if altitude < self.state.lower_limit {
            info!("Refusing slew: target altitude {:.2} below limit {}",
                  altitude, self.state.lower_limit);
            return SlewOutcome::BelowHorizon;
        }
        if altitude > self.state.high_limit {
            info!("Refusing slew: target altitude {:.2} above limit {}",
                  altitude, self.state.high_limit);
            return SlewOutcome::AboveHighLimit;
        }
        self.start_slew(target_ra, target_dec, now, /*parking=*/false);
        self.state.parked = false;
        SlewOutcome::Started
    }

    fn start_slew(&mut self, to_ra: f64, to_dec: f64, now: SystemTime, parking: bool) {
        let (ra, dec) = (self.state.ra, self.state.dec);
        let separation = angular_separation(
            ra.to_radians(), dec.to_radians(),
            to_ra.to_radians(), to_dec.to_radians()).to_degrees();
        // Coincident points can yield NaN; treat as no motion.
        let duration = Duration::try_from_secs_f64(separation / self.config.slew_rate)
            .unwrap_or(Duration::ZERO);
        info!("Slewing from RA {:.4} Dec {:.4} to RA {:.4} Dec {:.4} ({:.1}s)",
              ra, dec, to_ra, to_dec, duration.as_secs_f64());
        self.state.motion = Motion::Slewing(Slew {
            start: now,
            duration,
            from_ra: ra,
            from_dec: dec,
            to_ra,
            to_dec,
            ra_delta: wrap_delta_degrees(ra, to_ra),
            parking,
        });
    }

    fn park(&mut self, now: SystemTime) {
        self.state.tracking = false;
        let park_ra = normalize_degrees(self.config.park_ra);
        let park_dec = clamp_declination(self.config.park_dec);
        self.start_slew(park_ra, park_dec, now, /*parking=*/true);
    }

    fn sync(&mut self) {
        if let Motion::Slewing(_) = self.state.motion {
            self.state.motion = Motion::Idle;
        }
        self.state.ra = self.state.target_ra;
        self.state.dec = self.state.target_dec;
        self.state.aligned_stars = (self.state.aligned_stars + 1).min(MAX_ALIGNMENT_STARS);
        info!("Synced to RA {:.4} Dec {:.4}", self.state.ra, self.state.dec);
    }

    fn start_move(&mut self, direction: Direction) {
        let mut manual = match self.state.motion {
            Motion::Moving(manual) => manual,
            _ => ManualMove::default(),
        };
        match direction {
            Direction::East | Direction::West => manual.ra = Some(direction),
            Direction::North | Direction::South => manual.dec = Some(direction),
        }
        self.state.motion = Motion::Moving(manual);
        self.state.parked = false;
    }

    // Stops manual motion in `direction`; motion on the other axis continues.
    fn halt(&mut self, direction: Direction) {
        let Motion::Moving(mut manual) = self.state.motion else {
            return;
        };
        if manual.ra == Some(direction) {
            manual.ra = None;
        }
        if manual.dec == Some(direction) {
            manual.dec = None;
        }
        self.state.motion = if manual == ManualMove::default() {
            Motion::Idle
        } else {
            Motion::Moving(manual)
        };
    }

    // Sites are numbered from 1.
    fn site_name_mut(&mut self, site: u8) -> Option<&mut String> {
        usize::from(site).checked_sub(1).and_then(|i| self.state.site_names.get_mut(i))
    }

    fn utc_time(&self, now: SystemTime) -> DateTime<Utc> {
        DateTime::<Utc>::from(now) + self.state.clock_offset
    }

    fn utc_offset(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.state.utc_offset * 3_600_000.0).round() as i64)
    }

    fn local_time(&self, now: SystemTime) -> NaiveDateTime {
        (self.utc_time(now) - self.utc_offset()).naive_utc()
    }

    fn set_local_time(&mut self, local: NaiveDateTime, now: SystemTime) {
        let utc = Utc.from_utc_datetime(&local) + self.utc_offset();
        self.state.clock_offset = utc - DateTime::<Utc>::from(now);
        debug!("Simulated clock set to {} UTC", utc);
    }

    // Local sidereal time in degrees.
    fn sidereal_time(&self, now: SystemTime) -> f64 {
        let time = SystemTime::from(self.utc_time(now));
        local_sidereal_time(self.state.longitude.to_radians(), &time).to_degrees()
    }

    // (altitude, azimuth) in degrees, at the simulated clock.
    fn horizon(&self, ra: f64, dec: f64, now: SystemTime) -> (f64, f64) {
        let time = SystemTime::from(self.utc_time(now));
        let (alt, az, _ha) = alt_az_from_equatorial(
            ra.to_radians(), dec.to_radians(),
            self.state.latitude.to_radians(), self.state.longitude.to_radians(),
            &time);
        (alt.to_degrees(), az.to_degrees())
    }
}
