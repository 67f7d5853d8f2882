//! Command codec. [`Command`] is the typed form of every request the mount
//! understands; [`Command::encode`] produces the exact ASCII frame, and
//! [`Command::reply_shape`] tells the caller how the mount answers it.

use arrayvec::ArrayString;
use snafu::ensure;

use core::fmt::Write;

use crate::types::{
    ArgumentNotFiniteSnafu, ArgumentOutOfRangeSnafu, Axis, CommandTooLongSnafu, Direction,
    Error, LocalDate, LocalTime, SlewRate, TrackRate, WireDigit,
};

/// Every command and every terminated reply ends with this byte.
pub const TERMINATOR: u8 = b'#';

/// Reply to the handshake from a mount speaking the supported protocol.
pub const HANDSHAKE_REPLY: &[u8] = b"V1.00#";

// longest command is ":RR+09.9999#" / ":MountInfo#"
pub const MAX_COMMAND_LEN: usize = 16;

/// Encoded command text.
pub type CommandBytes = ArrayString<MAX_COMMAND_LEN>;

/// A request to the mount, with its arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Command {
    /// Protocol version query, `:V#`.
    Handshake,
    /// Six digit status query, `:GAS#`.
    GetStatus,
    /// Four digit model code, `:MountInfo#`.
    GetModel,
    /// Main board and hand controller firmware dates, `:FW1#`.
    GetMainFirmware,
    /// RA and DEC motor board firmware dates, `:FW2#`.
    GetRaDecFirmware,
    /// Start moving at the current slew rate. The mount does not reply.
    StartMotion(Direction),
    /// Stop motion on one axis.
    StopMotion(Axis),
    FindHome,
    GotoHome,
    /// Make the current position the home (zero) position.
    SetCurrentHome,
    SetSlewRate(SlewRate),
    SetTrackMode(TrackRate),
    /// Custom tracking rate, in multiples of the sidereal rate.
    SetCustomTrackRate(f64),
    /// Guide rate as a fraction of the sidereal rate.
    SetGuideRate(f64),
    GetGuideRate,
    Park,
    Unpark,
    /// Stop all motion.
    Abort,
    /// Site longitude in degrees, east positive.
    SetLongitude(f64),
    /// Site latitude in degrees, north positive.
    SetLatitude(f64),
    SetLocalDate(LocalDate),
    SetLocalTime(LocalTime),
    SetDaylightSaving(bool),
    /// Offset from UTC in hours.
    SetUtcOffset(f64),
}

/// How the mount answers a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReplyShape {
    /// The mount sends nothing back.
    None,
    /// A fixed number of bytes, not terminated.
    Exact(usize),
    /// Bytes up to and including [`TERMINATOR`]; the frame must be exactly
    /// this long.
    Terminated(usize),
}

impl ReplyShape {
    /// Number of bytes a well formed reply has.
    pub const fn len(self) -> usize {
        match self {
            ReplyShape::None => 0,
            ReplyShape::Exact(len) | ReplyShape::Terminated(len) => len,
        }
    }
}

/// Generic acknowledgement, a single `'1'`.
const ACK: ReplyShape = ReplyShape::Exact(1);

impl Command {
    /// Short name used in logs and errors.
    pub const fn name(&self) -> &'static str {
        use Command::*;
        match self {
            Handshake => "handshake",
            GetStatus => "get status",
            GetModel => "get model",
            GetMainFirmware => "get main firmware",
            GetRaDecFirmware => "get RA/DEC firmware",
            StartMotion(_) => "start motion",
            StopMotion(_) => "stop motion",
            FindHome => "find home",
            GotoHome => "goto home",
            SetCurrentHome => "set current home",
            SetSlewRate(_) => "set slew rate",
            SetTrackMode(_) => "set track mode",
            SetCustomTrackRate(_) => "set custom track rate",
            SetGuideRate(_) => "set guide rate",
            GetGuideRate => "get guide rate",
            Park => "park",
            Unpark => "unpark",
            Abort => "abort",
            SetLongitude(_) => "set longitude",
            SetLatitude(_) => "set latitude",
            SetLocalDate(_) => "set local date",
            SetLocalTime(_) => "set local time",
            SetDaylightSaving(_) => "set daylight saving",
            SetUtcOffset(_) => "set UTC offset",
        }
    }

    /// The reply the mount sends for this command.
    pub const fn reply_shape(&self) -> ReplyShape {
        use Command::*;
        match self {
            Handshake => ReplyShape::Terminated(HANDSHAKE_REPLY.len()),
            GetStatus => ReplyShape::Terminated(7),
            GetModel => ReplyShape::Exact(4),
            GetMainFirmware | GetRaDecFirmware => ReplyShape::Terminated(13),
            StartMotion(_) => ReplyShape::None,
            GetGuideRate => ReplyShape::Exact(4),
            _ => ACK,
        }
    }

    /// Encode the command into its on-wire text.
    ///
    /// # Errors
    /// Returns an input contract [`Error`] if an argument can't be
    /// represented in the command's fixed-width fields.
    pub fn encode(&self) -> Result<CommandBytes, Error> {
        use Command::*;
        let mut buf = CommandBytes::new();
        let written = match *self {
            Handshake => buf.try_push_str(":V#").is_ok(),
            GetStatus => buf.try_push_str(":GAS#").is_ok(),
            GetModel => buf.try_push_str(":MountInfo#").is_ok(),
            GetMainFirmware => buf.try_push_str(":FW1#").is_ok(),
            GetRaDecFirmware => buf.try_push_str(":FW2#").is_ok(),
            StartMotion(direction) => write!(buf, ":m{}#", direction.letter()).is_ok(),
            StopMotion(axis) => write!(buf, ":q{}#", axis.letter()).is_ok(),
            FindHome => buf.try_push_str(":MSH#").is_ok(),
            GotoHome => buf.try_push_str(":MH#").is_ok(),
            SetCurrentHome => buf.try_push_str(":SZP#").is_ok(),
            SetSlewRate(rate) => write!(buf, ":SR{}#", rate.to_wire() as char).is_ok(),
            SetTrackMode(rate) => write!(buf, ":RT{}#", track_mode_digit(rate)).is_ok(),
            SetCustomTrackRate(rate) => {
                let digits = custom_rate_digits(rate)?;
                write!(buf, ":RR{}0{}#", sign(rate), digits).is_ok()
            }
            SetGuideRate(rate) => write!(buf, ":RG{:03}#", guide_rate_percent(rate)?).is_ok(),
            GetGuideRate => buf.try_push_str(":AG#").is_ok(),
            Park => buf.try_push_str(":MP1#").is_ok(),
            Unpark => buf.try_push_str(":MP0#").is_ok(),
            Abort => buf.try_push_str(":Q#").is_ok(),
            SetLongitude(degrees) => {
                check_range("longitude", degrees, 180.0)?;
                write!(buf, ":Sg{}{:.2}#", sign(degrees), degrees.abs()).is_ok()
            }
            SetLatitude(degrees) => {
                check_range("latitude", degrees, 90.0)?;
                write!(buf, ":St{}{:.2}#", sign(degrees), degrees.abs()).is_ok()
            }
            SetLocalDate(date) => {
                check_field("year", date.year, 0, 99)?;
                check_field("month", date.month, 1, 12)?;
                check_field("day", date.day, 1, 31)?;
                write!(buf, ":SC{:02}{:02}{:02}#", date.year, date.month, date.day).is_ok()
            }
            SetLocalTime(time) => {
                check_field("hour", time.hour, 0, 23)?;
                check_field("minute", time.minute, 0, 59)?;
                check_field("second", time.second, 0, 59)?;
                write!(buf, ":SL{:02}{:02}{:02}#", time.hour, time.minute, time.second).is_ok()
            }
            SetDaylightSaving(enabled) => {
                write!(buf, ":SDS{}#", if enabled { '1' } else { '0' }).is_ok()
            }
            SetUtcOffset(hours) => {
                let minutes = utc_offset_minutes(hours)?;
                write!(buf, ":SG{}{:03}#", sign(hours), minutes).is_ok()
            }
        };
        ensure!(written, CommandTooLongSnafu { command: self.name() });
        Ok(buf)
    }
}

/// Track mode digit sent by `:RT<n>#`.
///
/// King rate is sent as `4`, the same digit as custom rate. Existing
/// drivers for this mount behave the same way and the firmware documentation
/// doesn't say which one is right, so the digit is kept as is.
const fn track_mode_digit(rate: TrackRate) -> char {
    match rate {
        TrackRate::Sidereal => '0',
        TrackRate::Lunar => '1',
        TrackRate::Solar => '2',
        TrackRate::King | TrackRate::Custom => '4',
    }
}

fn sign(value: f64) -> char {
    if value >= 0.0 {
        '+'
    } else {
        '-'
    }
}

fn check_finite(argument: &'static str, value: f64) -> Result<(), Error> {
    ensure!(value.is_finite(), ArgumentNotFiniteSnafu { argument });
    Ok(())
}

fn check_range(argument: &'static str, value: f64, limit: f64) -> Result<(), Error> {
    check_finite(argument, value)?;
    ensure!(
        value.abs() <= limit,
        ArgumentOutOfRangeSnafu { argument, value }
    );
    Ok(())
}

fn check_field(argument: &'static str, value: u8, min: u8, max: u8) -> Result<(), Error> {
    ensure!(
        (min..=max).contains(&value),
        ArgumentOutOfRangeSnafu {
            argument,
            value: f64::from(value)
        }
    );
    Ok(())
}

/// The `d.dddd` part of a custom track rate.
fn custom_rate_digits(rate: f64) -> Result<ArrayString<8>, Error> {
    check_range("custom track rate", rate, 10.0)?;
    let mut digits = ArrayString::<8>::new();
    let fits = write!(digits, "{:.4}", rate.abs()).is_ok() && digits.len() == 6;
    ensure!(
        fits,
        ArgumentOutOfRangeSnafu {
            argument: "custom track rate",
            value: rate
        }
    );
    Ok(digits)
}

/// Guide rate as whole percent of sidereal.
fn guide_rate_percent(rate: f64) -> Result<u16, Error> {
    check_finite("guide rate", rate)?;
    ensure!(
        (0.0..=1.0).contains(&rate),
        ArgumentOutOfRangeSnafu {
            argument: "guide rate",
            value: rate
        }
    );
    Ok((rate * 100.0).round() as u16)
}

/// UTC offset in whole minutes, sign dropped.
fn utc_offset_minutes(hours: f64) -> Result<u16, Error> {
    check_finite("UTC offset", hours)?;
    let minutes = (hours.abs() * 60.0).trunc();
    ensure!(
        minutes <= 999.0,
        ArgumentOutOfRangeSnafu {
            argument: "UTC offset",
            value: hours
        }
    );
    Ok(minutes as u16)
}
