//! This module defines the typed values carried by the iEQ protocol: the six
//! status fields, motion directions, site/time arguments and firmware
//! identification, together with their single-digit on-wire form.

use snafu::{OptionExt, Snafu};

use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;

/// Error type for this module. These are input contract violations: the
/// caller supplied something that has no representation in the protocol.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// The value isn't one of the four motion directions.
    #[snafu(display("Invalid direction {:?}", value))]
    InvalidDirection { value: String },
    /// The ordinal has no member in the field's enum.
    #[snafu(display("Invalid {} ordinal {}", field, value))]
    InvalidOrdinal { field: &'static str, value: u8 },
    /// The name doesn't match any member of the field's enum.
    #[snafu(display("Unknown {} {:?}", field, value))]
    UnknownName { field: &'static str, value: String },
    /// A numeric argument doesn't fit its fixed-width wire field.
    #[snafu(display("Argument {} out of range: {}", argument, value))]
    ArgumentOutOfRange { argument: &'static str, value: f64 },
    /// A numeric argument is NaN or infinite.
    #[snafu(display("Argument {} is not a finite number", argument))]
    ArgumentNotFinite { argument: &'static str },
    /// The encoded command would not fit the command buffer.
    #[snafu(display("Command {} does not fit the command buffer", command))]
    CommandTooLong { command: &'static str },
}

/// A status field sent as a single ASCII digit.
///
/// Most fields put their ordinal on the wire directly. Slew rate and time
/// source are one-based on the wire, so they carry an offset of one:
///
/// | field       | `FIELD`       | `OFFSET` | wire digit |
/// |-------------|---------------|----------|------------|
/// | GPS         | `gps`         | 0        | `'0'..='3'`|
/// | system      | `system`      | 0        | `'0'..='7'`|
/// | track rate  | `track rate`  | 0        | `'0'..='4'`|
/// | slew rate   | `slew rate`   | 1        | `'1'..='9'`|
/// | time source | `time source` | 1        | `'1'..='3'`|
/// | hemisphere  | `hemisphere`  | 0        | `'0'..='1'`|
pub trait WireDigit: Sized + Copy {
    /// Field name used in diagnostics.
    const FIELD: &'static str;
    /// Added to the ordinal before it is sent.
    const OFFSET: u8;

    /// Zero-based position of the member within its enum.
    fn ordinal(self) -> u8;

    /// Inverse of [`ordinal`](Self::ordinal).
    fn from_ordinal(ordinal: u8) -> Option<Self>;

    /// The ASCII digit sent for this value.
    fn to_wire(self) -> u8 {
        b'0' + self.ordinal() + Self::OFFSET
    }

    /// Decode an ASCII digit, returning `None` if it is not a digit or is
    /// outside the field's range.
    fn from_wire(byte: u8) -> Option<Self> {
        if !byte.is_ascii_digit() {
            return None;
        }
        (byte - b'0')
            .checked_sub(Self::OFFSET)
            .and_then(Self::from_ordinal)
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $field:literal, offset $offset:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $ord:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $ord, )+
        }

        impl $name {
            /// Every member, in ordinal order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Human readable name of the member.
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl WireDigit for $name {
            const FIELD: &'static str = $field;
            const OFFSET: u8 = $offset;

            fn ordinal(self) -> u8 {
                self as u8
            }

            fn from_ordinal(ordinal: u8) -> Option<Self> {
                match ordinal {
                    $( $ord => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
                Self::from_ordinal(ordinal).context(InvalidOrdinalSnafu {
                    field: $field,
                    value: ordinal,
                })
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Accepts the member name (case insensitive) or its ordinal.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if let Ok(ordinal) = s.parse::<u8>() {
                    return Self::try_from(ordinal);
                }
                Self::ALL
                    .iter()
                    .copied()
                    .find(|member| member.name().eq_ignore_ascii_case(s))
                    .context(UnknownNameSnafu { field: $field, value: s })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_enum! {
    /// Satellite receiver state.
    pub enum GpsStatus: "gps", offset 0 {
        NoGps = 0 => "none",
        NotFound = 1 => "not found",
        Detected = 2 => "detected",
        Locked = 3 => "locked",
    }
}

wire_enum! {
    /// What the mount is currently doing.
    pub enum SystemStatus: "system", offset 0 {
        Stopped = 0 => "stopped",
        Tracking = 1 => "tracking",
        Slewing = 2 => "slewing",
        Guiding = 3 => "guiding",
        MeridianFlipping = 4 => "meridian flipping",
        Homing = 5 => "homing",
        Parked = 6 => "parked",
        Parking = 7 => "parking",
    }
}

wire_enum! {
    /// Rate used to compensate for sky motion.
    pub enum TrackRate: "track rate", offset 0 {
        Sidereal = 0 => "sidereal",
        Lunar = 1 => "lunar",
        Solar = 2 => "solar",
        King = 3 => "king",
        Custom = 4 => "custom",
    }
}

wire_enum! {
    /// Discrete manual slew speeds, as multiples of the sidereal rate.
    pub enum SlewRate: "slew rate", offset 1 {
        X1 = 0 => "1x",
        X2 = 1 => "2x",
        X8 = 2 => "8x",
        X16 = 3 => "16x",
        X64 = 4 => "64x",
        X128 = 5 => "128x",
        X256 = 6 => "256x",
        X512 = 7 => "512x",
        Max = 8 => "max",
    }
}

wire_enum! {
    /// Where the mount got its current date and time from.
    pub enum TimeSource: "time source", offset 1 {
        Rs232 = 0 => "rs232",
        Controller = 1 => "controller",
        Gps = 2 => "gps",
    }
}

wire_enum! {
    /// Observing hemisphere.
    pub enum Hemisphere: "hemisphere", offset 0 {
        South = 0 => "south",
        North = 1 => "north",
    }
}

/// Snapshot of the six fields returned by the status query, in wire order.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct MountStatus {
    pub gps: GpsStatus,
    pub system: SystemStatus,
    pub track_rate: TrackRate,
    pub slew_rate: SlewRate,
    pub time_source: TimeSource,
    pub hemisphere: Hemisphere,
}

/// Number of status digits in a status reply, excluding the terminator.
pub const STATUS_DIGITS: usize = 6;

impl MountStatus {
    /// The six status digits, in the order the mount sends them.
    pub fn to_bytes(self) -> [u8; STATUS_DIGITS] {
        [
            self.gps.to_wire(),
            self.system.to_wire(),
            self.track_rate.to_wire(),
            self.slew_rate.to_wire(),
            self.time_source.to_wire(),
            self.hemisphere.to_wire(),
        ]
    }
}

impl fmt::Display for MountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPS {}, {}, {} tracking, slew {}, time from {}, {} hemisphere",
            self.gps, self.system, self.track_rate, self.slew_rate, self.time_source, self.hemisphere
        )
    }
}

/// Manual motion direction.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

/// Mount axis. Stopping motion is per axis, not per direction.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Axis {
    /// Declination, moved by north/south.
    Dec,
    /// Right ascension, moved by west/east.
    Ra,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The axis this direction moves.
    pub const fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::Dec,
            Direction::West | Direction::East => Axis::Ra,
        }
    }

    /// Lower case letter used in the motion commands.
    pub const fn letter(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::West => 'w',
            Direction::East => 'e',
        }
    }
}

impl TryFrom<char> for Direction {
    type Error = Error;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_lowercase() {
            'n' => Ok(Direction::North),
            's' => Ok(Direction::South),
            'w' => Ok(Direction::West),
            'e' => Ok(Direction::East),
            _ => InvalidDirectionSnafu { value: c }.fail(),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let direction = match lower.as_str() {
            "n" | "north" => Direction::North,
            "s" | "south" => Direction::South,
            "w" | "west" => Direction::West,
            "e" | "east" => Direction::East,
            _ => return InvalidDirectionSnafu { value: s }.fail(),
        };
        Ok(direction)
    }
}

impl Axis {
    /// Upper case letter used in the stop commands.
    pub const fn letter(self) -> char {
        match self {
            Axis::Dec => 'D',
            Axis::Ra => 'R',
        }
    }
}

/// Model name reported when the model code is not in the table.
pub const UNKNOWN_MODEL: &str = "Unknown";

const MODELS: [(&str, &str); 4] = [
    ("0060", "CEM60"),
    ("0061", "CEM60-EC"),
    ("0045", "iEQ45 Pro"),
    ("0046", "iEQ45 Pro AA"),
];

/// Look up the model name for a four digit model code.
pub fn model_name(code: &str) -> &'static str {
    MODELS
        .iter()
        .find(|&&(known, _)| known == code)
        .map_or(UNKNOWN_MODEL, |&(_, name)| name)
}

/// Mount identification, assembled from the model and both firmware queries.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FirmwareInfo {
    pub model: String,
    pub main_board: String,
    pub controller: String,
    pub ra: String,
    pub dec: String,
}

/// Calendar date as sent to the mount, two digit year.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct LocalDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

/// Local wall clock time.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}


#[cfg(test)]
mod argument_tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert_eq!(SlewRate::try_from(3u8), Ok(SlewRate::X16));
        assert_eq!(
            SlewRate::try_from(9u8),
            Err(Error::InvalidOrdinal {
                field: "slew rate",
                value: 9
            })
        );
        assert!(TrackRate::try_from(5u8).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!("Lunar".parse(), Ok(TrackRate::Lunar));
        assert_eq!("4".parse(), Ok(TrackRate::Custom));
        assert_eq!("256x".parse(), Ok(SlewRate::X256));
        assert!("warp".parse::<SlewRate>().is_err());
    }

    #[test]
    fn test_directions() {
        assert_eq!("north".parse(), Ok(Direction::North));
        assert_eq!(Direction::try_from('E'), Ok(Direction::East));
        assert_eq!(
            Direction::try_from('x'),
            Err(Error::InvalidDirection { value: "x".into() })
        );
        assert!("up".parse::<Direction>().is_err());
        assert_eq!(Direction::North.axis(), Axis::Dec);
        assert_eq!(Direction::South.axis(), Axis::Dec);
        assert_eq!(Direction::West.axis(), Axis::Ra);
        assert_eq!(Direction::East.axis(), Axis::Ra);
    }

    #[test]
    fn test_models() {
        assert_eq!(model_name("0060"), "CEM60");
        assert_eq!(model_name("0061"), "CEM60-EC");
        assert_eq!(model_name("0045"), "iEQ45 Pro");
        assert_eq!(model_name("0046"), "iEQ45 Pro AA");
        assert_eq!(model_name("0120"), UNKNOWN_MODEL);
        assert_eq!(model_name(""), UNKNOWN_MODEL);
    }
}
