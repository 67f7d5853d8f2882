use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while_m_n};
use nom::bytes::streaming;
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map, map_opt, map_res, opt, recognize, value};
use nom::number::complete::u8;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::{IResult, Parser};

type Buf = [u8];

/// Decoding of mount replies, the inverse of the command encodings.
pub mod reply {
    use super::*;
    use crate::command::HANDSHAKE_REPLY;
    use crate::types::{
        model_name, GpsStatus, Hemisphere, MountStatus, SlewRate, SystemStatus, TimeSource,
        TrackRate, WireDigit,
    };
    use snafu::{ensure, OptionExt, Snafu};

    /// Reply decoding errors.
    #[derive(Debug, Snafu, PartialEq)]
    #[snafu(visibility(pub(crate)))]
    #[non_exhaustive]
    pub enum Error {
        /// The reply is shorter or longer than the command's reply.
        #[snafu(display("Expected {} reply bytes, received {}", expected, received))]
        Framing { expected: usize, received: usize },
        /// A status digit is outside its field's range.
        #[snafu(display("Invalid {} digit {:?}", field, byte))]
        InvalidField { field: &'static str, byte: char },
        /// The reply has the right length but can't be decoded.
        #[snafu(display("Malformed {} reply {:?}", what, reply))]
        Malformed { what: &'static str, reply: String },
        /// The mount answered something other than `1`.
        #[snafu(display("Command rejected, mount replied {:?}", reply))]
        Rejected { reply: String },
        /// The mount refused to park, usually because the park position is
        /// below the horizon.
        #[snafu(display("Park rejected, mount replied {:?}", reply))]
        ParkRejected { reply: String },
    }

    pub const STATUS_LEN: usize = 7;
    pub const MODEL_LEN: usize = 4;
    pub const FIRMWARE_LEN: usize = 13;
    pub const GUIDE_RATE_LEN: usize = 4;
    pub const ACK_LEN: usize = 1;

    const FIRMWARE_FIELD: usize = 6;

    fn lossy(frame: &Buf) -> String {
        String::from_utf8_lossy(frame).into_owned()
    }

    /// Reject the frame unless it is exactly `expected` bytes long.
    pub fn check_len(frame: &Buf, expected: usize) -> Result<(), Error> {
        ensure!(
            frame.len() == expected,
            FramingSnafu {
                expected,
                received: frame.len()
            }
        );
        Ok(())
    }

    fn wire_digit<T: WireDigit>(buf: &Buf) -> IResult<&Buf, Result<T, Error>> {
        map(u8, |byte| {
            T::from_wire(byte).context(InvalidFieldSnafu {
                field: T::FIELD,
                byte: byte as char,
            })
        })(buf)
    }

    /// Decode the `:GAS#` reply: six status digits and a terminator.
    pub fn status(frame: &Buf) -> Result<MountStatus, Error> {
        check_len(frame, STATUS_LEN)?;
        let (_, (gps, system, track_rate, slew_rate, time_source, hemisphere)) =
            all_consuming(terminated(
                tuple((
                    wire_digit::<GpsStatus>,
                    wire_digit::<SystemStatus>,
                    wire_digit::<TrackRate>,
                    wire_digit::<SlewRate>,
                    wire_digit::<TimeSource>,
                    wire_digit::<Hemisphere>,
                )),
                ascii_char(b'#'),
            ))(frame)
            .map_err(|_| Error::Malformed {
            what: "status",
            reply: lossy(frame),
        })?;
        Ok(MountStatus {
            gps: gps?,
            system: system?,
            track_rate: track_rate?,
            slew_rate: slew_rate?,
            time_source: time_source?,
            hemisphere: hemisphere?,
        })
    }

    /// Decode the four digit `:MountInfo#` reply into a model name.
    pub fn model(frame: &Buf) -> Result<&'static str, Error> {
        check_len(frame, MODEL_LEN)?;
        Ok(core::str::from_utf8(frame).map_or(crate::types::UNKNOWN_MODEL, model_name))
    }

    /// Split a `:FW1#`/`:FW2#` reply into its two six character halves.
    /// The thirteenth byte is not part of either field.
    pub fn firmware_pair(frame: &Buf) -> Result<(String, String), Error> {
        check_len(frame, FIRMWARE_LEN)?;
        let halves: IResult<&Buf, (&str, &str)> = pair(
            map_res(take(FIRMWARE_FIELD), core::str::from_utf8),
            map_res(take(FIRMWARE_FIELD), core::str::from_utf8),
        )(frame);
        let (_, (first, second)) = halves.map_err(|_| Error::Malformed {
            what: "firmware",
            reply: lossy(frame),
        })?;
        Ok((first.to_owned(), second.to_owned()))
    }

    /// Decode the `:AG#` reply, e.g. `045#`, into a fraction of sidereal.
    pub fn guide_rate(frame: &Buf) -> Result<f64, Error> {
        check_len(frame, GUIDE_RATE_LEN)?;
        let percent: IResult<&Buf, u16> =
            all_consuming(terminated(map_parsed(digit1), opt(ascii_char(b'#'))))(frame);
        let (_, percent) = percent.map_err(|_| Error::Malformed {
            what: "guide rate",
            reply: lossy(frame),
        })?;
        Ok(f64::from(percent) / 100.0)
    }

    /// A single byte acknowledgement, `1` on success.
    pub fn ack(frame: &Buf) -> Result<(), Error> {
        check_len(frame, ACK_LEN)?;
        ensure!(frame == b"1", RejectedSnafu { reply: lossy(frame) });
        Ok(())
    }

    /// Acknowledgement of the park command. Anything but `1` is a refusal.
    pub fn park(frame: &Buf) -> Result<(), Error> {
        check_len(frame, ACK_LEN)?;
        ensure!(frame == b"1", ParkRejectedSnafu { reply: lossy(frame) });
        Ok(())
    }

    /// The handshake reply must be the exact protocol version string.
    pub fn handshake(frame: &Buf) -> Result<(), Error> {
        check_len(frame, HANDSHAKE_REPLY.len())?;
        ensure!(
            frame == HANDSHAKE_REPLY,
            MalformedSnafu {
                what: "handshake",
                reply: lossy(frame)
            }
        );
        Ok(())
    }

}

/// Parsing of command frames, used by the simulated mount.
pub(crate) mod command {
    use super::*;
    use crate::command::Command::{self, *};
    use crate::types::{Axis, Direction, LocalDate, LocalTime, SlewRate, TrackRate, WireDigit};

    #[derive(PartialEq, Debug, Copy, Clone)]
    pub(crate) enum CommandToken {
        Command(Command),
        /// A complete `:...#` frame that isn't a known command.
        Unknown,
        NeedData,
    }

    /// Parse one command frame from the start of `buf`. Returns the number of
    /// bytes consumed along with the token.
    pub(crate) fn parse_command(buf: &Buf) -> (usize, CommandToken) {
        if !buf.contains(&b':') {
            // nothing here can start a command
            return (buf.len(), CommandToken::NeedData);
        }
        match frame(buf) {
            Ok((remaining, body)) => {
                let consumed = buf.len() - remaining.len();
                match all_consuming(command_body)(body) {
                    Ok((_, command)) => (consumed, CommandToken::Command(command)),
                    Err(_) => (consumed, CommandToken::Unknown),
                }
            }
            Err(_) => (0, CommandToken::NeedData),
        }
    }

    /// `<junk>:<body>#`, returning the body.
    fn frame(buf: &Buf) -> IResult<&Buf, &Buf> {
        preceded(
            pair(
                streaming::take_till(|c: u8| c == b':'),
                streaming::tag(":"),
            ),
            terminated(
                streaming::take_till(|c: u8| c == b'#'),
                streaming::tag("#"),
            ),
        )(buf)
    }

    fn command_body(buf: &Buf) -> IResult<&Buf, Command> {
        alt((queries_and_motion, setters))(buf)
    }

    fn queries_and_motion(buf: &Buf) -> IResult<&Buf, Command> {
        alt((
            value(Handshake, tag("V")),
            value(GetStatus, tag("GAS")),
            value(GetModel, tag("MountInfo")),
            value(GetMainFirmware, tag("FW1")),
            value(GetRaDecFirmware, tag("FW2")),
            map(preceded(ascii_char(b'm'), direction), StartMotion),
            map(preceded(ascii_char(b'q'), axis), StopMotion),
            value(FindHome, tag("MSH")),
            value(GotoHome, tag("MH")),
            value(SetCurrentHome, tag("SZP")),
            value(GetGuideRate, tag("AG")),
            value(Park, tag("MP1")),
            value(Unpark, tag("MP0")),
            value(Abort, tag("Q")),
        ))(buf)
    }

    fn setters(buf: &Buf) -> IResult<&Buf, Command> {
        alt((
            map(
                preceded(tag("SR"), map_opt(u8, SlewRate::from_wire)),
                SetSlewRate,
            ),
            map(preceded(tag("RT"), track_mode), SetTrackMode),
            map(
                preceded(tag("RR"), pair(sign, preceded(ascii_char(b'0'), decimal))),
                |(sign, rate)| SetCustomTrackRate(sign * rate),
            ),
            map(preceded(tag("RG"), digits::<u16>(3)), |percent| {
                SetGuideRate(f64::from(percent) / 100.0)
            }),
            map(preceded(tag("Sg"), pair(sign, decimal)), |(sign, degrees)| {
                SetLongitude(sign * degrees)
            }),
            map(preceded(tag("St"), pair(sign, decimal)), |(sign, degrees)| {
                SetLatitude(sign * degrees)
            }),
            map(
                preceded(tag("SC"), tuple((digits::<u8>(2), digits(2), digits(2)))),
                |(year, month, day)| SetLocalDate(LocalDate { year, month, day }),
            ),
            map(
                preceded(tag("SL"), tuple((digits::<u8>(2), digits(2), digits(2)))),
                |(hour, minute, second)| {
                    SetLocalTime(LocalTime {
                        hour,
                        minute,
                        second,
                    })
                },
            ),
            map(
                preceded(
                    tag("SDS"),
                    alt((value(true, ascii_char(b'1')), value(false, ascii_char(b'0')))),
                ),
                SetDaylightSaving,
            ),
            map(
                preceded(tag("SG"), pair(sign, digits::<u16>(3))),
                |(sign, minutes)| SetUtcOffset(sign * f64::from(minutes) / 60.0),
            ),
        ))(buf)
    }

    fn direction(buf: &Buf) -> IResult<&Buf, Direction> {
        alt((
            value(Direction::North, ascii_char(b'n')),
            value(Direction::South, ascii_char(b's')),
            value(Direction::West, ascii_char(b'w')),
            value(Direction::East, ascii_char(b'e')),
        ))(buf)
    }

    fn axis(buf: &Buf) -> IResult<&Buf, Axis> {
        alt((
            value(Axis::Dec, ascii_char(b'D')),
            value(Axis::Ra, ascii_char(b'R')),
        ))(buf)
    }

    fn track_mode(buf: &Buf) -> IResult<&Buf, TrackRate> {
        alt((
            value(TrackRate::Sidereal, ascii_char(b'0')),
            value(TrackRate::Lunar, ascii_char(b'1')),
            value(TrackRate::Solar, ascii_char(b'2')),
            value(TrackRate::King, ascii_char(b'3')),
            value(TrackRate::Custom, ascii_char(b'4')),
        ))(buf)
    }

    fn sign(buf: &Buf) -> IResult<&Buf, f64> {
        alt((
            value(1.0, ascii_char(b'+')),
            value(-1.0, ascii_char(b'-')),
        ))(buf)
    }

    /// Unsigned `ddd.dd` style number.
    fn decimal(buf: &Buf) -> IResult<&Buf, f64> {
        map_parsed(recognize(tuple((digit1, ascii_char(b'.'), digit1))))(buf)
    }

    /// Exactly `count` ASCII digits.
    fn digits<'a, O: core::str::FromStr>(
        count: usize,
    ) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, O> {
        map_parsed(take_while_m_n(count, count, |c: u8| c.is_ascii_digit()))
    }

}

fn ascii_char<'a>(c: u8) -> impl Fn(&'a Buf) -> IResult<&'a Buf, char> {
    nom::character::complete::char(c as char)
}

/// Apply `first`, then parse the recognized ASCII text with `FromStr`.
fn map_parsed<'a, O, F>(first: F) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, O>
where
    F: Parser<&'a Buf, &'a Buf, nom::error::Error<&'a Buf>>,
    O: core::str::FromStr,
{
    let to_str = map_res(first, |u: &'a Buf| core::str::from_utf8(u));
    map_res(to_str, |s| s.parse::<O>())
}
