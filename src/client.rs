//! See [`IeqPro`] for more details.

use std::io;
use std::thread;

use log::{debug, error, warn};
use snafu::{ResultExt, Snafu};

use crate::command::{Command, ReplyShape, TERMINATOR};
use crate::config::Config;
use crate::nom_parser::reply;
use crate::simulator::{SimState, Simulator};
use crate::transport::{Offline, ReplyBytes, Transport};
use crate::types::{
    self, Direction, FirmwareInfo, LocalDate, LocalTime, MountStatus, SlewRate, TrackRate,
};

/// Number of handshake attempts made by [`IeqPro::check_connection`].
pub const HANDSHAKE_ATTEMPTS: u32 = 2;

/// Error type for mount operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// Writing the command or reading the reply failed, including timeouts.
    #[snafu(display("{}: I/O error: {}", command, source))]
    Transport {
        command: &'static str,
        source: io::Error,
    },
    /// The reply had the wrong length or could not be decoded.
    #[snafu(display("{}: {}", command, source))]
    Decode {
        command: &'static str,
        source: reply::Error,
    },
    /// An argument can't be sent to the mount.
    #[snafu(display("{}: {}", command, source))]
    InvalidInput {
        command: &'static str,
        source: types::Error,
    },
    /// The mount didn't answer the handshake with the expected version.
    #[snafu(display("No valid handshake reply after {} attempts", attempts))]
    Handshake { attempts: u32 },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The link failed or the mount did not answer in time.
    Transport,
    /// The reply had the wrong number of bytes.
    Framing,
    /// The reply was well framed but invalid, or the mount refused the command.
    ProtocolViolation,
    /// The caller passed an argument the protocol can't express.
    InputContract,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } | Error::Handshake { .. } => ErrorKind::Transport,
            Error::Decode {
                source: reply::Error::Framing { .. },
                ..
            } => ErrorKind::Framing,
            Error::Decode { .. } => ErrorKind::ProtocolViolation,
            Error::InvalidInput { .. } => ErrorKind::InputContract,
        }
    }

    /// True if the mount refused to park.
    pub fn is_park_rejected(&self) -> bool {
        matches!(
            self,
            Error::Decode {
                source: reply::Error::ParkRejected { .. },
                ..
            }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Driver for one iEQ Pro / CEM60 mount.
///
/// Every operation sends one command and, unless the mount doesn't answer
/// that command, reads and decodes one reply. Commands must not overlap, so
/// the driver takes `&mut self` throughout.
///
/// With simulation enabled all traffic goes to a built-in [`Simulator`]
/// instead of the transport, through the same encoder and reply parser.
///
/// # Example
///
/// ```
/// use ieqpro_proto::{Config, IeqPro, SlewRate, TrackRate};
///
/// # fn main() -> Result<(), ieqpro_proto::Error> {
/// let mut mount = IeqPro::simulated(Config::default());
/// mount.check_connection()?;
///
/// mount.set_track_mode(TrackRate::Lunar)?;
/// mount.set_slew_rate(SlewRate::X16)?;
/// let status = mount.get_status()?;
/// assert_eq!(status.track_rate, TrackRate::Lunar);
/// assert_eq!(status.slew_rate, SlewRate::X16);
///
/// let firmware = mount.get_firmware()?;
/// assert_eq!(firmware.model, "iEQ45 Pro");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct IeqPro<T> {
    io: T,
    sim: Option<Simulator>,
    config: Config,
    status: Option<MountStatus>,
}

impl IeqPro<Offline> {
    /// A driver that only talks to the simulated mount.
    pub fn simulated(config: Config) -> Self {
        Self::new(Offline, config.simulation(true))
    }
}

impl<T> IeqPro<T>
where
    T: Transport,
{
    pub fn new(io: T, config: Config) -> Self {
        let sim = if config.simulation {
            Some(Simulator::new())
        } else {
            None
        };
        Self {
            io,
            sim,
            config,
            status: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switch between the transport and the simulated mount. Enabling
    /// simulation starts from a default [`SimState`] unless a simulator
    /// already exists. Disabling it discards the simulated state.
    pub fn set_simulation(&mut self, enabled: bool) {
        self.config.simulation = enabled;
        if enabled {
            self.sim.get_or_insert_with(Simulator::new);
        } else {
            self.sim = None;
        }
        self.status = None;
    }

    pub fn is_simulation(&self) -> bool {
        self.sim.is_some()
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.config.debug = enabled;
    }

    pub fn set_device_name(&mut self, name: impl Into<String>) {
        self.config.device_name = name.into();
    }

    /// State of the simulated mount, for seeding it before a test.
    /// `None` when simulation is off.
    pub fn sim_state_mut(&mut self) -> Option<&mut SimState> {
        self.sim.as_mut().map(Simulator::state_mut)
    }

    /// The status snapshot from the last status query. With simulation on,
    /// it is kept current after every command.
    pub fn last_status(&self) -> Option<&MountStatus> {
        self.status.as_ref()
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    /// Confirm the mount speaks the expected protocol version. The
    /// handshake is retried once after a short backoff.
    ///
    /// # Errors
    /// [`Error::Handshake`] if no attempt got the version reply.
    pub fn check_connection(&mut self) -> Result<()> {
        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            let outcome = self
                .exchange(Command::Handshake)
                .and_then(|frame| self.decode(&Command::Handshake, reply::handshake(&frame)));
            match outcome {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(
                        "[{}] Handshake attempt {} of {} failed: {}",
                        self.config.device_name, attempt, HANDSHAKE_ATTEMPTS, err
                    );
                    if attempt < HANDSHAKE_ATTEMPTS {
                        thread::sleep(self.config.probe_backoff);
                    }
                }
            }
        }
        HandshakeSnafu {
            attempts: HANDSHAKE_ATTEMPTS,
        }
        .fail()
    }

    /// Query the six status fields and store them as the current snapshot.
    pub fn get_status(&mut self) -> Result<MountStatus> {
        let command = Command::GetStatus;
        let frame = self.exchange(command)?;
        let status = self.decode(&command, reply::status(&frame))?;
        self.status = Some(status);
        Ok(status)
    }

    /// Read the model code and look up the model name.
    pub fn get_model(&mut self) -> Result<&'static str> {
        let command = Command::GetModel;
        let frame = self.exchange(command)?;
        self.decode(&command, reply::model(&frame))
    }

    /// Main board and hand controller firmware versions.
    pub fn get_main_firmware(&mut self) -> Result<(String, String)> {
        let command = Command::GetMainFirmware;
        let frame = self.exchange(command)?;
        self.decode(&command, reply::firmware_pair(&frame))
    }

    /// RA and DEC motor board firmware versions.
    pub fn get_radec_firmware(&mut self) -> Result<(String, String)> {
        let command = Command::GetRaDecFirmware;
        let frame = self.exchange(command)?;
        self.decode(&command, reply::firmware_pair(&frame))
    }

    /// Model, then main firmware, then RA/DEC firmware. Fails as a whole if
    /// any of the three queries fails.
    pub fn get_firmware(&mut self) -> Result<FirmwareInfo> {
        let model = self.get_model()?.to_owned();
        let (main_board, controller) = self.get_main_firmware()?;
        let (ra, dec) = self.get_radec_firmware()?;
        Ok(FirmwareInfo {
            model,
            main_board,
            controller,
            ra,
            dec,
        })
    }

    /// Start moving toward `direction` at the current slew rate.
    /// The mount doesn't acknowledge this command.
    pub fn start_motion(&mut self, direction: Direction) -> Result<()> {
        self.exchange(Command::StartMotion(direction)).map(drop)
    }

    /// Stop motion on the axis `direction` moves along.
    pub fn stop_motion(&mut self, direction: Direction) -> Result<()> {
        self.command_ack(Command::StopMotion(direction.axis()))
    }

    pub fn find_home(&mut self) -> Result<()> {
        self.command_ack(Command::FindHome)
    }

    pub fn goto_home(&mut self) -> Result<()> {
        self.command_ack(Command::GotoHome)
    }

    pub fn set_current_home(&mut self) -> Result<()> {
        self.command_ack(Command::SetCurrentHome)
    }

    pub fn set_slew_rate(&mut self, rate: SlewRate) -> Result<()> {
        self.command_ack(Command::SetSlewRate(rate))
    }

    pub fn set_track_mode(&mut self, rate: TrackRate) -> Result<()> {
        self.command_ack(Command::SetTrackMode(rate))
    }

    /// Custom tracking rate in multiples of sidereal, magnitude below 10.
    pub fn set_custom_track_rate(&mut self, rate: f64) -> Result<()> {
        self.command_ack(Command::SetCustomTrackRate(rate))
    }

    /// Guide rate as a fraction of sidereal, 0.0 to 1.0.
    pub fn set_guide_rate(&mut self, rate: f64) -> Result<()> {
        self.command_ack(Command::SetGuideRate(rate))
    }

    pub fn get_guide_rate(&mut self) -> Result<f64> {
        let command = Command::GetGuideRate;
        let frame = self.exchange(command)?;
        self.decode(&command, reply::guide_rate(&frame))
    }

    /// Park the mount.
    ///
    /// # Errors
    /// A refusal from the mount is reported as a decode error for which
    /// [`Error::is_park_rejected`] is true.
    pub fn park(&mut self) -> Result<()> {
        let command = Command::Park;
        let frame = self.exchange(command)?;
        self.decode(&command, reply::park(&frame))
    }

    pub fn unpark(&mut self) -> Result<()> {
        self.command_ack(Command::Unpark)
    }

    /// Stop all motion.
    pub fn abort(&mut self) -> Result<()> {
        self.command_ack(Command::Abort)
    }

    /// Site longitude in degrees, east positive.
    pub fn set_longitude(&mut self, degrees: f64) -> Result<()> {
        self.command_ack(Command::SetLongitude(degrees))
    }

    /// Site latitude in degrees, north positive.
    pub fn set_latitude(&mut self, degrees: f64) -> Result<()> {
        self.command_ack(Command::SetLatitude(degrees))
    }

    pub fn set_local_date(&mut self, date: LocalDate) -> Result<()> {
        self.command_ack(Command::SetLocalDate(date))
    }

    pub fn set_local_time(&mut self, time: LocalTime) -> Result<()> {
        self.command_ack(Command::SetLocalTime(time))
    }

    pub fn set_daylight_saving(&mut self, enabled: bool) -> Result<()> {
        self.command_ack(Command::SetDaylightSaving(enabled))
    }

    /// Offset from UTC in hours. Sent as whole minutes.
    pub fn set_utc_offset(&mut self, hours: f64) -> Result<()> {
        self.command_ack(Command::SetUtcOffset(hours))
    }

    fn command_ack(&mut self, command: Command) -> Result<()> {
        let frame = self.exchange(command)?;
        self.decode(&command, reply::ack(&frame))
    }

    fn link(&mut self) -> &mut dyn Transport {
        match self.sim {
            Some(ref mut sim) => sim as &mut dyn Transport,
            None => &mut self.io as &mut dyn Transport,
        }
    }

    /// Send one command and collect its reply frame.
    fn exchange(&mut self, command: Command) -> Result<ReplyBytes> {
        let name = command.name();
        let encoded = match command.encode() {
            Ok(encoded) => encoded,
            Err(source) => {
                error!("[{}] {}: {}", self.config.device_name, name, source);
                return Err(source).context(InvalidInputSnafu { command: name });
            }
        };
        if self.config.debug {
            debug!("[{}] CMD ({})", self.config.device_name, encoded);
        }

        let timeout = self.config.timeout;
        let shape = command.reply_shape();
        let link = self.link();
        let received = link.send(encoded.as_bytes()).and_then(|()| match shape {
            ReplyShape::None => Ok(ReplyBytes::new()),
            ReplyShape::Exact(len) => link.read_exact(len, timeout),
            // one byte of slack so an overlong reply shows up as a framing error
            ReplyShape::Terminated(len) => link.read_until(TERMINATOR, len + 1, timeout),
        });

        if let Some(sim) = &self.sim {
            self.status = Some(sim.state().status);
        }

        match received {
            Ok(frame) => {
                if self.config.debug && shape != ReplyShape::None {
                    debug!(
                        "[{}] RES ({})",
                        self.config.device_name,
                        String::from_utf8_lossy(&frame)
                    );
                }
                Ok(frame)
            }
            Err(source) => {
                error!("[{}] {}: {}", self.config.device_name, name, source);
                Err(source).context(TransportSnafu { command: name })
            }
        }
    }

    fn decode<R>(&self, command: &Command, decoded: Result<R, reply::Error>) -> Result<R> {
        decoded.map_err(|source| {
            error!(
                "[{}] {}: {}",
                self.config.device_name,
                command.name(),
                source
            );
            Error::Decode {
                command: command.name(),
                source,
            }
        })
    }
}
