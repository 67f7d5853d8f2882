//! A simulated mount.
//!
//! [`Simulator`] accepts the same command bytes a real mount does, keeps its
//! state in a [`SimState`], and answers with replies built to the same
//! framing as the hardware. It implements [`Transport`], so a client
//! talks to it exactly as it would to a serial port.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use log::{debug, warn};

use crate::buffer::Buffer;
use crate::command::{Command, HANDSHAKE_REPLY, TERMINATOR};
use crate::nom_parser::command::{parse_command, CommandToken};
use crate::transport::Transport;
use crate::types::{
    GpsStatus, Hemisphere, LocalDate, LocalTime, MountStatus, SlewRate, SystemStatus, TimeSource,
    TrackRate,
};

const ACK: &[u8] = b"1";
const NAK: &[u8] = b"0";

/// Everything the simulated mount knows about itself.
///
/// All fields can be changed directly to put the simulator into a given
/// state before exercising a client against it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    pub status: MountStatus,
    /// Four digit model code returned by `:MountInfo#`.
    pub model_code: String,
    pub main_board_firmware: String,
    pub controller_firmware: String,
    pub ra_firmware: String,
    pub dec_firmware: String,
    /// Guide rate in percent of sidereal.
    pub guide_rate_percent: u8,
    pub custom_track_rate: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub date: Option<LocalDate>,
    pub time: Option<LocalTime>,
    pub daylight_saving: bool,
    /// Hours from UTC.
    pub utc_offset: f64,
    /// When false the mount refuses to park, as it does when the park
    /// position is below the horizon.
    pub park_allowed: bool,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            status: MountStatus {
                gps: GpsStatus::NoGps,
                system: SystemStatus::Stopped,
                track_rate: TrackRate::Sidereal,
                slew_rate: SlewRate::X64,
                time_source: TimeSource::Controller,
                hemisphere: Hemisphere::North,
            },
            model_code: "0045".to_owned(),
            main_board_firmware: "150324".to_owned(),
            controller_firmware: "150101".to_owned(),
            ra_firmware: "140324".to_owned(),
            dec_firmware: "140101".to_owned(),
            guide_rate_percent: 45,
            custom_track_rate: 1.0,
            longitude: 0.0,
            latitude: 0.0,
            date: None,
            time: None,
            daylight_saving: false,
            utc_offset: 0.0,
            park_allowed: true,
        }
    }
}

/// In-process stand-in for the mount hardware.
#[derive(Debug)]
pub struct Simulator {
    state: SimState,
    input: Buffer,
    output: VecDeque<u8>,
    // what to go back to when a slew or home move is stopped
    resume: Option<SystemStatus>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_state(SimState::default())
    }

    pub fn with_state(state: SimState) -> Self {
        Self {
            state,
            input: Buffer::new(),
            output: VecDeque::new(),
            resume: None,
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    /// Feed command bytes to the mount. Any number of commands, or a
    /// partial command, may be passed in one call. Replies are queued and
    /// can be collected with [`take_output`](Self::take_output).
    pub fn receive_data(&mut self, data: &[u8]) {
        self.input.write(data);
        while !self.input.is_empty() {
            let (consumed, token) = parse_command(self.input.as_ref());
            if consumed == 0 {
                break;
            }
            match token {
                CommandToken::Command(command) => {
                    let reply = self.handle(&command);
                    self.output.extend(reply);
                }
                CommandToken::Unknown => warn!(
                    "Simulator ignoring unknown command {:?}",
                    String::from_utf8_lossy(&self.input.as_ref()[..consumed])
                ),
                CommandToken::NeedData => {}
            }
            self.input.consume(consumed);
        }
    }

    /// Remove and return all queued reply bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.output.drain(..).collect()
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Apply a command to the simulated state and build the mount's reply.
    /// Commands the mount doesn't answer give an empty reply.
    pub fn handle(&mut self, command: &Command) -> Vec<u8> {
        use Command::*;

        debug!("Simulator executing {}", command.name());
        let state = &mut self.state;
        match *command {
            Handshake => HANDSHAKE_REPLY.to_vec(),
            GetStatus => terminated(&state.status.to_bytes()),
            GetModel => state.model_code.as_bytes().to_vec(),
            GetMainFirmware => {
                firmware_reply(&state.main_board_firmware, &state.controller_firmware)
            }
            GetRaDecFirmware => firmware_reply(&state.ra_firmware, &state.dec_firmware),
            StartMotion(_) => {
                self.start_move(SystemStatus::Slewing);
                Vec::new()
            }
            StopMotion(_) | Abort => {
                self.halt();
                ACK.to_vec()
            }
            FindHome | GotoHome => {
                self.start_move(SystemStatus::Homing);
                ACK.to_vec()
            }
            SetCurrentHome => ACK.to_vec(),
            SetSlewRate(rate) => {
                state.status.slew_rate = rate;
                ACK.to_vec()
            }
            SetTrackMode(rate) => {
                state.status.track_rate = rate;
                ACK.to_vec()
            }
            SetCustomTrackRate(rate) => {
                state.custom_track_rate = rate;
                ACK.to_vec()
            }
            SetGuideRate(rate) => {
                state.guide_rate_percent = (rate * 100.0).round() as u8;
                ACK.to_vec()
            }
            GetGuideRate => terminated(format!("{:03}", state.guide_rate_percent).as_bytes()),
            Park => {
                if state.park_allowed {
                    state.status.system = SystemStatus::Parked;
                    self.resume = None;
                    ACK.to_vec()
                } else {
                    NAK.to_vec()
                }
            }
            Unpark => {
                if state.status.system == SystemStatus::Parked {
                    state.status.system = SystemStatus::Stopped;
                }
                ACK.to_vec()
            }
            SetLongitude(degrees) => {
                state.longitude = degrees;
                ACK.to_vec()
            }
            SetLatitude(degrees) => {
                state.latitude = degrees;
                state.status.hemisphere = if degrees >= 0.0 {
                    Hemisphere::North
                } else {
                    Hemisphere::South
                };
                ACK.to_vec()
            }
            SetLocalDate(date) => {
                state.date = Some(date);
                ACK.to_vec()
            }
            SetLocalTime(time) => {
                state.time = Some(time);
                ACK.to_vec()
            }
            SetDaylightSaving(enabled) => {
                state.daylight_saving = enabled;
                ACK.to_vec()
            }
            SetUtcOffset(hours) => {
                state.utc_offset = hours;
                ACK.to_vec()
            }
        }
    }

    fn start_move(&mut self, moving: SystemStatus) {
        let system = &mut self.state.status.system;
        if self.resume.is_none() {
            self.resume = Some(match *system {
                SystemStatus::Tracking => SystemStatus::Tracking,
                _ => SystemStatus::Stopped,
            });
        }
        *system = moving;
    }

    fn halt(&mut self) {
        if let Some(resume) = self.resume.take() {
            self.state.status.system = resume;
        }
    }
}

fn terminated(payload: &[u8]) -> Vec<u8> {
    let mut reply = Vec::with_capacity(payload.len() + 1);
    reply.extend_from_slice(payload);
    reply.push(TERMINATOR);
    reply
}

fn firmware_reply(first: &str, second: &str) -> Vec<u8> {
    let mut reply = first.as_bytes().to_vec();
    reply.extend_from_slice(second.as_bytes());
    reply.push(TERMINATOR);
    reply
}

impl Transport for Simulator {
    /// Unread reply bytes from an earlier command are discarded.
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.output.clear();
        self.receive_data(data);
        Ok(())
    }

    fn recv_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Ok(self.output.pop_front())
    }
}
