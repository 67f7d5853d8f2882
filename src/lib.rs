//! Protocol driver for iOptron iEQ Pro and CEM60 equatorial mounts.
//!
//! The mount is controlled with short ASCII commands such as `:GAS#` over a
//! serial line, and answers with fixed-size replies. This crate provides:
//!
//! * [`Command`]: every supported command with its exact on-wire encoding,
//! * [`reply`]: decoders for the mount's replies,
//! * [`IeqPro`]: a blocking driver with one method per mount operation,
//!   running over any [`Transport`],
//! * [`Simulator`]: a simulated mount speaking the same protocol, used by
//!   the driver when simulation is enabled.
//!
//! # Example
//!
//! ```no_run
//! use ieqpro_proto::{Config, Direction, IeqPro, StreamTransport};
//! # fn open_serial_port() -> std::io::Result<std::net::TcpStream> {
//! #     std::net::TcpStream::connect("127.0.0.1:4030") }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = open_serial_port()?; // 9600 8N1
//! let mut mount = IeqPro::new(StreamTransport::new(port), Config::default());
//! mount.check_connection()?;
//! println!("{}", mount.get_status()?);
//!
//! mount.start_motion(Direction::North)?;
//! mount.stop_motion(Direction::North)?;
//! # Ok(()) }
//! ```

mod buffer;
pub mod client;
pub mod command;
pub mod config;
mod nom_parser;
pub mod simulator;
pub mod transport;
pub mod types;

pub use client::{Error, ErrorKind, IeqPro};
pub use command::{Command, ReplyShape};
pub use config::Config;
pub use nom_parser::reply;
pub use nom_parser::reply::Error as DecodeError;
pub use simulator::{SimState, Simulator};
pub use transport::{Offline, StreamTransport, Transport};
pub use types::{
    Axis, Direction, FirmwareInfo, GpsStatus, Hemisphere, LocalDate, LocalTime, MountStatus,
    SlewRate, SystemStatus, TimeSource, TrackRate, WireDigit,
};
