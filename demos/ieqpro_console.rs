use anyhow::{Context, Result};
use std::io::Write;
use std::iter::Peekable;
use std::str::{FromStr, SplitWhitespace};
use std::sync::mpsc;

use ieqpro_proto::transport::Transport;
use ieqpro_proto::{
    Config, Direction, IeqPro, LocalDate, LocalTime, Offline, SlewRate, StreamTransport, TrackRate,
};

type Mount = IeqPro<Box<dyn Transport>>;

fn cmd_status(mount: &mut Mount) -> Result<()> {
    println!("{}", mount.get_status()?);
    Ok(())
}

fn cmd_info(mount: &mut Mount) -> Result<()> {
    let info = mount.get_firmware()?;
    println!("Model:      {}", info.model);
    println!("Main board: {}", info.main_board);
    println!("Controller: {}", info.controller);
    println!("RA:         {}", info.ra);
    println!("DEC:        {}", info.dec);
    Ok(())
}

fn cmd_poll(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    let delay = std::time::Duration::from_secs_f32(args.parse_next()?);

    println!("Press enter to stop polling.");
    // check that the first read is ok before starting the poll stop thread
    println!("{}", mount.get_status()?);
    let (io_tx, io_rx) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        let _ch = io_tx;
        let mut buf = String::new();
        let _ = std::io::stdin().read_line(&mut buf);
    });
    loop {
        if io_rx.recv_timeout(delay) == Err(mpsc::RecvTimeoutError::Disconnected) {
            break;
        }
        println!("{}", mount.get_status()?);
    }
    Ok(())
}

fn cmd_move(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    mount.start_motion(args.parse_next::<Direction>()?)?;
    Ok(())
}

fn cmd_stop(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    mount.stop_motion(args.parse_next::<Direction>()?)?;
    Ok(())
}

fn cmd_rate(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    match args.next()? {
        "slew" => mount.set_slew_rate(args.parse_next::<SlewRate>()?)?,
        "track" => mount.set_track_mode(args.parse_next::<TrackRate>()?)?,
        "custom" => mount.set_custom_track_rate(args.parse_next()?)?,
        "guide" => match args.peek() {
            Some(_) => mount.set_guide_rate(args.parse_next()?)?,
            None => println!("{:.2}", mount.get_guide_rate()?),
        },
        other => println!("Unknown rate {}", other),
    }
    Ok(())
}

fn cmd_site(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    mount.set_latitude(args.parse_next()?)?;
    mount.set_longitude(args.parse_next()?)?;
    Ok(())
}

fn cmd_time(args: &mut CmdScanner, mount: &mut Mount) -> Result<()> {
    let date = LocalDate {
        year: args.parse_next()?,
        month: args.parse_next()?,
        day: args.parse_next()?,
    };
    let time = LocalTime {
        hour: args.parse_next()?,
        minute: args.parse_next()?,
        second: args.parse_next()?,
    };
    mount.set_local_date(date)?;
    mount.set_local_time(time)?;
    if args.peek().is_some() {
        mount.set_utc_offset(args.parse_next()?)?;
    }
    if args.peek().is_some() {
        mount.set_daylight_saving(args.parse_next::<u8>()? != 0)?;
    }
    Ok(())
}

fn cmd_toggle(args: &mut CmdScanner) -> Result<bool> {
    match args.next()? {
        "on" | "1" => Ok(true),
        "off" | "0" => Ok(false),
        other => anyhow::bail!("Expected on or off, got {}", other),
    }
}

fn open_mount(port: &str) -> Result<Mount> {
    if port == "sim" {
        let io: Box<dyn Transport> = Box::new(Offline);
        return Ok(IeqPro::new(io, Config::default().simulation(true)));
    }
    let serial = serialport::new(port, 9600)
        .timeout(std::time::Duration::from_millis(100))
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;
    let io: Box<dyn Transport> = Box::new(StreamTransport::new(serial));
    Ok(IeqPro::new(io, Config::default()))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let mut mount = open_mount(&port)?;
    mount.check_connection()?;

    let mut stdout = std::io::stdout();
    let mut cmd = String::new();
    loop {
        print!(">> ");
        stdout.flush()?;
        let mut scan = CmdScanner::read_stdin(&mut cmd)?;
        if let Err(err) = match scan.next() {
            Err(_) => continue,
            Ok("status") | Ok("s") => cmd_status(&mut mount),
            Ok("info") => cmd_info(&mut mount),
            Ok("poll") => cmd_poll(&mut scan, &mut mount),
            Ok("move") | Ok("m") => cmd_move(&mut scan, &mut mount),
            Ok("stop") => cmd_stop(&mut scan, &mut mount),
            Ok("rate") => cmd_rate(&mut scan, &mut mount),
            Ok("site") => cmd_site(&mut scan, &mut mount),
            Ok("time") => cmd_time(&mut scan, &mut mount),
            Ok("home") => mount.goto_home().map_err(Into::into),
            Ok("findhome") => mount.find_home().map_err(Into::into),
            Ok("sethome") => mount.set_current_home().map_err(Into::into),
            Ok("park") => mount.park().map_err(Into::into),
            Ok("unpark") => mount.unpark().map_err(Into::into),
            Ok("abort") | Ok("q") => mount.abort().map_err(Into::into),
            Ok("sim") => cmd_toggle(&mut scan).map(|on| mount.set_simulation(on)),
            Ok("debug") => cmd_toggle(&mut scan).map(|on| mount.set_debug(on)),
            Ok("quit") | Ok("exit") => break,
            Ok(cmd) => {
                println!("Unknown command {}", cmd);
                continue;
            }
        } {
            println!("{:?}", err)
        }
    }
    Ok(())
}

struct CmdScanner<'a> {
    splt: Peekable<SplitWhitespace<'a>>,
}

impl<'a> CmdScanner<'a> {
    fn read_stdin(buf: &'a mut String) -> Result<Self> {
        buf.clear();
        if std::io::stdin().read_line(buf)? == 0 {
            buf.push_str("quit");
        }
        let splt = buf.split_whitespace().peekable();
        Ok(Self { splt })
    }
    fn next(&mut self) -> Result<&'a str> {
        self.splt.next().context("End of stream")
    }
    fn peek(&mut self) -> Option<&&'a str> {
        self.splt.peek()
    }
    fn parse_next<T: FromStr>(&mut self) -> Result<T> {
        self.next()?.parse::<T>().ok().context("Parse error")
    }
}
