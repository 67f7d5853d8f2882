mod common;

use std::io::{Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::thread;
use std::time::Duration;

use ieqpro_proto::{
    Config, Direction, Error, IeqPro, SimState, Simulator, SlewRate, StreamTransport,
    SystemStatus, TrackRate,
};

use common::sync::{BusInterface, SerialLine};

fn host_main_loop(io: BusInterface) -> Result<HostSummary, Error> {
    let config = Config::default()
        .device_name("chat")
        .debug(true)
        .timeout(Duration::from_secs(1));
    let mut mount = IeqPro::new(StreamTransport::new(io), config);

    mount.check_connection()?;
    let firmware = mount.get_firmware()?;
    assert_eq!(firmware.model, "CEM60");
    assert_eq!(firmware.ra, "140324");

    for _ in 0..3 {
        mount.set_track_mode(TrackRate::Solar)?;
        mount.set_slew_rate(SlewRate::Max)?;
        mount.get_status()?;
    }
    mount.start_motion(Direction::South)?;
    let moving = mount.get_status()?.system;
    mount.stop_motion(Direction::South)?;
    mount.set_guide_rate(0.5)?;

    Ok(HostSummary {
        status_while_moving: moving,
        last_status: *mount.last_status().expect("status was queried"),
        guide_rate: mount.get_guide_rate()?,
    })
}

struct HostSummary {
    status_while_moving: SystemStatus,
    last_status: ieqpro_proto::MountStatus,
    guide_rate: f64,
}

fn mount_main_loop(mut serial: BusInterface, state: SimState) -> Simulator {
    let mut sim = Simulator::with_state(state);
    'main: loop {
        if SHUTDOWN.load(SeqCst) {
            break 'main;
        };

        let mut buf = [0; 1];
        match serial.read(&mut buf) {
            Ok(0) => break 'main,
            Ok(len) => sim.receive_data(&buf[..len]),
            Err(_) => continue,
        }
        if sim.has_output() {
            serial.write_all(&sim.take_output()).unwrap();
        }
    }
    sim
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[test]
fn chat1() {
    common::init_logger();
    SHUTDOWN.store(false, SeqCst);

    let line = SerialLine::new();
    let mut host_if = line.new_host_interface();
    host_if.timeout = Duration::from_millis(20);
    let mount_if = line.new_mount_interface();

    let state = SimState {
        model_code: "0060".to_owned(),
        ..SimState::default()
    };

    let host = thread::spawn(move || host_main_loop(host_if));
    let mount = thread::spawn(move || mount_main_loop(mount_if, state));

    let summary = host
        .join()
        .expect("Join failed")
        .expect("Host returned an error");

    SHUTDOWN.store(true, SeqCst);
    line.disconnect();
    let sim = mount.join().expect("Mount panicked");

    assert_eq!(summary.status_while_moving, SystemStatus::Slewing);
    assert_eq!(summary.last_status.track_rate, TrackRate::Solar);
    assert_eq!(summary.last_status.slew_rate, SlewRate::Max);
    assert!((summary.guide_rate - 0.5).abs() < 1e-9);
    assert_eq!(sim.state().status.system, SystemStatus::Stopped);
    assert_eq!(sim.state().guide_rate_percent, 50);
}
