mod common;

use common::mock_mount;
use ieqpro_proto::{
    Direction, ErrorKind, GpsStatus, Hemisphere, LocalDate, LocalTime, SlewRate, SystemStatus,
    TimeSource, TrackRate,
};

#[test]
fn setter_command_bytes() {
    common::init_logger();
    let (serial, mut mount) = mock_mount(b"1111111111");

    mount.set_slew_rate(SlewRate::X16).unwrap();
    mount.set_guide_rate(0.45).unwrap();
    mount.set_utc_offset(-5.5).unwrap();
    mount.set_latitude(-33.87).unwrap();
    mount.set_longitude(151.21).unwrap();
    mount
        .set_local_date(LocalDate {
            year: 15,
            month: 3,
            day: 24,
        })
        .unwrap();
    mount
        .set_local_time(LocalTime {
            hour: 1,
            minute: 2,
            second: 3,
        })
        .unwrap();
    mount.set_daylight_saving(true).unwrap();
    mount.set_custom_track_rate(-1.0027).unwrap();
    mount.set_current_home().unwrap();

    assert_eq!(
        serial.borrow().tx(),
        &b":SR4#:RG045#:SG-330#:St-33.87#:Sg+151.21#:SC150324#:SL010203#:SDS1#:RR-01.0027#:SZP#"[..]
    );
    assert!(serial.borrow().unread().is_empty());
}

#[test]
fn motion_commands() {
    let (serial, mut mount) = mock_mount(b"111");

    // no reply is read after starting a move
    mount.start_motion(Direction::North).unwrap();
    assert_eq!(serial.borrow().unread(), b"111");
    mount.stop_motion(Direction::South).unwrap();
    mount.start_motion(Direction::East).unwrap();
    mount.stop_motion(Direction::West).unwrap();
    mount.abort().unwrap();

    assert_eq!(serial.borrow().tx(), b":mn#:qD#:me#:qR#:Q#");
}

#[test]
fn king_rate_shares_custom_digit() {
    // documents existing behavior: King is sent with the Custom digit
    let (serial, mut mount) = mock_mount(b"11");
    mount.set_track_mode(TrackRate::King).unwrap();
    mount.set_track_mode(TrackRate::Custom).unwrap();
    assert_eq!(serial.borrow().tx(), b":RT4#:RT4#");
}

#[test]
fn status_query() {
    let (serial, mut mount) = mock_mount(b"311531#");
    assert!(mount.last_status().is_none());

    let status = mount.get_status().unwrap();
    assert_eq!(serial.borrow().tx(), b":GAS#");
    assert_eq!(status.gps, GpsStatus::Locked);
    assert_eq!(status.system, SystemStatus::Tracking);
    assert_eq!(status.track_rate, TrackRate::Lunar);
    assert_eq!(status.slew_rate, SlewRate::X64);
    assert_eq!(status.time_source, TimeSource::Gps);
    assert_eq!(status.hemisphere, Hemisphere::North);
    assert_eq!(mount.last_status(), Some(&status));
}

#[test]
fn status_errors() {
    // short
    let (_, mut mount) = mock_mount(b"31153#");
    assert_eq!(mount.get_status().unwrap_err().kind(), ErrorKind::Framing);

    // long
    let (_, mut mount) = mock_mount(b"3115311#");
    assert_eq!(mount.get_status().unwrap_err().kind(), ErrorKind::Framing);

    // right length, no terminator
    let (_, mut mount) = mock_mount(b"3115311");
    assert_eq!(
        mount.get_status().unwrap_err().kind(),
        ErrorKind::ProtocolViolation
    );

    // system status 9 doesn't exist
    let (_, mut mount) = mock_mount(b"391531#");
    assert_eq!(
        mount.get_status().unwrap_err().kind(),
        ErrorKind::ProtocolViolation
    );

    // slew rate 0 is below the one-based range
    let (_, mut mount) = mock_mount(b"311031#");
    assert_eq!(
        mount.get_status().unwrap_err().kind(),
        ErrorKind::ProtocolViolation
    );
    assert!(mount.last_status().is_none());
}

#[test]
fn model_lookup() {
    let (serial, mut mount) = mock_mount(b"00611234");
    assert_eq!(mount.get_model().unwrap(), "CEM60-EC");
    assert_eq!(mount.get_model().unwrap(), "Unknown");
    assert_eq!(serial.borrow().tx(), b":MountInfo#:MountInfo#");

    let (_, mut mount) = mock_mount(b"00");
    assert_eq!(mount.get_model().unwrap_err().kind(), ErrorKind::Framing);
}

#[test]
fn firmware_sequence() {
    let (serial, mut mount) = mock_mount(b"0045150324150101#140324140101#");
    let info = mount.get_firmware().unwrap();
    assert_eq!(serial.borrow().tx(), b":MountInfo#:FW1#:FW2#");
    assert_eq!(info.model, "iEQ45 Pro");
    assert_eq!(info.main_board, "150324");
    assert_eq!(info.controller, "150101");
    assert_eq!(info.ra, "140324");
    assert_eq!(info.dec, "140101");
}

#[test]
fn firmware_sequence_stops_at_first_failure() {
    let (serial, mut mount) = mock_mount(b"004615032415#140324140101#");
    let err = mount.get_firmware().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Framing);
    assert_eq!(serial.borrow().tx(), b":MountInfo#:FW1#");
}

#[test]
fn park_replies() {
    let (serial, mut mount) = mock_mount(b"10");
    mount.park().unwrap();
    let err = mount.park().unwrap_err();
    assert!(err.is_park_rejected());
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_eq!(serial.borrow().tx(), b":MP1#:MP1#");
}

#[test]
fn rejected_ack() {
    let (_, mut mount) = mock_mount(b"0");
    let err = mount.unpark().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(!err.is_park_rejected());
}

#[test]
fn guide_rate() {
    let (serial, mut mount) = mock_mount(b"045#");
    assert!((mount.get_guide_rate().unwrap() - 0.45).abs() < 1e-9);
    assert_eq!(serial.borrow().tx(), b":AG#");
}

#[test]
fn invalid_input_is_not_sent() {
    let (serial, mut mount) = mock_mount(b"1");
    let err = mount.set_latitude(91.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputContract);
    assert!("up".parse::<Direction>().is_err());
    assert_eq!(serial.borrow().writes(), 0);
}

#[test]
fn probe_succeeds_on_first_attempt() {
    let (serial, mut mount) = mock_mount(b"V1.00#");
    mount.check_connection().unwrap();
    assert_eq!(serial.borrow().writes(), 1);
    assert_eq!(serial.borrow().tx(), b":V#");
}

#[test]
fn probe_retries_once() {
    let (serial, mut mount) = mock_mount(b"V2.00#V1.00#");
    mount.check_connection().unwrap();
    assert_eq!(serial.borrow().writes(), 2);
}

#[test]
fn probe_gives_up_after_two_attempts() {
    let (serial, mut mount) = mock_mount(b"");
    let err = mount.check_connection().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(serial.borrow().writes(), 2);
    assert_eq!(serial.borrow().tx(), b":V#:V#");
}

#[test]
fn transport_errors() {
    let (serial, mut mount) = mock_mount(b"1");
    serial.borrow_mut().trigger_write_error();
    assert_eq!(mount.abort().unwrap_err().kind(), ErrorKind::Transport);

    serial.borrow_mut().trigger_read_error();
    assert_eq!(mount.abort().unwrap_err().kind(), ErrorKind::Transport);

    // the reply is still there for the next command
    mount.abort().unwrap();

    // nothing left to read
    assert_eq!(mount.goto_home().unwrap_err().kind(), ErrorKind::Transport);
}
