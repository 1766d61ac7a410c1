//! End-to-end run of the controller loop over the public API.

use std::io::Cursor;
use std::sync::mpsc;

use panel_bridge::{
    spawn_json_lines_source, BridgeConfig, BridgeController, BridgeEvent, LinkId, RecordingLink,
    RecordingSink, SimEvent, HANDSHAKE_PC,
};

const FEED: &str = r#"{"autopilot_master":true,"heading_hold":true,"true_heading_rad":1.5708,"indicated_altitude_ft":3500.4,"altimeter_inhg":29.92,"fuel_quantity_gal":40.0,"fuel_capacity_gal":80.0,"wind_direction_deg":270.0,"wind_velocity_kt":10.0,"flaps_fraction":0.5}
{"true_heading_rad":2.0,"indicated_altitude_ft":3600.0}
{"true_heading_rad":2.1502,"indicated_altitude_ft":3700.0}
"#;

#[test]
fn handshake_then_telemetry_then_sync() {
    let link = RecordingLink::new();
    let sim = RecordingSink::new();
    let ctl = BridgeController::new(Box::new(sim.clone()), BridgeConfig::default());
    let (tx, rx) = mpsc::channel();

    tx.send(BridgeEvent::Connect { link: LinkId(1), sink: Box::new(link.clone()) }).unwrap();
    tx.send(BridgeEvent::HardwareLine { link: LinkId(1), line: "handshakearduino\r\n".into() }).unwrap();

    // Three frames land while the first is unacknowledged.
    spawn_json_lines_source(Cursor::new(FEED), tx.clone(), None)
        .unwrap()
        .join()
        .unwrap();

    tx.send(BridgeEvent::HardwareLine { link: LinkId(1), line: "READY\r\n".into() }).unwrap();
    tx.send(BridgeEvent::HardwareLine { link: LinkId(1), line: "sync_heading\r\n".into() }).unwrap();
    tx.send(BridgeEvent::HardwareLine { link: LinkId(1), line: "sync_altitude\r\n".into() }).unwrap();
    tx.send(BridgeEvent::Shutdown).unwrap();

    let totals = ctl.run(rx);

    let lines = link.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], HANDSHAKE_PC);
    assert_eq!(
        lines[1],
        "<DATA;1;0;1;0;0;0;0;3500;90;29.92;50;270;10;50;0;0;0;AP--HDG---------;END;>"
    );

    // 2.1502 rad = 123.198..°
    assert_eq!(
        sim.events(),
        vec![(SimEvent::HeadingBugSet, 123), (SimEvent::ApAltVarSetEnglish, 3700)]
    );

    assert_eq!(totals.snapshots_received, 3);
    assert_eq!(totals.snapshots_dropped, 2);
    assert_eq!(totals.messages_sent, 2);
    assert_eq!(totals.lines_received, 4);
}
