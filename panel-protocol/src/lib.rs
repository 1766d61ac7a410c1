//! ASCII line codec for the bridge ↔ autopilot panel serial protocol.
//!
//! Every message is a single line. The PC sends two kinds of line:
//! ```text
//! <handshakepc;END;>
//! <DATA;ap;yd;hdg;apr;nav;alt;vs;altitude;heading;altimeter;fuel%;windDir;
//!       windVel;flaps%;hdgBug;altBug;vsBug;status;END;>
//! ```
//! (shown wrapped; on the wire it is one line with exactly 18 payload fields).
//!
//! The panel answers with bare words: `handshakearduino`, `READY`, or one of
//! the command literals in [`ControlKind`]. Panel lines end in `\r\n`; the
//! transport splits on `\n` and [`decode_line`] strips the trailing `\r`.
//!
//! Fields are numeric or fixed tokens, so no escaping is defined.

use std::fmt::Write as _;

use panel_schema::TelemetrySnapshot;

/// Line the PC sends once after opening the port.
pub const HANDSHAKE_PC: &str = "<handshakepc;END;>";
/// Panel reply to [`HANDSHAKE_PC`].
pub const HANDSHAKE_DEVICE: &str = "handshakearduino";
/// Panel acknowledgement of a telemetry line.
pub const READY: &str = "READY";

/// Number of `;`-separated fields between `<DATA;` and `;END;>`.
pub const PAYLOAD_FIELDS: usize = 18;

const DATA_PREFIX: &str = "<DATA;";
const DATA_SUFFIX: &str = "END;>";

// ── ControlKind ───────────────────────────────────────────────────────────────

/// A button or knob action reported by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    AutopilotToggle,
    YawDamperToggle,
    HeadingHoldToggle,
    ApproachHoldToggle,
    NavHoldToggle,
    AltitudeHoldToggle,
    VerticalSpeedHoldToggle,
    AltimeterUp,
    AltimeterDown,
    HeadingLeft,
    HeadingRight,
    AltitudeUp,
    AltitudeDown,
    VerticalSpeedUp,
    VerticalSpeedDown,
    SyncHeading,
    SyncAltitude,
}

impl ControlKind {
    pub const ALL: [ControlKind; 17] = [
        Self::AutopilotToggle,
        Self::YawDamperToggle,
        Self::HeadingHoldToggle,
        Self::ApproachHoldToggle,
        Self::NavHoldToggle,
        Self::AltitudeHoldToggle,
        Self::VerticalSpeedHoldToggle,
        Self::AltimeterUp,
        Self::AltimeterDown,
        Self::HeadingLeft,
        Self::HeadingRight,
        Self::AltitudeUp,
        Self::AltitudeDown,
        Self::VerticalSpeedUp,
        Self::VerticalSpeedDown,
        Self::SyncHeading,
        Self::SyncAltitude,
    ];

    /// The literal the panel firmware prints for this action.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::AutopilotToggle         => "set_autopilot_onoff",
            Self::YawDamperToggle         => "set_yawdamp_onoff",
            Self::HeadingHoldToggle       => "set_heading_onoff",
            Self::ApproachHoldToggle      => "set_approach_onoff",
            Self::NavHoldToggle           => "set_nav_onoff",
            Self::AltitudeHoldToggle      => "set_altitude_onoff",
            Self::VerticalSpeedHoldToggle => "set_vs_onoff",
            Self::AltimeterUp             => "set_altimeter_up",
            Self::AltimeterDown           => "set_altimeter_down",
            Self::HeadingLeft             => "set_heading_left",
            Self::HeadingRight            => "set_heading_right",
            Self::AltitudeUp              => "set_altitude_up",
            Self::AltitudeDown            => "set_altitude_down",
            Self::VerticalSpeedUp         => "set_vertical_up",
            Self::VerticalSpeedDown       => "set_vertical_down",
            Self::SyncHeading             => "sync_heading",
            Self::SyncAltitude            => "sync_altitude",
        }
    }

    fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == s)
    }
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ── InboundCommand ────────────────────────────────────────────────────────────

/// A decoded panel → PC line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    Handshake,
    Ready,
    ControlEvent(ControlKind),
    /// Anything unrecognised; callers drop it.
    Unknown,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode one line received from the panel.
///
/// Never fails: unrecognised input maps to [`InboundCommand::Unknown`].
pub fn decode_line(line: &str) -> InboundCommand {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    match line {
        HANDSHAKE_DEVICE => InboundCommand::Handshake,
        READY => InboundCommand::Ready,
        other => ControlKind::from_wire(other)
            .map_or(InboundCommand::Unknown, InboundCommand::ControlEvent),
    }
}

/// Encode a [`TelemetrySnapshot`] into a `<DATA;...;END;>` line (no terminator).
pub fn encode_telemetry(s: &TelemetrySnapshot) -> String {
    let mut line = String::with_capacity(96);
    line.push_str(DATA_PREFIX);

    // Mode flags
    for flag in [
        s.autopilot_master,
        s.yaw_damper,
        s.heading_hold,
        s.approach_hold,
        s.nav_hold,
        s.altitude_hold,
        s.vertical_speed_hold,
    ] {
        push_field(&mut line, u8::from(flag));
    }

    // Instruments
    push_field(&mut line, s.altitude_whole_ft());
    push_field(&mut line, s.heading_whole_deg());
    push_field(&mut line, two_decimals(s.altimeter_inhg));
    push_field(&mut line, round_int(s.fuel_percent()));
    push_field(&mut line, round_int(s.wind_direction_deg));
    push_field(&mut line, round_int(s.wind_velocity_kt));
    push_field(&mut line, round_int(s.flaps_percent()));

    // Autopilot bugs
    push_field(&mut line, round_int(s.heading_bug_deg));
    push_field(&mut line, round_int(s.altitude_bug_ft));
    push_field(&mut line, round_int(s.vertical_speed_bug_fpm));

    push_field(&mut line, status_code(s));
    line.push_str(DATA_SUFFIX);
    line
}

/// Fixed-width summary of the engaged autopilot modes, e.g. `AP--HDG---------`.
///
/// Altitude hold wins over vertical-speed hold for the last slot.
pub fn status_code(s: &TelemetrySnapshot) -> String {
    let mut code = String::with_capacity(16);
    code.push_str(if s.autopilot_master { "AP" } else { "--" });
    code.push_str(if s.yaw_damper { "YD" } else { "--" });
    code.push_str(if s.heading_hold { "HDG" } else { "---" });
    code.push_str(if s.approach_hold { "APR" } else { "---" });
    code.push_str(if s.nav_hold { "NAV" } else { "---" });
    code.push_str(if s.altitude_hold {
        "ALT"
    } else if s.vertical_speed_hold {
        "VS-"
    } else {
        "---"
    });
    code
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn push_field(line: &mut String, value: impl std::fmt::Display) {
    // Writing to a String cannot fail.
    let _ = write!(line, "{value};");
}

fn round_int(v: f64) -> i64 {
    if v.is_finite() { v.round() as i64 } else { 0 }
}

/// Fixed two decimals (`30.00`); the panel firmware parses this as readily as
/// the shorter `30` or `29.9`.
fn two_decimals(v: f64) -> String {
    let cents = round_int(v * 100.0);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
