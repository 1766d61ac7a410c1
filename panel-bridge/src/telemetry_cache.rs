/// Last observed heading and altitude, used to answer `sync_*` requests.
///
/// Both read zero until the first snapshot arrives, so an early sync moves
/// the bug to 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryCache {
    heading_deg: i32,
    altitude_ft: i32,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, heading_deg: i32, altitude_ft: i32) {
        self.heading_deg = heading_deg;
        self.altitude_ft = altitude_ft;
    }

    pub fn heading(&self) -> i32 {
        self.heading_deg
    }

    pub fn altitude(&self) -> i32 {
        self.altitude_ft
    }
}
