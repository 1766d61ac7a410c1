//! Panel command → simulator event mapping.

use panel_protocol::ControlKind;

use crate::sim_shim::SimEvent;
use crate::telemetry_cache::TelemetryCache;

/// Where the event parameter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Zero,
    CachedHeading,
    CachedAltitude,
}

/// Static mapping for one panel command.
pub fn lookup(kind: ControlKind) -> (SimEvent, ParamSource) {
    use ControlKind as K;
    use ParamSource::*;
    match kind {
        K::AutopilotToggle         => (SimEvent::ApMaster,            Zero),
        K::YawDamperToggle         => (SimEvent::YawDamperToggle,     Zero),
        K::HeadingHoldToggle       => (SimEvent::ApHdgHold,           Zero),
        K::ApproachHoldToggle      => (SimEvent::ApAprHold,           Zero),
        K::NavHoldToggle           => (SimEvent::ApNav1Hold,          Zero),
        K::AltitudeHoldToggle      => (SimEvent::ApPanelAltitudeHold, Zero),
        K::VerticalSpeedHoldToggle => (SimEvent::ApPanelVsOn,         Zero),
        K::AltimeterUp             => (SimEvent::KohlsmanInc,         Zero),
        K::AltimeterDown           => (SimEvent::KohlsmanDec,         Zero),
        K::HeadingLeft             => (SimEvent::HeadingBugDec,       Zero),
        K::HeadingRight            => (SimEvent::HeadingBugInc,       Zero),
        K::AltitudeUp              => (SimEvent::ApAltVarInc,         Zero),
        K::AltitudeDown            => (SimEvent::ApAltVarDec,         Zero),
        K::VerticalSpeedUp         => (SimEvent::ApVsVarInc,          Zero),
        K::VerticalSpeedDown       => (SimEvent::ApVsVarDec,          Zero),
        K::SyncHeading             => (SimEvent::HeadingBugSet,       CachedHeading),
        K::SyncAltitude            => (SimEvent::ApAltVarSetEnglish,  CachedAltitude),
    }
}

/// Event and concrete parameter for `kind`, reading sync values from `cache`.
///
/// Cached values are passed in the simulator's unsigned event-data form, so a
/// negative altitude arrives as its two's-complement bit pattern.
pub fn resolve(kind: ControlKind, cache: &TelemetryCache) -> (SimEvent, u32) {
    let (event, source) = lookup(kind);
    let param = match source {
        ParamSource::Zero => 0,
        ParamSource::CachedHeading => cache.heading() as u32,
        ParamSource::CachedAltitude => cache.altitude() as u32,
    };
    (event, param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_is_injective() {
        let events: HashSet<SimEvent> = ControlKind::ALL.iter().map(|&k| lookup(k).0).collect();
        assert_eq!(events.len(), ControlKind::ALL.len());
    }

    #[test]
    fn only_sync_commands_read_the_cache() {
        for kind in ControlKind::ALL {
            let (_, source) = lookup(kind);
            match kind {
                ControlKind::SyncHeading => assert_eq!(source, ParamSource::CachedHeading),
                ControlKind::SyncAltitude => assert_eq!(source, ParamSource::CachedAltitude),
                _ => assert_eq!(source, ParamSource::Zero, "{kind}"),
            }
        }
    }

    #[test]
    fn sync_uses_cached_values() {
        let mut cache = TelemetryCache::new();
        cache.update(123, 4500);
        assert_eq!(resolve(ControlKind::SyncHeading, &cache), (SimEvent::HeadingBugSet, 123));
        assert_eq!(resolve(ControlKind::SyncAltitude, &cache), (SimEvent::ApAltVarSetEnglish, 4500));
        assert_eq!(resolve(ControlKind::AutopilotToggle, &cache), (SimEvent::ApMaster, 0));
    }

    #[test]
    fn negative_altitude_wraps() {
        let mut cache = TelemetryCache::new();
        cache.update(0, -1);
        assert_eq!(resolve(ControlKind::SyncAltitude, &cache).1, u32::MAX);
    }
}
