use std::sync::Arc;

use crate::map::annotation::{sanitize_zoom, RegionAnnotation, CITY_ZOOM};
use crate::region::{RegionKind, RegionSnapshot, StatKind};

/// Marker granularity: national markers when zoomed out, sub-national
/// when zoomed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Countries,
    Provinces,
}

impl Tier {
    /// Select tier from zoom. The boundary is exclusive: exactly at the
    /// city zoom level the map still shows countries.
    pub fn from_zoom(zoom: f64) -> Tier {
        if sanitize_zoom(zoom) > CITY_ZOOM {
            Tier::Provinces
        } else {
            Tier::Countries
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Countries => "countries",
            Tier::Provinces => "provinces",
        }
    }
}

/// Annotations for every province with at least one confirmed case.
/// Zero-count regions are skipped; they add noise without information.
pub fn province_tier(snapshot: &RegionSnapshot, kind: StatKind) -> Vec<RegionAnnotation> {
    tier_of(snapshot, RegionKind::Province, kind)
}

/// Annotations for every country with at least one confirmed case.
pub fn country_tier(snapshot: &RegionSnapshot, kind: StatKind) -> Vec<RegionAnnotation> {
    tier_of(snapshot, RegionKind::Country, kind)
}

fn tier_of(
    snapshot: &RegionSnapshot,
    region_kind: RegionKind,
    kind: StatKind,
) -> Vec<RegionAnnotation> {
    snapshot
        .of_kind(region_kind)
        .filter(|r| r.number(StatKind::Confirmed) > 0)
        .map(|r| RegionAnnotation::new(Arc::clone(r), kind))
        .collect()
}
