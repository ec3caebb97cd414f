use log::debug;

use crate::map::annotation::RegionAnnotation;
use crate::map::tiers::{country_tier, province_tier, Tier};
use crate::region::{RegionSnapshot, StatKind};

/// Decides which marker tier is on the map for the current zoom, keeping
/// updates change-minimal so zoom jitter does not make markers flicker.
pub struct TierSelector {
    countries: Vec<RegionAnnotation>,
    provinces: Vec<RegionAnnotation>,
    displayed: Vec<RegionAnnotation>,
    active: Tier,
}

impl TierSelector {
    pub fn new() -> Self {
        Self {
            countries: Vec::new(),
            provinces: Vec::new(),
            displayed: Vec::new(),
            active: Tier::Countries,
        }
    }

    /// Markers that should be on the map right now.
    pub fn annotations(&self) -> &[RegionAnnotation] {
        &self.displayed
    }

    pub fn active_tier(&self) -> Tier {
        self.active
    }

    pub fn is_displayed(&self, key: &str) -> bool {
        self.displayed.iter().any(|a| a.region.key() == key)
    }

    /// Zoom event. Returns true when the displayed markers were torn down
    /// and replaced; repeated events at the same zoom are no-ops.
    ///
    /// Change detection compares marker counts, not sets. The two tiers are
    /// built from disjoint region populations of different sizes, so equal
    /// counts mean "nothing to do" in practice; see DESIGN.md before
    /// tightening this.
    pub fn on_zoom_changed(&mut self, zoom: f64) -> bool {
        let desired = Tier::from_zoom(zoom);
        let want = match desired {
            Tier::Countries => &self.countries,
            Tier::Provinces => &self.provinces,
        };

        if want.len() == self.displayed.len() {
            return false;
        }

        debug!(
            "tier switch: {} -> {} ({} markers)",
            self.active.label(),
            desired.label(),
            want.len()
        );
        self.displayed = want.clone();
        self.active = desired;
        true
    }

    /// Full data refresh. Rebuilds both tiers and unconditionally replaces
    /// the displayed set, because the underlying statistics may have
    /// changed even when the marker count did not.
    pub fn on_refresh(&mut self, snapshot: &RegionSnapshot, kind: StatKind, zoom: f64) {
        self.provinces = province_tier(snapshot, kind);
        self.countries = country_tier(snapshot, kind);

        let desired = Tier::from_zoom(zoom);
        self.displayed = match desired {
            Tier::Countries => self.countries.clone(),
            Tier::Provinces => self.provinces.clone(),
        };
        self.active = desired;

        debug!(
            "refresh: {} countries, {} provinces, showing {}",
            self.countries.len(),
            self.provinces.len(),
            self.active.label()
        );
    }
}

impl Default for TierSelector {
    fn default() -> Self {
        Self::new()
    }
}
