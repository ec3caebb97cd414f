use std::sync::Arc;

use log::debug;

use crate::geo::Coordinate;
use crate::map::annotation::RegionAnnotation;
use crate::region::Region;

/// Keeps the detail panel in sync with the map selection and handles
/// programmatic "jump to region" requests.
///
/// The panel is never empty: with nothing selected it shows the worldwide
/// aggregate, and deselection always falls back there rather than to a
/// stale previous selection.
pub struct SelectionCoordinator {
    worldwide: Arc<Region>,
    selected: Option<Arc<Region>>,
    pending_focus: Option<Arc<Region>>,
}

impl SelectionCoordinator {
    pub fn new(worldwide: Arc<Region>) -> Self {
        Self {
            worldwide,
            selected: None,
            pending_focus: None,
        }
    }

    /// Region whose report the detail panel shows right now.
    pub fn detail_region(&self) -> &Arc<Region> {
        self.selected.as_ref().unwrap_or(&self.worldwide)
    }

    pub fn selected(&self) -> Option<&Arc<Region>> {
        self.selected.as_ref()
    }

    pub fn on_marker_selected(&mut self, region: Arc<Region>) {
        debug!("selected {}", region.key());
        self.selected = Some(region);
    }

    pub fn on_marker_deselected(&mut self) {
        self.selected = None;
    }

    /// Start a programmatic focus. Returns the camera target; the selection
    /// itself is deferred until the host reports the viewport settled via
    /// `finish_focus`, because a marker cannot be reliably selected while
    /// it is still moving into place.
    pub fn begin_focus(&mut self, region: Arc<Region>) -> Coordinate {
        let target = region.location;
        debug!("focus {} at {}", region.key(), target);
        self.pending_focus = Some(region);
        target
    }

    /// The viewport finished moving: select the pending region iff its
    /// marker is currently displayed, otherwise drop the request.
    pub fn finish_focus(&mut self, displayed: &[RegionAnnotation]) -> Option<Arc<Region>> {
        let region = self.pending_focus.take()?;
        if displayed.iter().any(|a| a.region.key() == region.key()) {
            self.selected = Some(region.clone());
            Some(region)
        } else {
            debug!("focus target {} not displayed, skipping select", region.key());
            None
        }
    }

    /// The snapshot was replaced: drop every reference into the old set so
    /// the panel cannot show stale data.
    pub fn on_refresh(&mut self, worldwide: Arc<Region>) {
        self.worldwide = worldwide;
        self.selected = None;
        self.pending_focus = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{RegionKind, Report, Statistic, StatKind};
    use chrono::Utc;

    fn region(name: &str, confirmed: u64) -> Arc<Region> {
        Arc::new(Region {
            name: name.to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::new(40.0, -3.0),
            report: Some(Report::new(Utc::now(), Statistic::new(confirmed, 0, 0))),
        })
    }

    fn region_without_report(name: &str) -> Arc<Region> {
        Arc::new(Region {
            name: name.to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::ZERO,
            report: None,
        })
    }

    #[test]
    fn test_defaults_to_worldwide() {
        let coordinator = SelectionCoordinator::new(region("Worldwide", 1000));
        assert_eq!(coordinator.detail_region().name, "Worldwide");
    }

    #[test]
    fn test_deselect_falls_back_to_worldwide_not_previous() {
        let mut coordinator = SelectionCoordinator::new(region("Worldwide", 1000));
        coordinator.on_marker_selected(region("Spain", 100));
        coordinator.on_marker_selected(region("Italy", 200));
        coordinator.on_marker_deselected();
        assert_eq!(coordinator.detail_region().name, "Worldwide");
    }

    #[test]
    fn test_selecting_region_without_report_still_shows_it() {
        // The panel renders zero counts for it; absence of data is normal.
        let mut coordinator = SelectionCoordinator::new(region("Worldwide", 1000));
        coordinator.on_marker_selected(region_without_report("Quietland"));
        let detail = coordinator.detail_region();
        assert_eq!(detail.name, "Quietland");
        assert_eq!(detail.number(StatKind::Confirmed), 0);
    }

    #[test]
    fn test_finish_focus_selects_only_displayed() {
        let mut coordinator = SelectionCoordinator::new(region("Worldwide", 1000));
        let spain = region("Spain", 100);

        let target = coordinator.begin_focus(spain.clone());
        assert_eq!(target, spain.location);

        // Not displayed: request dropped, selection untouched.
        assert!(coordinator.finish_focus(&[]).is_none());
        assert_eq!(coordinator.detail_region().name, "Worldwide");

        // Displayed: selected.
        coordinator.begin_focus(spain.clone());
        let displayed = [RegionAnnotation::new(spain, StatKind::Confirmed)];
        assert!(coordinator.finish_focus(&displayed).is_some());
        assert_eq!(coordinator.detail_region().name, "Spain");
    }

    #[test]
    fn test_refresh_clears_selection_and_pending() {
        let mut coordinator = SelectionCoordinator::new(region("Worldwide", 1000));
        coordinator.on_marker_selected(region("Spain", 100));
        coordinator.begin_focus(region("Italy", 200));

        coordinator.on_refresh(region("Worldwide", 2000));
        assert_eq!(coordinator.detail_region().name, "Worldwide");
        assert!(coordinator.finish_focus(&[]).is_none());
    }
}
