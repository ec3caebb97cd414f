use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use log::{info, warn};

use crate::data;
use crate::geo::Coordinate;
use crate::map::projection::FOCUS_ZOOM;
use crate::map::{MapRenderer, MapScene, SelectionCoordinator, TierSelector, Viewport};
use crate::region::{Region, RegionSnapshot, StatKind};

/// Animated recenter of the viewport. Selecting a marker before the camera
/// stops moving is unreliable, so the selection is performed by the caller
/// when `step` reports completion, not on a timer.
struct CameraFlight {
    from: (f64, f64, f64),
    to: (f64, f64, f64),
    frame: u32,
    frames: u32,
}

impl CameraFlight {
    fn new(viewport: &Viewport, target: Coordinate, zoom: f64) -> Self {
        Self {
            from: (viewport.center_lon, viewport.center_lat, viewport.zoom),
            to: (
                target.longitude.clamp(-180.0, 180.0),
                target.latitude.clamp(-85.0, 85.0),
                zoom,
            ),
            frame: 0,
            frames: 45,
        }
    }

    /// Advance one frame; returns true when the flight has settled.
    fn step(&mut self, viewport: &mut Viewport) -> bool {
        self.frame += 1;
        let t = (self.frame as f64 / self.frames as f64).min(1.0);
        let eased = t * t * (3.0 - 2.0 * t);

        viewport.center_lon = self.from.0 + (self.to.0 - self.from.0) * eased;
        viewport.center_lat = self.from.1 + (self.to.1 - self.from.1) * eased;
        // Interpolate zoom in log space so the speed feels uniform.
        let zoom = (self.from.2.ln() + (self.to.2.ln() - self.from.2.ln()) * eased).exp();
        viewport.set_zoom(zoom);

        self.frame >= self.frames
    }
}

/// Application state: the viewport, the current region snapshot and the
/// annotation machinery, plus the in-flight camera move and refresh task.
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub snapshot: RegionSnapshot,
    pub selector: TierSelector,
    pub selection: SelectionCoordinator,
    pub stat_kind: StatKind,
    pub show_percents: bool,
    pub should_quit: bool,
    pub last_mouse: Option<(u16, u16)>,
    camera: Option<CameraFlight>,
    refresh_rx: Option<Receiver<Result<RegionSnapshot>>>,
    snapshot_path: Option<PathBuf>,
}

impl App {
    pub fn new(snapshot: RegionSnapshot, snapshot_path: Option<PathBuf>) -> Self {
        let viewport = Viewport::world(2, 4);
        let selection = SelectionCoordinator::new(snapshot.worldwide().clone());
        let mut app = Self {
            viewport,
            map_renderer: MapRenderer::new(),
            snapshot: RegionSnapshot::empty(),
            selector: TierSelector::new(),
            selection,
            stat_kind: StatKind::Confirmed,
            show_percents: false,
            should_quit: false,
            last_mouse: None,
            camera: None,
            refresh_rx: None,
            snapshot_path,
        };
        app.apply_snapshot(snapshot);
        app
    }

    /// Swap in a freshly built snapshot: both tiers are rebuilt, the
    /// displayed markers are reset for the current zoom, and the selection
    /// falls back to the worldwide aggregate.
    fn apply_snapshot(&mut self, snapshot: RegionSnapshot) {
        self.selector
            .on_refresh(&snapshot, self.stat_kind, self.viewport.zoom);
        self.selection.on_refresh(snapshot.worldwide().clone());
        self.snapshot = snapshot;
    }

    /// Size the viewport in dots for a map area of `cols` x `rows` cells.
    pub fn sync_viewport(&mut self, cols: u16, rows: u16) {
        self.viewport.width = cols as usize * 2;
        self.viewport.height = rows as usize * 4;
    }

    pub fn build_scene(&self, cols: u16, rows: u16) -> MapScene {
        let selected = self.selection.selected().map(|r| r.key());
        self.map_renderer.render(
            cols,
            rows,
            &self.viewport,
            self.selector.annotations(),
            selected.as_deref(),
        )
    }

    /// Markers that should be displayed right now.
    pub fn current_annotations(&self) -> &[crate::map::RegionAnnotation] {
        self.selector.annotations()
    }

    /// Run the tier state machine against the current zoom, and drop the
    /// selection if its marker just left the map.
    pub fn on_zoom_changed(&mut self) {
        let replaced = self.selector.on_zoom_changed(self.viewport.zoom);
        if replaced {
            if let Some(selected) = self.selection.selected() {
                if !self.selector.is_displayed(&selected.key()) {
                    self.selection.on_marker_deselected();
                }
            }
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.camera = None;
        self.viewport.pan(dx, dy);
        self.on_zoom_changed();
    }

    pub fn zoom_in(&mut self) {
        self.camera = None;
        self.viewport.zoom_in();
        self.on_zoom_changed();
    }

    pub fn zoom_out(&mut self) {
        self.camera = None;
        self.viewport.zoom_out();
        self.on_zoom_changed();
    }

    /// Zoom towards a map-area cell position.
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        self.camera = None;
        self.viewport.zoom_in_at(col as i32 * 2, row as i32 * 4);
        self.on_zoom_changed();
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        self.camera = None;
        self.viewport.zoom_out_at(col as i32 * 2, row as i32 * 4);
        self.on_zoom_changed();
    }

    pub fn reset_view(&mut self) {
        self.camera = None;
        self.viewport = Viewport::world(self.viewport.width, self.viewport.height);
        self.on_zoom_changed();
    }

    /// A marker was clicked.
    pub fn on_marker_selected(&mut self, key: &str) {
        let region = self
            .selector
            .annotations()
            .iter()
            .find(|a| a.region.key() == key)
            .map(|a| Arc::clone(&a.region));
        if let Some(region) = region {
            self.selection.on_marker_selected(region);
        }
    }

    /// The map background was clicked or the selection dismissed.
    pub fn on_marker_deselected(&mut self) {
        self.selection.on_marker_deselected();
    }

    /// Cycle the statistic the markers encode. The displayed set is rebuilt
    /// like a refresh; the selection survives because the regions do.
    pub fn cycle_stat_kind(&mut self) {
        self.stat_kind = self.stat_kind.next();
        self.selector
            .on_refresh(&self.snapshot, self.stat_kind, self.viewport.zoom);
    }

    /// Recenter on a region with a generous span and select its marker once
    /// the camera settles.
    pub fn focus(&mut self, region: Arc<Region>) {
        let target = self.selection.begin_focus(region);
        self.camera = Some(CameraFlight::new(&self.viewport, target, FOCUS_ZOOM));
    }

    /// Focus the selected region, or the worst-hit country when nothing is
    /// selected.
    pub fn focus_hotspot(&mut self) {
        let region = self
            .selection
            .selected()
            .cloned()
            .or_else(|| self.snapshot.hottest(self.stat_kind).cloned());
        if let Some(region) = region {
            self.focus(region);
        }
    }

    /// Reload the snapshot on a background thread; the result is consumed
    /// by `tick` on the UI loop.
    pub fn request_refresh(&mut self) {
        if self.refresh_rx.is_some() {
            return; // one refresh in flight is enough
        }
        let Some(path) = self.snapshot_path.clone() else {
            info!("no snapshot path configured, nothing to refresh");
            return;
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(data::load_snapshot(&path));
        });
        self.refresh_rx = Some(rx);
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_rx.is_some()
    }

    /// Per-frame housekeeping: advance the camera flight and consume a
    /// finished refresh, both on the UI loop.
    pub fn tick(&mut self) {
        if let Some(camera) = &mut self.camera {
            let settled = camera.step(&mut self.viewport);
            self.on_zoom_changed();
            if settled {
                self.camera = None;
                self.selection.finish_focus(self.selector.annotations());
            }
        }

        let outcome = match &self.refresh_rx {
            Some(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    Some(Err(anyhow::anyhow!("refresh worker dropped")))
                }
            },
            None => None,
        };

        if let Some(result) = outcome {
            self.refresh_rx = None;
            match result {
                Ok(snapshot) => {
                    info!("refresh complete: {} regions", snapshot.regions().len());
                    self.apply_snapshot(snapshot);
                }
                // Keep showing the old snapshot; failure and "no new data"
                // look the same from here.
                Err(err) => warn!("refresh failed: {:#}", err),
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
