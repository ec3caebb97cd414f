use crate::braille::BrailleCanvas;
use crate::map::annotation::RegionAnnotation;
use crate::map::projection::Viewport;
use crate::map::tiers::Tier;

/// A geographic polyline (sequence of lon/lat coordinates).
pub type LineString = Vec<(f64, f64)>;

/// Coastline resolution, switched together with the marker tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Low,
    High,
}

impl Detail {
    pub fn from_zoom(zoom: f64) -> Detail {
        match Tier::from_zoom(zoom) {
            Tier::Countries => Detail::Low,
            Tier::Provinces => Detail::High,
        }
    }
}

/// Display points to braille dots; marker radii are specified in points
/// while the canvas is dot-addressed.
const DOTS_PER_POINT: f64 = 0.4;

/// One region marker ready for cell rendering. Positions are character
/// cells relative to the map area; the vertical radius is halved by the
/// UI to compensate for the 1:2 cell aspect.
#[derive(Debug, Clone)]
pub struct Marker {
    pub col: i32,
    pub row: i32,
    /// Horizontal half-extent in cells, >= 1.
    pub radius_cells: i32,
    pub color: (u8, u8, u8),
    pub label: String,
    pub key: String,
    pub selected: bool,
}

impl Marker {
    /// Vertical half-extent; terminal cells are about twice as tall as wide.
    pub fn radius_rows(&self) -> i32 {
        (self.radius_cells / 2).max(1)
    }

    fn contains(&self, col: i32, row: i32) -> bool {
        let nx = (col - self.col) as f64 / self.radius_cells as f64;
        let ny = (row - self.row) as f64 / self.radius_rows() as f64;
        nx * nx + ny * ny <= 1.0
    }
}

/// Everything the UI needs to draw one frame of the map area.
pub struct MapScene {
    pub coastlines: BrailleCanvas,
    /// Sorted large-to-small so small markers draw on top of big ones.
    pub markers: Vec<Marker>,
}

impl MapScene {
    /// Topmost marker covering the given cell, if any.
    pub fn marker_at(&self, col: i32, row: i32) -> Option<&Marker> {
        self.markers.iter().rev().find(|m| m.contains(col, row))
    }
}

/// Renders the coastline background and region markers into a scene.
pub struct MapRenderer {
    coastlines_low: Vec<LineString>,
    coastlines_high: Vec<LineString>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_high: Vec::new(),
        }
    }

    pub fn add_coastline(&mut self, line: LineString, detail: Detail) {
        match detail {
            Detail::Low => self.coastlines_low.push(line),
            Detail::High => self.coastlines_high.push(line),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty() || !self.coastlines_high.is_empty()
    }

    fn coastlines(&self, detail: Detail) -> &[LineString] {
        match detail {
            Detail::High if !self.coastlines_high.is_empty() => &self.coastlines_high,
            _ => &self.coastlines_low,
        }
    }

    /// Build the scene for one frame. `cols`/`rows` are the map area size
    /// in character cells; the viewport is expected to be dot-sized to the
    /// same area (cols * 2 by rows * 4).
    pub fn render(
        &self,
        cols: u16,
        rows: u16,
        viewport: &Viewport,
        annotations: &[RegionAnnotation],
        selected_key: Option<&str>,
    ) -> MapScene {
        let mut canvas = BrailleCanvas::new(cols as usize, rows as usize);

        for line in self.coastlines(Detail::from_zoom(viewport.zoom)) {
            self.draw_linestring(&mut canvas, line, viewport);
        }

        let mut markers: Vec<Marker> = annotations
            .iter()
            .filter_map(|a| self.build_marker(a, viewport, selected_key))
            .collect();
        markers.sort_by(|a, b| b.radius_cells.cmp(&a.radius_cells));

        MapScene {
            coastlines: canvas,
            markers,
        }
    }

    fn build_marker(
        &self,
        annotation: &RegionAnnotation,
        viewport: &Viewport,
        selected_key: Option<&str>,
    ) -> Option<Marker> {
        let (px, py) = viewport.project(annotation.location());
        if !viewport.is_visible(px, py) {
            return None;
        }

        let dots = annotation.radius(viewport.zoom) * DOTS_PER_POINT;
        let key = annotation.region.key();
        Some(Marker {
            col: px / 2,
            row: py / 4,
            radius_cells: (dots / 2.0).round().max(1.0) as i32,
            color: annotation.color().to_u8(),
            label: annotation.label_text(viewport.zoom),
            selected: selected_key == Some(key.as_str()),
            key,
        })
    }

    fn draw_linestring(&self, canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
        if line.len() < 2 {
            return;
        }

        let mut prev: Option<(i32, i32)> = None;
        for &(lon, lat) in line {
            let (px, py) = viewport.project_lonlat(lon, lat);

            if let Some((prev_x, prev_y)) = prev {
                // Skip segments that wrap the antimeridian or are off-screen.
                let length = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
                if length < viewport.width
                    && viewport.segment_might_be_visible((prev_x, prev_y), (px, py))
                {
                    canvas.line(prev_x, prev_y, px, py);
                }
            }

            prev = Some((px, py));
        }
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::region::{Region, RegionKind, Report, StatKind, Statistic};
    use chrono::Utc;
    use std::sync::Arc;

    fn annotation(name: &str, lat: f64, lon: f64, confirmed: u64) -> RegionAnnotation {
        RegionAnnotation::new(
            Arc::new(Region {
                name: name.to_string(),
                kind: RegionKind::Country,
                country: None,
                location: Coordinate::new(lat, lon),
                report: Some(Report::new(Utc::now(), Statistic::new(confirmed, 0, 0))),
            }),
            StatKind::Confirmed,
        )
    }

    fn viewport() -> Viewport {
        // 80x40 cells of map area.
        Viewport::new(0.0, 0.0, 1.0, 160, 160)
    }

    #[test]
    fn test_markers_projected_into_cells() {
        let renderer = MapRenderer::new();
        let annotations = [annotation("Origin", 0.0, 0.0, 100)];
        let scene = renderer.render(80, 40, &viewport(), &annotations, None);

        assert_eq!(scene.markers.len(), 1);
        let marker = &scene.markers[0];
        assert_eq!(marker.col, 40);
        assert_eq!(marker.row, 20);
        assert!(marker.radius_cells >= 1);
    }

    #[test]
    fn test_offscreen_markers_are_culled() {
        let mut vp = viewport();
        vp.set_zoom(20.0);
        vp.center_lon = -120.0;
        vp.center_lat = 40.0;

        let renderer = MapRenderer::new();
        let annotations = [annotation("Far", -35.0, 150.0, 100)];
        let scene = renderer.render(80, 40, &vp, &annotations, None);
        assert!(scene.markers.is_empty());
    }

    #[test]
    fn test_hit_test_finds_topmost_marker() {
        let renderer = MapRenderer::new();
        let mut vp = viewport();
        vp.set_zoom(8.0);
        // Same spot, very different counts: the small marker sits on top.
        let annotations = [
            annotation("Big", 0.0, 0.0, 1_000_000),
            annotation("Small", 0.0, 0.0, 1),
        ];
        let scene = renderer.render(80, 40, &vp, &annotations, None);

        let hit = scene.marker_at(40, 20).unwrap();
        assert_eq!(hit.key, "Small");
        assert!(scene.marker_at(0, 0).is_none());
    }

    #[test]
    fn test_selected_key_marks_marker() {
        let renderer = MapRenderer::new();
        let annotations = [annotation("Origin", 0.0, 0.0, 100)];
        let scene = renderer.render(80, 40, &viewport(), &annotations, Some("Origin"));
        assert!(scene.markers[0].selected);
    }

    #[test]
    fn test_detail_follows_tier_threshold() {
        assert_eq!(Detail::from_zoom(1.0), Detail::Low);
        assert_eq!(Detail::from_zoom(4.0), Detail::Low);
        assert_eq!(Detail::from_zoom(4.5), Detail::High);
    }
}
