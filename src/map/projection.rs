use std::f64::consts::PI;

use crate::geo::Coordinate;

/// Zoom bounds. 1.0 shows the whole world across the canvas width.
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 100.0;

/// Zoom applied when programmatically focusing a region: a generous span so
/// the region and its neighbors stay visible (~24 degrees of longitude).
pub const FOCUS_ZOOM: f64 = 15.0;

/// Visible map area and zoom level, in dot (sub-cell) coordinates.
#[derive(Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85, Mercator-safe)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas dot width
    pub width: usize,
    /// Canvas dot height
    pub height: usize,
}

/// Normalized Web-Mercator position of a lon/lat pair, both axes in [0, 1].
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Inverse of `mercator`.
fn unmercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        let mut vp = Self {
            center_lon,
            center_lat,
            zoom: MIN_ZOOM,
            width,
            height,
        };
        vp.set_zoom(zoom);
        vp
    }

    /// A view of the whole world, biased slightly north where most land is.
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Clamp into the valid range; non-finite input (a rendering surface
    /// can feed NaN during resize) falls back to the minimum rather than
    /// poisoning the projection math.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MIN_ZOOM
        };
    }

    /// Pan by a dot delta.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * 1.5);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / 1.5);
    }

    /// Zoom in keeping the geographic point under the given dot fixed.
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out keeping the geographic point under the given dot fixed.
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.set_zoom(self.zoom * factor);

        // Pan so the anchor point lands back under the cursor.
        let (new_px, new_py) = self.project_lonlat(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Jump the view to a coordinate at the given zoom.
    pub fn recenter(&mut self, target: Coordinate, zoom: f64) {
        self.center_lon = target.longitude.clamp(-180.0, 180.0);
        self.center_lat = target.latitude.clamp(-85.0, 85.0);
        self.set_zoom(zoom);
    }

    /// Project lon/lat to dot coordinates.
    pub fn project_lonlat(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = mercator(lon, lat);
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let scale = self.zoom * self.width as f64;

        let px = ((x - cx) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - cy) * scale + self.height as f64 / 2.0) as i32;
        (px, py)
    }

    pub fn project(&self, point: Coordinate) -> (i32, i32) {
        self.project_lonlat(point.longitude, point.latitude)
    }

    /// Dot coordinates back to (lon, lat).
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let scale = self.zoom * self.width as f64;

        let x = (px as f64 - self.width as f64 / 2.0) / scale + cx;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + cy;
        unmercator(x, y)
    }

    /// Whether a projected dot is (nearly) inside the viewport. The margin
    /// keeps markers alive while their center is just off-screen.
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Rough bounding-box visibility check for a line segment.
    pub fn segment_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
