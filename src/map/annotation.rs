use std::sync::Arc;

use crate::geo::Coordinate;
use crate::map::projection::{MAX_ZOOM, MIN_ZOOM};
use crate::region::{Region, StatKind};

/// Marker radius at a count of zero, in display points.
pub const BASE_RADIUS: f64 = 10.0;

/// Radius floor; anything smaller is unreadable and unclickable.
pub const MIN_RADIUS: f64 = 4.0;

/// Zoom threshold past which the map switches to province markers and
/// starts printing count labels.
pub const CITY_ZOOM: f64 = 4.0;

/// Clamp a zoom value coming from the rendering surface. Negative or NaN
/// input degrades to the minimum zoom instead of propagating.
pub fn sanitize_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        MIN_ZOOM
    }
}

/// Color channels in [0, 1]. The engine stays independent of any terminal
/// or pixel color type; the UI converts at the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Semantic marker colors for the non-magnitude kinds.
    pub const ORANGE: Rgb = Rgb { r: 1.0, g: 0.584, b: 0.0 };
    pub const GREEN: Rgb = Rgb { r: 0.204, g: 0.780, b: 0.349 };
    pub const RED: Rgb = Rgb { r: 1.0, g: 0.231, b: 0.188 };

    pub fn to_u8(self) -> (u8, u8, u8) {
        (
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }
}

/// Marker radius for a count at a zoom level. Counts span several orders of
/// magnitude, so the count contributes logarithmically; the zoom factor
/// makes markers grow as the map scale increases instead of staying
/// pixel-locked. The factor bottoms out at zero so a bigger count never
/// yields a smaller marker, and the result never drops below `MIN_RADIUS`.
pub fn radius(count: u64, zoom: f64) -> f64 {
    let growth = (sanitize_zoom(zoom) - 2.2).max(0.0);
    (BASE_RADIUS + (1.0 + count as f64).ln() * growth).max(MIN_RADIUS)
}

/// Marker color. Active/recovered/deaths use fixed semantic colors; the
/// confirmed kind encodes magnitude as a gradient running from pale yellow
/// at low counts to deep red at high counts. Monotonic: a higher count is
/// never paler.
pub fn color(kind: StatKind, count: u64) -> Rgb {
    match kind {
        StatKind::Active => Rgb::ORANGE,
        StatKind::Recovered => Rgb::GREEN,
        StatKind::Deaths => Rgb::RED,
        StatKind::Confirmed => {
            let level = (count as f64 + 10.0).log10() * 2.0;
            let brightness = ((255.0 - level * 40.0) / 255.0).clamp(0.0, 1.0);
            let saturation = if brightness > 0.0 {
                1.0
            } else {
                ((255.0 - (level * 40.0 - 255.0)) / 255.0).clamp(0.0, 1.0)
            };
            Rgb {
                r: saturation,
                g: brightness,
                b: brightness * 0.4,
            }
        }
    }
}

/// Count label shown next to a marker, digit-grouped. Hidden below the
/// city zoom threshold where labels would be unreadable clutter.
pub fn label_text(count: u64, zoom: f64) -> String {
    if sanitize_zoom(zoom) > CITY_ZOOM {
        group_digits(count)
    } else {
        String::new()
    }
}

/// 1234567 -> "1,234,567".
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A displayable marker: one region bound to the statistic kind it encodes.
/// Ephemeral; rebuilt whenever the region snapshot or the kind changes.
#[derive(Debug, Clone)]
pub struct RegionAnnotation {
    pub region: Arc<Region>,
    pub kind: StatKind,
}

impl RegionAnnotation {
    pub fn new(region: Arc<Region>, kind: StatKind) -> Self {
        Self { region, kind }
    }

    pub fn count(&self) -> u64 {
        self.region.number(self.kind)
    }

    pub fn location(&self) -> Coordinate {
        self.region.location
    }

    pub fn radius(&self, zoom: f64) -> f64 {
        radius(self.count(), zoom)
    }

    pub fn color(&self) -> Rgb {
        color(self.kind, self.count())
    }

    pub fn label_text(&self, zoom: f64) -> String {
        label_text(self.count(), zoom)
    }
}

/// Identity is the wrapped region alone; two annotations for the same
/// region in different display kinds are the same marker.
impl PartialEq for RegionAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.region.key() == other.region.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{RegionKind, Report, Statistic};
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn region_with(confirmed: u64) -> Arc<Region> {
        Arc::new(Region {
            name: "Testland".to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::new(10.0, 20.0),
            report: Some(Report::new(Utc::now(), Statistic::new(confirmed, 0, 0))),
        })
    }

    #[test]
    fn test_radius_non_decreasing_in_count() {
        for zoom in [0.5, 1.0, 4.0, 8.0, 20.0] {
            let mut last = 0.0;
            for count in [0, 1, 10, 1_000, 1_000_000] {
                let r = radius(count, zoom);
                assert!(r >= last, "radius shrank at count {} zoom {}", count, zoom);
                last = r;
            }
        }
    }

    #[test]
    fn test_radius_non_decreasing_in_zoom() {
        let mut last = 0.0;
        for zoom in [0.5, 1.0, 2.2, 3.0, 4.0, 8.0, 16.0] {
            let r = radius(5_000, zoom);
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn test_radius_has_floor() {
        assert!(radius(0, 0.5) >= MIN_RADIUS);
        assert!(radius(0, f64::NAN) >= MIN_RADIUS);
        assert!(radius(u64::MAX, -5.0) >= MIN_RADIUS);
    }

    #[test]
    fn test_radius_matches_formula_above_threshold() {
        let r = radius(99, 5.0);
        assert_relative_eq!(r, 10.0 + 100.0_f64.ln() * 2.8, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_colors_per_kind() {
        assert_eq!(color(StatKind::Active, 123), Rgb::ORANGE);
        assert_eq!(color(StatKind::Recovered, 123), Rgb::GREEN);
        assert_eq!(color(StatKind::Deaths, 123), Rgb::RED);
    }

    #[test]
    fn test_confirmed_brightness_darkens_with_count() {
        let mut last = f64::INFINITY;
        for count in [0, 10, 100, 10_000, 1_000_000, 100_000_000] {
            let c = color(StatKind::Confirmed, count);
            assert!(c.g <= last, "brightness rose at count {}", count);
            last = c.g;
        }
    }

    #[test]
    fn test_confirmed_low_count_is_pale() {
        let c = color(StatKind::Confirmed, 1);
        assert!(c.g > 0.5);
        assert_relative_eq!(c.r, 1.0);
    }

    #[test]
    fn test_label_hidden_at_city_zoom_and_below() {
        assert_eq!(label_text(1234, 4.0), "");
        assert_eq!(label_text(1234, 2.0), "");
        assert_eq!(label_text(1234, 4.1), "1,234");
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(1_234_567), "1,234,567");
    }

    #[test]
    fn test_equality_ignores_kind() {
        let region = region_with(5);
        let a = RegionAnnotation::new(region.clone(), StatKind::Confirmed);
        let b = RegionAnnotation::new(region, StatKind::Deaths);
        assert_eq!(a, b);
    }

    #[test]
    fn test_count_without_report_is_zero() {
        let region = Arc::new(Region {
            name: "Quiet".to_string(),
            kind: RegionKind::Country,
            country: None,
            location: Coordinate::ZERO,
            report: None,
        });
        let a = RegionAnnotation::new(region, StatKind::Confirmed);
        assert_eq!(a.count(), 0);
    }
}
