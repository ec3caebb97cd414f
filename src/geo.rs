use thiserror::Error;

/// Errors from coordinate aggregation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeoError {
    /// Aggregating zero points is undefined; callers must guarantee at
    /// least one point rather than rely on a sentinel result.
    #[error("cannot aggregate an empty set of coordinates")]
    EmptyInput,
}

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const ZERO: Coordinate = Coordinate {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Euclidean distance in degree space. A cheap proxy good enough for
    /// choosing marker placement; not a geodesic measurement.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        (self.latitude - other.latitude).hypot(self.longitude - other.longitude)
    }

    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Truncate both axes to 3 decimal places (~100m).
    fn milli_key(&self) -> (i64, i64) {
        (
            (self.latitude * 1000.0) as i64,
            (self.longitude * 1000.0) as i64,
        )
    }
}

/// Two coordinates are equal iff they agree after truncation to 3 decimal
/// degrees. Used to collapse near-identical points, not for distance math.
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.milli_key() == other.milli_key()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Arithmetic mean of a non-empty set of points.
pub fn center(points: &[Coordinate]) -> Result<Coordinate, GeoError> {
    if points.is_empty() {
        return Err(GeoError::EmptyInput);
    }

    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));

    let n = points.len() as f64;
    Ok(Coordinate::new(lat_sum / n, lon_sum / n))
}

/// The input point closest to the arithmetic mean. Unlike the mean itself,
/// the result is always a real sample location, so a marker derived from it
/// can never land in open water between an archipelago's islands.
///
/// Ties resolve to the earliest point in input order.
pub fn medoid(points: &[Coordinate]) -> Result<Coordinate, GeoError> {
    let target = center(points)?;

    let mut best = points[0];
    let mut best_distance = target.distance(&best);
    for p in &points[1..] {
        let d = target.distance(p);
        if d < best_distance {
            best = *p;
            best_distance = d;
        }
    }

    Ok(best)
}

/// Drop points that duplicate an earlier one at 3-decimal precision,
/// preserving first-occurrence order.
pub fn dedup(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(points.len());
    for p in points {
        if !out.contains(p) {
            out.push(*p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_is_mean() {
        let points = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 10.0)];
        let c = center(&points).unwrap();
        assert_relative_eq!(c.latitude, 0.0);
        assert_relative_eq!(c.longitude, 5.0);
    }

    #[test]
    fn test_center_empty_fails() {
        assert!(matches!(center(&[]), Err(GeoError::EmptyInput)));
    }

    #[test]
    fn test_medoid_is_input_element() {
        let points = [
            Coordinate::new(10.0, 10.0),
            Coordinate::new(12.0, 11.0),
            Coordinate::new(50.0, 50.0),
        ];
        let m = medoid(&points).unwrap();
        assert!(points
            .iter()
            .any(|p| p.latitude == m.latitude && p.longitude == m.longitude));
    }

    #[test]
    fn test_medoid_tie_breaks_to_first() {
        // Both points are exactly 5.0 degrees from the mean (0, 5).
        let points = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 10.0)];
        let m = medoid(&points).unwrap();
        assert_relative_eq!(m.longitude, 0.0);
    }

    #[test]
    fn test_medoid_minimizes_distance_to_center() {
        let points = [
            Coordinate::new(3.0, -7.0),
            Coordinate::new(41.0, 2.5),
            Coordinate::new(40.0, 3.0),
            Coordinate::new(-12.0, 88.0),
        ];
        let c = center(&points).unwrap();
        let m = medoid(&points).unwrap();
        for p in &points {
            assert!(c.distance(&m) <= c.distance(p));
        }
    }

    #[test]
    fn test_medoid_empty_fails() {
        assert!(matches!(medoid(&[]), Err(GeoError::EmptyInput)));
    }

    #[test]
    fn test_equality_truncates_to_three_decimals() {
        assert_eq!(Coordinate::new(1.0004, 2.0), Coordinate::new(1.0009, 2.0));
        assert_ne!(Coordinate::new(1.01, 2.0), Coordinate::new(1.0009, 2.0));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let points = [
            Coordinate::new(1.0001, 2.0),
            Coordinate::new(1.0002, 2.0),
            Coordinate::new(3.0, 4.0),
        ];
        let unique = dedup(&points);
        assert_eq!(unique.len(), 2);
        assert_relative_eq!(unique[0].latitude, 1.0001);
    }
}
