//! Geographic coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A location fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine distance to `other`, in metres.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let sin_dlat_2 = (dlat / 2.0).sin();
        let sin_dlon_2 = (dlon / 2.0).sin();
        let a = sin_dlat_2.mul_add(
            sin_dlat_2,
            lat1.cos() * lat2.cos() * sin_dlon_2 * sin_dlon_2,
        );

        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Returns the point `metres` due north of this one.
    #[must_use]
    pub fn north_by(&self, metres: f64) -> Self {
        Self {
            lat: self.lat + (metres / EARTH_RADIUS_M).to_degrees(),
            lon: self.lon,
        }
    }
}

/// Axis-aligned lat/lon bounds of a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BoundingBox {
    /// Bounds of every coordinate in `points`, or `None` when empty.
    pub fn around<'a>(points: impl IntoIterator<Item = &'a Coordinate>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self { min: *p, max: *p },
                Some(b) => Self {
                    min: Coordinate::new(b.min.lat.min(p.lat), b.min.lon.min(p.lon)),
                    max: Coordinate::new(b.max.lat.max(p.lat), b.max.lon.max(p.lon)),
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coordinate::new(52.52, 13.405);
        assert!(p.distance_to(&p).abs() < 1e-9);
    }

    #[test]
    fn test_north_offset_round_trips_through_haversine() {
        let origin = Coordinate::new(48.137, 11.575);
        let moved = origin.north_by(8.0);
        assert!((origin.distance_to(&moved) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);
        // 2πR / 360
        assert!((a.distance_to(&b) - 111_194.93).abs() < 0.1);
    }

    #[test]
    fn test_bounding_box_of_empty_set_is_none() {
        let empty: [Coordinate; 0] = [];
        assert!(BoundingBox::around(&empty).is_none());
    }

    #[test]
    fn test_bounding_box_spans_all_points() {
        let points = [
            Coordinate::new(1.0, 5.0),
            Coordinate::new(-2.0, 7.0),
            Coordinate::new(0.5, 4.0),
        ];
        let bounds = BoundingBox::around(&points).unwrap();
        assert_eq!(bounds.min, Coordinate::new(-2.0, 4.0));
        assert_eq!(bounds.max, Coordinate::new(1.0, 7.0));
    }
}
