use serde_json::Value;

pub const EARTH_RADIUS_MILES: f64 = 3963.0;
pub const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

/// Spherical cap around a centre point, radius expressed in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    pub latitude: f64,
    pub longitude: f64,
    pub radians: f64,
}

impl GeoRadius {
    pub fn new(latitude: f64, longitude: f64, distance: f64, unit: DistanceUnit) -> Self {
        Self { latitude, longitude, radians: distance / unit.earth_radius() }
    }

    /// Great-circle angle between the centre and (lat, lng), in radians
    pub fn central_angle(&self, latitude: f64, longitude: f64) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    /// `value` is a GeoJSON coordinate pair `[lng, lat]`.
    pub fn contains_point(&self, value: &Value) -> bool {
        let Some(pair) = value.as_array() else { return false };
        match (pair.first().and_then(Value::as_f64), pair.get(1).and_then(Value::as_f64)) {
            (Some(lng), Some(lat)) => self.central_angle(lat, lng) <= self.radians,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn radius_is_distance_over_earth_radius() {
        let r = GeoRadius::new(42.35, -71.06, 3963.0, DistanceUnit::Miles);
        assert!((r.radians - 1.0).abs() < f64::EPSILON);
        let r = GeoRadius::new(42.35, -71.06, 63.78, DistanceUnit::Kilometers);
        assert!((r.radians - 0.01).abs() < 1e-12);
    }

    #[test]
    fn contains_nearby_point_and_rejects_far_point() {
        // Boston centre, 10 miles
        let r = GeoRadius::new(42.3601, -71.0589, 10.0, DistanceUnit::Miles);
        // Cambridge, ~3 miles away
        assert!(r.contains_point(&json!([-71.1097, 42.3736])));
        // New York, ~190 miles away
        assert!(!r.contains_point(&json!([-74.0060, 40.7128])));
        assert!(!r.contains_point(&json!("not coordinates")));
    }
}
