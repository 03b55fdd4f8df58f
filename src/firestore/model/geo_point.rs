/// Latitude/longitude pair as carried by `geoPointValue`.
///
/// Construction does not range-check: values read from the wire or from an
/// edited file are carried through unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_coordinates_are_kept() {
        let point = GeoPoint::new(100.0, -200.0);
        assert_eq!(point.latitude(), 100.0);
        assert_eq!(point.longitude(), -200.0);
    }
}
