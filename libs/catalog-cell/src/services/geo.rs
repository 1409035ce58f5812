use crate::models::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 50.0;

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn is_valid_coordinate(point: GeoPoint) -> bool {
    (-90.0..=90.0).contains(&point.lat) && (-180.0..=180.0).contains(&point.lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_trivandrum_and_kochi() {
        let trivandrum = GeoPoint { lat: 8.5241, lng: 76.9366 };
        let kochi = GeoPoint { lat: 9.9312, lng: 76.2673 };

        let km = haversine_km(trivandrum, kochi);
        assert!((km - 173.0).abs() < 3.0, "got {}", km);
        assert_eq!(haversine_km(kochi, kochi), 0.0);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(is_valid_coordinate(GeoPoint { lat: 8.5, lng: 76.9 }));
        assert!(!is_valid_coordinate(GeoPoint { lat: 91.0, lng: 0.0 }));
        assert!(!is_valid_coordinate(GeoPoint { lat: 0.0, lng: -181.0 }));
    }
}
