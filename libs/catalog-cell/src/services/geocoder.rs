use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::{CatalogError, GeoPoint, GeocodedPlace};

const USER_AGENT: &str = "Akshaya-Seva/1.0";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Free-text address lookup against a Nominatim-compatible search API,
/// restricted to India.
/// Based on: https://nominatim.org/release-docs/latest/api/Search/
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.geocoder_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /search
    pub async fn locate(&self, address: &str) -> Result<GeocodedPlace, CatalogError> {
        debug!("Geocoding '{}'", address);

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", address), ("limit", "1"), ("countrycodes", "in")])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!("Geocoder request failed: {}", e);
                CatalogError::Geocoder(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Geocoder returned {}: {}", status, body);
            return Err(CatalogError::Geocoder(format!("upstream returned {}", status)));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| CatalogError::Geocoder(format!("unreadable response: {}", e)))?;

        let Some(place) = places.into_iter().next() else {
            warn!("No geocoding match for '{}'", address);
            return Err(CatalogError::LocationNotFound);
        };

        to_place(place)
    }
}

fn to_place(place: NominatimPlace) -> Result<GeocodedPlace, CatalogError> {
    let parse = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| CatalogError::Geocoder(format!("bad coordinate '{}'", value)))
    };

    Ok(GeocodedPlace {
        location: GeoPoint {
            lat: parse(&place.lat)?,
            lng: parse(&place.lon)?,
        },
        display_name: place.display_name,
    })
}
