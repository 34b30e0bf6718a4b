use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::GeocoderConfig;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoder is not configured (GEOCODER_API_KEY missing)")]
    NotConfigured,
    #[error("Invalid geocoder URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A resolved address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    /// GeoJSON point document stored on a bootcamp as `location`
    pub fn to_point(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
            "formatted_address": self.formatted_address,
            "street": self.street,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
            "country": self.country,
        })
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the address resolves to nothing
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError>;
}

/// MapQuest geocoding API client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    street: Option<String>,
    admin_area5: Option<String>,
    admin_area3: Option<String>,
    postal_code: Option<String>,
    admin_area1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestLocation {
    fn into_location(self) -> GeoLocation {
        let formatted_address = [&self.street, &self.admin_area5, &self.admin_area3, &self.postal_code, &self.admin_area1]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        GeoLocation {
            latitude: self.lat_lng.lat,
            longitude: self.lat_lng.lng,
            formatted_address,
            street: self.street,
            city: self.admin_area5,
            state: self.admin_area3,
            zipcode: self.postal_code,
            country: self.admin_area1,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        let key = self.api_key.as_deref().ok_or(GeocodeError::NotConfigured)?;
        let url = url::Url::parse_with_params(&self.url, &[("key", key), ("location", address)])?;
        debug!("geocoding '{}'", address);

        let response: MapQuestResponse = self.client.get(url).send().await?.error_for_status()?.json().await?;
        Ok(response
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(MapQuestLocation::into_location))
    }
}

/// Fixed lookup table keyed by address fragment (usually a zipcode). An
/// address resolves to the first entry whose key it contains.
#[derive(Default, Clone)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, location: GeoLocation) -> Self {
        self.entries.insert(key.into(), location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        if let Some(location) = self.entries.get(address) {
            return Ok(Some(location.clone()));
        }
        Ok(self
            .entries
            .iter()
            .find(|(key, _)| address.contains(key.as_str()))
            .map(|(_, location)| location.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boston() -> GeoLocation {
        GeoLocation {
            latitude: 42.350846,
            longitude: -71.105793,
            formatted_address: "233 Bay State Rd, Boston, MA 02215-1405, US".into(),
            street: Some("233 Bay State Rd".into()),
            city: Some("Boston".into()),
            state: Some("MA".into()),
            zipcode: Some("02215-1405".into()),
            country: Some("US".into()),
        }
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let geocoder = StaticGeocoder::new().with("02215", boston());
        assert_eq!(geocoder.geocode("02215").await.unwrap(), Some(boston()));
        assert_eq!(geocoder.geocode("233 Bay State Rd Boston MA 02215").await.unwrap(), Some(boston()));
        assert_eq!(geocoder.geocode("90210").await.unwrap(), None);
    }

    #[test]
    fn test_point_is_lng_lat() {
        let point = boston().to_point();
        assert_eq!(point["type"], "Point");
        assert_eq!(point["coordinates"], json!([-71.105793, 42.350846]));
        assert_eq!(point["city"], "Boston");
    }

    #[test]
    fn test_mapquest_payload() {
        let payload = json!({
            "results": [{
                "locations": [{
                    "latLng": {"lat": 42.35, "lng": -71.1},
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "postalCode": "02215",
                    "adminArea1": "US"
                }]
            }]
        });
        let response: MapQuestResponse = serde_json::from_value(payload).unwrap();
        let location = response.results.into_iter().flat_map(|r| r.locations).next().unwrap().into_location();
        assert_eq!(location.latitude, 42.35);
        assert_eq!(location.formatted_address, "233 Bay State Rd, Boston, MA, 02215, US");
    }

    #[tokio::test]
    async fn test_mapquest_without_key() {
        let config = GeocoderConfig { url: "http://localhost/geocode".into(), api_key: None };
        let geocoder = MapQuestGeocoder::new(&config).unwrap();
        assert!(matches!(geocoder.geocode("02215").await, Err(GeocodeError::NotConfigured)));
    }
}
