//! Reverse geocoding: coordinates to postal address components

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::Fetch;

const USER_AGENT: &str = concat!("civic-connect/", env!("CARGO_PKG_VERSION"));

/// Address fields the report form is filled from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// Neighbourhood or suburb, used for grouping on the heatmap
    pub area: Option<String>,
    /// Municipal ward or city district
    pub ward: Option<String>,
    /// Provider's one-line rendering, when it has one
    pub formatted: Option<String>,
}

impl AddressComponents {
    /// One-line address: the provider's rendering, else the non-empty parts joined
    pub fn display_address(&self) -> Option<String> {
        if let Some(formatted) = self.formatted.as_deref().filter(|s| !s.trim().is_empty()) {
            return Some(formatted.to_string());
        }
        let parts: Vec<&str> = [&self.street, &self.area, &self.city, &self.region, &self.postal_code]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Converts coordinates into address components
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents>;
}

/// Reverse geocoder using a Nominatim-compatible `/reverse` endpoint
pub struct NominatimGeocoder {
    url: String,
    client: Client,
    timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

impl From<NominatimResponse> for AddressComponents {
    fn from(response: NominatimResponse) -> Self {
        let a = response.address;
        let street = match (a.house_number, a.road) {
            (Some(number), Some(road)) => Some(format!("{} {}", number, road)),
            (None, road) => road,
            (Some(number), None) => Some(number),
        };
        AddressComponents {
            street,
            city: a.city.or(a.town).or(a.village),
            region: a.state,
            postal_code: a.postcode,
            country: a.country,
            area: a.suburb.or(a.neighbourhood),
            ward: a.city_district,
            formatted: response.display_name,
        }
    }
}

impl NominatimGeocoder {
    pub fn new(url: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            timeout: None,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents> {
        let url = format!("{}/reverse", self.url);
        debug!("Reverse geocoding {},{}", latitude, longitude);

        let response = Fetch::get(&self.client, &url)
            .header("User-Agent", USER_AGENT)
            .query_param("format", "jsonv2")
            .query_param("lat", &latitude.to_string())
            .query_param("lon", &longitude.to_string())
            .timeout(self.timeout)
            .execute::<NominatimResponse>()
            .await
            .map_err(|e| Error::geocode(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(Error::geocode(error));
        }
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn display_address_joins_parts() {
        let address = AddressComponents {
            street: Some("12 MG Road".into()),
            city: Some("Bengaluru".into()),
            region: Some("Karnataka".into()),
            ..Default::default()
        };
        assert_eq!(
            address.display_address().as_deref(),
            Some("12 MG Road, Bengaluru, Karnataka")
        );
        assert_eq!(AddressComponents::default().display_address(), None);
    }

    #[tokio::test]
    async fn test_reverse_maps_nominatim_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "jsonv2"))
            .and(query_param("lat", "12.97"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "12, MG Road, Shivajinagar, Bengaluru",
                "address": {
                    "house_number": "12",
                    "road": "MG Road",
                    "suburb": "Shivajinagar",
                    "city_district": "East Zone",
                    "city": "Bengaluru",
                    "state": "Karnataka",
                    "postcode": "560001",
                    "country": "India"
                }
            })))
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::new(&mock_server.uri(), Client::new());
        let address = geocoder.reverse(12.97, 77.59).await.unwrap();

        assert_eq!(address.street.as_deref(), Some("12 MG Road"));
        assert_eq!(address.area.as_deref(), Some("Shivajinagar"));
        assert_eq!(address.ward.as_deref(), Some("East Zone"));
        assert_eq!(address.city.as_deref(), Some("Bengaluru"));
    }

    #[tokio::test]
    async fn test_reverse_error_body_is_geocode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "Unable to geocode" })),
            )
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::new(&mock_server.uri(), Client::new());
        match geocoder.reverse(0.0, 0.0).await {
            Err(Error::Geocode(msg)) => assert_eq!(msg, "Unable to geocode"),
            other => panic!("Expected Geocode error, got {:?}", other),
        }
    }
}
