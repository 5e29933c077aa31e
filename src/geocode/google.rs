use super::{error_body, NameLocalizer};
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use geo_sync_common::{parse_google_geocode, LocalizedPlace};
use std::time::Duration;

const GEOCODE_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Geocoding API, used for names in another language
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleGeocoder {
    /// Fails with `MissingApiKey` when no key is configured
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.get_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: GEOCODE_API_URL.to_string(),
        })
    }
}

#[async_trait]
impl NameLocalizer for GoogleGeocoder {
    async fn localize(&mut self, query: &str, language: &str) -> Result<Option<LocalizedPlace>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("address", query),
                ("language", language),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeoSyncError::lookup(query, e))?;

        if !response.status().is_success() {
            return Err(GeoSyncError::lookup(query, error_body(response).await));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeoSyncError::lookup(query, e))?;
        let place = parse_google_geocode(&body).map_err(|e| GeoSyncError::lookup(query, e))?;
        tracing::debug!(
            "Geocode [{}] {:?} -> {:?}",
            language,
            query,
            place.as_ref().and_then(|p| p.name.as_deref())
        );
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let err = GoogleGeocoder::new(&Settings::default()).err().unwrap();
        assert!(matches!(err, GeoSyncError::MissingApiKey));
    }

    #[test]
    fn test_builds_with_key() {
        let settings = Settings {
            google_maps_api_key: Some("k".into()),
            ..Default::default()
        };
        assert!(GoogleGeocoder::new(&settings).is_ok());
    }
}
