use super::{error_body, PlaceLookup};
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use geo_sync_common::{parse_nominatim, Place};
use std::time::Duration;

/// OpenStreetMap Nominatim `/search`
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    country_codes: Vec<String>,
}

impl NominatimClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.nominatim_url.trim_end_matches('/').to_string(),
            country_codes: Vec::new(),
        })
    }

    /// Restrict results to ISO 3166-1 alpha-2 codes
    pub fn with_country_codes(mut self, codes: &[String]) -> Self {
        self.country_codes = codes.iter().map(|c| c.to_lowercase()).collect();
        self
    }

    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
            ("addressdetails", "1".to_string()),
            ("extratags", "1".to_string()),
            ("polygon_geojson", "1".to_string()),
        ];
        if !self.country_codes.is_empty() {
            params.push(("countrycodes", self.country_codes.join(",")));
        }
        params
    }
}

#[async_trait]
impl PlaceLookup for NominatimClient {
    async fn lookup(&mut self, query: &str) -> Result<Option<Place>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&self.query_params(query))
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
        let place = parse_nominatim(&body).map_err(|e| GeoSyncError::lookup(query, e))?;

        match &place {
            Some(p) => tracing::debug!("Nominatim {:?} -> osm_id {:?}", query, p.osm_id),
            None => tracing::debug!("Nominatim {:?} -> no result", query),
        }
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_include_country_filter() {
        let client = NominatimClient::new(&Settings::default())
            .unwrap()
            .with_country_codes(&["GE".to_string()]);
        let params = client.query_params("Gudauri");
        assert!(params.contains(&("countrycodes", "ge".to_string())));
        assert!(params.contains(&("polygon_geojson", "1".to_string())));
        assert!(params.contains(&("limit", "1".to_string())));
    }

    #[test]
    fn test_params_without_country_filter() {
        let client = NominatimClient::new(&Settings::default()).unwrap();
        assert!(!client
            .query_params("Gudauri")
            .iter()
            .any(|(k, _)| *k == "countrycodes"));
    }
}
