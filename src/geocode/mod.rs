//! Geocoding services

pub mod google;
pub mod nominatim;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimClient;

use crate::error::Result;
use async_trait::async_trait;
use geo_sync_common::{LocalizedPlace, Place};

/// Primary place lookup. `Ok(None)` means the service had no candidate.
#[async_trait]
pub trait PlaceLookup: Send {
    async fn lookup(&mut self, query: &str) -> Result<Option<Place>>;
}

/// Secondary lookup for a name in a target language
#[async_trait]
pub trait NameLocalizer: Send {
    async fn localize(&mut self, query: &str, language: &str) -> Result<Option<LocalizedPlace>>;
}

/// reqwest error body text, for error messages
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("status {}: {}", status, text.chars().take(200).collect::<String>())
}
