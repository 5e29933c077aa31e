//! Geocoder response parsing
//!
//! Nominatim (`format=json`) and the Google Geocoding API. Only the first
//! candidate is used; the service's own ranking is authoritative.

use crate::error::{Error, Result};
use crate::types::{BoundingBox, LocalizedPlace, Place};
use serde::Deserialize;

/// Nominatim sends numbers as strings, some mirrors send real numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(f64),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Text(s) => s.trim().replace(',', ".").parse().ok(),
            Loose::Number(n) => Some(*n),
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Loose::Text(s) => s.trim().parse().ok(),
            Loose::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            Loose::Number(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimGeometry {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimCandidate {
    lat: Option<Loose>,
    lon: Option<Loose>,
    osm_id: Option<Loose>,
    osm_type: Option<String>,
    /// `class` in format=json, `category` in format=jsonv2
    #[serde(alias = "category")]
    class: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    display_name: Option<String>,
    /// [south, north, west, east]
    boundingbox: Option<Vec<Loose>>,
    geojson: Option<NominatimGeometry>,
}

impl NominatimCandidate {
    fn into_place(self) -> Place {
        let bbox = self.boundingbox.as_deref().and_then(|b| {
            if b.len() != 4 {
                return None;
            }
            Some(BoundingBox {
                south: b[0].as_f64()?,
                north: b[1].as_f64()?,
                west: b[2].as_f64()?,
                east: b[3].as_f64()?,
            })
        });

        Place {
            lat: self.lat.as_ref().and_then(Loose::as_f64),
            lon: self.lon.as_ref().and_then(Loose::as_f64),
            osm_id: self.osm_id.as_ref().and_then(Loose::as_u64),
            osm_type: self.osm_type,
            class: self.class,
            kind: self.kind,
            geometry: self.geojson.and_then(|g| g.kind),
            bbox,
            display_name: self.display_name,
            localized_name: None,
        }
    }
}

/// Parse a Nominatim `/search` body; `Ok(None)` when there is no candidate
pub fn parse_nominatim(body: &str) -> Result<Option<Place>> {
    let candidates: Vec<NominatimCandidate> = serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("Nominatim response: {}", e)))?;
    Ok(candidates.into_iter().next().map(NominatimCandidate::into_place))
}

#[derive(Debug, Deserialize)]
struct GoogleComponent {
    long_name: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: Option<GoogleLocation>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    #[serde(default)]
    address_components: Vec<GoogleComponent>,
    geometry: Option<GoogleGeometry>,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    error_message: Option<String>,
}

/// Parse a Google Geocoding body.
///
/// `ZERO_RESULTS` is "not found"; any other non-OK status is an error.
pub fn parse_google_geocode(body: &str) -> Result<Option<LocalizedPlace>> {
    let response: GoogleResponse = serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("Geocoding response: {}", e)))?;

    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        status => {
            return Err(Error::Service(format!(
                "Geocoding API {}: {}",
                status,
                response.error_message.unwrap_or_default()
            )))
        }
    }

    Ok(response.results.into_iter().next().map(|first| {
        let location = first.geometry.and_then(|g| g.location);
        LocalizedPlace {
            name: first
                .address_components
                .into_iter()
                .next()
                .map(|c| c.long_name)
                .filter(|n| !n.is_empty()),
            lat: location.as_ref().map(|l| l.lat),
            lon: location.as_ref().map(|l| l.lng),
        }
    }))
}
