use geo_sheet_sync::config::Settings;
use geo_sheet_sync::geocode::{GoogleGeocoder, NameLocalizer, NominatimClient, PlaceLookup};

fn live_enabled() -> bool {
    match std::env::var("GEO_SYNC_LIVE_TESTS") {
        Ok(v) if v == "1" => true,
        _ => {
            eprintln!("GEO_SYNC_LIVE_TESTS not set; skipping integration test");
            false
        }
    }
}

#[tokio::test]
async fn nominatim_finds_gudauri() {
    if !live_enabled() {
        return;
    }

    let mut client = NominatimClient::new(&Settings::default())
        .expect("client")
        .with_country_codes(&["GE".to_string()]);
    let place = client
        .lookup("Gudauri, Mtskheta-Mtianeti")
        .await
        .expect("request failed")
        .expect("no result for Gudauri");

    let lat = place.lat.expect("lat missing");
    let lon = place.lon.expect("lon missing");
    assert!((42.0..43.0).contains(&lat), "lat {}", lat);
    assert!((44.0..45.0).contains(&lon), "lon {}", lon);
    assert!(place.osm_id.is_some());
}

#[tokio::test]
async fn google_localizes_gudauri() {
    if !live_enabled() {
        return;
    }
    let api_key = match std::env::var("GOOGLE_MAPS_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("GOOGLE_MAPS_API_KEY not set; skipping integration test");
            return;
        }
    };

    let settings = Settings {
        google_maps_api_key: Some(api_key),
        ..Default::default()
    };
    let mut geocoder = GoogleGeocoder::new(&settings).expect("geocoder");
    let place = geocoder
        .localize("Gudauri", "ru")
        .await
        .expect("request failed")
        .expect("no result for Gudauri");

    let name = place.name.expect("name missing");
    assert!(!name.is_empty());
    assert!(place.lat.is_some());
}
