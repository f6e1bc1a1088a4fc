//! Coordinates from EXIF GPS descriptors.
//!
//! The metadata service stores `GPSInfo` as the textual form of an EXIF GPS
//! dictionary, e.g. `{1: 'N', 2: (55.0, 45.0, 21.6), 3: 'E', 4: (37.0, 37.0, 4.2)}`.
//! Key 2 carries latitude and key 4 longitude as degrees/minutes/seconds;
//! keys 1 and 3 carry the hemispheres. The JSON rendering of the same
//! dictionary (`{"1":"N","2":[55.0,45.0,21.6],...}`) is accepted as well.

use api_client::Metadata;
use once_cell::sync::Lazy;
use regex::Regex;

static TRIPLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"["']?(\d+)["']?\s*:\s*[\(\[]\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*[\)\]]"#,
    )
    .expect("GPS triplet pattern")
});

static NORTH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']?1["']?\s*:\s*["']N["']"#).expect("north pattern"));

static EAST: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']?3["']?\s*:\s*["']E["']"#).expect("east pattern"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Link to the location on OpenStreetMap.
    pub fn map_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={:.6}&mlon={:.6}#map=15/{:.6}/{:.6}",
            self.latitude, self.longitude, self.latitude, self.longitude
        )
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

fn to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Parse a GPS descriptor. `None` means there is nothing to put on a map.
pub fn parse_descriptor(descriptor: &str) -> Option<Coordinates> {
    let mut latitude = None;
    let mut longitude = None;
    for caps in TRIPLET.captures_iter(descriptor) {
        let value = || -> Option<f64> {
            let d: f64 = caps.get(2)?.as_str().parse().ok()?;
            let m: f64 = caps.get(3)?.as_str().parse().ok()?;
            let s: f64 = caps.get(4)?.as_str().parse().ok()?;
            Some(to_decimal(d, m, s))
        };
        match caps.get(1).map(|k| k.as_str()) {
            Some("2") => latitude = value(),
            Some("4") => longitude = value(),
            _ => {}
        }
    }

    let (mut latitude, mut longitude) = (latitude?, longitude?);
    if !NORTH.is_match(descriptor) {
        latitude = -latitude;
    }
    if !EAST.is_match(descriptor) {
        longitude = -longitude;
    }
    Some(Coordinates { latitude, longitude })
}

pub fn extract_geolocation(metadata: &Metadata) -> Option<Coordinates> {
    let descriptor = metadata.gps_descriptor()?;
    let coords = parse_descriptor(&descriptor);
    if coords.is_none() {
        tracing::debug!("No coordinates in GPS descriptor: {}", descriptor);
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_north_east_descriptor() {
        let coords =
            parse_descriptor("{1: 'N', 2: (55.0, 45.0, 21.6), 3: 'E', 4: (37.0, 37.0, 4.2), 5: b'\\x00'}").unwrap();
        assert!(approx(coords.latitude, 55.756));
        assert!(approx(coords.longitude, 37.617833333));
    }

    #[test]
    fn test_south_west_is_negative() {
        let coords = parse_descriptor("{1: 'S', 2: (33.0, 52.0, 4.8), 3: 'W', 4: (151.0, 12.0, 36.0)}").unwrap();
        assert!(coords.latitude < 0.0);
        assert!(coords.longitude < 0.0);
        assert!(approx(coords.latitude, -33.868));
        assert!(approx(coords.longitude, -151.21));
    }

    #[test]
    fn test_json_shaped_descriptor() {
        let metadata: Metadata = serde_json::from_value(json!({
            "GPSInfo": {"1": "N", "2": [10.0, 30.0, 0.0], "3": "E", "4": [20.0, 15.0, 0.0]}
        }))
        .unwrap();
        let coords = extract_geolocation(&metadata).unwrap();
        assert!(approx(coords.latitude, 10.5));
        assert!(approx(coords.longitude, 20.25));
        assert!(coords.map_url().contains("mlat=10.500000"));
    }

    #[test]
    fn test_unrecognized_descriptor_has_no_map() {
        assert_eq!(parse_descriptor("somewhere near the sea"), None);
        assert_eq!(parse_descriptor("{1: 'N', 2: (55.0, 45.0, 21.6)}"), None);
        assert_eq!(extract_geolocation(&Metadata::default()), None);
    }
}
