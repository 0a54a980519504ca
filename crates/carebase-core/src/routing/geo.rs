//! Distance and duration estimates for home visits.
//!
//! Travel uses a flat-earth approximation: one degree of latitude or
//! longitude counts as 111 km everywhere, and the effective speed is a
//! constant 30 km/h (2 minutes per km). Good enough inside a single city,
//! wrong near the poles.

use serde::{Deserialize, Serialize};

use crate::models::CareLevel;

/// Kilometres per degree, applied uniformly to both axes.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Minutes of travel per kilometre (30 km/h).
pub const MINUTES_PER_KM: f64 = 2.0;

/// Visit length for care level 1.
pub const BASE_VISIT_MINUTES: u32 = 30;

/// Extra visit minutes for each care level above 1.
pub const MINUTES_PER_CARE_LEVEL: u32 = 10;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Centre of Germany, used when a patient has no usable location.
    pub const FALLBACK: Coordinates = Coordinates {
        lat: 51.1657,
        lng: 10.4515,
    };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Parse a legacy `"lat,lng"` string.
    ///
    /// Returns `None` for anything that is not exactly two valid numbers,
    /// which includes ordinary street addresses.
    pub fn parse_pair(text: &str) -> Option<Self> {
        let mut parts = text.split(',');
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        let lng = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let coords = Self { lat, lng };
        coords.is_valid().then_some(coords)
    }
}

/// Estimated travel time in whole minutes between two points.
pub fn travel_minutes(from: Coordinates, to: Coordinates) -> u32 {
    let d_lat = to.lat - from.lat;
    let d_lng = to.lng - from.lng;
    let km = (d_lat * d_lat + d_lng * d_lng).sqrt() * KM_PER_DEGREE;
    (km * MINUTES_PER_KM).round() as u32
}

/// Leg distance in km, back-derived from its travel time.
pub fn distance_km(travel_minutes: u32) -> f64 {
    f64::from(travel_minutes) / MINUTES_PER_KM
}

/// Visit length for a care level: 30/40/50/60/70 minutes for levels 1-5.
pub fn care_minutes(level: CareLevel) -> u32 {
    BASE_VISIT_MINUTES + u32::from(level.get() - 1) * MINUTES_PER_CARE_LEVEL
}
