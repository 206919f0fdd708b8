use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a city in the weather data source.
pub type CityId = i64;

/// A device position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// One city's current conditions, as produced by a weather source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub city_id: CityId,
    pub city_name: String,
    pub temperature_c: f64,
    pub condition: String,
    pub icon: String,
    pub observed_at: DateTime<Utc>,
}
