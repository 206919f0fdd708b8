//! Domain layer for the weather app.
//!
//! This crate defines:
//! - Shared domain models (geo positions, city ids, weather records)
//! - The failure taxonomy every collaborator reports through
//! - Contracts for the injected capabilities (geolocation, city lookup,
//!   weather retrieval)
//!
//! It is used by `weather-screen`, but carries no I/O of its own, so UI
//! shells and test harnesses can depend on it directly.

pub mod error;
pub mod model;
pub mod provider;

pub use error::{ErrorClass, ProviderError};
pub use model::{CityId, GeoLocation, WeatherInfo};
pub use provider::{CityIdResolver, GeoLocationProvider, WeatherInfoProvider};
