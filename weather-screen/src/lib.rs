//! Presentation layer for the weather app's main screen.
//!
//! This crate defines:
//! - The screen coordinator ([`MainScreen`]) driving the injected
//!   collaborators
//! - The observable state the UI renders from
//! - Screen configuration handling
//!
//! UI shells construct a [`MainScreen`] with their platform's
//! collaborators, subscribe to the fields they render, and call the
//! trigger methods on user input.

pub mod config;
pub mod screen;

mod policy;
mod state;

pub use config::ScreenConfig;
pub use screen::MainScreen;

pub use weather_domain::{
    CityId, CityIdResolver, ErrorClass, GeoLocation, GeoLocationProvider, ProviderError,
    WeatherInfo, WeatherInfoProvider,
};
