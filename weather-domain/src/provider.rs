use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{CityId, GeoLocation, WeatherInfo};

/// Resolves the device position.
#[async_trait]
pub trait GeoLocationProvider: Send + Sync + Debug {
    /// Fails when permissions were not granted or the platform has no fix.
    async fn locate(&self, permissions_granted: bool) -> Result<GeoLocation, ProviderError>;
}

/// Looks a city up by name.
#[async_trait]
pub trait CityIdResolver: Send + Sync + Debug {
    /// The name is forwarded verbatim; an empty name is the source's
    /// problem to reject, not ours.
    async fn resolve(&self, city_name: &str) -> Result<CityId, ProviderError>;
}

/// Retrieves current conditions for a set of cities.
#[async_trait]
pub trait WeatherInfoProvider: Send + Sync + Debug {
    /// `params` carries the query as string pairs under the keys the data
    /// sources expect (`lat`, `lon`, `cnt`); `is_local` selects the local
    /// instead of the remote source.
    async fn fetch(
        &self,
        params: HashMap<String, String>,
        is_local: bool,
    ) -> Result<Vec<WeatherInfo>, ProviderError>;
}
