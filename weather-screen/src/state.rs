use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, warn};

use weather_domain::{CityId, GeoLocation, ProviderError, WeatherInfo};

use crate::policy::{BannerEffect, Operation};

/// The screen's observable fields.
///
/// Every field lives in a `watch` channel: subscribers always see the
/// current value, every write wakes them, later writes overwrite earlier
/// ones. Resolved city ids are the exception; they are consumed once and
/// never retained, so they travel through a queue instead (see
/// [`crate::MainScreen::take_city_id_events`]).
#[derive(Debug)]
pub(crate) struct Fields {
    pub(crate) loading: watch::Sender<bool>,
    pub(crate) error: watch::Sender<Option<Arc<ProviderError>>>,
    pub(crate) weather_results: watch::Sender<Option<Vec<WeatherInfo>>>,
    pub(crate) geo_location: watch::Sender<Option<GeoLocation>>,
    pub(crate) show_location_alert: watch::Sender<bool>,
    pub(crate) show_http_error: watch::Sender<bool>,
    pub(crate) show_connectivity_error: watch::Sender<bool>,
    city_ids: mpsc::UnboundedSender<CityId>,
}

impl Fields {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<CityId>) {
        let (city_ids, city_id_rx) = mpsc::unbounded_channel();

        let fields = Arc::new(Self {
            loading: watch::Sender::new(false),
            error: watch::Sender::new(None),
            weather_results: watch::Sender::new(None),
            geo_location: watch::Sender::new(None),
            show_location_alert: watch::Sender::new(false),
            show_http_error: watch::Sender::new(false),
            show_connectivity_error: watch::Sender::new(false),
            city_ids,
        });

        (fields, city_id_rx)
    }

    /// Raise `loading` now; it goes back down when the returned guard
    /// drops. Dropping is the operation's guaranteed last step, firing on
    /// completion, failure and task abort alike, so `loading` can never
    /// stay stuck at `true`.
    pub(crate) fn begin_loading(&self) -> LoadingGuard {
        self.loading.send_replace(true);
        LoadingGuard {
            loading: self.loading.clone(),
        }
    }

    pub(crate) fn publish_geo_location(&self, location: GeoLocation) {
        self.geo_location.send_replace(Some(location));
    }

    pub(crate) fn publish_weather_results(&self, results: Vec<WeatherInfo>) {
        self.weather_results.send_replace(Some(results));
    }

    /// One-shot delivery of a resolved city id. Nothing is retained: the
    /// UI consumes the id once and later reads observe no sticky value.
    pub(crate) fn publish_city_id(&self, id: CityId) {
        // The UI may never have taken the receiver, or dropped it; the id
        // is simply lost then, like a notification nobody listens to.
        let _ = self.city_ids.send(id);
    }

    /// Route a failed operation into the observable state: banner flag
    /// first when the routing table says so, then `error`. The `error`
    /// field is last-write-wins and is never cleared by later successes.
    pub(crate) fn report_failure(&self, operation: Operation, failure: ProviderError) {
        let class = failure.class();

        match operation.banner_effect(class) {
            BannerEffect::RaiseConnectivityBanner => {
                self.show_connectivity_error.send_replace(true);
            }
            BannerEffect::LowerHttpBanner => {
                self.show_http_error.send_replace(false);
            }
            BannerEffect::None => {}
        }

        let failure = Arc::new(failure);
        self.error.send_replace(Some(Arc::clone(&failure)));

        match operation {
            Operation::Locate => {
                error!(%operation, %class, %failure, "operation failed");
            }
            Operation::ResolveCityId | Operation::FetchWeather => {
                warn!(%operation, %class, %failure, "operation failed");
            }
        }
    }

    pub(crate) fn set_location_alert(&self, visible: bool) {
        self.show_location_alert.send_replace(visible);
    }

    pub(crate) fn clear_http_error(&self) {
        self.show_http_error.send_replace(false);
    }

    pub(crate) fn clear_connectivity_error(&self) {
        self.show_connectivity_error.send_replace(false);
    }
}

/// Keeps `loading` raised for the duration of one in-flight operation.
#[derive(Debug)]
pub(crate) struct LoadingGuard {
    loading: watch::Sender<bool>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.loading.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_domain::ErrorClass;

    #[test]
    fn loading_guard_raises_and_lowers() {
        let (fields, _city_ids) = Fields::new();
        assert!(!*fields.loading.borrow());

        let guard = fields.begin_loading();
        assert!(*fields.loading.borrow());

        drop(guard);
        assert!(!*fields.loading.borrow());
    }

    #[test]
    fn city_id_failure_routing_per_class() {
        let (fields, _city_ids) = Fields::new();

        fields.report_failure(
            Operation::ResolveCityId,
            ProviderError::connectivity("api.openweathermap.org"),
        );
        assert!(*fields.show_connectivity_error.borrow());
        let err = fields.error.borrow().clone().expect("error published");
        assert_eq!(err.class(), ErrorClass::Connectivity);

        fields.report_failure(Operation::ResolveCityId, ProviderError::http(500, "boom"));
        assert!(!*fields.show_http_error.borrow());
        let err = fields.error.borrow().clone().expect("error published");
        assert_eq!(err.class(), ErrorClass::Protocol);
    }

    #[test]
    fn weather_failures_leave_banners_alone() {
        let (fields, _city_ids) = Fields::new();

        fields.report_failure(
            Operation::FetchWeather,
            ProviderError::connectivity("api.openweathermap.org"),
        );

        assert!(!*fields.show_connectivity_error.borrow());
        assert!(!*fields.show_http_error.borrow());
        assert!(fields.error.borrow().is_some());
    }

    #[test]
    fn city_id_delivery_survives_a_dropped_receiver() {
        let (fields, city_ids) = Fields::new();
        drop(city_ids);

        // Must not panic; the id is discarded.
        fields.publish_city_id(2_643_743);
    }

    #[test]
    fn error_is_not_cleared_by_later_successes() {
        let (fields, _city_ids) = Fields::new();

        fields.report_failure(Operation::FetchWeather, ProviderError::other("no data"));
        fields.publish_weather_results(Vec::new());
        fields.publish_geo_location(GeoLocation {
            latitude: 53.9,
            longitude: 27.56,
        });

        assert!(fields.error.borrow().is_some());
    }
}
