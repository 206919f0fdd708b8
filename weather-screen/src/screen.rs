use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use weather_domain::{
    CityId, CityIdResolver, GeoLocation, GeoLocationProvider, ProviderError, WeatherInfo,
    WeatherInfoProvider,
};

use crate::config::ScreenConfig;
use crate::policy::Operation;
use crate::state::Fields;

/// State coordinator for the app's main screen.
///
/// The screen owns the observable fields the UI renders from and drives
/// the three injected collaborators. Trigger methods return immediately;
/// the work runs on a background task and lands in the fields, so they
/// must be called from within a Tokio runtime. Outstanding work is
/// aborted when the screen is dropped.
///
/// Per operation kind, the latest call wins: a new trigger aborts the
/// in-flight task of the same kind (and of any kind whose work overlaps)
/// and only starts once the aborted task has wound down. Calls of
/// different, non-overlapping kinds run concurrently.
#[derive(Debug)]
pub struct MainScreen {
    fields: Arc<Fields>,
    geo_provider: Arc<dyn GeoLocationProvider>,
    city_resolver: Arc<dyn CityIdResolver>,
    weather_provider: Arc<dyn WeatherInfoProvider>,
    config: ScreenConfig,
    slots: Mutex<TaskSlots>,
    inflight: watch::Sender<usize>,
    city_id_rx: Mutex<Option<mpsc::UnboundedReceiver<CityId>>>,
}

impl MainScreen {
    pub fn new(
        geo_provider: Arc<dyn GeoLocationProvider>,
        city_resolver: Arc<dyn CityIdResolver>,
        weather_provider: Arc<dyn WeatherInfoProvider>,
    ) -> Self {
        Self::with_config(
            geo_provider,
            city_resolver,
            weather_provider,
            ScreenConfig::default(),
        )
    }

    pub fn with_config(
        geo_provider: Arc<dyn GeoLocationProvider>,
        city_resolver: Arc<dyn CityIdResolver>,
        weather_provider: Arc<dyn WeatherInfoProvider>,
        config: ScreenConfig,
    ) -> Self {
        let (fields, city_id_rx) = Fields::new();

        Self {
            fields,
            geo_provider,
            city_resolver,
            weather_provider,
            config,
            slots: Mutex::new(TaskSlots::default()),
            inflight: watch::Sender::new(0),
            city_id_rx: Mutex::new(Some(city_id_rx)),
        }
    }

    /// Resolve the device position. Runs without raising `loading`; the
    /// outcome is exactly one field write, `geo_location` or `error`.
    pub fn resolve_location(&self, permissions_granted: bool) {
        let fields = Arc::clone(&self.fields);
        let provider = Arc::clone(&self.geo_provider);

        self.spawn(TaskKind::Locate, async move {
            run_locate(&fields, provider.as_ref(), permissions_granted).await;
        });
    }

    /// Look a city up by name. On success the id is delivered through the
    /// queue behind [`MainScreen::take_city_id_events`]; on failure the
    /// routing table decides which banner flag moves along with `error`.
    pub fn resolve_city_id(&self, city_name: impl Into<String>) {
        let city_name = city_name.into();
        let fields = Arc::clone(&self.fields);
        let resolver = Arc::clone(&self.city_resolver);

        self.spawn(TaskKind::ResolveCityId, async move {
            run_resolve_city_id(&fields, resolver.as_ref(), city_name).await;
        });
    }

    /// Fetch current conditions for `city_count` cities around a position.
    pub fn fetch_nearby_weather(
        &self,
        longitude: f64,
        latitude: f64,
        city_count: u32,
        is_local: bool,
    ) {
        let fields = Arc::clone(&self.fields);
        let provider = Arc::clone(&self.weather_provider);

        self.spawn(TaskKind::FetchWeather, async move {
            run_fetch_weather(&fields, provider.as_ref(), latitude, longitude, city_count, is_local)
                .await;
        });
    }

    /// Locate the device, then fetch weather around the fix using the
    /// configured city count and data source. Stops after the location
    /// step if it fails.
    pub fn refresh(&self, permissions_granted: bool) {
        let fields = Arc::clone(&self.fields);
        let geo = Arc::clone(&self.geo_provider);
        let weather = Arc::clone(&self.weather_provider);
        let config = self.config.clone();

        self.spawn(TaskKind::Refresh, async move {
            run_refresh(&fields, geo.as_ref(), weather.as_ref(), &config, permissions_granted)
                .await;
        });
    }

    /// Cancel-and-replace dispatch: abort the in-flight tasks this kind
    /// overlaps with, then spawn the replacement, which waits for the
    /// aborted tasks to wind down before doing any work. Triggers of the
    /// same kind are therefore strictly ordered, and a stale task can
    /// never write over its replacement's fields.
    fn spawn(&self, kind: TaskKind, work: impl Future<Output = ()> + Send + 'static) {
        let mut slots = self.slots.lock().expect("task slots poisoned");

        let mut displaced = Vec::new();
        for k in kind.displaces() {
            if let Some(handle) = slots.slot(*k).take() {
                handle.abort();
                displaced.push(handle);
            }
        }

        debug!(task = kind.as_str(), displaced = displaced.len(), "dispatch");

        // Counted before the task exists so a settle() racing this trigger
        // can never observe a quiescent screen with work pending. The
        // guard travels with the task; its drop is the decrement, firing
        // on completion and abort alike.
        self.inflight.send_modify(|n| *n += 1);
        let inflight = InflightGuard {
            inflight: self.inflight.clone(),
        };

        let handle = tokio::spawn(async move {
            let _inflight = inflight;
            for handle in displaced {
                // A JoinError from an aborted predecessor is the expected
                // outcome here; we only need it finished.
                let _ = handle.await;
            }
            work.await;
        });

        *slots.slot(kind) = Some(handle);
    }

    /// Wait until no task is in flight. Purely an observer: the task
    /// slots are left alone, so triggers issued while the wait is pending
    /// are neither blocked nor exempt from displacement; settle simply
    /// waits for them too. Mainly useful to tests and shutdown paths; the
    /// UI normally just observes the fields.
    pub async fn settle(&self) {
        let mut inflight = self.inflight.subscribe();
        // Err would mean every sender is gone, and the screen itself
        // holds one for as long as it lives.
        let _ = inflight.wait_for(|n| *n == 0).await;
    }

    /// Hand out the city-id event queue. There is exactly one receiver;
    /// the first caller gets it and every later call returns `None`.
    pub fn take_city_id_events(&self) -> Option<mpsc::UnboundedReceiver<CityId>> {
        self.city_id_rx
            .lock()
            .expect("city id receiver poisoned")
            .take()
    }

    /// Show or hide the location-permission alert. The screen stores the
    /// flag; deciding when to raise it is the UI's call.
    pub fn set_location_alert(&self, visible: bool) {
        self.fields.set_location_alert(visible);
    }

    pub fn dismiss_http_error(&self) {
        self.fields.clear_http_error();
    }

    pub fn dismiss_connectivity_error(&self) {
        self.fields.clear_connectivity_error();
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.fields.loading.subscribe()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<Arc<ProviderError>>> {
        self.fields.error.subscribe()
    }

    pub fn watch_weather_results(&self) -> watch::Receiver<Option<Vec<WeatherInfo>>> {
        self.fields.weather_results.subscribe()
    }

    pub fn watch_geo_location(&self) -> watch::Receiver<Option<GeoLocation>> {
        self.fields.geo_location.subscribe()
    }

    pub fn watch_show_location_alert(&self) -> watch::Receiver<bool> {
        self.fields.show_location_alert.subscribe()
    }

    pub fn watch_show_http_error(&self) -> watch::Receiver<bool> {
        self.fields.show_http_error.subscribe()
    }

    pub fn watch_show_connectivity_error(&self) -> watch::Receiver<bool> {
        self.fields.show_connectivity_error.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.fields.loading.borrow()
    }

    pub fn last_error(&self) -> Option<Arc<ProviderError>> {
        self.fields.error.borrow().clone()
    }

    pub fn weather_results(&self) -> Option<Vec<WeatherInfo>> {
        self.fields.weather_results.borrow().clone()
    }

    pub fn geo_location(&self) -> Option<GeoLocation> {
        *self.fields.geo_location.borrow()
    }

    pub fn show_location_alert(&self) -> bool {
        *self.fields.show_location_alert.borrow()
    }

    pub fn show_http_error(&self) -> bool {
        *self.fields.show_http_error.borrow()
    }

    pub fn show_connectivity_error(&self) -> bool {
        *self.fields.show_connectivity_error.borrow()
    }
}

impl Drop for MainScreen {
    /// In-flight work dies with the screen.
    fn drop(&mut self) {
        if let Ok(mut slots) = self.slots.lock() {
            for handle in slots.drain() {
                handle.abort();
            }
        }
    }
}

/// One background-task slot per trigger kind.
#[derive(Debug, Default)]
struct TaskSlots {
    locate: Option<JoinHandle<()>>,
    resolve_city_id: Option<JoinHandle<()>>,
    fetch_weather: Option<JoinHandle<()>>,
    refresh: Option<JoinHandle<()>>,
}

impl TaskSlots {
    fn slot(&mut self, kind: TaskKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            TaskKind::Locate => &mut self.locate,
            TaskKind::ResolveCityId => &mut self.resolve_city_id,
            TaskKind::FetchWeather => &mut self.fetch_weather,
            TaskKind::Refresh => &mut self.refresh,
        }
    }

    fn drain(&mut self) -> Vec<JoinHandle<()>> {
        [
            self.locate.take(),
            self.resolve_city_id.take(),
            self.fetch_weather.take(),
            self.refresh.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Locate,
    ResolveCityId,
    FetchWeather,
    Refresh,
}

impl TaskKind {
    fn as_str(self) -> &'static str {
        match self {
            TaskKind::Locate => "locate",
            TaskKind::ResolveCityId => "resolve_city_id",
            TaskKind::FetchWeather => "fetch_weather",
            TaskKind::Refresh => "refresh",
        }
    }

    /// Which in-flight slots a new trigger of this kind displaces: its own,
    /// plus every kind whose work overlaps with it. Refresh overlaps both
    /// of the steps it is composed of.
    fn displaces(self) -> &'static [TaskKind] {
        match self {
            TaskKind::Locate => &[TaskKind::Locate, TaskKind::Refresh],
            TaskKind::ResolveCityId => &[TaskKind::ResolveCityId],
            TaskKind::FetchWeather => &[TaskKind::FetchWeather, TaskKind::Refresh],
            TaskKind::Refresh => &[TaskKind::Refresh, TaskKind::Locate, TaskKind::FetchWeather],
        }
    }
}

/// Holds one unit of the screen's in-flight count.
#[derive(Debug)]
struct InflightGuard {
    inflight: watch::Sender<usize>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.send_modify(|n| *n -= 1);
    }
}

async fn run_locate(
    fields: &Fields,
    provider: &dyn GeoLocationProvider,
    permissions_granted: bool,
) -> Option<GeoLocation> {
    match provider.locate(permissions_granted).await {
        Ok(location) => {
            fields.publish_geo_location(location);
            Some(location)
        }
        Err(failure) => {
            fields.report_failure(Operation::Locate, failure);
            None
        }
    }
}

async fn run_resolve_city_id(fields: &Fields, resolver: &dyn CityIdResolver, city_name: String) {
    // Taken first so it drops last: `loading` goes back down only after
    // every other write of this operation has landed.
    let _loading = fields.begin_loading();

    match resolver.resolve(&city_name).await {
        Ok(id) => fields.publish_city_id(id),
        Err(failure) => fields.report_failure(Operation::ResolveCityId, failure),
    }
}

async fn run_fetch_weather(
    fields: &Fields,
    provider: &dyn WeatherInfoProvider,
    latitude: f64,
    longitude: f64,
    city_count: u32,
    is_local: bool,
) {
    let _loading = fields.begin_loading();

    let params = nearby_params(latitude, longitude, city_count);
    match provider.fetch(params, is_local).await {
        Ok(results) => fields.publish_weather_results(results),
        Err(failure) => fields.report_failure(Operation::FetchWeather, failure),
    }
}

async fn run_refresh(
    fields: &Fields,
    geo: &dyn GeoLocationProvider,
    weather: &dyn WeatherInfoProvider,
    config: &ScreenConfig,
    permissions_granted: bool,
) {
    let Some(location) = run_locate(fields, geo, permissions_granted).await else {
        return;
    };

    run_fetch_weather(
        fields,
        weather,
        location.latitude,
        location.longitude,
        config.nearby_city_count,
        config.prefer_local_source,
    )
    .await;
}

/// Query payload for the weather collaborator, as string pairs under the
/// keys the data sources expect.
fn nearby_params(latitude: f64, longitude: f64, city_count: u32) -> HashMap<String, String> {
    HashMap::from([
        ("lat".to_owned(), latitude.to_string()),
        ("lon".to_owned(), longitude.to_string()),
        ("cnt".to_owned(), city_count.to_string()),
    ])
}
