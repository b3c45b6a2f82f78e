use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::client::{DEFAULT_FORECAST_DAYS, WeatherClient};
use crate::config::{Config, Units};
use crate::error::{Error, Result};
use crate::model::{CurrentConditions, Forecast, Location};
use crate::search::SearchFlow;
use crate::store::{AppState, LocationStore};
use crate::view::View;

/// Where the app currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// No location on record; waiting for the user to search and pick one.
    AwaitingSelection,
    /// Showing weather for a location.
    Displaying(Location),
}

/// Everything the orchestrator reacts to, UI signals and fetch
/// completions alike, delivered over one channel and handled on a single
/// logical thread.
#[derive(Debug)]
pub enum Event {
    SearchSubmitted(String),
    CandidateSelected(Location),
    UnitsChanged(Units),

    CandidatesArrived { result: Result<Vec<Location>> },
    CurrentArrived { epoch: u64, result: Result<CurrentConditions> },
    ForecastArrived { epoch: u64, result: Result<Forecast> },
}

/// Drives the whole app: decides between "pick a location" and "show the
/// last one" at startup, records selections, and fans fetch results out
/// to the view.
///
/// Weather fetches are spawned as independent tasks whose completions
/// come back as [`Event`]s; they finish in any order and the view gets
/// whichever arrives first. Each issuance bumps an epoch, and completions
/// stamped with an older epoch are dropped so a superseded fetch can
/// never overwrite the display.
pub struct Orchestrator<V: View> {
    config: Config,
    store: LocationStore,
    client: WeatherClient,
    search: SearchFlow,
    view: V,
    phase: Phase,
    epoch: u64,
    events: UnboundedSender<Event>,
}

impl<V: View> Orchestrator<V> {
    /// Build the orchestrator and the receiving half of its event channel.
    ///
    /// The caller owns the receiver and pumps every received event back
    /// into [`Orchestrator::handle`]. Fails with [`Error::NoApiKey`] when
    /// no key is configured; that is the one condition the app cannot
    /// run past.
    pub fn new(
        config: Config,
        store: LocationStore,
        client: WeatherClient,
        search: SearchFlow,
        view: V,
    ) -> Result<(Self, UnboundedReceiver<Event>)> {
        if !config.has_api_key() {
            return Err(Error::NoApiKey);
        }

        let (events, rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                config,
                store,
                client,
                search,
                view,
                phase: Phase::Uninitialized,
                epoch: 0,
                events,
            },
            rx,
        ))
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// First transition: restore the last-viewed location if there is
    /// one, otherwise ask the user to pick.
    pub fn startup(&mut self) {
        match self.store.state().current.clone() {
            Some(loc) => {
                tracing::info!(location = %loc.query_value(), "restoring last viewed location");
                self.phase = Phase::Displaying(loc.clone());
                self.issue_fetches(loc);
            }
            None => {
                tracing::info!("no location on record, requesting selection");
                self.phase = Phase::AwaitingSelection;
                let history: Vec<Location> =
                    self.store.state().history.values().cloned().collect();
                self.view.request_selection(&history);
            }
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::SearchSubmitted(query) => self.start_search(query),
            Event::CandidateSelected(loc) => self.select(loc),
            Event::UnitsChanged(units) => self.change_units(units),
            Event::CandidatesArrived { result } => self.apply_candidates(result),
            Event::CurrentArrived { epoch, result } => self.apply_current(epoch, result),
            Event::ForecastArrived { epoch, result } => self.apply_forecast(epoch, result),
        }
    }

    fn start_search(&mut self, query: String) {
        let flow = self.search.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            let result = flow.search(&query).await;
            let _ = tx.send(Event::CandidatesArrived { result });
        });
    }

    fn select(&mut self, loc: Location) {
        if let Err(e) = self.store.record_selection(loc.clone(), &self.config) {
            // Weather can still be shown; only the history write is lost.
            tracing::error!(error = %e, "failed to persist selection");
        }

        self.phase = Phase::Displaying(loc.clone());
        self.issue_fetches(loc);
        self.view.dismiss_selection_prompt();
    }

    fn change_units(&mut self, units: Units) {
        self.config.temp_type = units;

        // Refresh the display in the new units; history is untouched.
        if let Phase::Displaying(loc) = &self.phase {
            self.issue_fetches(loc.clone());
        }
    }

    /// Launch the two weather fetches for `loc` under a fresh epoch. The
    /// tasks are independent and unordered; either may complete first.
    fn issue_fetches(&mut self, loc: Location) {
        self.epoch += 1;
        let epoch = self.epoch;
        let units = self.config.temp_type;

        let client = self.client.clone();
        let tx = self.events.clone();
        let target = loc.clone();
        tokio::spawn(async move {
            let result = client.fetch_current(&target, units).await;
            let _ = tx.send(Event::CurrentArrived { epoch, result });
        });

        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client.fetch_forecast(&loc, units, DEFAULT_FORECAST_DAYS).await;
            let _ = tx.send(Event::ForecastArrived { epoch, result });
        });
    }

    fn apply_candidates(&mut self, result: Result<Vec<Location>>) {
        match result {
            Ok(candidates) => self.view.show_candidates(&candidates),
            Err(e) => tracing::warn!(error = %e, "location search failed"),
        }
    }

    fn apply_current(&mut self, epoch: u64, result: Result<CurrentConditions>) {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "discarding stale current-conditions result");
            return;
        }

        match result {
            Ok(conditions) => self.view.show_current(&conditions),
            Err(e) => tracing::warn!(error = %e, "current conditions fetch failed"),
        }
    }

    fn apply_forecast(&mut self, epoch: u64, result: Result<Forecast>) {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "discarding stale forecast result");
            return;
        }

        match result {
            Ok(forecast) => self.view.show_forecast(&forecast),
            Err(e) => tracing::warn!(error = %e, "forecast fetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForecastDay;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct RecordingView {
        current: Option<CurrentConditions>,
        forecast: Option<Forecast>,
        candidates: Option<Vec<Location>>,
        offered_history: Vec<Location>,
        selection_requests: usize,
        dismissals: usize,
    }

    impl View for RecordingView {
        fn show_current(&mut self, conditions: &CurrentConditions) {
            self.current = Some(conditions.clone());
        }

        fn show_forecast(&mut self, forecast: &Forecast) {
            self.forecast = Some(forecast.clone());
        }

        fn show_candidates(&mut self, candidates: &[Location]) {
            self.candidates = Some(candidates.to_vec());
        }

        fn request_selection(&mut self, history: &[Location]) {
            self.selection_requests += 1;
            self.offered_history = history.to_vec();
        }

        fn dismiss_selection_prompt(&mut self) {
            self.dismissals += 1;
        }
    }

    fn boston() -> Location {
        Location::new("Boston", "US", 4930956)
    }

    fn config_with_key() -> Config {
        Config { weather_api_key: "KEY".into(), ..Config::default() }
    }

    async fn mock_weather_endpoints(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{"description": "light rain", "icon": "10d"}],
                "main": {"temp": 12.3, "temp_min": 10.0, "temp_max": 14.5}
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/forecast/daily"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [
                    {"dt": 1_700_000_000i64, "temp": {"min": 1.0, "max": 5.0},
                     "weather": [{"description": "sky is clear", "icon": "01d"}]},
                    {"dt": 1_700_086_400i64, "temp": {"min": 2.0, "max": 6.0},
                     "weather": [{"description": "few clouds", "icon": "02d"}]},
                    {"dt": 1_700_172_800i64, "temp": {"min": 3.0, "max": 7.0},
                     "weather": [{"description": "light rain", "icon": "10d"}]}
                ]
            })))
            .mount(server)
            .await;
    }

    fn orchestrator_at(
        server: &MockServer,
        config: Config,
        store: LocationStore,
    ) -> (Orchestrator<RecordingView>, UnboundedReceiver<Event>) {
        let client = WeatherClient::with_base_url("KEY", server.uri());
        let search = SearchFlow::with_base_url("KEY", server.uri());
        Orchestrator::new(config, store, client, search, RecordingView::default()).unwrap()
    }

    /// Pump `n` events from the channel back into the orchestrator.
    async fn pump(orch: &mut Orchestrator<RecordingView>, rx: &mut UnboundedReceiver<Event>, n: usize) {
        for _ in 0..n {
            let event = rx.recv().await.expect("event channel closed");
            orch.handle(event);
        }
    }

    #[tokio::test]
    async fn missing_api_key_is_fatal_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let client = WeatherClient::new("");
        let search = SearchFlow::new("");

        let err = Orchestrator::new(Config::default(), store, client, search, RecordingView::default())
            .map(|_| ())
            .unwrap_err();

        assert!(matches!(err, Error::NoApiKey));
    }

    #[tokio::test]
    async fn startup_with_empty_store_requests_selection() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));

        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        assert_eq!(*orch.phase(), Phase::AwaitingSelection);
        assert_eq!(orch.view().selection_requests, 1);
        assert!(orch.view().offered_history.is_empty());
        assert_eq!(orch.view().dismissals, 0);
    }

    #[tokio::test]
    async fn selection_prompt_offers_previously_searched_locations() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        // History without a current location: the user has searched
        // before but nothing was on display at last exit.
        std::fs::write(
            &path,
            serde_json::json!({
                "locations": {
                    "location_history": {
                        "4930956": ["Boston", "US", 4930956],
                        "703448": ["Kyiv", "UA", 703448]
                    }
                }
            })
            .to_string(),
        )
        .unwrap();

        let store = LocationStore::load(&path);
        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        assert_eq!(*orch.phase(), Phase::AwaitingSelection);
        assert_eq!(orch.view().selection_requests, 1);
        // History keys sort as strings, so "4930956" precedes "703448".
        assert_eq!(
            orch.view().offered_history,
            vec![boston(), Location::new("Kyiv", "UA", 703448)]
        );
    }

    #[tokio::test]
    async fn startup_with_prior_location_skips_selection_and_fetches() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut seeded = LocationStore::load(&path);
        seeded.record_selection(boston(), &config_with_key()).unwrap();
        drop(seeded);

        let store = LocationStore::load(&path);
        let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        assert_eq!(*orch.phase(), Phase::Displaying(boston()));
        assert_eq!(orch.view().selection_requests, 0);

        // Both fetch completions, in whichever order they land.
        pump(&mut orch, &mut rx, 2).await;

        let current = orch.view().current.as_ref().unwrap();
        assert_eq!(current.description, "light rain");
        let forecast = orch.view().forecast.as_ref().unwrap();
        assert_eq!(forecast.len(), 3);
    }

    #[tokio::test]
    async fn selecting_a_candidate_records_dismisses_and_fetches() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        orch.handle(Event::CandidateSelected(boston()));

        assert_eq!(*orch.phase(), Phase::Displaying(boston()));
        assert_eq!(orch.view().dismissals, 1);
        assert_eq!(orch.state().current, Some(boston()));
        assert!(orch.state().history.contains_key("4930956"));

        pump(&mut orch, &mut rx, 2).await;
        assert!(orch.view().current.is_some());
        assert!(orch.view().forecast.is_some());
    }

    #[tokio::test]
    async fn stale_epoch_results_are_discarded() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        // Two selections in a row: the first fetch pair is now stale.
        orch.handle(Event::CandidateSelected(boston()));
        orch.handle(Event::CandidateSelected(Location::new("Kyiv", "UA", 703448)));

        let stale = CurrentConditions {
            description: "stale".into(),
            icon_id: "01d".into(),
            temp: 0.0,
            temp_min: 0.0,
            temp_max: 0.0,
        };
        orch.handle(Event::CurrentArrived { epoch: 1, result: Ok(stale) });
        assert!(orch.view().current.is_none());

        orch.handle(Event::ForecastArrived { epoch: 1, result: Ok(Vec::new()) });
        assert!(orch.view().forecast.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_previous_display_untouched() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();
        orch.handle(Event::CandidateSelected(boston()));
        pump(&mut orch, &mut rx, 2).await;

        let shown = orch.view().current.clone();
        assert!(shown.is_some());

        orch.handle(Event::CurrentArrived {
            epoch: 1,
            result: Err(Error::MalformedResponse("missing temp".into())),
        });

        assert_eq!(orch.view().current, shown);
    }

    #[tokio::test]
    async fn unit_change_refreshes_without_touching_history() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();
        orch.handle(Event::CandidateSelected(boston()));
        pump(&mut orch, &mut rx, 2).await;

        let history_before = orch.state().history.clone();

        orch.handle(Event::UnitsChanged(Units::Imperial));
        pump(&mut orch, &mut rx, 2).await;

        assert_eq!(*orch.phase(), Phase::Displaying(boston()));
        assert_eq!(orch.state().history, history_before);
        assert!(orch.view().current.is_some());
    }

    #[tokio::test]
    async fn unit_change_before_any_selection_fetches_nothing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        orch.handle(Event::UnitsChanged(Units::Imperial));

        assert_eq!(*orch.phase(), Phase::AwaitingSelection);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_search_leaves_candidate_panel_untouched() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();

        orch.handle(Event::CandidatesArrived {
            result: Err(Error::MalformedResponse("no list".into())),
        });

        assert!(orch.view().candidates.is_none());
    }

    #[tokio::test]
    async fn search_select_restart_end_to_end() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;
        Mock::given(method("GET"))
            .and(path("/find"))
            .and(query_param("q", "Boston"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{"id": 4930956, "name": "Boston", "sys": {"country": "US"}}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = LocationStore::load(&path);
            let (mut orch, mut rx) = orchestrator_at(&server, config_with_key(), store);
            orch.startup();
            assert_eq!(*orch.phase(), Phase::AwaitingSelection);

            orch.handle(Event::SearchSubmitted("Boston".into()));
            pump(&mut orch, &mut rx, 1).await;
            let candidates = orch.view().candidates.clone().unwrap();
            assert_eq!(candidates, vec![boston()]);

            orch.handle(Event::CandidateSelected(candidates[0].clone()));
            pump(&mut orch, &mut rx, 2).await;
            assert!(orch.view().current.is_some());
        }

        // Restart: the persisted location is picked up and no prompt shows.
        let store = LocationStore::load(&path);
        assert_eq!(store.state().current, Some(boston()));

        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();
        assert_eq!(*orch.phase(), Phase::Displaying(boston()));
        assert_eq!(orch.view().selection_requests, 0);
    }

    /// A forecast arriving before current conditions is fine; the two
    /// fetches are unordered.
    #[tokio::test]
    async fn partial_arrival_renders_whichever_comes_first() {
        let server = MockServer::start().await;
        mock_weather_endpoints(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::load(dir.path().join("store.json"));
        let (mut orch, _rx) = orchestrator_at(&server, config_with_key(), store);
        orch.startup();
        orch.handle(Event::CandidateSelected(boston()));

        let day = ForecastDay {
            date: chrono::NaiveDate::from_ymd_opt(2023, 11, 14).unwrap(),
            description: "sky is clear".into(),
            icon_id: "01d".into(),
            temp_min: 1.0,
            temp_max: 5.0,
        };
        orch.handle(Event::ForecastArrived { epoch: 1, result: Ok(vec![day]) });

        assert!(orch.view().forecast.is_some());
        assert!(orch.view().current.is_none());
    }
}
