//! Core library for the `weathervane` app.
//!
//! This crate defines:
//! - Configuration handling (API key, unit system, history toggle)
//! - The durable location store (search history + last-viewed location)
//! - The weather/search HTTP clients for the provider API
//! - The orchestrator wiring selections, fetches and the view together
//!
//! It is used by `weathervane-cli`, but can also sit behind any other
//! frontend that implements the [`View`] trait.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod search;
pub mod store;
pub mod view;

pub use app::{Event, Orchestrator, Phase};
pub use client::{DEFAULT_FORECAST_DAYS, WeatherClient};
pub use config::{Config, Units};
pub use error::{Error, Result};
pub use model::{CurrentConditions, Forecast, ForecastDay, Location};
pub use search::SearchFlow;
pub use store::{AppState, LocationStore};
pub use view::View;
