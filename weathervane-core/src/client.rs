use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{Config, Units};
use crate::error::{Error, Result};
use crate::model::{CurrentConditions, Forecast, ForecastDay, Location};

/// Base URL of the weather provider's REST API.
pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Days requested from the forecast endpoint.
pub const DEFAULT_FORECAST_DAYS: u8 = 3;

/// Client for the provider's `weather` and `forecast/daily` endpoints.
///
/// Every fetch is a single fresh round-trip: no retry, no caching. The
/// returned future resolves exactly once with either parsed data or a
/// failure for the caller to deal with.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Same as [`WeatherClient::new`] with the API base replaced, for
    /// pointing at a mock server.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.weather_api_key.clone())
    }

    /// Current conditions for `loc`.
    pub async fn fetch_current(&self, loc: &Location, units: Units) -> Result<CurrentConditions> {
        let url = format!("{}/weather", self.base_url);
        let q = loc.query_value();

        let body = get_text(
            &self.http,
            &url,
            &[
                ("q", q.as_str()),
                ("units", units.as_query_param()),
                ("APPID", self.api_key.as_str()),
            ],
        )
        .await?;

        let parsed: OwCurrent =
            serde_json::from_str(&body).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let weather = parsed
            .weather
            .first()
            .ok_or_else(|| Error::MalformedResponse("no weather description entries".into()))?;

        Ok(CurrentConditions {
            description: weather.description.clone(),
            icon_id: weather.icon.clone(),
            temp: parsed.main.temp,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
        })
    }

    /// Daily forecast for `loc`, `days` entries in provider (chronological)
    /// order. The result stands alone; callers replace any previously
    /// displayed forecast with it wholesale.
    pub async fn fetch_forecast(&self, loc: &Location, units: Units, days: u8) -> Result<Forecast> {
        let url = format!("{}/forecast/daily", self.base_url);
        let q = loc.query_value();
        let cnt = days.to_string();

        let body = get_text(
            &self.http,
            &url,
            &[
                ("q", q.as_str()),
                ("cnt", cnt.as_str()),
                ("units", units.as_query_param()),
                ("APPID", self.api_key.as_str()),
            ],
        )
        .await?;

        let parsed: OwForecast =
            serde_json::from_str(&body).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        parsed.list.into_iter().map(ForecastDay::try_from).collect()
    }
}

/// One GET round-trip. Non-success statuses become [`Error::Provider`]
/// with a truncated body so upstream errors stay readable.
pub(crate) async fn get_text(http: &Client, url: &str, query: &[(&str, &str)]) -> Result<String> {
    let res = http.get(url).query(query).send().await?;

    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(Error::Provider { status, body: truncate_body(&body) });
    }

    Ok(body)
}

fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    // Cut on a char boundary; provider error bodies are arbitrary text.
    match body.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    weather: Vec<OwWeather>,
    main: OwMain,
}

#[derive(Debug, Deserialize)]
struct OwDayTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastDay {
    dt: i64,
    temp: OwDayTemp,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecast {
    list: Vec<OwForecastDay>,
}

impl TryFrom<OwForecastDay> for ForecastDay {
    type Error = Error;

    fn try_from(day: OwForecastDay) -> Result<Self> {
        let date = DateTime::from_timestamp(day.dt, 0)
            .ok_or_else(|| Error::MalformedResponse(format!("day timestamp {} out of range", day.dt)))?
            .date_naive();

        let weather = day
            .weather
            .first()
            .ok_or_else(|| Error::MalformedResponse("forecast day has no weather description".into()))?;

        Ok(ForecastDay {
            date,
            description: weather.description.clone(),
            icon_id: weather.icon.clone(),
            temp_min: day.temp.min,
            temp_max: day.temp.max,
        })
    }
}
