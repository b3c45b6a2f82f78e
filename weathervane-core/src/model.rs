use chrono::NaiveDate;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A place the provider knows about. Identity is `provider_id`; the name
/// and country are display data frozen at the time the location was first
/// returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub country_code: String,
    pub provider_id: u64,
}

impl Location {
    pub fn new(name: impl Into<String>, country_code: impl Into<String>, provider_id: u64) -> Self {
        Self { name: name.into(), country_code: country_code.into(), provider_id }
    }

    /// The `q` query value the provider expects, e.g. `"Boston,US"`.
    pub fn query_value(&self) -> String {
        format!("{},{}", self.name, self.country_code)
    }
}

// The store keeps locations as `[name, country, id]` triples so the JSON
// on disk stays compact and diffable.
impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.name, &self.country_code, self.provider_id).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, country_code, provider_id) = <(String, String, u64)>::deserialize(deserializer)?;
        Ok(Self { name, country_code, provider_id })
    }
}

/// Latest observed conditions for the displayed location. Ephemeral:
/// replaced wholesale on every refresh, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub description: String,
    pub icon_id: String,
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// One day of the short-range forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub description: String,
    pub icon_id: String,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// Days in provider order (chronological). Replaced in full on refresh.
pub type Forecast = Vec<ForecastDay>;

/// URL of the provider's condition icon, e.g. for icon id `"10d"`.
pub fn icon_url(icon_id: &str) -> String {
    format!("http://openweathermap.org/img/w/{icon_id}.png")
}
