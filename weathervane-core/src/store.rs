use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::Location;

/// Persisted application state: every location ever selected, plus the
/// one shown on last exit.
///
/// Invariant: `current`, when set, is also a value in `history`
/// (guaranteed by [`LocationStore::record_selection`]; a store written
/// with `save_search_history = false` is exempt because it is never
/// written at all).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(rename = "current_location", default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Location>,

    /// Stringified provider id -> location, first-seen wins.
    #[serde(rename = "location_history", default)]
    pub history: BTreeMap<String, Location>,
}

/// On-disk document. Everything lives under a single `locations` key;
/// `BTreeMap` plus fixed field order keeps the output sorted and
/// human-diffable.
#[derive(Debug, Default, Deserialize)]
struct StoreDoc {
    #[serde(default)]
    locations: AppState,
}

#[derive(Serialize)]
struct StoreDocOut<'a> {
    locations: &'a AppState,
}

/// Durable store for location history and the last-viewed location.
///
/// Single-writer: the app is single-threaded and every write replaces
/// the whole document, so there is no locking and no partial update.
#[derive(Debug)]
pub struct LocationStore {
    path: PathBuf,
    state: AppState,
}

impl LocationStore {
    /// Open the store at `path`, loading any previously persisted state.
    ///
    /// A missing file is the normal first-run condition and an unreadable
    /// or unparsable one is treated the same way: both yield an empty
    /// state. Load never hard-fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StoreDoc>(&contents) {
                Ok(doc) => doc.locations,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable location store, starting empty");
                    AppState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read location store, starting empty");
                AppState::default()
            }
        };

        tracing::debug!(
            path = %path.display(),
            history_len = state.history.len(),
            has_current = state.current.is_some(),
            "location store loaded"
        );

        Self { path, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Record that the user selected `loc`.
    ///
    /// With `save_search_history` disabled this only updates the
    /// in-memory `current` and touches neither history nor disk.
    /// Otherwise the location is added to history unless its id is
    /// already present (the first-recorded entry wins, even if provider
    /// data changed since), `current` is updated, and the full state is
    /// persisted before returning.
    pub fn record_selection(&mut self, loc: Location, config: &Config) -> Result<&AppState> {
        if !config.save_search_history {
            self.state.current = Some(loc);
            return Ok(&self.state);
        }

        self.state
            .history
            .entry(loc.provider_id.to_string())
            .or_insert_with(|| loc.clone());
        self.state.current = Some(loc);

        self.persist()?;
        Ok(&self.state)
    }

    /// Write the whole document atomically: serialize to a temp file next
    /// to the target, then rename over it.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&StoreDocOut { locations: &self.state })
            .map_err(|e| Error::StoreFormat(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "location store saved");
        Ok(())
    }
}
