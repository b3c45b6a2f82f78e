use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc::UnboundedReceiver;

use weathervane_core::{
    Config, Event, Location, LocationStore, Orchestrator, Phase, SearchFlow, Units, WeatherClient,
};

use crate::term::TerminalView;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathervane", version, about = "City weather lookup with search history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, unit system and history behavior interactively.
    Configure,

    /// Show weather for the saved location, searching for one first if
    /// none is saved. This is the default command.
    Show {
        /// Unit system override for this run.
        #[arg(long, value_enum)]
        units: Option<UnitsArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitsArg {
    Metric,
    Imperial,
}

impl From<UnitsArg> for Units {
    fn from(arg: UnitsArg) -> Self {
        match arg {
            UnitsArg::Metric => Units::Metric,
            UnitsArg::Imperial => Units::Imperial,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Show { units: None }) {
            Command::Configure => configure(),
            Command::Show { units } => show(units).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;

    let key = inquire::Text::new("OpenWeatherMap API key:")
        .with_initial_value(&config.weather_api_key)
        .prompt()?;
    config.weather_api_key = key.trim().to_string();

    let units = inquire::Select::new("Temperature system:", vec!["metric", "imperial"]).prompt()?;
    config.temp_type = if units == "imperial" { Units::Imperial } else { Units::Metric };

    config.save_search_history = inquire::Confirm::new("Save search history?")
        .with_default(config.save_search_history)
        .prompt()?;

    config.save().context("failed to save configuration")?;
    println!("Configuration written to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn show(units: Option<UnitsArg>) -> anyhow::Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(units) = units {
        config.temp_type = units.into();
    }

    let store = LocationStore::load(config.store_path()?);
    let client = WeatherClient::from_config(&config);
    let search = SearchFlow::from_config(&config);
    let view = TerminalView::new(config.temp_type);

    let (mut app, mut events) = Orchestrator::new(config, store, client, search, view)?;
    app.startup();
    tracing::debug!(phase = ?app.phase(), "app started");

    if *app.phase() == Phase::AwaitingSelection {
        prompt_for_location(&mut app, &mut events).await?;
    }

    // Pump until both panels have resolved, one way or the other.
    let mut current_done = false;
    let mut forecast_done = false;
    while !(current_done && forecast_done) {
        let Some(event) = events.recv().await else { break };
        match &event {
            Event::CurrentArrived { .. } => current_done = true,
            Event::ForecastArrived { .. } => forecast_done = true,
            _ => {}
        }
        app.handle(event);
    }

    Ok(())
}

/// Offer previously searched locations, then repeat search prompts until
/// the user picks a candidate.
async fn prompt_for_location(
    app: &mut Orchestrator<TerminalView>,
    events: &mut UnboundedReceiver<Event>,
) -> anyhow::Result<()> {
    let history: Vec<Location> = app.state().history.values().cloned().collect();
    if !history.is_empty() {
        let mut labels: Vec<String> = history
            .iter()
            .map(|c| format!("{}, {}", c.name, c.country_code))
            .collect();
        labels.push("Search for a new city...".into());

        let picked = inquire::Select::new("Pick a location:", labels).raw_prompt()?;
        if picked.index < history.len() {
            app.handle(Event::CandidateSelected(history[picked.index].clone()));
            return Ok(());
        }
    }

    loop {
        let query = inquire::Text::new("Search for a city:").prompt()?;
        app.handle(Event::SearchSubmitted(query));

        // Nothing else is in flight yet, so the next event is the
        // candidate list.
        let Some(event) = events.recv().await else {
            anyhow::bail!("event channel closed while searching");
        };

        let candidates = match &event {
            Event::CandidatesArrived { result: Ok(list) } => list.clone(),
            Event::CandidatesArrived { result: Err(e) } => {
                eprintln!("Search failed: {e}");
                app.handle(event);
                continue;
            }
            _ => Vec::new(),
        };
        app.handle(event);

        if candidates.is_empty() {
            continue;
        }

        let labels: Vec<String> = candidates
            .iter()
            .map(|c| format!("{}, {}", c.name, c.country_code))
            .collect();
        let picked = inquire::Select::new("Pick a location:", labels).raw_prompt()?;

        app.handle(Event::CandidateSelected(candidates[picked.index].clone()));
        return Ok(());
    }
}
