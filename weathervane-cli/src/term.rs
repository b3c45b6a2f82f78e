use weathervane_core::model::icon_url;
use weathervane_core::{CurrentConditions, Forecast, Location, Units, View};

/// Terminal implementation of the core's view seam: every update call
/// prints a panel, nothing is redrawn in place.
pub struct TerminalView {
    units: Units,
}

impl TerminalView {
    pub fn new(units: Units) -> Self {
        Self { units }
    }

    fn degrees(&self) -> &'static str {
        match self.units {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }
}

impl View for TerminalView {
    fn show_current(&mut self, conditions: &CurrentConditions) {
        let unit = self.degrees();
        println!();
        println!("Current conditions: {}", conditions.description);
        println!(
            "  {:.1}{unit}  (min {:.1}{unit}, max {:.1}{unit})",
            conditions.temp, conditions.temp_min, conditions.temp_max
        );
        println!("  icon: {}", icon_url(&conditions.icon_id));
    }

    fn show_forecast(&mut self, forecast: &Forecast) {
        let unit = self.degrees();
        println!();
        println!("Forecast:");
        for day in forecast {
            println!(
                "  {}  {:.1}{unit} / {:.1}{unit}  {}",
                day.date.format("%a %b %d"),
                day.temp_min,
                day.temp_max,
                day.description
            );
        }
    }

    fn show_candidates(&mut self, candidates: &[Location]) {
        if candidates.is_empty() {
            println!("No match found");
        }
        // Non-empty lists go through the interactive picker instead.
    }

    fn request_selection(&mut self, history: &[Location]) {
        if history.is_empty() {
            println!("No saved location yet.");
        }
        // A non-empty history goes through the interactive picker.
    }

    fn dismiss_selection_prompt(&mut self) {}
}
