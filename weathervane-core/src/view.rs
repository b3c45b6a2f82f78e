use crate::model::{CurrentConditions, Forecast, Location};

/// Rendering seam between the core and whatever draws on screen.
///
/// The orchestrator pushes explicit updates through these calls; the view
/// never observes core state on its own. A fetch that fails produces no
/// call at all, so the previously rendered data stays up.
pub trait View {
    fn show_current(&mut self, conditions: &CurrentConditions);

    fn show_forecast(&mut self, forecast: &Forecast);

    /// Search results are in. An empty slice means the query matched
    /// nothing, not that the search failed.
    fn show_candidates(&mut self, candidates: &[Location]);

    /// No current location; ask the user to pick one. `history` holds
    /// previously searched locations so the prompt can offer them before
    /// any fresh search; it is empty on a true first run.
    fn request_selection(&mut self, history: &[Location]);

    /// A location was chosen; close the selection prompt without waiting
    /// for weather data to arrive.
    fn dismiss_selection_prompt(&mut self);
}
