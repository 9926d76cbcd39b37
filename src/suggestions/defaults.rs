//! Hardcoded last-resort suggestions.

use super::types::SuggestionRecord;
use once_cell::sync::Lazy;

static DEFAULT_SUGGESTIONS: Lazy<Vec<SuggestionRecord>> = Lazy::new(|| {
    vec![
        SuggestionRecord::new("Seattle, Washington", 1350)
            .with_country("United States")
            .with_description("Pike Place Market, ferries across the Sound and coffee everywhere.")
            .with_vibes(&["food", "city", "outdoors"]),
        SuggestionRecord::new("Portland, Oregon", 1500)
            .with_country("United States")
            .with_description("Food carts, Forest Park hikes and easy day trips to the Columbia Gorge.")
            .with_vibes(&["food", "outdoors", "culture"]),
        SuggestionRecord::new("San Diego, California", 1900)
            .with_country("United States")
            .with_description("Beaches, Balboa Park and year-round sunshine.")
            .with_vibes(&["beach", "relaxation", "family"]),
    ]
});

/// Suggestions returned when neither the AI service nor the seed table can answer.
/// Never empty.
pub fn default_suggestions() -> Vec<SuggestionRecord> {
    DEFAULT_SUGGESTIONS.clone()
}
