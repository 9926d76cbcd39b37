use crate::cache::NormalizedSuggestionParams;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are a travel planner. Reply with a JSON array only, no prose. \
Each element must have: destination (string), country (string), estimatedTotal (integer, whole trip \
cost for the party), flightEstimate (integer), hotelEstimate (integer), description (one sentence), \
vibes (array of strings from the traveller's vibes that the destination matches).";

/// User prompt for a suggestion request.
pub fn build_prompt(params: &NormalizedSuggestionParams) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Suggest 3 to 5 trip destinations for travellers leaving from {}. \
         Total budget: {} for {} adult{}",
        params.origin_label,
        params.budget,
        params.adults,
        if params.adults == 1 { "" } else { "s" },
    );
    if params.kids > 0 {
        let _ = write!(
            prompt,
            " and {} kid{}",
            params.kids,
            if params.kids == 1 { "" } else { "s" }
        );
    }
    prompt.push('.');

    if !params.vibes.is_empty() {
        let _ = write!(prompt, " Desired vibes: {}.", params.vibes.join(", "));
    }
    match (&params.start_date, &params.end_date) {
        (Some(start), Some(end)) => {
            let _ = write!(prompt, " Travel dates: {} to {}.", start, end);
        }
        (Some(start), None) => {
            let _ = write!(prompt, " Departing {}.", start);
        }
        (None, Some(end)) => {
            let _ = write!(prompt, " Returning by {}.", end);
        }
        (None, None) => {}
    }
    if let Some(details) = &params.additional_details {
        let _ = write!(prompt, " Additional details: {}", details);
    }
    prompt.push_str(" Keep every estimatedTotal within the budget.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKeyBuilder;
    use serde_json::json;

    #[test]
    fn test_prompt_for_defaults() {
        let params = CacheKeyBuilder::new().normalize(&json!({}));
        let prompt = build_prompt(&params);
        assert!(prompt.contains("leaving from Vancouver"));
        assert!(prompt.contains("budget: 2000 for 2 adults."));
        assert!(!prompt.contains("kid"));
        assert!(!prompt.contains("vibes"));
    }

    #[test]
    fn test_prompt_includes_everything_given() {
        let params = CacheKeyBuilder::new().normalize(&json!({
            "from": "Toronto",
            "budget": 3000,
            "vibes": ["food", "beach"],
            "adults": 1,
            "kids": 1,
            "startDate": "2026-12-20",
            "endDate": "2026-12-27",
            "additionalDetails": "vegetarian"
        }));
        let prompt = build_prompt(&params);
        assert!(prompt.contains("1 adult and 1 kid."));
        assert!(prompt.contains("Desired vibes: food, beach."));
        assert!(prompt.contains("2026-12-20 to 2026-12-27"));
        assert!(prompt.contains("Additional details: vegetarian"));
    }
}
