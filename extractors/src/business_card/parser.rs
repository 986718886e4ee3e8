use shared_types::Card;

/// Parse a vision-model reply into a `Card`.
///
/// Models occasionally wrap the JSON in markdown code fences despite the
/// prompt, so fences are stripped before parsing. Missing keys become
/// `None`. An unparseable reply yields the sentinel error card instead of
/// an error, so one bad image never aborts the batch it arrived in.
pub fn parse_reply(raw: &str) -> Card {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Card>(cleaned.trim()) {
        Ok(card) => card,
        Err(err) => Card::extraction_failure(format!("parse_failed: {err}")),
    }
}

/// Remove a leading ```/```json line and a trailing ``` line, if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the rest of the fence line (e.g. the "json" language tag).
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(fence) => &body[..fence],
        None => body,
    }
}
