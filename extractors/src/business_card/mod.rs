mod parser;
mod prompt;

pub use parser::parse_reply;
pub use prompt::system_prompt;

/// Pick the image MIME type from the uploaded filename. The vision API
/// only needs a plausible type for the data URI; PNG is the fallback.
pub fn mime_type_for(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}
