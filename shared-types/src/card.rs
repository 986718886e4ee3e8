use serde::{Deserialize, Serialize};

/// One business card's extracted contact fields. Every field is optional:
/// the vision model returns null for anything it cannot read off the card.
///
/// The email is the identity key: two cards with the same non-empty email
/// refer to the same contact. A card without an email can never collide
/// with a stored contact and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub qualification: Option<String>,
    pub company_address: Option<String>,
    pub company_url: Option<String>,
    pub company_phone: Option<String>,
    pub company_fax: Option<String>,
    /// Set when extraction could not produce a usable card for an image.
    /// Such a card carries no fields and flows through the pipeline as an
    /// ordinary keyless card, so one bad image never aborts a batch.
    pub extraction_error: Option<String>,
}

impl Card {
    /// The identity key: the trimmed email, if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Sentinel card for a failed extraction: all fields null, error set.
    pub fn extraction_failure(error: impl Into<String>) -> Self {
        Card {
            extraction_error: Some(error.into()),
            ..Card::default()
        }
    }
}
