use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use extractors::business_card;
use serde::Deserialize;
use shared_types::Card;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Client for the vision extraction collaborator: sends one card image per
/// chat-completion request and parses the JSON reply into a `Card`.
pub struct OpenAiVisionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiVisionClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Extract one card from raw image bytes. Failures come back as the
    /// sentinel error card rather than an `Err`: a rejected request or an
    /// unreadable image must not abort the rest of the batch.
    pub async fn extract_card(&self, image: &[u8], filename: &str) -> Card {
        let mime = business_card::mime_type_for(filename);
        let data_uri = format!("data:{};base64,{}", mime, BASE64.encode(image));

        match self.request_completion(&data_uri).await {
            Ok(reply) => business_card::parse_reply(&reply),
            Err(err) => {
                tracing::warn!("vision extraction failed for {}: {}", filename, err);
                Card::extraction_failure(format!("vision request failed: {err}"))
            }
        }
    }

    /// Extract a batch of images in submission order.
    pub async fn extract_cards(&self, images: &[(String, Vec<u8>)]) -> Vec<Card> {
        let mut cards = Vec::with_capacity(images.len());
        for (filename, bytes) in images {
            cards.push(self.extract_card(bytes, filename).await);
        }
        cards
    }

    async fn request_completion(&self, data_uri: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {
                    "role": "system",
                    "content": business_card::system_prompt(),
                },
                {
                    "role": "user",
                    "content": [
                        {"type": "image_url", "image_url": {"url": data_uri}}
                    ],
                },
            ],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API returned {}: {}", status, detail);
        }

        let reply: ChatCompletionReply = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion reply carried no choices"))
    }
}
