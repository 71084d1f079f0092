//! OpenAI-compatible chat, vision, and speech client (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    clamp_temperature, Captioner, PoemGenerator, SceneAnalysis, SpeechSynthesizer, FALLBACK_POEM,
};
use crate::config::GenerationConfig;
use crate::error::{CaptionError, CompletionError};
use crate::retrieval::ReferenceDocument;

const CAPTION_SYSTEM_PROMPT: &str = "You are a poetic assistant. Return ONLY valid JSON.";

const CAPTION_USER_PROMPT: &str = r#"Analyze this image for a 19th-century poem. Identify:
1. Mood: Single adjective.
2. Themes: 2-3 abstract concepts.
3. Concrete Nouns: 3-5 physical objects.

Return strictly this JSON:
{
    "mood": "str",
    "themes": ["str", "str"],
    "concrete_nouns": ["str", "str"]
}"#;

const CAPTION_TEMPERATURE: f32 = 0.5;

const POEM_SYSTEM_PROMPT: &str = r#"You are the ghost of Emily Dickinson.
You do not speak like a modern assistant. You speak only in poetry.

Your task: observe a scene (described to you) and write a NEW poem about it.

Rules:
1. Use the style, meter, and vocabulary of the provided Reference Poems.
2. Do NOT copy the references. Use them only as a "style transfer" source.
3. Keep it short (4-12 lines).
4. Use capitalization for Emphasis.
5. Use the Em-Dash for pauses, NOT the hyphen (-). This is crucial.
6. Do not output any intro text (like "Here is a poem"). Just the poem."#;

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One client for every hosted step; cheap to clone.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    vision_model: String,
    tts_model: String,
    tts_voice: String,
    max_tokens: u32,
}

impl GroqClient {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("GROQ_API_KEY is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn chat(&self, body: &Value) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("no message content".into()))
    }

    async fn speech(&self, text: &str) -> Result<Vec<u8>, CompletionError> {
        let response = self
            .client
            .post(format!("{}/audio/speech", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.tts_model,
                "voice": self.tts_voice,
                "input": text,
                "response_format": "mp3",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Sniff the image type from its magic bytes.
fn image_mime(image: &[u8]) -> Option<&'static str> {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if image.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else {
        None
    }
}

fn caption_request(model: &str, image: &[u8]) -> Result<Value, CaptionError> {
    if image.is_empty() {
        return Err(CaptionError::EmptyImage);
    }
    let mime = image_mime(image).ok_or(CaptionError::UnsupportedImage)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);

    Ok(json!({
        "model": model,
        "messages": [
            {"role": "system", "content": CAPTION_SYSTEM_PROMPT},
            {"role": "user", "content": [
                {"type": "text", "text": CAPTION_USER_PROMPT},
                {"type": "image_url", "image_url": {"url": format!("data:{mime};base64,{encoded}")}}
            ]}
        ],
        "response_format": {"type": "json_object"},
        "temperature": CAPTION_TEMPERATURE,
    }))
}

/// Numbered reference block for the generation prompt.
fn reference_block(references: &[ReferenceDocument]) -> String {
    let mut block = String::new();
    for (i, r) in references.iter().enumerate() {
        block.push_str(&format!("\n--- Reference {} ---\n{}\n", i + 1, r.text));
    }
    block
}

fn poem_user_prompt(narrative: &str, references: &[ReferenceDocument]) -> String {
    format!(
        "SCENE OBSERVED:\n{narrative}\n\nSTYLE REFERENCES:\n{}\n\nWrite the poem now:",
        reference_block(references)
    )
}

#[async_trait]
impl Captioner for GroqClient {
    async fn caption(&self, image: &[u8]) -> Result<String, CaptionError> {
        let body = caption_request(&self.vision_model, image)?;
        tracing::info!(model = %self.vision_model, bytes = image.len(), "analyzing image");

        let content = self.chat(&body).await.map_err(|e| match e {
            CompletionError::Request(r) => CaptionError::Request(r),
            CompletionError::Status { status, body } => CaptionError::Status { status, body },
            CompletionError::InvalidResponse(m) => CaptionError::InvalidResponse(m),
        })?;

        let scene: SceneAnalysis = serde_json::from_str(&content)
            .map_err(|e| CaptionError::InvalidResponse(format!("scene JSON: {e}")))?;
        let narrative = scene.narrative();
        tracing::info!(narrative = %narrative, "caption complete");
        Ok(narrative)
    }
}

#[async_trait]
impl PoemGenerator for GroqClient {
    async fn generate(
        &self,
        narrative: &str,
        references: &[ReferenceDocument],
        temperature: f32,
    ) -> String {
        let temperature = clamp_temperature(temperature);
        tracing::info!(references = references.len(), temperature, "generating poem");

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": POEM_SYSTEM_PROMPT},
                {"role": "user", "content": poem_user_prompt(narrative, references)}
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });

        match self.chat(&body).await {
            Ok(poem) => poem,
            Err(e) => {
                tracing::error!(error = %e, "generation failed, using fallback poem");
                FALLBACK_POEM.to_string()
            }
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GroqClient {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        if text.trim().is_empty() {
            tracing::error!("speech requested for empty text");
            return None;
        }

        match self.speech(text).await {
            Ok(bytes) => {
                tracing::info!(bytes = bytes.len(), "speech synthesized");
                Some(bytes)
            }
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> ReferenceDocument {
        ReferenceDocument {
            id: "1".into(),
            vector: vec![],
            text: text.into(),
            title: "Poem 1".into(),
            score: 0.9,
        }
    }

    #[test]
    fn detects_image_types() {
        assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(image_mime(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(image_mime(b"GIF89a"), None);
    }

    #[test]
    fn caption_request_embeds_data_url() {
        let body = caption_request("vision", &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        let url = body["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn caption_request_rejects_bad_images() {
        assert!(matches!(caption_request("m", &[]), Err(CaptionError::EmptyImage)));
        assert!(matches!(
            caption_request("m", b"not an image"),
            Err(CaptionError::UnsupportedImage)
        ));
    }

    #[test]
    fn references_are_numbered_in_order() {
        let prompt = poem_user_prompt(
            "A Serene poem about Nature.",
            &[doc("I'm Nobody! Who are you?"), doc("Hope is the thing with feathers")],
        );
        let first = prompt.find("--- Reference 1 ---\nI'm Nobody!").unwrap();
        let second = prompt.find("--- Reference 2 ---\nHope").unwrap();
        assert!(first < second);
        assert!(prompt.starts_with("SCENE OBSERVED:\nA Serene poem about Nature."));
    }

    fn unreachable_client() -> GroqClient {
        let config = GenerationConfig {
            // discard port; nothing listens here
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            api_key: Some("test-key".into()),
            ..GenerationConfig::default()
        };
        GroqClient::new(&config).unwrap()
    }

    #[test]
    fn missing_key_is_rejected() {
        let config = GenerationConfig {
            api_key: None,
            ..GenerationConfig::default()
        };
        assert!(GroqClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn failed_generation_returns_fallback_poem() {
        let poem = unreachable_client()
            .generate("A Serene poem about Nature.", &[doc("A Bird came down")], 0.7)
            .await;
        assert_eq!(poem, FALLBACK_POEM);
    }

    #[tokio::test]
    async fn failed_or_blank_speech_is_none() {
        let client = unreachable_client();
        assert!(client.synthesize("  ").await.is_none());
        assert!(client.synthesize("Hope is the thing").await.is_none());
    }

    #[tokio::test]
    async fn empty_image_fails_before_any_request() {
        let err = unreachable_client().caption(&[]).await.unwrap_err();
        assert!(matches!(err, CaptionError::EmptyImage));
    }

    #[test]
    fn chat_response_parses_first_choice() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "A Bird came down"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("A Bird came down")
        );
    }
}
