pub mod caption_image;
pub mod compose_poem;
pub mod reset_session;
pub mod retrieve_references;
pub mod visualize_narrative;

use std::sync::Arc;

use caption_image::CaptionImageParams;
use compose_poem::ComposePoemParams;
use reset_session::ResetSessionParams;
use retrieve_references::RetrieveReferencesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde_json::json;
use visualize_narrative::VisualizeNarrativeParams;

use ekphrasis::collaborators::groq::GroqClient;
use ekphrasis::collaborators::{
    encode_caption, AudioClip, Captioner, PoemGenerator, SpeechSynthesizer,
};
use ekphrasis::error::CaptionError;
use ekphrasis::pipeline::PipelineOrchestrator;
use ekphrasis::projection::ProjectedPoint;
use ekphrasis::retrieval::{top_k_in_range, MAX_TOP_K};

use crate::server::SharedState;

/// The Ekphrasis MCP tool handler. One instance per MCP session: the
/// pipeline (and its result memo) is per session, the background cache and
/// clients are shared.
#[derive(Clone)]
pub struct EkphrasisTools {
    tool_router: ToolRouter<Self>,
    state: SharedState,
    pipeline: Arc<PipelineOrchestrator>,
}

#[tool_router]
impl EkphrasisTools {
    pub fn new(state: SharedState) -> Self {
        let pipeline = Arc::new(PipelineOrchestrator::new(
            state.retrieval.clone(),
            Arc::clone(&state.background),
            state.config.retrieval.top_k,
        ));
        Self {
            tool_router: Self::tool_router(),
            state,
            pipeline,
        }
    }

    fn groq(&self) -> Result<&GroqClient, String> {
        self.state
            .groq
            .as_deref()
            .ok_or_else(|| "GROQ_API_KEY is not configured".to_string())
    }

    /// Find the reference poems nearest to a narrative.
    #[tool(description = "Embed a scene narrative and return the nearest reference poems, most similar first.")]
    async fn retrieve_references(
        &self,
        Parameters(params): Parameters<RetrieveReferencesParams>,
    ) -> Result<String, String> {
        let top_k = params.top_k.unwrap_or(self.state.config.retrieval.top_k);
        if !top_k_in_range(top_k) {
            return Err(format!("top_k must be between 1 and {MAX_TOP_K}"));
        }

        tracing::info!(narrative = %params.narrative, top_k, "retrieve_references called");

        let context = self
            .state
            .retrieval
            .retrieve(&params.narrative, top_k)
            .await
            .map_err(|e| format!("retrieval failed: {e}"))?;

        let body = json!({
            "narrative": context.narrative,
            "degraded": context.is_degraded(),
            "references": context.references,
        });
        serde_json::to_string(&body).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Project a narrative into the 3-D latent map.
    #[tool(description = "Place a scene narrative, its reference poems, and a background sample of the corpus in a 3-D latent map. Points are null when there is nothing to draw.")]
    async fn visualize_narrative(
        &self,
        Parameters(params): Parameters<VisualizeNarrativeParams>,
    ) -> Result<String, String> {
        tracing::info!(narrative = %params.narrative, "visualize_narrative called");

        let result = self
            .pipeline
            .run(&params.narrative)
            .await
            .map_err(|e| format!("pipeline failed: {e}"))?;

        let body = json!({
            "narrative": result.query_context.narrative,
            "degraded": result.query_context.is_degraded(),
            "references": result.query_context.references,
            "points": result.points.as_deref().map(points_json),
        });
        serde_json::to_string(&body).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Describe an image as a scene narrative. Failures carry the `ERROR:`
    /// caption prefix.
    #[tool(description = "Analyze a JPEG or PNG image and return its scene narrative (mood, themes, concrete nouns). Errors start with 'ERROR:'.")]
    async fn caption_image(
        &self,
        Parameters(params): Parameters<CaptionImageParams>,
    ) -> Result<String, String> {
        tracing::info!(path = %params.path, "caption_image called");
        let captioner = self.state.groq.as_deref().map(|g| g as &dyn Captioner);
        caption_response(caption_file(captioner, &params.path).await)
    }

    /// Write a poem for a narrative in the style of its references.
    #[tool(description = "Write a short poem about a scene narrative in the style of its nearest reference poems. Optionally read it aloud to an MP3 file.")]
    async fn compose_poem(
        &self,
        Parameters(params): Parameters<ComposePoemParams>,
    ) -> Result<String, String> {
        let groq = self.groq()?;
        let temperature = params
            .temperature
            .unwrap_or(self.state.config.generation.temperature);

        tracing::info!(narrative = %params.narrative, temperature, "compose_poem called");

        let result = self
            .pipeline
            .run(&params.narrative)
            .await
            .map_err(|e| format!("pipeline failed: {e}"))?;
        let references = &result.query_context.references;
        let poem = groq
            .generate(&params.narrative, references, temperature)
            .await;

        let audio = match params.audio_path {
            None => None,
            Some(path) => Some(match AudioClip::validate(groq.synthesize(&poem).await) {
                AudioClip::Playable(bytes) => {
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| format!("failed to write {path}: {e}"))?;
                    json!({ "status": "written", "path": path, "bytes": bytes.len() })
                }
                AudioClip::Rejected { size } => json!({ "status": "rejected", "bytes": size }),
                AudioClip::Missing => json!({ "status": "missing" }),
            }),
        };

        let titles: Vec<&str> = references.iter().map(|r| r.title.as_str()).collect();
        let body = json!({
            "poem": poem,
            "references": titles,
            "audio": audio,
        });
        serde_json::to_string(&body).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Forget this session's cached result and the shared background sample.
    #[tool(description = "Clear cached results so the next call re-queries the embedding and index services.")]
    async fn reset_session(
        &self,
        Parameters(_params): Parameters<ResetSessionParams>,
    ) -> Result<String, String> {
        tracing::info!("reset_session called");
        self.pipeline
            .reset()
            .await
            .map_err(|e| format!("reset failed: {e}"))?;
        Ok(json!({ "status": "reset" }).to_string())
    }
}

async fn caption_file(
    captioner: Option<&dyn Captioner>,
    path: &str,
) -> Result<String, CaptionError> {
    let captioner = captioner
        .ok_or_else(|| CaptionError::Unavailable("GROQ_API_KEY is not configured".into()))?;
    let image = tokio::fs::read(path)
        .await
        .map_err(|e| CaptionError::Unavailable(format!("failed to read {path}: {e}")))?;
    captioner.caption(&image).await
}

/// Tool output for a caption: the narrative as JSON, or the encoded error.
fn caption_response(result: Result<String, CaptionError>) -> Result<String, String> {
    let wire = encode_caption(&result);
    match result {
        Ok(_) => Ok(json!({ "narrative": wire }).to_string()),
        Err(e) => {
            tracing::error!(error = %e, "caption failed");
            Err(wire)
        }
    }
}

fn points_json(points: &[ProjectedPoint]) -> Vec<serde_json::Value> {
    points
        .iter()
        .map(|p| {
            let (x, y, z) = p.coordinates;
            json!({
                "x": x,
                "y": y,
                "z": z,
                "label": p.label,
                "group": p.category.group(),
                "color": p.category.color(),
                "weight": p.weight,
            })
        })
        .collect()
}

#[tool_handler]
impl ServerHandler for EkphrasisTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Ekphrasis turns scenes into poems. Use caption_image to describe an image, \
                 retrieve_references or visualize_narrative to explore the poem corpus, and \
                 compose_poem to write a new poem."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekphrasis::collaborators::{decode_caption, CAPTION_ERROR_PREFIX};

    #[test]
    fn caption_failure_carries_the_error_prefix() {
        let err = caption_response(Err(CaptionError::UnsupportedImage)).unwrap_err();
        assert!(err.starts_with(CAPTION_ERROR_PREFIX));
        assert!(matches!(decode_caption(&err), Err(CaptionError::Remote(_))));
    }

    #[test]
    fn caption_success_is_plain_narrative() {
        let ok = caption_response(Ok("A Serene poem about Nature.".into())).unwrap();
        let body: serde_json::Value = serde_json::from_str(&ok).unwrap();
        assert_eq!(body["narrative"], "A Serene poem about Nature.");
    }

    #[tokio::test]
    async fn missing_captioner_is_an_encoded_error() {
        let err = caption_response(caption_file(None, "/nonexistent.jpg").await).unwrap_err();
        assert!(err.starts_with(CAPTION_ERROR_PREFIX));
        assert!(err.contains("GROQ_API_KEY"));
    }
}
