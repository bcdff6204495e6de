// Gemini generateContent client
//
// Implements AnalysisClient over the Gemini REST API.
// - Web-search grounding (google_search tool) for suggestions and fact checks
// - Per-minute request quota via governor, shared by every capability and
//   awaited through `ready()` so the quota wait is not part of a call timeout
// - HTTP 408/429/5xx and transport failures are transient; other 4xx permanent
// - The model's text is scanned for the outermost JSON array and each element
//   is decoded on its own, so one bad element only affects its record

use super::analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordReply};
use crate::config::{resolve_gemini_api_key, AuditToml, GeminiConfig};
use crate::error::{AuditError, AuditResult};
use crate::models::findings::{ContradictionReport, FactCheck, SuggestionSet};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl GeminiClient {
    /// Client for a loaded configuration; fails when no API key is configured
    pub fn from_config(config: &AuditToml) -> AuditResult<Self> {
        let api_key = resolve_gemini_api_key(config)?;
        Self::new(api_key, &config.gemini, config.audit.call_timeout())
    }

    pub fn new(api_key: String, config: &GeminiConfig, timeout: Duration) -> AuditResult<Self> {
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            AuditError::Common(a11y_common::Error::Config(
                "gemini.requests_per_minute must be at least 1".to_string(),
            ))
        })?;
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_minute(per_minute));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            rate_limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one prompt and return the concatenated text of the first candidate
    async fn generate(&self, prompt: String, grounded: bool) -> AuditResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: if grounded {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
            generation_config: GenerationConfig { temperature: 0.1 },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AuditError::TransientExternal(format!("Failed to decode Gemini response: {}", e))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        debug!(model = %self.model, chars = text.len(), "Gemini response received");
        Ok(text)
    }

    async fn run<T: DeserializeOwned>(&self, prompt: String, grounded: bool) -> AuditResult<Vec<RecordReply<T>>> {
        let text = self.generate(prompt, grounded).await?;
        Ok(parse_replies(&text))
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn ready(&self) {
        self.rate_limiter.until_ready().await;
    }

    async fn suggest_missing(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<SuggestionSet>>> {
        self.run(prompts::suggest_missing(batch, hints)?, true).await
    }

    async fn detect_contradictions(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<ContradictionReport>>> {
        self.run(prompts::detect_contradictions(batch, hints)?, false).await
    }

    async fn verify_facts(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<FactCheck>>> {
        self.run(prompts::verify_facts(batch, hints)?, true).await
    }
}

// ============================================================================
// Error classification and reply parsing
// ============================================================================

/// Map a non-success HTTP status to the retry taxonomy
pub fn classify_status(status: u16, body: &str) -> AuditError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        408 | 429 | 500..=599 => {
            AuditError::TransientExternal(format!("Gemini API returned {}: {}", status, snippet))
        }
        _ => AuditError::PermanentExternal(format!("Gemini API returned {}: {}", status, snippet)),
    }
}

fn classify_transport(err: reqwest::Error) -> AuditError {
    if err.is_builder() {
        AuditError::PermanentExternal(format!("Invalid Gemini request: {}", err))
    } else {
        AuditError::TransientExternal(format!("Gemini request failed: {}", err))
    }
}

/// Slice from the first `[` to the last `]`, if both exist in that order
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode each array element independently
pub fn parse_replies<T: DeserializeOwned>(text: &str) -> Vec<RecordReply<T>> {
    let Some(array) = extract_json_array(text) else {
        warn!("No JSON array found in analysis response");
        return Vec::new();
    };

    let elements: Vec<serde_json::Value> = match serde_json::from_str(array) {
        Ok(elements) => elements,
        Err(e) => {
            warn!(error = %e, "Analysis response array is not valid JSON");
            return Vec::new();
        }
    };

    elements
        .into_iter()
        .map(|element| {
            let row_index = element
                .get("row_index")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize);
            match serde_json::from_value::<T>(element) {
                Ok(parsed) => RecordReply::Parsed(parsed),
                Err(e) => RecordReply::Malformed {
                    row_index,
                    reason: format!("Malformed reply: {}", e),
                },
            }
        })
        .collect()
}

// ============================================================================
// Prompts
// ============================================================================

mod prompts {
    use crate::services::analysis_client::{BatchRequest, FieldHints};
    use crate::error::AuditResult;

    fn header(batch: &BatchRequest) -> AuditResult<String> {
        Ok(format!(
            "Batch {} of {} ({} tools):\n{}\n",
            batch.batch_index + 1,
            batch.total_batches,
            batch.records.len(),
            serde_json::to_string_pretty(&batch.records)?
        ))
    }

    const JSON_ONLY: &str = "Echo each tool's row_index exactly as given. Return ONLY the JSON array, no other text.";

    pub fn suggest_missing(batch: &BatchRequest, hints: &FieldHints) -> AuditResult<String> {
        Ok(format!(
            "I need you to help fix missing data for these accessibility tools by searching the web \
             for current information.\n\n{}\n\
             Each tool lists its missing_requirements. For each one, search the web and suggest a value.\n\
             Recognized pricing values: {}.\nRecognized accessibility categories: {}.\n\
             Recognized platforms: {}.\n\n\
             Provide suggestions in this exact JSON format for each tool:\n\
             {{\"tool_name\": \"...\", \"row_index\": 0, \"missing_requirements\": [\"...\"], \
             \"suggestions\": [{{\"requirement\": \"...\", \"current_value\": \"...\", \
             \"suggested_value\": \"...\", \"source\": \"...\", \"confidence\": \"high|medium|low\", \
             \"notes\": \"...\"}}]}}\n\n{}",
            header(batch)?,
            hints.pricing.join(", "),
            hints.categories.join(", "),
            hints.platforms.join(", "),
            JSON_ONLY
        ))
    }

    pub fn detect_contradictions(batch: &BatchRequest, hints: &FieldHints) -> AuditResult<String> {
        Ok(format!(
            "Analyze these accessibility tools for contradictions between their descriptions and \
             their accessibility category assignments.\n\n\
             The accessibility categories in this database are: {}.\n\n{}\n\
             Identify tools where the description indicates a category that is missing, where an \
             assigned category is not supported by the description, or where categories are \
             over-assigned.\n\n\
             Provide your analysis in this exact JSON format for each tool (use an empty \
             contradictions array when there are none):\n\
             {{\"tool_name\": \"...\", \"row_index\": 0, \"contradictions\": [{{\"type\": \
             \"missing_category|incorrect_category_assignment|category_mismatch|overcategorization\", \
             \"category_involved\": \"...\", \"description\": \"...\", \"recommendation\": \"...\"}}]}}\n\n{}",
            hints.categories.join(", "),
            header(batch)?,
            JSON_ONLY
        ))
    }

    pub fn verify_facts(batch: &BatchRequest, _hints: &FieldHints) -> AuditResult<String> {
        Ok(format!(
            "Verify the accuracy of information in these accessibility tools by searching the web.\n\n{}\n\
             For each tool, search and verify whether the information is correct.\n\n\
             Return a JSON array with this structure for each tool:\n\
             {{\"tool_name\": \"...\", \"row_index\": 0, \"id_tag\": \"...\", \
             \"is_information_correct\": true, \"incorrect_information\": [{{\"field\": \"...\", \
             \"incorrect_value\": \"...\", \"correct_value\": \"...\"}}]}}\n\
             Omit incorrect_information when everything is correct.\n\n{}",
            header(batch)?,
            JSON_ONLY
        ))
    }
}
