//! Vision-model collaborator: screenshots plus a prompt in, a JSON object out.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use beslist_core::{PageFeatures, Verdict, Winner};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AnalyzerConfig;
use crate::error::VisionError;

/// A chat model that answers with a single JSON object.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends `prompt` with the given PNG screenshots attached.
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        images: &[&Path],
    ) -> Result<Value, VisionError>;
}

/// OpenAI-compatible `chat/completions` client using `json_object` output.
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_retries: u32,
    backoff: Duration,
}

impl OpenAiVision {
    /// # Errors
    ///
    /// Returns [`VisionError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            max_retries: 3,
            backoff: Duration::from_secs(2),
        })
    }

    /// Builds the client when an API key is configured; `Ok(None)` otherwise.
    ///
    /// Vision calls upload two full-page screenshots, so the timeout is the
    /// larger of the request and screenshot timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Option<Self>, VisionError> {
        let Some(key) = config.openai_api_key.as_deref() else {
            return Ok(None);
        };
        let timeout = config
            .request_timeout_secs
            .max(config.screenshot_timeout_secs);
        let vision = Self::new(key, &config.vision_base_url, &config.vision_model, timeout)?
            .with_retry(
                config.max_retries,
                Duration::from_secs(config.retry_backoff_secs),
            );
        Ok(Some(vision))
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    async fn send_once(&self, request: &Request<'_>) -> Result<Value, VisionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(VisionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: Response = response
            .json()
            .await
            .map_err(|e| VisionError::MalformedOutput(format!("response body: {e}")))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VisionError::MalformedOutput("no message content".to_owned()))?;

        parse_json_object(&content)
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionModel for OpenAiVision {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        images: &[&Path],
    ) -> Result<Value, VisionError> {
        let mut parts = vec![ContentPart::Text {
            text: prompt.to_owned(),
        }];
        for path in images {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: png_data_url(path).await?,
                    detail: "high",
                },
            });
        }

        let request = Request {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.1,
            messages: vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system.to_owned()),
                },
                Message {
                    role: "user",
                    content: MessageContent::Parts(parts),
                },
            ],
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retriable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "vision request failed; retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn png_data_url(path: &Path) -> Result<String, VisionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| VisionError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
}

/// Parses model text as a JSON object, tolerating a surrounding code fence.
fn parse_json_object(content: &str) -> Result<Value, VisionError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(VisionError::MalformedOutput(
            "expected a JSON object".to_owned(),
        )),
        Err(e) => Err(VisionError::MalformedOutput(e.to_string())),
    }
}

const FEATURES_SYSTEM_PROMPT: &str = "You inspect screenshots of Dutch product \
comparison pages and report what is visibly shown. Answer with one JSON object.";

const FEATURES_PROMPT: &str = "Look at this product page screenshot and answer \
with a JSON object using exactly these keys:\n\
- on_sale: true if a discount, old price or sale badge is visible, else false\n\
- has_reviews: true if review stars or a review count are visible, else false\n\
- shipping_info: short text of any shipping cost information, or null\n\
- free_shipping: true if free shipping is shown, false if a shipping cost is shown, null if unknown\n\
- delivery_time: short text of any delivery time, or null\n\
- notes: one sentence on anything else notable, or null";

const COMPARE_SYSTEM_PROMPT: &str = "You are a search ranking expert evaluating \
two rankings of the same Dutch product listing page. Answer with one JSON object.";

/// Listing context sent along with an A/B screenshot pair.
#[derive(Debug, Clone, Default)]
pub struct ComparisonContext<'a> {
    pub url: &'a str,
    pub h1_title: Option<&'a str>,
    pub titles_a: &'a [String],
    pub titles_b: &'a [String],
}

/// Extracts page features from one screenshot.
///
/// # Errors
///
/// Any [`VisionError`] from the model, or [`VisionError::MalformedOutput`]
/// when the answer does not fit [`PageFeatures`].
pub async fn extract_features(
    model: &dyn VisionModel,
    screenshot: &Path,
) -> Result<PageFeatures, VisionError> {
    let value = model
        .complete_json(FEATURES_SYSTEM_PROMPT, FEATURES_PROMPT, &[screenshot])
        .await?;
    serde_json::from_value(value).map_err(|e| VisionError::MalformedOutput(e.to_string()))
}

/// Judges which ranking variant serves the page's search intent better.
///
/// # Errors
///
/// Any [`VisionError`] from the model, or [`VisionError::MalformedOutput`]
/// when the answer lacks a valid winner or scores.
pub async fn compare_variants(
    model: &dyn VisionModel,
    screenshot_a: &Path,
    screenshot_b: &Path,
    context: &ComparisonContext<'_>,
) -> Result<Verdict, VisionError> {
    let prompt = comparison_prompt(context);
    let value = model
        .complete_json(COMPARE_SYSTEM_PROMPT, &prompt, &[screenshot_a, screenshot_b])
        .await?;
    parse_verdict(value)
}

fn comparison_prompt(context: &ComparisonContext<'_>) -> String {
    let list = |titles: &[String]| {
        if titles.is_empty() {
            "(not available)".to_owned()
        } else {
            titles
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{}. {t}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };
    format!(
        "The first image shows variant A and the second variant B of the listing page {url}.\n\
         Page heading: {h1}\n\n\
         Top products in variant A:\n{a}\n\n\
         Top products in variant B:\n{b}\n\n\
         Judge which variant ranks products that better match the page's search intent \
         (relevance of the top results, variety, visible prices and availability).\n\
         Answer with a JSON object with keys:\n\
         - winner: \"A\", \"B\" or \"tie\"\n\
         - confidence: number between 0 and 1\n\
         - score_a: relevance score for A from 0 to 10\n\
         - score_b: relevance score for B from 0 to 10\n\
         - winner_summary: one sentence\n\
         - reasoning: a short paragraph\n\
         - key_differences: list of short strings",
        url = context.url,
        h1 = context.h1_title.unwrap_or("(not available)"),
        a = list(context.titles_a),
        b = list(context.titles_b),
    )
}

#[derive(Deserialize)]
struct RawVerdict {
    winner: Winner,
    #[serde(default)]
    confidence: Option<f64>,
    score_a: f64,
    score_b: f64,
    #[serde(default)]
    winner_summary: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    key_differences: Option<Value>,
}

/// Validates a model answer into a [`Verdict`]. Confidence given as a
/// percentage is scaled down; the result is clamped to `[0, 1]`.
fn parse_verdict(value: Value) -> Result<Verdict, VisionError> {
    let raw: RawVerdict =
        serde_json::from_value(value).map_err(|e| VisionError::MalformedOutput(e.to_string()))?;

    let mut confidence = raw.confidence.unwrap_or(0.0);
    if confidence > 1.0 {
        confidence /= 100.0;
    }
    let confidence = confidence.clamp(0.0, 1.0);

    let key_differences = match raw.key_differences {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    };

    Ok(Verdict {
        winner: raw.winner,
        confidence,
        score_a: raw.score_a,
        score_b: raw.score_b,
        winner_summary: raw.winner_summary,
        reasoning: raw.reasoning,
        key_differences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fenced_json_object() {
        let value = parse_json_object("```json\n{\"on_sale\": true}\n```").unwrap();
        assert_eq!(value["on_sale"], json!(true));
    }

    #[test]
    fn non_object_output_is_malformed() {
        assert!(matches!(
            parse_json_object("[1, 2]"),
            Err(VisionError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_json_object("Variant A wins"),
            Err(VisionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn verdict_accepts_lowercase_tie_and_percent_confidence() {
        let verdict = parse_verdict(json!({
            "winner": "tie",
            "confidence": 80,
            "score_a": 7.0,
            "score_b": 7.0,
            "key_differences": ["same top 3", "B shows more brands"]
        }))
        .unwrap();
        assert_eq!(verdict.winner, Winner::Tie);
        assert!((verdict.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(
            verdict.key_differences.as_deref(),
            Some("same top 3; B shows more brands")
        );
    }

    #[test]
    fn verdict_rejects_unknown_winner() {
        let result = parse_verdict(json!({"winner": "C", "score_a": 1, "score_b": 2}));
        assert!(matches!(result, Err(VisionError::MalformedOutput(_))));
    }

    #[test]
    fn verdict_requires_scores() {
        let result = parse_verdict(json!({"winner": "A", "confidence": 0.9}));
        assert!(matches!(result, Err(VisionError::MalformedOutput(_))));
    }

    #[test]
    fn prompt_lists_titles_per_variant() {
        let a = vec!["Sneaker wit".to_owned()];
        let context = ComparisonContext {
            url: "https://www.beslist.nl/schoenen/",
            h1_title: Some("Schoenen"),
            titles_a: &a,
            titles_b: &[],
        };
        let prompt = comparison_prompt(&context);
        assert!(prompt.contains("1. Sneaker wit"));
        assert!(prompt.contains("Top products in variant B:\n(not available)"));
        assert!(prompt.contains("Page heading: Schoenen"));
    }
}
