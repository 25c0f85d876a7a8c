//! Size-in-title detection.

use std::sync::LazyLock;

use regex::Regex;

use crate::vision::VisionModel;

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(maat|mt|size)\s*\d+\b|\b\d{2}(\.5)?\b").expect("valid size regex")
});

const SIZE_SYSTEM_PROMPT: &str = "You classify Dutch e-commerce product titles. \
Answer with a JSON object {\"has_size\": true|false}.";

/// Pattern check: `maat 42`, `mt 38`, `size 9`, or a bare two-digit size
/// (optionally `.5`).
#[must_use]
pub fn size_in_title_pattern(title: &str) -> bool {
    SIZE_RE.is_match(&title.to_lowercase())
}

/// Asks the model whether `title` names a specific size, falling back to
/// [`size_in_title_pattern`] when no model is configured or the call fails.
pub async fn size_in_title(model: Option<&dyn VisionModel>, title: &str) -> bool {
    let Some(model) = model else {
        return size_in_title_pattern(title);
    };

    let prompt = format!(
        "Does this product title contain a specific size (for example 'maat 42', \
         'mt 38' or a numeric shoe or clothing size)?\n\nTitle: {title}"
    );
    match model.complete_json(SIZE_SYSTEM_PROMPT, &prompt, &[]).await {
        Ok(value) => match value.get("has_size").and_then(serde_json::Value::as_bool) {
            Some(answer) => answer,
            None => {
                tracing::warn!(title, "model gave no has_size answer; using pattern");
                size_in_title_pattern(title)
            }
        },
        Err(e) => {
            tracing::warn!(title, error = %e, "size check failed; using pattern");
            size_in_title_pattern(title)
        }
    }
}
