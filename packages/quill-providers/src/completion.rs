//! Chat-completions client. One request per call; callers decide whether to try again.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends `messages` to the configured model and returns the JSON object it answered with.
pub async fn complete(cfg: &quill_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	tracing::debug!(provider = %cfg.provider_id, model = %cfg.model, "Sending completion request.");

	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_json(json)
}

/// Reads the JSON object out of `choices[0].message.content`. A bare object body is accepted
/// as-is for providers that answer without the chat envelope.
pub fn parse_completion_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(strip_code_fence(content)).map_err(|err| {
			Error::InvalidResponse { message: format!("Completion content is not valid JSON: {err}.") }
		})?;

		if !parsed.is_object() {
			return Err(Error::InvalidResponse {
				message: "Completion content must be a JSON object.".to_string(),
			});
		}

		return Ok(parsed);
	}

	if json.is_object() && json.get("choices").is_none() {
		return Ok(json);
	}

	Err(Error::InvalidResponse { message: "Completion response is missing JSON content.".to_string() })
}

// Some models wrap JSON answers in a markdown fence.
fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
