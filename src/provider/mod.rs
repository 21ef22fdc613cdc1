//! The AI provider boundary.
//!
//! The core only depends on the [`Provider`] trait: chunks in, findings out,
//! one synchronous call per pipeline run. Concrete HTTP clients live outside
//! this crate; [`MockProvider`] covers tests and offline runs.
//!
//! Providers return heterogeneous raw payloads: plain JSON, JSON fenced in
//! markdown, or free text with an embedded object. [`extract_findings`]
//! normalizes all of these and never fails: anything unparseable is an empty
//! finding list.

use crate::chunk::ReviewChunk;
use crate::findings::Finding;
use anyhow::Result;

/// Black-box reviewer contract: findings in, findings out.
///
/// Implementations must not mutate their input. A failed call is fatal to
/// the pipeline run; retries belong to the adapter layer, not the core.
pub trait Provider {
    /// Provider name, used for error messages and token estimation.
    fn name(&self) -> &str;

    /// Review the chunks and return raw findings.
    fn review(&self, chunks: &[ReviewChunk]) -> Result<Vec<Finding>>;
}

/// In-process provider returning canned findings; the default when no real
/// provider is wired up.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    findings: Vec<Finding>,
}

impl MockProvider {
    /// A mock that returns no findings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that returns the given findings for every call.
    pub fn with_findings(findings: Vec<Finding>) -> Self {
        Self { findings }
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn review(&self, _chunks: &[ReviewChunk]) -> Result<Vec<Finding>> {
        Ok(self.findings.clone())
    }
}

/// Extract findings from a raw provider payload.
///
/// Attempts, in order: direct JSON decode, JSON inside a markdown code
/// fence, and a bounded text scan for an embedded `{"findings": [...]}`
/// object. The payload may be a bare array of findings or an object with a
/// `findings` key. Unparseable input yields an empty list, never an error.
pub fn extract_findings(raw: &str) -> Vec<Finding> {
    if let Some(findings) = decode_payload(raw.trim()) {
        return findings;
    }
    if let Some(fenced) = extract_code_fence(raw) {
        if let Some(findings) = decode_payload(fenced.trim()) {
            return findings;
        }
    }
    if let Some(embedded) = scan_embedded_object(raw) {
        if let Some(findings) = decode_payload(&embedded) {
            return findings;
        }
    }
    Vec::new()
}

/// Decode a candidate JSON string as either a finding array or a
/// `{"findings": [...]}` object. Malformed entries within the array are
/// skipped rather than failing the whole payload.
fn decode_payload(candidate: &str) -> Option<Vec<Finding>> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let array = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.get("findings")?.as_array()?,
        _ => return None,
    };
    Some(
        array
            .iter()
            .filter_map(|item| serde_json::from_value::<Finding>(item.clone()).ok())
            .collect(),
    )
}

/// Extract the body of the first markdown code fence, preferring ```json.
fn extract_code_fence(output: &str) -> Option<String> {
    if let Some(start) = output.find("```json") {
        let after_marker = &output[start + 7..];
        if let Some(end) = after_marker.find("```") {
            return Some(after_marker[..end].trim().to_string());
        }
    }
    if let Some(start) = output.find("```") {
        let after_marker = &output[start + 3..];
        if let Some(end) = after_marker.find("```") {
            let body = after_marker[..end].trim();
            if !body.is_empty() {
                return Some(body.to_string());
            }
        }
    }
    None
}

/// Find a balanced `{"findings"` object embedded in free text.
///
/// Brace counting tracks string literals and escapes, so braces inside
/// finding content cannot derail the scan.
fn scan_embedded_object(output: &str) -> Option<String> {
    let start = output.find(r#"{"findings""#)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in output[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(output[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
