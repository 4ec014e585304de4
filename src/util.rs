//! Small utility helpers used across modules.

use serde::Deserialize;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values, in order.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip a Markdown code fence wrapped around a model payload.
///
/// Accepts "```json\n{..}\n```", "```\n{..}```", "``` JSON {..}" (no closer),
/// leading/trailing whitespace, and text that isn't fenced at all.
pub fn strip_code_fence(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else { return s };
  // Optional language tag on the opening line.
  let rest = rest.trim_start_matches([' ', '\t']);
  let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  let rest = rest.trim_end();
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Pull a readable message out of a provider error body.
/// Tries `error.message`, then top-level `message`, and gives up otherwise.
pub fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { #[serde(default)] error: Option<EObj>, #[serde(default)] message: Option<String> }
  #[derive(Deserialize)]
  struct EObj { #[serde(default)] message: Option<String> }
  let w = serde_json::from_str::<EWrap>(body).ok()?;
  w.error.and_then(|e| e.message).or(w.message).filter(|m| !m.trim().is_empty())
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
