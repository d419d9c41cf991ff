// src/extract.rs — Pull structured payloads out of free-form model responses

use regex::Regex;

/// First fenced block tagged `lang` (```` ```lang ... ``` ````), inner text
/// trimmed. The tag is matched literally, so `python` also matches
/// ```` ```python3 ````.
pub fn extract_fenced(text: &str, lang: &str) -> Option<String> {
    let re = fence_regex(lang)?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// First ```` ```python ```` block.
pub fn extract_code(text: &str) -> Option<String> {
    extract_fenced(text, "python")
}

/// First ```` ```latex ```` block.
pub fn extract_latex(text: &str) -> Option<String> {
    extract_fenced(text, "latex")
}

/// Every block tagged `word`, joined with newlines and trimmed. Empty when
/// there are none.
pub fn extract_prompt(text: &str, word: &str) -> String {
    let Some(re) = fence_regex(word) else {
        return String::new();
    };
    re.captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse the first JSON object found in `text`.
///
/// ```` ```json ```` blocks are tried first; without any, every balanced
/// `{...}` span is a candidate. A candidate that fails to parse is retried with
/// control characters stripped.
pub fn extract_json_between_markers(text: &str) -> Option<serde_json::Value> {
    let fenced: Vec<String> = fence_regex("json")
        .map(|re| {
            re.captures_iter(text)
                .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
                .collect()
        })
        .unwrap_or_default();

    let candidates = if fenced.is_empty() {
        balanced_objects(text)
    } else {
        fenced
    };

    candidates.iter().find_map(|candidate| parse_json_lenient(candidate))
}

/// Numeric score from a response that should contain only a number.
/// Unparsable or non-finite text scores 0.
pub fn parse_score(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn fence_regex(lang: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?s)```{}(.*?)```", regex::escape(lang))).ok()
}

fn parse_json_lenient(candidate: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) {
        return Some(value);
    }
    let cleaned: String = candidate.chars().filter(|c| !c.is_control()).collect();
    serde_json::from_str(&cleaned).ok()
}

/// Balanced `{...}` spans, one per opening brace that closes, in order of
/// their start. Braces inside JSON string literals do not count. An unmatched
/// `{` in prose only loses its own span.
fn balanced_objects(text: &str) -> Vec<String> {
    text.match_indices('{')
        .filter_map(|(start, _)| balanced_span(text, start))
        .map(str::to_string)
        .collect()
}

/// The span opened by the `{` at `start`, if it closes before the text ends.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}
