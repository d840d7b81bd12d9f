use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            JsonShape::Object => ('{', '}'),
            JsonShape::Array => ('[', ']'),
        }
    }
}

/// Returns the first balanced `{...}` or `[...]` block in free-form model output.
///
/// One pass with a stack of open positions. String literals are tracked only
/// inside a block, so quotes in surrounding prose do not hide it. An opening
/// delimiter that never closes is skipped in favour of the earliest block
/// that does.
pub fn find_json_block(text: &str, shape: JsonShape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let mut opens: Vec<usize> = Vec::new();
    let mut earliest: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if !opens.is_empty() => in_string = true,
            _ if c == open => opens.push(offset),
            _ if c == close => {
                let Some(start) = opens.pop() else { continue };
                let end = offset + c.len_utf8();
                if opens.is_empty() {
                    return Some(&text[start..end]);
                }
                if earliest.map_or(true, |(first, _)| start < first) {
                    earliest = Some((start, end));
                }
            }
            _ => {}
        }
    }

    earliest.map(|(start, end)| &text[start..end])
}

/// Parses the first JSON block of the given shape, or `None` when there is
/// no block or it is not valid JSON.
pub fn parse_json_block(text: &str, shape: JsonShape) -> Option<Value> {
    let block = find_json_block(text, shape)?;
    serde_json::from_str(block)
        .map_err(|e| debug!("Model returned a block that is not valid JSON: {}", e))
        .ok()
}

/// Applies the fields of a model answer to `base` one at a time.
///
/// A field that is missing or does not fit `T` keeps its value from `base`;
/// every other field is taken from the answer. Non-object answers are
/// decoded whole, falling back to `base`.
pub fn overlay<T>(base: T, answer: Value) -> T
where
    T: Serialize + DeserializeOwned,
{
    let fields = match answer {
        Value::Object(fields) => fields,
        other => {
            return serde_json::from_value(other)
                .map_err(|e| debug!("Model answer did not match the expected shape: {}", e))
                .unwrap_or(base)
        }
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&base) else {
        return base;
    };

    let mut current = base;
    for (key, field) in fields {
        let previous = merged.insert(key.clone(), field);
        match serde_json::from_value::<T>(Value::Object(merged.clone())) {
            Ok(parsed) => current = parsed,
            Err(e) => {
                debug!(field = %key, "Ignoring unusable field in model answer: {}", e);
                match previous {
                    Some(value) => merged.insert(key, value),
                    None => merged.remove(&key),
                };
            }
        }
    }
    current
}

/// Matches a string against `variants` ignoring ASCII case and surrounding
/// whitespace.
pub fn variant_ignoring_case<'de, D, T>(
    deserializer: D,
    variants: &[(&'static str, T)],
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Copy,
{
    let raw = String::deserialize(deserializer)?;
    let wanted = raw.trim();
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, variant)| *variant)
        .ok_or_else(|| {
            let names: Vec<&str> = variants.iter().map(|(name, _)| *name).collect();
            de::Error::custom(format!("unknown variant `{}`, expected one of {:?}", raw, names))
        })
}

/// Accepts any JSON number (or numeric string) as a score, rounded and
/// clamped to `0..=100`.
pub fn percentage<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| de::Error::custom(format!("expected a numeric score, got {}", value)))?;
    Ok(number.round().clamp(0.0, 100.0) as u32)
}
