// src/ai/json.rs

use serde_json::Value;

/// Returns the first balanced `{...}` span in `text`, if any.
///
/// Braces inside JSON string literals do not count towards the balance.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses the first balanced object in a model response.
///
/// Returns `None` when there is no balanced span or it is not valid JSON.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let span = first_balanced_object(text)?;
    match serde_json::from_str::<Value>(span) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"topic\": \"Journal\", \"marks\": 4}\n```\nGood luck!";
        assert_eq!(
            extract_json_object(reply),
            Some(json!({"topic": "Journal", "marks": 4}))
        );
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_object() {
        let reply = r#"{"solution": "use } and { freely \" }", "n": {"x": 1}} trailing }"#;
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["solution"], "use } and { freely \" }");
        assert_eq!(value["n"]["x"], 1);
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let reply = "₹ amounts: {\"amount\": \"₹1000\"} ₹";
        assert_eq!(
            first_balanced_object(reply),
            Some("{\"amount\": \"₹1000\"}")
        );
    }

    #[test]
    fn unbalanced_or_missing_objects_yield_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"open\": true"), None);
        assert_eq!(extract_json_object("{not json}"), None);
    }
}
