//! Legacy script encoding of the nested org chart.
//!
//! This is not a JSON encoder. It reproduces the text the admin page script
//! has always consumed: every scalar field is followed by a comma (the last
//! one included), keys and strings are interpolated without escaping, and
//! `emoji` is written as UTF-16 `\u` escapes. Use `serde_json` for anything
//! that expects real JSON.

pub mod utf16;

use serde_json::Value;

use crate::record::CHILDREN_FIELD;
use crate::tree::NestedNode;

/// Field whose value is written as UTF-16 escapes.
pub const EMOJI_FIELD: &str = "emoji";

/// Failure to encode an `emoji` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("emoji is empty")]
    EmptyInput,
    #[error("invalid UTF-8 lead byte 0x{0:02x}")]
    InvalidLeadByte(u8),
    #[error("truncated UTF-8 sequence: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("invalid UTF-8 continuation byte 0x{0:02x}")]
    InvalidContinuation(u8),
    #[error("emoji is more than one character ({0} extra bytes)")]
    TrailingBytes(usize),
    #[error("emoji is not a string")]
    NotText,
}

/// Encode a nested tree; `None` encodes as `null`.
pub fn encode_tree(root: Option<&NestedNode>) -> Result<String, EncodeError> {
    let Some(root) = root else {
        return Ok("null".to_string());
    };

    let mut js = String::new();
    open_node(&mut js, root)?;

    // Each frame: the children still to write, and whether one was written already.
    let mut stack = vec![(root.children.iter(), false)];
    while let Some((pending, started)) = stack.last_mut() {
        match pending.next() {
            Some(child) => {
                if *started {
                    js.push_str(", ");
                }
                *started = true;
                open_node(&mut js, child)?;
                stack.push((child.children.iter(), false));
            }
            None => {
                js.push_str("]}");
                stack.pop();
            }
        }
    }

    Ok(js)
}

/// Write `{`, the node's own fields, and the opening of its children array.
fn open_node(js: &mut String, node: &NestedNode) -> Result<(), EncodeError> {
    js.push('{');
    for (key, value) in &node.fields {
        if key == CHILDREN_FIELD {
            continue;
        }
        js.push('"');
        js.push_str(key);
        js.push_str("\":");
        encode_value(js, key, value)?;
    }
    js.push('"');
    js.push_str(CHILDREN_FIELD);
    js.push_str("\":[");
    Ok(())
}

fn encode_value(js: &mut String, key: &str, value: &Value) -> Result<(), EncodeError> {
    if let Some(number) = numeric_text(value) {
        js.push_str(&number);
        js.push(',');
        return Ok(());
    }

    if key == EMOJI_FIELD {
        let emoji = value.as_str().ok_or(EncodeError::NotText)?;
        js.push_str(&utf16::emoji_to_js(emoji)?);
        return Ok(());
    }

    match value {
        Value::Null => js.push_str("null,"),
        Value::Bool(true) => js.push_str("\"1\","),
        Value::Bool(false) => js.push_str("\"\","),
        Value::String(s) => {
            js.push('"');
            js.push_str(s);
            js.push_str("\",");
        }
        other => {
            js.push('"');
            js.push_str(&other.to_string());
            js.push_str("\",");
        }
    }
    Ok(())
}

/// Text of a value that is written as a bare number: JSON numbers and numeric strings.
fn numeric_text(value: &Value) -> Option<std::borrow::Cow<'_, str>> {
    match value {
        Value::Number(n) => Some(number_text(n).into()),
        Value::String(s) if is_numeric(s) => Some(s.as_str().into()),
        _ => None,
    }
}

/// Whole floats print without a fraction (`1.0` as `1`), the way the admin
/// page has always received them. Larger magnitudes keep exponent form.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            if f == 0.0 && f.is_sign_negative() {
                "-0".to_string()
            } else {
                (f as i64).to_string()
            }
        }
        _ => n.to_string(),
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0b}' | '\u{0c}')
}

/// Numeric string: optional surrounding whitespace, sign, digits with an
/// optional fraction, and an optional exponent.
fn is_numeric(s: &str) -> bool {
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let is_sign = |c: char| c == '+' || c == '-';

    let trimmed = s.trim_start_matches(is_blank).trim_end_matches(is_blank);
    let unsigned = trimmed.strip_prefix(is_sign).unwrap_or(trimmed);

    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };

    if !all_digits(int_part) || !all_digits(frac_part) || int_part.len() + frac_part.len() == 0 {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let digits = exp.strip_prefix(is_sign).unwrap_or(exp);
            !digits.is_empty() && all_digits(digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OrgChartTree;
    use serde_json::json;

    fn node(value: Value) -> NestedNode {
        crate::nested_json::nested_from_value(value).unwrap().unwrap()
    }

    #[test]
    fn test_null_tree() {
        assert_eq!(encode_tree(None).unwrap(), "null");
    }

    #[test]
    fn test_single_node_keeps_trailing_comma() {
        let root = node(json!({"id": 1, "parent_id": null, "name": "root"}));
        assert_eq!(
            encode_tree(Some(&root)).unwrap(),
            r#"{"id":1,"parent_id":null,"name":"root","children":[]}"#
        );
    }

    #[test]
    fn test_rusty_corp_golden() {
        let teams = serde_json::from_value(json!([
            {"id": 2, "name": "Food", "emoji": "🥩", "parent_id": 1},
            {"id": 3, "name": "Canine Therapy", "emoji": "😌", "parent_id": 1},
            {"id": 1, "name": "Rusty Corp.", "emoji": "🐕", "parent_id": null},
        ]))
        .unwrap();
        let js = OrgChartTree::new(teams).nested_tree_js().unwrap();

        let expected = concat!(
            r#"{"id":1,"name":"Rusty Corp.","emoji":"\ud83d\udc15","parent_id":null,"children":["#,
            r#"{"id":2,"name":"Food","emoji":"\ud83e\udd69","parent_id":1,"children":[]}, "#,
            r#"{"id":3,"name":"Canine Therapy","emoji":"\ud83d\ude0c","parent_id":1,"children":[]}"#,
            r#"]}"#,
        );
        assert_eq!(js, expected);
    }

    #[test]
    fn test_numeric_strings_are_bare() {
        let root = node(json!({"id": "7", "parent_id": null, "budget": " 1.5e3", "code": "12ab"}));
        assert_eq!(
            encode_tree(Some(&root)).unwrap(),
            r#"{"id":7,"parent_id":null,"budget": 1.5e3,"code":"12ab","children":[]}"#
        );
    }

    #[test]
    fn test_strings_are_not_escaped() {
        let root = node(json!({"id": 1, "name": "say \"hi\"", "parent_id": null}));
        assert_eq!(
            encode_tree(Some(&root)).unwrap(),
            r#"{"id":1,"name":"say "hi"","parent_id":null,"children":[]}"#
        );
    }

    #[test]
    fn test_other_scalars() {
        let root = node(json!({"id": 1, "active": true, "hidden": false, "tags": ["a", 1]}));
        assert_eq!(
            encode_tree(Some(&root)).unwrap(),
            r#"{"id":1,"active":"1","hidden":"","tags":"["a",1]","children":[]}"#
        );
    }

    #[test]
    fn test_emoji_forms() {
        let bmp = node(json!({"emoji": "☺"}));
        assert_eq!(
            encode_tree(Some(&bmp)).unwrap(),
            r#"{"emoji":"\u263a","children":[]}"#
        );

        let numeric = node(json!({"emoji": 5}));
        assert_eq!(encode_tree(Some(&numeric)).unwrap(), r#"{"emoji":5,"children":[]}"#);
    }

    #[test]
    fn test_emoji_errors_surface() {
        let missing = node(json!({"id": 1, "emoji": null}));
        assert_eq!(encode_tree(Some(&missing)), Err(EncodeError::NotText));

        let nested_bad = node(json!({"id": 1, "children": [{"id": 2, "emoji": "ab"}]}));
        assert_eq!(
            encode_tree(Some(&nested_bad)),
            Err(EncodeError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_whole_floats_drop_the_fraction() {
        let root = node(json!({"id": 1.0, "parent_id": 3, "ratio": 2.5, "neg": -4.0, "big": 1e20}));
        assert_eq!(
            encode_tree(Some(&root)).unwrap(),
            r#"{"id":1,"parent_id":3,"ratio":2.5,"neg":-4,"big":1e20,"children":[]}"#
        );
    }

    #[test]
    fn test_is_numeric() {
        for yes in ["0", "-3", "+4", "1.", ".5", "1e10", "2.5E-3", " 42", "42 "] {
            assert!(is_numeric(yes), "{yes:?} should be numeric");
        }
        for no in ["", ".", "-", "e5", "1e", "0x1A", "1_000", "12ab", "1.2.3"] {
            assert!(!is_numeric(no), "{no:?} should not be numeric");
        }
    }

    #[test]
    fn test_deep_tree_encodes_iteratively() {
        let mut root = node(json!({"id": 0}));
        for id in 1..50_000 {
            let mut parent = node(json!({ "id": id }));
            parent.children.push(root);
            root = parent;
        }
        let js = encode_tree(Some(&root)).unwrap();
        assert!(js.starts_with(r#"{"id":49999,"children":[{"id":49998,"#));
        assert_eq!(js.matches("]}").count(), 50_000);
    }
}
