//! Standard JSON text of a nested org chart, both directions.
//!
//! Serde's derived impls recurse once per tree level, so a deep chart would
//! overflow the stack. Encoding here walks an explicit frame stack. Decoding
//! parses into a `Value` on a dedicated thread and converts that value with
//! an explicit stack.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::record::{Record, CHILDREN_FIELD};
use crate::tree::NestedNode;

/// Deepest accepted nesting of objects and arrays. A tree level costs two
/// (the team object and its `children` array), so this admits 256 levels.
pub const MAX_DECODE_DEPTH: usize = 512;

/// Stack of the decoder thread; ample for `MAX_DECODE_DEPTH` levels of parser recursion.
const DECODE_STACK_BYTES: usize = 32 * 1024 * 1024;

/// Encode a nested tree as compact JSON; `None` encodes as `null`.
///
/// Fields keep record order and `children` always comes last.
pub fn encode_nested(root: Option<&NestedNode>) -> serde_json::Result<String> {
    let Some(root) = root else {
        return Ok("null".to_string());
    };

    let mut json = String::new();
    open_node(&mut json, root)?;

    let mut stack = vec![(root.children.iter(), false)];
    while let Some((pending, started)) = stack.last_mut() {
        match pending.next() {
            Some(child) => {
                if *started {
                    json.push(',');
                }
                *started = true;
                open_node(&mut json, child)?;
                stack.push((child.children.iter(), false));
            }
            None => {
                json.push_str("]}");
                stack.pop();
            }
        }
    }

    Ok(json)
}

fn open_node(json: &mut String, node: &NestedNode) -> serde_json::Result<()> {
    json.push('{');
    for (key, value) in &node.fields {
        if key == CHILDREN_FIELD {
            continue;
        }
        json.push_str(&serde_json::to_string(key)?);
        json.push(':');
        json.push_str(&serde_json::to_string(value)?);
        json.push(',');
    }
    json.push('"');
    json.push_str(CHILDREN_FIELD);
    json.push_str("\":[");
    Ok(())
}

/// Decode a JSON nested tree. `null` decodes as `None`.
///
/// Every node must be an object; `children`, when present, must be an array.
pub fn decode_nested(json: &str) -> Result<Option<NestedNode>> {
    let depth = nesting_depth(json);
    if depth > MAX_DECODE_DEPTH {
        bail!(
            "Nested tree is {} levels of JSON deep, the limit is {}",
            depth,
            MAX_DECODE_DEPTH
        );
    }

    std::thread::scope(|scope| {
        let decoder = std::thread::Builder::new()
            .name("nested-json-decode".to_string())
            .stack_size(DECODE_STACK_BYTES)
            .spawn_scoped(scope, || {
                let mut de = serde_json::Deserializer::from_str(json);
                de.disable_recursion_limit();
                let value = Value::deserialize(&mut de).context("Invalid JSON")?;
                de.end().context("Invalid JSON")?;
                nested_from_value(value)
            })
            .context("Failed to start JSON decoder thread")?;

        decoder
            .join()
            .map_err(|_| anyhow!("JSON decoder thread panicked"))?
    })
}

/// Deepest nesting of objects and arrays in `json`, ignoring brackets inside strings.
fn nesting_depth(json: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

struct DecodeFrame {
    fields: Record,
    pending: std::vec::IntoIter<Value>,
    children: Vec<NestedNode>,
}

impl DecodeFrame {
    fn open(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => bail!("Expected a team object, found {}", kind(&other)),
        };
        let pending = match fields.shift_remove(CHILDREN_FIELD) {
            None => Vec::new(),
            Some(Value::Array(children)) => children,
            Some(other) => bail!("Expected a children array, found {}", kind(&other)),
        };
        Ok(Self {
            fields,
            children: Vec::with_capacity(pending.len()),
            pending: pending.into_iter(),
        })
    }
}

/// Convert an already parsed JSON value into a nested tree.
pub fn nested_from_value(value: Value) -> Result<Option<NestedNode>> {
    if value.is_null() {
        return Ok(None);
    }

    let mut stack = vec![DecodeFrame::open(value)?];
    loop {
        let next = stack.last_mut().and_then(|frame| frame.pending.next());
        if let Some(child) = next {
            stack.push(DecodeFrame::open(child)?);
            continue;
        }

        let Some(frame) = stack.pop() else {
            return Ok(None);
        };
        let node = NestedNode {
            fields: frame.fields,
            children: frame.children,
        };
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => return Ok(Some(node)),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
