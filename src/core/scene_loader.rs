// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub use crate::core::error::SceneLoadError;
use crate::core::scene_desc::{NodeDesc, Property, SceneDesc};
use crate::math::constants::Float;

pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneDesc, SceneLoadError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_scene(&xml, base_dir)
}

struct PendingNode {
    name: Option<String>,
    node: NodeDesc,
}

struct ParseState {
    defaults: HashMap<String, String>,
    named: HashMap<String, NodeDesc>,
    stack: Vec<PendingNode>,
    scene: SceneDesc,
}

pub fn parse_scene(xml: &str, base_dir: &Path) -> Result<SceneDesc, SceneLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut state = ParseState {
        defaults: HashMap::new(),
        named: HashMap::new(),
        stack: Vec::new(),
        scene: SceneDesc {
            base_dir: base_dir.to_path_buf(),
            ..SceneDesc::default()
        },
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => open_element(&e, false, &mut state)?,
            Ok(Event::Empty(e)) => open_element(&e, true, &mut state)?,
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                close_element(&tag, &mut state)?;
            }
            Err(e) => {
                return Err(SceneLoadError::Parse(e.to_string()));
            }
            _ => {}
        }

        buf.clear();
    }

    if !state.stack.is_empty() {
        return Err(SceneLoadError::Parse(String::from("unterminated scene node")));
    }
    Ok(state.scene)
}

fn is_structural(tag: &str) -> bool {
    matches!(
        tag,
        "scene" | "default" | "ref" | "boolean" | "integer" | "float" | "string" | "rgb" | "vector" | "point"
    )
}

fn open_element(e: &BytesStart, empty: bool, state: &mut ParseState) -> Result<(), SceneLoadError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();

    let mut type_attr: Option<String> = None;
    let mut id_attr: Option<String> = None;
    let mut name_attr: Option<String> = None;
    let mut value_attr: Option<String> = None;
    for attr in e.attributes().flatten() {
        let raw = attr.unescape_value().unwrap_or_default();
        match attr.key.as_ref() {
            b"type" => type_attr = Some(resolve_value(&raw, &state.defaults)),
            b"id" => id_attr = Some(raw.to_string()),
            b"name" => name_attr = Some(raw.to_string()),
            b"value" => value_attr = Some(resolve_value(&raw, &state.defaults)),
            _ => {}
        }
    }

    match tag.as_str() {
        "scene" => {}
        "default" => {
            if let (Some(k), Some(v)) = (name_attr, value_attr) {
                state.defaults.insert(k, v);
            }
        }
        "ref" => {
            let id = id_attr.ok_or(SceneLoadError::MissingField("ref.id"))?;
            let node = state
                .named
                .get(&id)
                .cloned()
                .ok_or_else(|| SceneLoadError::Parse(format!("missing node ref: {}", id)))?;
            let name = name_attr.unwrap_or_else(|| node.tag().to_string());
            attach_property(state, &tag, &name, Property::Node(node))?;
        }
        "boolean" | "integer" | "float" | "string" | "rgb" | "vector" | "point" => {
            let name = name_attr.ok_or(SceneLoadError::MissingField("property.name"))?;
            let value = value_attr.ok_or(SceneLoadError::MissingField("property.value"))?;
            let property = match tag.as_str() {
                "boolean" => Property::Bool(parse_bool(&value)?),
                "integer" => Property::Integer(parse_int(&value)?),
                "string" => Property::String(value),
                _ => Property::Float(parse_floats(&value)?),
            };
            attach_property(state, &tag, &name, property)?;
        }
        _ => {
            if tag == "emitter" {
                state.scene.light_count += 1;
            }
            let mut node = NodeDesc::new(&tag, type_attr.as_deref().unwrap_or(""));
            if let Some(id) = id_attr {
                node = node.with_id(&id);
            }
            let pending = PendingNode { name: name_attr, node };
            if empty {
                finish_node(pending, state)?;
            } else {
                state.stack.push(pending);
            }
        }
    }
    Ok(())
}

fn close_element(tag: &str, state: &mut ParseState) -> Result<(), SceneLoadError> {
    if is_structural(tag) {
        return Ok(());
    }
    let pending = state
        .stack
        .pop()
        .ok_or_else(|| SceneLoadError::Parse(format!("unexpected closing tag: {}", tag)))?;
    finish_node(pending, state)
}

fn attach_property(state: &mut ParseState, tag: &str, name: &str, property: Property) -> Result<(), SceneLoadError> {
    match state.stack.last_mut() {
        Some(parent) => {
            parent.node.set_property(name, property);
            Ok(())
        }
        None => Err(SceneLoadError::Parse(format!("<{} name=\"{}\"> outside of a scene node", tag, name))),
    }
}

fn finish_node(pending: PendingNode, state: &mut ParseState) -> Result<(), SceneLoadError> {
    let PendingNode { name, node } = pending;
    if let Some(id) = node.id() {
        state.named.insert(id.to_string(), node.clone());
    }

    if let Some(parent) = state.stack.last_mut() {
        let name = name.unwrap_or_else(|| node.tag().to_string());
        parent.node.set_property(&name, Property::Node(node));
        return Ok(());
    }

    match node.tag() {
        "integrator" => {
            if state.scene.integrator.is_some() {
                return Err(SceneLoadError::Parse(String::from("multiple integrators declared")));
            }
            state.scene.integrator = Some(node);
        }
        "sensor" => state.scene.sensors.push(node),
        "emitter" => state.scene.emitters.push(node),
        _ => {}
    }
    Ok(())
}

/// Replaces every `$name` whose whole identifier is a declared default.
/// Unknown names are kept verbatim.
fn resolve_value(raw: &str, defaults: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];
        match defaults.get(name) {
            Some(value) if !name.is_empty() => out.push_str(value),
            _ => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &after[end..];
    }
    out.push_str(rest);
    out
}

fn parse_bool(value: &str) -> Result<bool, SceneLoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SceneLoadError::Parse(format!("invalid boolean: {}", value))),
    }
}

fn parse_int(value: &str) -> Result<i64, SceneLoadError> {
    value.trim().parse::<i64>().map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_floats(value: &str) -> Result<Vec<Float>, SceneLoadError> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Float>().map_err(|_| SceneLoadError::Parse(format!("invalid float: {}", s))))
        .collect()
}
