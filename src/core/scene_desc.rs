// Copyright @yucwang 2026

use crate::core::error::SceneLoadError;
use crate::math::constants::Float;

use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    Integer(i64),
    Float(Vec<Float>),
    String(String),
    Node(NodeDesc),
}

impl Property {
    fn kind(&self) -> &'static str {
        match self {
            Property::Bool(_) => "boolean",
            Property::Integer(_) => "integer",
            Property::Float(_) => "float",
            Property::String(_) => "string",
            Property::Node(_) => "node",
        }
    }
}

/// One configured scene node, e.g. `<integrator type="uv">` with its
/// properties and nested nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    tag: String,
    type_name: String,
    id: Option<String>,
    properties: BTreeMap<String, Property>,
}

impl NodeDesc {
    pub fn new(tag: &str, type_name: &str) -> Self {
        Self {
            tag: tag.to_string(),
            type_name: type_name.to_string(),
            id: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, value: Property) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn set_property(&mut self, name: &str, value: Property) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn property_bool_or_default(&self, name: &str, default: bool) -> Result<bool, SceneLoadError> {
        match self.property(name) {
            None => Ok(default),
            Some(Property::Bool(v)) => Ok(*v),
            Some(other) => Err(self.mismatch(name, "boolean", other)),
        }
    }

    pub fn property_int_or_default(&self, name: &str, default: i64) -> Result<i64, SceneLoadError> {
        match self.property(name) {
            None => Ok(default),
            Some(Property::Integer(v)) => Ok(*v),
            Some(other) => Err(self.mismatch(name, "integer", other)),
        }
    }

    pub fn property_float_or_default(&self, name: &str, default: Float) -> Result<Float, SceneLoadError> {
        match self.property(name) {
            None => Ok(default),
            Some(Property::Float(v)) if v.len() == 1 => Ok(v[0]),
            Some(Property::Integer(v)) => Ok(*v as Float),
            Some(other) => Err(self.mismatch(name, "float", other)),
        }
    }

    pub fn property_floats_or_default(&self, name: &str, default: &[Float]) -> Result<Vec<Float>, SceneLoadError> {
        match self.property(name) {
            None => Ok(default.to_vec()),
            Some(Property::Float(v)) => Ok(v.clone()),
            Some(other) => Err(self.mismatch(name, "float list", other)),
        }
    }

    pub fn property_string_or_default(&self, name: &str, default: &str) -> Result<String, SceneLoadError> {
        match self.property(name) {
            None => Ok(default.to_string()),
            Some(Property::String(v)) => Ok(v.clone()),
            Some(other) => Err(self.mismatch(name, "string", other)),
        }
    }

    pub fn property_node(&self, name: &str) -> Result<Option<&NodeDesc>, SceneLoadError> {
        match self.property(name) {
            None => Ok(None),
            Some(Property::Node(node)) => Ok(Some(node)),
            Some(other) => Err(self.mismatch(name, "node", other)),
        }
    }

    pub fn property_node_or_default(&self, name: &str, default_type: &str) -> Result<NodeDesc, SceneLoadError> {
        Ok(self
            .property_node(name)?
            .cloned()
            .unwrap_or_else(|| NodeDesc::new(name, default_type)))
    }

    fn mismatch(&self, name: &str, expected: &str, found: &Property) -> SceneLoadError {
        SceneLoadError::Parse(format!(
            "property '{}' of <{} type=\"{}\"> expects {}, found {}",
            name,
            self.tag,
            self.type_name,
            expected,
            found.kind()
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneDesc {
    pub integrator: Option<NodeDesc>,
    pub sensors: Vec<NodeDesc>,
    pub emitters: Vec<NodeDesc>,
    pub light_count: usize,
    pub base_dir: PathBuf,
}

impl SceneDesc {
    pub fn integrator(&self) -> Result<&NodeDesc, SceneLoadError> {
        self.integrator.as_ref().ok_or(SceneLoadError::MissingField("integrator"))
    }

    pub fn integrator_mut(&mut self) -> Result<&mut NodeDesc, SceneLoadError> {
        self.integrator.as_mut().ok_or(SceneLoadError::MissingField("integrator"))
    }
}
