// Copyright @yucwang 2026

use crate::core::error::SceneLoadError;
use crate::core::integrator::{IntegratorInstance, Radiance};
use crate::core::scene_desc::NodeDesc;
use crate::core::sensor::Camera;
use crate::math::constants::{Float, UInt, Vector2u, Vector3f};

pub struct ConstantRadiance {
    color: Vector3f,
}

impl ConstantRadiance {
    pub fn new(color: Vector3f) -> Self {
        Self { color }
    }

    pub fn from_desc(desc: &NodeDesc) -> Result<Self, SceneLoadError> {
        let color = desc.property_floats_or_default("color", &[1.0, 1.0, 1.0])?;
        match color.as_slice() {
            &[v] => Ok(Self::new(Vector3f::new(v, v, v))),
            &[r, g, b] => Ok(Self::new(Vector3f::new(r, g, b))),
            _ => Err(SceneLoadError::Parse(format!(
                "constant integrator expects 1 or 3 color components, got {}",
                color.len()
            ))),
        }
    }

    pub fn color(&self) -> Vector3f {
        self.color
    }
}

impl Radiance for ConstantRadiance {
    fn li(&self, _: &IntegratorInstance<'_>, _: &Camera, _: UInt, _: Vector2u, _: Float) -> Vector3f {
        self.color
    }
}
