// Copyright @yucwang 2026

pub mod constant;
pub mod uv;

use crate::core::error::SceneLoadError;
use crate::core::scene_desc::NodeDesc;
use crate::renderers::progressive::ProgressiveIntegrator;

use self::constant::ConstantRadiance;
use self::uv::UvRadiance;

pub fn load_integrator(desc: &NodeDesc) -> Result<ProgressiveIntegrator, SceneLoadError> {
    match desc.type_name() {
        "uv" => ProgressiveIntegrator::new(desc, Box::new(UvRadiance)),
        "constant" => ProgressiveIntegrator::new(desc, Box::new(ConstantRadiance::from_desc(desc)?)),
        other => Err(SceneLoadError::Parse(format!("unsupported integrator: {}", other))),
    }
}
