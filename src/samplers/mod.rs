// Copyright @yucwang 2026

pub mod independent;

use crate::core::error::SceneLoadError;
use crate::core::sampler::Sampler;
use crate::core::scene_desc::NodeDesc;

use self::independent::IndependentSampler;

pub fn load_sampler(desc: &NodeDesc) -> Result<Box<dyn Sampler>, SceneLoadError> {
    match desc.type_name() {
        "independent" => Ok(Box::new(IndependentSampler::from_desc(desc)?)),
        other => Err(SceneLoadError::Parse(format!("unsupported sampler: {}", other))),
    }
}
