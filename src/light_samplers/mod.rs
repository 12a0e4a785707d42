// Copyright @yucwang 2026

pub mod uniform;

use crate::core::error::SceneLoadError;
use crate::core::light_sampler::LightSampler;
use crate::core::scene_desc::NodeDesc;

use self::uniform::UniformLightSampler;

pub fn load_light_sampler(desc: &NodeDesc) -> Result<Box<dyn LightSampler>, SceneLoadError> {
    match desc.type_name() {
        "uniform" => Ok(Box::new(UniformLightSampler)),
        other => Err(SceneLoadError::Parse(format!("unsupported light sampler: {}", other))),
    }
}
