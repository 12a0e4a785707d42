// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::pipeline::Pipeline;
use crate::math::constants::Float;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSelection {
    pub index: usize,
    pub pdf: Float,
}

pub trait LightSampler {
    fn type_name(&self) -> &str;
    fn build<'env>(&self, pipeline: &'env Pipeline, stream: &mut Stream<'env>) -> Box<dyn LightSamplerInstance>;
}

pub trait LightSamplerInstance: Send + Sync {
    fn light_count(&self) -> usize;
    /// Picks a light from a uniform number `u` in [0, 1).
    fn select(&self, u: Float) -> Option<LightSelection>;
}
