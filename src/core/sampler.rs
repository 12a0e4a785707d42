// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::pipeline::Pipeline;
use crate::math::constants::{UInt, Vector2u};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplerState {
    pub seed: u64,
    pub resolution: Vector2u,
    pub pixel_count: UInt,
    pub spp: UInt,
    pub reset_count: UInt,
}

pub trait Sampler {
    fn type_name(&self) -> &str;
    fn build<'env>(&self, pipeline: &'env Pipeline, stream: &mut Stream<'env>) -> Box<dyn SamplerInstance>;
}

pub trait SamplerInstance: Send + Sync {
    /// Prepares the sampler for a camera. Must be ordered before any
    /// dispatch of that camera.
    fn reset<'env>(&'env self, stream: &mut Stream<'env>, resolution: Vector2u, pixel_count: UInt, spp: UInt);
    fn state(&self) -> SamplerState;
}
