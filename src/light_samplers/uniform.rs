// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::light_sampler::{LightSampler, LightSamplerInstance, LightSelection};
use crate::core::pipeline::Pipeline;
use crate::math::constants::Float;

pub struct UniformLightSampler;

impl LightSampler for UniformLightSampler {
    fn type_name(&self) -> &str {
        "uniform"
    }

    fn build<'env>(&self, pipeline: &'env Pipeline, _stream: &mut Stream<'env>) -> Box<dyn LightSamplerInstance> {
        Box::new(UniformLightSamplerInstance {
            light_count: pipeline.light_count(),
        })
    }
}

struct UniformLightSamplerInstance {
    light_count: usize,
}

impl LightSamplerInstance for UniformLightSamplerInstance {
    fn light_count(&self) -> usize {
        self.light_count
    }

    fn select(&self, u: Float) -> Option<LightSelection> {
        if self.light_count == 0 {
            return None;
        }
        let n = self.light_count;
        let index = ((u.max(0.0) * n as Float) as usize).min(n - 1);
        Some(LightSelection {
            index,
            pdf: 1.0 / n as Float,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_selection() {
        let sampler = UniformLightSamplerInstance { light_count: 4 };
        assert_eq!(sampler.select(0.0), Some(LightSelection { index: 0, pdf: 0.25 }));
        assert_eq!(sampler.select(0.6).map(|s| s.index), Some(2));
        assert_eq!(sampler.select(1.0).map(|s| s.index), Some(3));
        assert_eq!(UniformLightSamplerInstance { light_count: 0 }.select(0.5), None);
    }
}
