// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::error::SceneLoadError;
use crate::core::pipeline::Pipeline;
use crate::core::sampler::{Sampler, SamplerInstance, SamplerState};
use crate::core::scene_desc::NodeDesc;
use crate::math::constants::{UInt, Vector2u};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct IndependentSampler {
    seed: u64,
}

impl IndependentSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_desc(desc: &NodeDesc) -> Result<Self, SceneLoadError> {
        let seed = desc.property_int_or_default("seed", 0)?;
        Ok(Self::new(seed as u64))
    }
}

impl Sampler for IndependentSampler {
    fn type_name(&self) -> &str {
        "independent"
    }

    fn build<'env>(&self, _pipeline: &'env Pipeline, stream: &mut Stream<'env>) -> Box<dyn SamplerInstance> {
        let state = Arc::new(Mutex::new(SamplerState::default()));
        let seed = self.seed;
        let device_state = Arc::clone(&state);
        stream.enqueue(move || {
            lock(&device_state).seed = seed;
            Ok(())
        });
        Box::new(IndependentSamplerInstance { state })
    }
}

struct IndependentSamplerInstance {
    state: Arc<Mutex<SamplerState>>,
}

impl SamplerInstance for IndependentSamplerInstance {
    fn reset<'env>(&'env self, stream: &mut Stream<'env>, resolution: Vector2u, pixel_count: UInt, spp: UInt) {
        stream.enqueue(move || {
            let mut state = lock(&self.state);
            state.resolution = resolution;
            state.pixel_count = pixel_count;
            state.spp = spp;
            state.reset_count += 1;
            Ok(())
        });
    }

    fn state(&self) -> SamplerState {
        *lock(&self.state)
    }
}

fn lock(state: &Mutex<SamplerState>) -> MutexGuard<'_, SamplerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;
    use crate::core::sensor::Camera;

    #[test]
    fn test_reset_records_camera_budget() {
        let device = Device::new(1);
        let pipeline = Pipeline::new(device.clone(), vec![Camera::new("a.exr", Vector2u::new(4, 2), 8)], 0);
        let sampler = IndependentSampler::new(42);
        let instance = device
            .with_stream(|stream| {
                let instance = sampler.build(&pipeline, stream);
                stream.synchronize()?;
                Ok(instance)
            })
            .unwrap();
        device
            .with_stream(|stream| {
                instance.reset(stream, Vector2u::new(4, 2), 8, 8);
                stream.synchronize()
            })
            .unwrap();

        let state = instance.state();
        assert_eq!(state.seed, 42);
        assert_eq!(state.resolution, Vector2u::new(4, 2));
        assert_eq!(state.pixel_count, 8);
        assert_eq!(state.spp, 8);
        assert_eq!(state.reset_count, 1);
    }
}
