// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::error::SceneLoadError;
use crate::core::light_sampler::{LightSampler, LightSamplerInstance};
use crate::core::pipeline::Pipeline;
use crate::core::sampler::{Sampler, SamplerInstance};
use crate::core::scene_desc::NodeDesc;
use crate::core::sensor::Camera;
use crate::light_samplers::load_light_sampler;
use crate::math::constants::{Float, UInt, Vector2u, Vector3f};
use crate::samplers::load_sampler;

use std::panic::Location;

pub struct Integrator {
    sampler: Box<dyn Sampler>,
    light_sampler: Box<dyn LightSampler>,
}

impl Integrator {
    pub fn new(desc: &NodeDesc) -> Result<Self, SceneLoadError> {
        let sampler = load_sampler(&desc.property_node_or_default("sampler", "independent")?)?;
        let light_sampler = load_light_sampler(&desc.property_node_or_default("light_sampler", "uniform")?)?;
        Ok(Self { sampler, light_sampler })
    }

    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    pub fn light_sampler(&self) -> &dyn LightSampler {
        self.light_sampler.as_ref()
    }
}

pub struct IntegratorInstance<'p> {
    pipeline: &'p Pipeline,
    sampler: Box<dyn SamplerInstance>,
    light_sampler: Option<Box<dyn LightSamplerInstance>>,
}

impl<'p> IntegratorInstance<'p> {
    pub fn new<'env>(pipeline: &'p Pipeline, stream: &mut Stream<'env>, integrator: &Integrator) -> Self
    where
        'p: 'env,
    {
        let sampler = integrator.sampler().build(pipeline, stream);
        let light_sampler = if pipeline.has_lighting() {
            Some(integrator.light_sampler().build(pipeline, stream))
        } else {
            None
        };
        log::debug!(
            "Integrator instance built with sampler '{}' and light sampler '{}'.",
            integrator.sampler().type_name(),
            if light_sampler.is_some() { integrator.light_sampler().type_name() } else { "none" }
        );
        Self { pipeline, sampler, light_sampler }
    }

    pub fn pipeline(&self) -> &'p Pipeline {
        self.pipeline
    }

    pub fn sampler(&self) -> &dyn SamplerInstance {
        self.sampler.as_ref()
    }

    pub fn light_sampler(&self) -> Option<&dyn LightSamplerInstance> {
        self.light_sampler.as_deref()
    }
}

/// The per-pixel radiance estimate every progressive strategy provides.
///
/// The provided body is not an algorithm: calling it aborts with the call
/// site, so a strategy that forgets to override `li` fails loudly.
pub trait Radiance: Sync {
    #[track_caller]
    fn li(
        &self,
        integrator: &IntegratorInstance<'_>,
        camera: &Camera,
        frame_index: UInt,
        pixel: Vector2u,
        time: Float,
    ) -> Vector3f {
        let _ = (integrator, camera, frame_index, pixel, time);
        panic!("{}: ProgressiveIntegrator::li() is not implemented.", Location::caller())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;
    use crate::core::scene_desc::Property;
    use std::panic::{self, AssertUnwindSafe};

    struct MissingOverride;

    impl Radiance for MissingOverride {}

    fn build(light_count: usize) -> (Device, Pipeline) {
        let device = Device::new(1);
        let camera = Camera::new("a.exr", Vector2u::new(2, 2), 1);
        let pipeline = Pipeline::new(device.clone(), vec![camera], light_count);
        (device, pipeline)
    }

    #[test]
    fn test_light_sampler_only_with_lighting() {
        let integrator = Integrator::new(&NodeDesc::new("integrator", "uv")).unwrap();

        let (device, pipeline) = build(0);
        let instance = device
            .with_stream(|stream| Ok(IntegratorInstance::new(&pipeline, stream, &integrator)))
            .unwrap();
        assert!(instance.light_sampler().is_none());

        let (device, pipeline) = build(3);
        let instance = device
            .with_stream(|stream| Ok(IntegratorInstance::new(&pipeline, stream, &integrator)))
            .unwrap();
        assert_eq!(instance.light_sampler().map(|l| l.light_count()), Some(3));
    }

    #[test]
    fn test_unknown_sampler_is_rejected() {
        let desc = NodeDesc::new("integrator", "uv")
            .with_property("sampler", Property::Node(NodeDesc::new("sampler", "sobol")));
        assert!(Integrator::new(&desc).is_err());
    }

    #[test]
    fn test_default_li_fails_identically_every_call() {
        let integrator = Integrator::new(&NodeDesc::new("integrator", "uv")).unwrap();
        let (device, pipeline) = build(0);
        let instance = device
            .with_stream(|stream| Ok(IntegratorInstance::new(&pipeline, stream, &integrator)))
            .unwrap();
        let camera = pipeline.camera(0).unwrap();
        let strategy = MissingOverride;

        let call = || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                strategy.li(&instance, camera, 0, Vector2u::new(0, 0), 0.0)
            }));
            match result {
                Ok(color) => panic!("li returned a color: {:?}", color),
                Err(payload) => payload
                    .downcast_ref::<String>()
                    .cloned()
                    .unwrap_or_default(),
            }
        };

        let first = call();
        let second = call();
        assert!(first.contains("ProgressiveIntegrator::li() is not implemented"));
        assert!(first.contains(file!()));
        assert_eq!(first, second);
    }
}
