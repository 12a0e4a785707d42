// Copyright @yucwang 2026

use crate::core::integrator::{IntegratorInstance, Radiance};
use crate::core::sensor::Camera;
use crate::math::constants::{Float, UInt, Vector2u, Vector3f};

/// Debug strategy: normalised pixel centre in red/green, shutter time in blue.
pub struct UvRadiance;

impl Radiance for UvRadiance {
    fn li(
        &self,
        _integrator: &IntegratorInstance<'_>,
        camera: &Camera,
        _frame_index: UInt,
        pixel: Vector2u,
        time: Float,
    ) -> Vector3f {
        let resolution = camera.film().resolution();
        Vector3f::new(
            (pixel.x as Float + 0.5) / resolution.x as Float,
            (pixel.y as Float + 0.5) / resolution.y as Float,
            time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;
    use crate::core::integrator::Integrator;
    use crate::core::pipeline::Pipeline;
    use crate::core::scene_desc::NodeDesc;

    #[test]
    fn test_uv_is_pixel_centre() {
        let device = Device::new(1);
        let pipeline = Pipeline::new(device.clone(), vec![Camera::new("uv.exr", Vector2u::new(4, 2), 1)], 0);
        let integrator = Integrator::new(&NodeDesc::new("integrator", "uv")).unwrap();
        let instance = device
            .with_stream(|stream| Ok(IntegratorInstance::new(&pipeline, stream, &integrator)))
            .unwrap();
        let camera = pipeline.camera(0).unwrap();

        let color = UvRadiance.li(&instance, camera, 0, Vector2u::new(1, 1), 0.5);
        assert_eq!(color, Vector3f::new(0.375, 0.75, 0.5));
    }
}
