// Copyright @yucwang 2026

use crate::core::device::{Device, Stream};
use crate::core::error::SceneLoadError;
use crate::core::printer::Printer;
use crate::core::scene_desc::SceneDesc;
use crate::core::sensor::Camera;
use crate::math::constants::Float;

use std::sync::atomic::{AtomicU32, Ordering};

/// Session-wide render state: device handle, cameras in registration order,
/// lighting summary, diagnostic printer and the animated shutter time.
///
/// Integrator instances borrow the pipeline, so it outlives all of them.
#[derive(Debug)]
pub struct Pipeline {
    device: Device,
    cameras: Vec<Camera>,
    light_count: usize,
    printer: Printer,
    time: AtomicU32,
}

impl Pipeline {
    pub fn new(device: Device, cameras: Vec<Camera>, light_count: usize) -> Self {
        Self {
            device,
            cameras,
            light_count,
            printer: Printer::default(),
            time: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    pub fn from_scene(device: Device, scene: &SceneDesc) -> Result<Self, SceneLoadError> {
        let cameras = scene
            .sensors
            .iter()
            .map(|desc| Camera::from_desc(desc, &scene.base_dir))
            .collect::<Result<Vec<_>, _>>()?;
        if cameras.is_empty() {
            return Err(SceneLoadError::MissingField("sensor"));
        }
        log::info!(
            "Pipeline created with {} camera(s) and {} light(s).",
            cameras.len(),
            scene.light_count
        );
        Ok(Self::new(device, cameras, scene.light_count))
    }

    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn light_count(&self) -> usize {
        self.light_count
    }

    pub fn has_lighting(&self) -> bool {
        self.light_count > 0
    }

    pub fn printer(&self) -> &Printer {
        &self.printer
    }

    pub fn time(&self) -> Float {
        Float::from_bits(self.time.load(Ordering::Acquire))
    }

    /// Advances the time-dependent state. Ordered on the stream, so every
    /// dispatch submitted afterwards observes `time`.
    pub fn update<'env>(&'env self, stream: &mut Stream<'env>, time: Float) {
        stream.enqueue(move || {
            self.time.store(time.to_bits(), Ordering::Release);
            log::debug!("Pipeline updated to shutter time {}.", time);
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene_desc::NodeDesc;
    use crate::math::constants::Vector2u;

    #[test]
    fn test_update_is_ordered_on_stream() {
        let device = Device::new(1);
        let pipeline = Pipeline::new(device.clone(), vec![Camera::new("a.exr", Vector2u::new(2, 2), 1)], 0);
        let seen = device
            .with_stream(|stream| {
                pipeline.update(stream, 0.75);
                let readback = stream.read(|| pipeline.time());
                stream.synchronize()?;
                readback.wait()
            })
            .unwrap();
        assert_eq!(seen, 0.75);
        assert!(!pipeline.has_lighting());
    }

    #[test]
    fn test_from_scene_requires_sensor() {
        let mut scene = SceneDesc::default();
        assert!(Pipeline::from_scene(Device::new(1), &scene).is_err());

        scene.sensors.push(NodeDesc::new("sensor", "perspective"));
        scene.light_count = 3;
        let pipeline = Pipeline::from_scene(Device::new(1), &scene).unwrap();
        assert_eq!(pipeline.camera_count(), 1);
        assert!(pipeline.has_lighting());
        assert_eq!(pipeline.camera(0).unwrap().film().resolution(), Vector2u::new(1280, 720));
    }
}
