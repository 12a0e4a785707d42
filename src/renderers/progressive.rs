// Copyright @yucwang 2026

//! Progressive rendering: every camera accumulates its spp as a stream of
//! full-frame dispatches, with host synchronisation only at commit points.

use crate::core::device::{DispatchArgs, Kernel, Stream};
use crate::core::display::Display;
use crate::core::error::{RenderError, SceneLoadError};
use crate::core::integrator::{Integrator, IntegratorInstance, Radiance};
use crate::core::pipeline::Pipeline;
use crate::core::progress::{ConsoleProgress, ProgressReporter};
use crate::core::scene_desc::NodeDesc;
use crate::core::sensor::Camera;
use crate::displays::preview::PreviewDisplay;
use crate::io::image_utils::save_image;
use crate::math::constants::{UInt, Vector2u};

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Dispatches between progress commits when nobody watches a display.
pub const DEFAULT_COMMIT_CADENCE: UInt = 32;

pub const RENDER_BLOCK_SIZE: (UInt, UInt) = (16, 16);

pub fn commit_cadence(display: Option<&dyn Display>, interval: u16) -> UInt {
    match display {
        Some(display) if !display.should_close() => UInt::from(interval.max(1)),
        _ => DEFAULT_COMMIT_CADENCE,
    }
}

pub struct ProgressiveIntegrator {
    base: Integrator,
    display: bool,
    display_interval: u16,
    display_file: String,
    radiance: Box<dyn Radiance>,
}

impl ProgressiveIntegrator {
    pub fn new(desc: &NodeDesc, radiance: Box<dyn Radiance>) -> Result<Self, SceneLoadError> {
        let base = Integrator::new(desc)?;
        let display = desc.property_bool_or_default("display", false)?;
        let display_interval = desc
            .property_int_or_default("display_interval", 1)?
            .clamp(1, u16::MAX as i64) as u16;
        let display_file = desc.property_string_or_default("display_file", "preview.png")?;
        Ok(Self {
            base,
            display,
            display_interval,
            display_file,
            radiance,
        })
    }

    pub fn base(&self) -> &Integrator {
        &self.base
    }

    pub fn display_enabled(&self) -> bool {
        self.display
    }

    pub fn display_interval(&self) -> u16 {
        self.display_interval
    }

    pub fn display_file(&self) -> &str {
        &self.display_file
    }

    pub fn radiance(&self) -> &dyn Radiance {
        self.radiance.as_ref()
    }

    /// Instance with a PNG preview (when enabled) and a console progress bar.
    pub fn build<'p, 'env>(&'p self, pipeline: &'p Pipeline, stream: &mut Stream<'env>) -> ProgressiveIntegratorInstance<'p>
    where
        'p: 'env,
    {
        let display_file = self.display_file.clone();
        self.build_with(
            pipeline,
            stream,
            move || Box::new(PreviewDisplay::new(display_file)),
            Arc::new(ConsoleProgress::new()),
        )
    }

    /// `make_display` runs at most once, and only when the display is enabled.
    pub fn build_with<'p, 'env, D>(
        &'p self,
        pipeline: &'p Pipeline,
        stream: &mut Stream<'env>,
        make_display: D,
        progress: Arc<dyn ProgressReporter>,
    ) -> ProgressiveIntegratorInstance<'p>
    where
        'p: 'env,
        D: FnOnce() -> Box<dyn Display>,
    {
        let base = IntegratorInstance::new(pipeline, stream, &self.base);
        let display = if self.display {
            let display = make_display();
            log::info!("Display '{}' enabled, interval {}.", display.name(), self.display_interval);
            Some(RefCell::new(display))
        } else {
            None
        };
        ProgressiveIntegratorInstance {
            base,
            node: self,
            display,
            progress,
        }
    }
}

pub struct ProgressiveIntegratorInstance<'p> {
    base: IntegratorInstance<'p>,
    node: &'p ProgressiveIntegrator,
    display: Option<RefCell<Box<dyn Display>>>,
    progress: Arc<dyn ProgressReporter>,
}

impl<'p> ProgressiveIntegratorInstance<'p> {
    pub fn base(&self) -> &IntegratorInstance<'p> {
        &self.base
    }

    pub fn node(&self) -> &'p ProgressiveIntegrator {
        self.node
    }

    pub fn has_display(&self) -> bool {
        self.display.is_some()
    }

    /// Renders every camera of the pipeline in registration order and writes
    /// each film to the camera's output file. The first failure aborts.
    pub fn render<'s>(&'s self, stream: &mut Stream<'s>) -> Result<(), RenderError> {
        let pipeline = self.base.pipeline();
        for camera in pipeline.cameras() {
            let film = camera.film();
            film.prepare(stream);
            if let Some(display) = &self.display {
                display.borrow_mut().reset(stream, film)?;
            }

            self.render_one_camera(stream, camera)?;

            if let Some(display) = &self.display {
                let mut display = display.borrow_mut();
                while !display.idle(stream)? {
                    thread::yield_now();
                }
            }

            let readback = film.download(stream);
            stream.synchronize()?;
            let pixels = readback.wait()?;
            film.release();
            save_image(camera.file(), &pixels, film.resolution())?;
        }
        Ok(())
    }

    fn render_one_camera<'s>(&'s self, stream: &mut Stream<'s>, camera: &'s Camera) -> Result<(), RenderError> {
        let pipeline = self.base.pipeline();
        let film = camera.film();
        let resolution = film.resolution();
        let pixel_count = film.pixel_count() as UInt;
        let spp = camera.spp();
        let printer = pipeline.printer();

        self.base.sampler().reset(stream, resolution, pixel_count, spp);
        printer.reset(stream);
        stream.synchronize()?;

        log::info!(
            "Rendering to '{}' of resolution {}x{} at {}spp.",
            camera.file().display(),
            resolution.x,
            resolution.y,
            spp
        );

        let base = &self.base;
        let radiance = self.node.radiance();
        let compile_start = Instant::now();
        let kernel = Kernel::new(move |args: DispatchArgs, pixel: Vector2u| {
            let color = radiance.li(base, camera, args.frame_index, pixel, args.time);
            film.accumulate(pixel, color * args.shutter_weight);
        })
        .with_block_size(RENDER_BLOCK_SIZE.0, RENDER_BLOCK_SIZE.1);
        let shader = pipeline.device().compile(kernel)?;
        log::info!("Integrator shader compile in {} ms.", compile_start.elapsed().as_millis());

        stream.synchronize()?;
        log::info!("Rendering started.");
        let render_start = Instant::now();
        self.progress.update(0.0);

        let mut display = self.display.as_ref().map(|display| display.borrow_mut());
        let interval = self.node.display_interval();
        let mut sample_id: UInt = 0;
        let mut dispatch_count: UInt = 0;
        for shutter_sample in camera.shutter_samples() {
            pipeline.update(stream, shutter_sample.time);
            for _ in 0..shutter_sample.spp {
                let args = DispatchArgs {
                    frame_index: sample_id,
                    time: shutter_sample.time,
                    shutter_weight: shutter_sample.weight,
                };
                stream.dispatch(&shader, args, resolution);
                sample_id += 1;
                if !printer.is_empty() {
                    printer.retrieve(stream);
                }

                dispatch_count += 1;
                let cadence = commit_cadence(display.as_deref().map(|d| &**d), interval);
                if dispatch_count >= cadence {
                    dispatch_count = 0;
                    let p = sample_id as f64 / spp as f64;
                    let consumed = match display.as_mut() {
                        Some(display) => display.update(stream, film, sample_id)?,
                        None => false,
                    };
                    if consumed {
                        stream.synchronize()?;
                        self.progress.update(p);
                    } else {
                        let progress = Arc::clone(&self.progress);
                        stream.callback(move || progress.update(p));
                    }
                }
            }
        }

        stream.synchronize()?;
        self.progress.done();
        log::info!("Rendering finished in {} ms.", render_start.elapsed().as_millis());
        Ok(())
    }
}
