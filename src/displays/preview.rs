// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::display::Display;
use crate::core::error::RenderError;
use crate::core::film::Film;
use crate::io::image_utils::to_srgb8;
use crate::math::constants::{UInt, Vector2u};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Live preview: the current film average is written as an sRGB PNG on the
/// stream, at most one snapshot in flight and one per `min_interval`.
pub struct PreviewDisplay {
    name: String,
    path: PathBuf,
    min_interval: Duration,
    last_present: Option<Instant>,
    pending: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    resolution: Vector2u,
}

impl PreviewDisplay {
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(250);

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            last_present: None,
            pending: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            resolution: Vector2u::new(0, 0),
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn rate_limited(&self) -> bool {
        if self.pending.load(Ordering::Acquire) > 0 {
            return true;
        }
        match self.last_present {
            Some(last) => last.elapsed() < self.min_interval,
            None => false,
        }
    }
}

impl Display for PreviewDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset<'env>(&mut self, _stream: &mut Stream<'env>, film: &'env Film) -> Result<(), RenderError> {
        self.resolution = film.resolution();
        self.last_present = None;
        log::info!(
            "Preview '{}' attached to film of resolution {}x{}.",
            self.name,
            self.resolution.x,
            self.resolution.y
        );
        Ok(())
    }

    fn update<'env>(&mut self, stream: &mut Stream<'env>, film: &'env Film, frame: UInt) -> Result<bool, RenderError> {
        if self.should_close() || self.rate_limited() {
            return Ok(false);
        }
        self.last_present = Some(Instant::now());
        self.pending.fetch_add(1, Ordering::AcqRel);

        let path = self.path.clone();
        let resolution = self.resolution;
        let pending = Arc::clone(&self.pending);
        let closed = Arc::clone(&self.closed);
        stream.enqueue(move || {
            let bytes = to_srgb8(&film.snapshot());
            if let Err(err) = image::save_buffer(&path, &bytes, resolution.x, resolution.y, image::ColorType::Rgba8) {
                log::warn!("Preview write to '{}' failed at frame {}: {}. Closing preview.", path.display(), frame, err);
                closed.store(true, Ordering::Release);
            }
            pending.fetch_sub(1, Ordering::AcqRel);
            Ok(())
        });
        Ok(true)
    }

    fn idle(&mut self, stream: &mut Stream<'_>) -> Result<bool, RenderError> {
        if self.pending.load(Ordering::Acquire) == 0 {
            return Ok(true);
        }
        stream.synchronize()?;
        thread::yield_now();
        Ok(self.pending.load(Ordering::Acquire) == 0)
    }

    fn should_close(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;

    #[test]
    fn test_preview_writes_png_and_drains() {
        let path = std::env::temp_dir().join(format!("macaron-preview-{}.png", std::process::id()));
        let device = Device::new(1);
        let film = Film::new(Vector2u::new(4, 2));
        let mut display = PreviewDisplay::new(&path).with_min_interval(Duration::from_secs(3600));

        let (first, second, idle) = device
            .with_stream(|stream| {
                film.prepare(stream);
                display.reset(stream, &film)?;
                let first = display.update(stream, &film, 1)?;
                let second = display.update(stream, &film, 2)?;
                let mut idle = display.idle(stream)?;
                while !idle {
                    idle = display.idle(stream)?;
                }
                Ok((first, second, idle))
            })
            .unwrap();

        assert!(first);
        assert!(!second);
        assert!(idle);
        let preview = image::open(&path).unwrap();
        assert_eq!((preview.width(), preview.height()), (4, 2));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_closed_preview_takes_no_frames() {
        let device = Device::new(1);
        let film = Film::new(Vector2u::new(2, 2));
        let mut display = PreviewDisplay::new(std::env::temp_dir().join("macaron-closed.png"));
        display.close_handle().store(true, Ordering::Release);

        let taken = device
            .with_stream(|stream| {
                display.reset(stream, &film)?;
                display.update(stream, &film, 1)
            })
            .unwrap();
        assert!(!taken);
        assert!(display.should_close());
    }

    #[test]
    fn test_failed_write_closes_preview() {
        let device = Device::new(1);
        let film = Film::new(Vector2u::new(2, 2));
        let mut display = PreviewDisplay::new(std::env::temp_dir().join("macaron-missing-dir/x/preview.png"));

        device
            .with_stream(|stream| {
                film.prepare(stream);
                display.reset(stream, &film)?;
                display.update(stream, &film, 1)?;
                stream.synchronize()
            })
            .unwrap();
        assert!(display.should_close());
    }
}
