// Copyright @yucwang 2026

use crate::core::device::{Readback, Stream};
use crate::math::constants::{Float, UInt, Vector2u, Vector3f, Vector4f};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Device-resident accumulation buffer. Each texel keeps the running rgb sum
/// in xyz and the number of accumulated samples in w.
#[derive(Debug)]
pub struct Film {
    resolution: Vector2u,
    // kernels lock one texel; prepare and release take the whole buffer
    accumulation: RwLock<Vec<Mutex<Vector4f>>>,
}

impl Film {
    pub fn new(resolution: Vector2u) -> Self {
        Self {
            resolution,
            accumulation: RwLock::new(Vec::new()),
        }
    }

    pub fn resolution(&self) -> Vector2u {
        self.resolution
    }

    pub fn pixel_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize
    }

    /// Allocates and clears the buffer, ordered after earlier stream work.
    pub fn prepare<'env>(&'env self, stream: &mut Stream<'env>) {
        stream.enqueue(move || {
            let mut accumulation = self.write();
            accumulation.clear();
            accumulation.resize_with(self.pixel_count(), || Mutex::new(Vector4f::zeros()));
            Ok(())
        });
    }

    pub fn accumulate(&self, pixel: Vector2u, color: Vector3f) {
        if pixel.x >= self.resolution.x || pixel.y >= self.resolution.y {
            return;
        }
        let index = pixel_index(pixel, self.resolution.x);
        if let Some(texel) = self.read().get(index) {
            *lock_texel(texel) += Vector4f::new(color.x, color.y, color.z, 1.0);
        }
    }

    pub fn snapshot(&self) -> Vec<Vector4f> {
        self.read()
            .iter()
            .map(|texel| {
                let texel = *lock_texel(texel);
                if texel.w > 0.0 {
                    let inv = 1.0 / texel.w;
                    Vector4f::new(texel.x * inv, texel.y * inv, texel.z * inv, 1.0)
                } else {
                    Vector4f::new(0.0, 0.0, 0.0, 1.0)
                }
            })
            .collect()
    }

    pub fn download<'env>(&'env self, stream: &mut Stream<'env>) -> Readback<Vec<Vector4f>> {
        stream.read(move || self.snapshot())
    }

    pub fn release(&self) {
        *self.write() = Vec::new();
    }

    pub fn sample_count(&self, pixel: Vector2u) -> Float {
        let index = pixel_index(pixel, self.resolution.x);
        self.read().get(index).map_or(0.0, |texel| lock_texel(texel).w)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Mutex<Vector4f>>> {
        self.accumulation.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Mutex<Vector4f>>> {
        self.accumulation.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_texel(texel: &Mutex<Vector4f>) -> MutexGuard<'_, Vector4f> {
    texel.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn pixel_index(pixel: Vector2u, width: UInt) -> usize {
    (pixel.y * width + pixel.x) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::{Device, DispatchArgs, Kernel};

    #[test]
    fn test_download_length_matches_resolution() {
        let device = Device::new(2);
        for &(w, h) in &[(1u32, 1u32), (4, 4), (7, 3), (33, 17)] {
            let film = Film::new(Vector2u::new(w, h));
            let pixels = device
                .with_stream(|stream| {
                    film.prepare(stream);
                    let readback = film.download(stream);
                    stream.synchronize()?;
                    readback.wait()
                })
                .unwrap();
            assert_eq!(pixels.len(), (w * h) as usize);
            film.release();
        }
    }

    #[test]
    fn test_accumulate_averages_samples() {
        let device = Device::new(1);
        let film = Film::new(Vector2u::new(2, 2));
        device
            .with_stream(|stream| {
                film.prepare(stream);
                stream.synchronize()
            })
            .unwrap();

        film.accumulate(Vector2u::new(1, 0), Vector3f::new(1.0, 2.0, 3.0));
        film.accumulate(Vector2u::new(1, 0), Vector3f::new(3.0, 2.0, 1.0));
        film.accumulate(Vector2u::new(5, 5), Vector3f::new(9.0, 9.0, 9.0));

        let pixels = film.snapshot();
        assert_eq!(pixels[pixel_index(Vector2u::new(1, 0), 2)], Vector4f::new(2.0, 2.0, 2.0, 1.0));
        assert_eq!(pixels[0], Vector4f::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(film.sample_count(Vector2u::new(1, 0)), 2.0);
    }

    #[test]
    fn test_parallel_dispatch_accumulates_every_sample() {
        let device = Device::new(4);
        let film = Film::new(Vector2u::new(40, 24));
        device
            .with_stream(|stream| {
                film.prepare(stream);
                let film = &film;
                let shader = device.compile(Kernel::new(move |args: DispatchArgs, pixel: Vector2u| {
                    film.accumulate(pixel, Vector3f::new(args.frame_index as Float, 0.0, 1.0));
                }))?;
                for frame in 0..8 {
                    let args = DispatchArgs { frame_index: frame, time: 0.0, shutter_weight: 1.0 };
                    stream.dispatch(&shader, args, film.resolution());
                }
                stream.synchronize()
            })
            .unwrap();

        for pixel in [Vector2u::new(0, 0), Vector2u::new(17, 9), Vector2u::new(39, 23)] {
            assert_eq!(film.sample_count(pixel), 8.0);
        }
        assert!(film.snapshot().iter().all(|p| *p == Vector4f::new(3.5, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_release_frees_buffer() {
        let device = Device::new(1);
        let film = Film::new(Vector2u::new(3, 3));
        device
            .with_stream(|stream| {
                film.prepare(stream);
                stream.synchronize()
            })
            .unwrap();
        film.release();
        assert!(film.snapshot().is_empty());
    }
}
