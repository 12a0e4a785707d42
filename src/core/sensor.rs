// Copyright @yucwang 2026

use crate::core::error::SceneLoadError;
use crate::core::film::Film;
use crate::core::scene_desc::NodeDesc;
use crate::math::constants::{Float, UInt, Vector2u};

use std::path::{Path, PathBuf};

/// A discretised shutter time with its weight and share of the camera's spp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShutterSample {
    pub time: Float,
    pub weight: Float,
    pub spp: UInt,
}

#[derive(Debug)]
pub struct Camera {
    name: String,
    spp: UInt,
    file: PathBuf,
    film: Film,
    shutter_span: (Float, Float),
    shutter_sample_count: UInt,
    shutter_curve: Vec<(Float, Float)>,
}

impl Camera {
    pub const DEFAULT_SPP: UInt = 1024;
    pub const DEFAULT_SHUTTER_SAMPLES: UInt = 64;

    pub fn new<P: AsRef<Path>>(file: P, resolution: Vector2u, spp: UInt) -> Self {
        Self {
            name: String::from("camera"),
            spp: spp.max(1),
            file: file.as_ref().to_path_buf(),
            film: Film::new(Vector2u::new(resolution.x.max(1), resolution.y.max(1))),
            shutter_span: (0.0, 0.0),
            shutter_sample_count: Self::DEFAULT_SHUTTER_SAMPLES,
            shutter_curve: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_shutter(mut self, open: Float, close: Float, samples: UInt) -> Self {
        self.shutter_span = (open.min(close), open.max(close));
        self.shutter_sample_count = samples.max(1);
        self
    }

    // piecewise linear, empty means constant
    pub fn with_shutter_curve(mut self, mut curve: Vec<(Float, Float)>) -> Self {
        curve.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        self.shutter_curve = curve;
        self
    }

    pub fn from_desc(desc: &NodeDesc, base_dir: &Path) -> Result<Self, SceneLoadError> {
        let spp = desc.property_int_or_default("spp", Self::DEFAULT_SPP as i64)?;
        let file = desc.property_string_or_default("file", "render.exr")?;
        let file = if Path::new(&file).is_absolute() {
            PathBuf::from(file)
        } else {
            base_dir.join(file)
        };

        let (width, height) = match desc.property_node("film")? {
            Some(film) => (
                film.property_int_or_default("width", 1280)?,
                film.property_int_or_default("height", 720)?,
            ),
            None => (1280, 720),
        };

        let span = desc.property_floats_or_default("shutter_span", &[0.0, 0.0])?;
        if span.len() != 2 {
            return Err(SceneLoadError::Parse(format!(
                "shutter_span expects two values, found {}",
                span.len()
            )));
        }
        let samples = desc.property_int_or_default("shutter_samples", Self::DEFAULT_SHUTTER_SAMPLES as i64)?;

        let time_points = desc.property_floats_or_default("shutter_time_points", &[])?;
        let weights = desc.property_floats_or_default("shutter_weights", &[])?;
        if time_points.len() != weights.len() {
            return Err(SceneLoadError::Parse(format!(
                "shutter_time_points ({}) and shutter_weights ({}) differ in length",
                time_points.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| *w < 0.0) {
            return Err(SceneLoadError::Parse(String::from("negative shutter weight")));
        }

        let name = desc.id().unwrap_or(desc.type_name()).to_string();
        Ok(Camera::new(file, Vector2u::new(clamp_u32(width), clamp_u32(height)), clamp_u32(spp))
            .with_name(&name)
            .with_shutter(span[0], span[1], clamp_u32(samples))
            .with_shutter_curve(time_points.into_iter().zip(weights).collect()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spp(&self) -> UInt {
        self.spp
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn film(&self) -> &Film {
        &self.film
    }

    pub fn shutter_span(&self) -> (Float, Float) {
        self.shutter_span
    }

    pub fn shutter_weight(&self, time: Float) -> Float {
        let curve = &self.shutter_curve;
        match curve.len() {
            0 => 1.0,
            1 => curve[0].1,
            _ => {
                if time <= curve[0].0 {
                    return curve[0].1;
                }
                for pair in curve.windows(2) {
                    let (t0, w0) = pair[0];
                    let (t1, w1) = pair[1];
                    if time <= t1 {
                        let span = t1 - t0;
                        let t = if span > 0.0 { (time - t0) / span } else { 1.0 };
                        return w0 + (w1 - w0) * t;
                    }
                }
                curve[curve.len() - 1].1
            }
        }
    }

    /// Splits the spp over the shutter interval. The returned spp always sum
    /// to `self.spp()` and the weights satisfy `Σ weight·spp = spp`.
    pub fn shutter_samples(&self) -> Vec<ShutterSample> {
        let (open, close) = self.shutter_span;
        if open == close {
            return vec![ShutterSample { time: open, weight: 1.0, spp: self.spp }];
        }

        let n = self.shutter_sample_count.min(self.spp).max(1);
        let base = self.spp / n;
        let remainder = self.spp % n;
        let mut samples: Vec<ShutterSample> = (0..n)
            .map(|i| {
                let t = (i as Float + 0.5) / n as Float;
                let time = open + (close - open) * t;
                ShutterSample {
                    time,
                    weight: self.shutter_weight(time),
                    spp: base + if i < remainder { 1 } else { 0 },
                }
            })
            .collect();

        let weight_sum: f64 = samples.iter().map(|s| s.weight as f64 * s.spp as f64).sum();
        if weight_sum > 0.0 {
            let scale = (self.spp as f64 / weight_sum) as Float;
            for s in samples.iter_mut() {
                s.weight *= scale;
            }
        } else {
            log::warn!("Shutter weights of camera '{}' sum to zero, using uniform weights.", self.name);
            for s in samples.iter_mut() {
                s.weight = 1.0;
            }
        }
        samples.retain(|s| s.spp > 0);
        samples
    }
}

fn clamp_u32(value: i64) -> UInt {
    value.max(1).min(UInt::MAX as i64) as UInt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene_desc::Property;

    fn total_spp(samples: &[ShutterSample]) -> UInt {
        samples.iter().map(|s| s.spp).sum()
    }

    #[test]
    fn test_closed_shutter_is_single_sample() {
        let camera = Camera::new("a.exr", Vector2u::new(4, 4), 4);
        let samples = camera.shutter_samples();
        assert_eq!(samples, vec![ShutterSample { time: 0.0, weight: 1.0, spp: 4 }]);
    }

    #[test]
    fn test_open_shutter_distributes_spp() {
        let camera = Camera::new("a.exr", Vector2u::new(4, 4), 10).with_shutter(0.0, 1.0, 4);
        let samples = camera.shutter_samples();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples.iter().map(|s| s.spp).collect::<Vec<_>>(), vec![3, 3, 2, 2]);
        assert_eq!(total_spp(&samples), 10);
        assert!((samples[0].time - 0.125).abs() < 1e-6);
        assert!(samples.iter().all(|s| (s.weight - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_fewer_spp_than_buckets() {
        let camera = Camera::new("a.exr", Vector2u::new(4, 4), 3).with_shutter(0.0, 2.0, 64);
        let samples = camera.shutter_samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(total_spp(&samples), 3);
    }

    #[test]
    fn test_weights_are_normalized() {
        let camera = Camera::new("a.exr", Vector2u::new(4, 4), 8)
            .with_shutter(0.0, 1.0, 2)
            .with_shutter_curve(vec![(0.0, 1.0), (1.0, 3.0)]);
        let samples = camera.shutter_samples();
        let weighted: Float = samples.iter().map(|s| s.weight * s.spp as Float).sum();
        assert!((weighted - 8.0).abs() < 1e-4);
        assert!(samples[1].weight > samples[0].weight);
    }

    #[test]
    fn test_from_desc() {
        let film = NodeDesc::new("film", "rgb")
            .with_property("width", Property::Integer(16))
            .with_property("height", Property::Integer(0));
        let desc = NodeDesc::new("sensor", "perspective")
            .with_property("spp", Property::Integer(32))
            .with_property("file", Property::String(String::from("out/a.png")))
            .with_property("film", Property::Node(film));
        let camera = Camera::from_desc(&desc, Path::new("/tmp/scene")).unwrap();
        assert_eq!(camera.spp(), 32);
        assert_eq!(camera.film().resolution(), Vector2u::new(16, 1));
        assert_eq!(camera.file(), Path::new("/tmp/scene/out/a.png"));

        let bad = NodeDesc::new("sensor", "perspective")
            .with_property("shutter_weights", Property::Float(vec![1.0]));
        assert!(Camera::from_desc(&bad, Path::new(".")).is_err());
    }
}
