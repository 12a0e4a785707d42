// Copyright @yucwang 2026

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SceneLoadError {
    Io(std::io::Error),
    Parse(String),
    MissingField(&'static str),
}

impl From<std::io::Error> for SceneLoadError {
    fn from(err: std::io::Error) -> Self {
        SceneLoadError::Io(err)
    }
}

impl fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneLoadError::Io(err) => write!(f, "failed to read scene: {}", err),
            SceneLoadError::Parse(msg) => write!(f, "failed to parse scene: {}", msg),
            SceneLoadError::MissingField(field) => write!(f, "missing scene field: {}", field),
        }
    }
}

impl Error for SceneLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SceneLoadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    Scene(SceneLoadError),
    /// A command on the stream failed; later commands were skipped.
    Device(String),
    /// The stream worker is gone (it panicked or was shut down).
    DeviceLost,
    Image(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<SceneLoadError> for RenderError {
    fn from(err: SceneLoadError) -> Self {
        RenderError::Scene(err)
    }
}

impl From<exr::error::Error> for RenderError {
    fn from(err: exr::error::Error) -> Self {
        RenderError::Image(err.to_string())
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::Image(err.to_string())
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io(err) => write!(f, "io error: {}", err),
            RenderError::Scene(err) => err.fmt(f),
            RenderError::Device(msg) => write!(f, "device error: {}", msg),
            RenderError::DeviceLost => write!(f, "device lost"),
            RenderError::Image(msg) => write!(f, "image error: {}", msg),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Io(err) => Some(err),
            RenderError::Scene(err) => Some(err),
            _ => None,
        }
    }
}
