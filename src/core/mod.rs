// Copyright @yucwang 2021

pub mod device;
pub mod display;
pub mod error;
pub mod film;
pub mod integrator;
pub mod light_sampler;
pub mod pipeline;
pub mod printer;
pub mod progress;
pub mod sampler;
pub mod scene_desc;
pub mod scene_loader;
pub mod sensor;
