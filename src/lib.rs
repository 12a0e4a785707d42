// Copyright @yucwang 2021

pub mod core;
pub mod displays;
pub mod integrators;
pub mod io;
pub mod light_samplers;
pub mod math;
pub mod renderers;
pub mod samplers;
