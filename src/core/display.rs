// Copyright @yucwang 2026

use crate::core::device::Stream;
use crate::core::error::RenderError;
use crate::core::film::Film;
use crate::math::constants::UInt;

/// Live-preview sink polled by the progressive render loop.
pub trait Display {
    fn name(&self) -> &str;

    fn reset<'env>(&mut self, stream: &mut Stream<'env>, film: &'env Film) -> Result<(), RenderError>;

    /// Non-blocking. Returns true when the display took a new frame.
    fn update<'env>(&mut self, stream: &mut Stream<'env>, film: &'env Film, frame: UInt) -> Result<bool, RenderError>;

    /// True once every submitted frame has been consumed.
    fn idle(&mut self, stream: &mut Stream<'_>) -> Result<bool, RenderError>;

    fn should_close(&self) -> bool;
}
