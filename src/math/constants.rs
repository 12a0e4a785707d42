/* Copyright 2020 @Yuchen Wong */

use nalgebra::{Vector2, Vector3, Vector4};

pub type Float = f32;
pub type UInt = u32;

pub type Vector2u = Vector2<UInt>;
pub type Vector3f = Vector3<Float>;
pub type Vector4f = Vector4<Float>;
