// Copyright 2020 @TwoCookingMice

pub mod constants;
