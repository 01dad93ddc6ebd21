// THEORY:
// This file is the main entry point for the `garment_vision` library crate.
// The crate describes detected people: the dominant color of a garment crop,
// named from a curated palette, and whether the person is standing or seated,
// read from the knee angle of one leg.
//
// Detection itself (boxes, pose keypoints) belongs to the caller. This crate only
// consumes what the detectors produce: a cropped pixel region and a set of joint
// coordinates.
//
// The high-level interface is `DescriptionPipeline` (one person at a time) and
// `ParallelPipeline` (batches over a tokio worker pool). The building blocks in
// `core_modules` stay public for callers that only need one of them, such as a
// bare `ColorEngine` or `PostureClassifier`.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use crate::core_modules::color::color::Color;
pub use crate::core_modules::color_engine::{
    ColorEngine, ColorReport, EngineConfig, SharedColorEngine, identify_clothing_color,
};
pub use crate::core_modules::namer::{ColorNamer, hue_name};
pub use crate::core_modules::palette::{Palette, PaletteEntry};
pub use crate::core_modules::posture::{
    JointPoint, Keypoint, LegSide, Posture, PostureClassifier, PostureConfig, PostureSample,
    angle_calc,
};
pub use crate::core_modules::quantize::detect_dominant_color_name;
pub use crate::core_modules::region::{BoundingBox, OwnedRegion, PixelLayout, Region};
pub use crate::error::{Error, Result};
pub use crate::parallel_pipeline::{OwnedObservation, ParallelPipeline, PoolError};
pub use crate::pipeline::{
    DescriptionPipeline, PersonDescription, PersonObservation, PipelineConfig,
};
