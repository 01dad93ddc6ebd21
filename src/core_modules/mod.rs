pub mod cluster;
pub mod color;
pub mod color_engine;
pub mod equalize;
pub mod namer;
pub mod palette;
pub mod posture;
pub mod preprocess;
pub mod quantize;
pub mod region;
