// THEORY:
// The Color Engine is the stateful half of garment color description. Every stage
// it drives (preprocessing, clustering, naming) is a pure function; the engine
// only adds the one piece of mutable state the system has: a calibration factor.
//
// Pipeline for a single crop:
//   preprocess -> flatten -> k-means -> largest cluster -> x factor -> name
//
// Key architectural principles:
// 1.  **Explicit Calibration State**: the factor lives on the engine value the
//     caller owns. It starts at 1.0, only changes through `calibrate`, and is
//     never reset behind the caller's back. Calibration always compares the
//     reference patch's *uncalibrated* color to the known color, so calibrating
//     twice with the same inputs leaves the same factor.
// 2.  **Construction-Time Validation**: every tunable is checked in `new`. A bad
//     cluster count or CLAHE setting is a configuration error, never a per-call
//     surprise.
// 3.  **Sharing Discipline**: `ColorEngine` is `Clone + Send + Sync`, so workers
//     each own a copy. Callers that truly need one calibrated engine across
//     threads use `SharedColorEngine`: analyses share a read lock and run in
//     parallel, while calibration takes the write lock.

use crate::core_modules::cluster::{KMeansSettings, MAX_CLUSTER_COUNT, kmeans};
use crate::core_modules::color::color::Color;
use crate::core_modules::equalize::{Clahe, equalize_value_channel};
use crate::core_modules::namer::ColorNamer;
use crate::core_modules::palette::Palette;
use crate::core_modules::preprocess::{PreprocessSettings, preprocess};
use crate::core_modules::region::Region;
use crate::error::{Error, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Configuration for the ColorEngine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// k for k-means. Reduced automatically when a crop has fewer distinct colors.
    pub cluster_count: usize,
    /// Seed for centroid initialisation.
    pub seed: u64,
    pub max_iterations: usize,
    /// Convergence score at or below which k-means stops refining.
    pub convergence_tolerance: f64,
    /// Gaussian sigma for the denoising blur. `0.0` disables it.
    pub blur_sigma: f32,
    pub contrast_gain: f64,
    pub brightness_offset: f64,
    pub clahe_clip_limit: f64,
    pub clahe_tile_grid: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_count: 5,
            seed: 0,
            max_iterations: 300,
            convergence_tolerance: 1e-4,
            blur_sigma: 1.1,
            contrast_gain: 1.2,
            brightness_offset: 10.0,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 8,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 || self.cluster_count > MAX_CLUSTER_COUNT {
            return Err(Error::Configuration(format!(
                "cluster_count must be within 1..={MAX_CLUSTER_COUNT}, got {}",
                self.cluster_count
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Configuration("max_iterations must be at least 1".to_string()));
        }
        if !(self.convergence_tolerance >= 0.0) {
            return Err(Error::Configuration(format!(
                "convergence_tolerance must be non-negative, got {}",
                self.convergence_tolerance
            )));
        }
        if !(self.blur_sigma >= 0.0) || !self.blur_sigma.is_finite() {
            return Err(Error::Configuration(format!(
                "blur_sigma must be a finite non-negative number, got {}",
                self.blur_sigma
            )));
        }
        if !(self.contrast_gain > 0.0) || !self.contrast_gain.is_finite() {
            return Err(Error::Configuration(format!(
                "contrast_gain must be positive, got {}",
                self.contrast_gain
            )));
        }
        if !self.brightness_offset.is_finite() {
            return Err(Error::Configuration(format!(
                "brightness_offset must be finite, got {}",
                self.brightness_offset
            )));
        }
        Clahe::new(self.clahe_clip_limit, self.clahe_tile_grid)?;
        Ok(())
    }

    pub fn preprocess_settings(&self) -> PreprocessSettings {
        PreprocessSettings {
            blur_sigma: self.blur_sigma,
            contrast_gain: self.contrast_gain,
            brightness_offset: self.brightness_offset,
        }
    }

    pub fn kmeans_settings(&self) -> KMeansSettings {
        KMeansSettings {
            cluster_count: self.cluster_count,
            max_iterations: self.max_iterations,
            tolerance: self.convergence_tolerance,
            seed: self.seed,
        }
    }
}

/// The color of one garment: the calibrated dominant RGB and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorReport {
    pub rgb: (u8, u8, u8),
    pub name: String,
}

impl ColorReport {
    pub fn color(&self) -> Color {
        Color::from(self.rgb)
    }
}

#[derive(Debug, Clone)]
pub struct ColorEngine {
    config: EngineConfig,
    namer: ColorNamer,
    clahe: Clahe,
    calibration_factor: f64,
}

impl ColorEngine {
    /// Builds an engine that names colors with the curated extended palette.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_palette(config, Palette::extended()?)
    }

    pub fn with_palette(config: EngineConfig, palette: Arc<Palette>) -> Result<Self> {
        config.validate()?;
        let clahe = Clahe::new(config.clahe_clip_limit, config.clahe_tile_grid)?;
        let namer = ColorNamer::new(palette)?;
        Ok(Self {
            config,
            namer,
            clahe,
            calibration_factor: 1.0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namer(&self) -> &ColorNamer {
        &self.namer
    }

    pub fn calibration_factor(&self) -> f64 {
        self.calibration_factor
    }

    /// Returns the factor to 1.0. The only way besides `calibrate` to change it.
    pub fn reset_calibration(&mut self) {
        info!("calibration factor reset from {:.4} to 1.0", self.calibration_factor);
        self.calibration_factor = 1.0;
    }

    pub fn preprocess(&self, region: &Region) -> RgbImage {
        preprocess(region, &self.config.preprocess_settings())
    }

    /// Centroid of the largest cluster, before calibration, rounded to bytes.
    pub fn uncalibrated_dominant_color(&self, region: &Region) -> Result<Color> {
        let [red, green, blue] = self.dominant_centroid(region)?;
        Ok(Color::from_f64_saturating(red, green, blue))
    }

    /// The calibrated dominant color of a region.
    pub fn dominant_color(&self, region: &Region) -> Result<Color> {
        let [red, green, blue] = self.dominant_centroid(region)?;
        let factor = self.calibration_factor;
        Ok(Color::from_f64_saturating(red * factor, green * factor, blue * factor))
    }

    fn dominant_centroid(&self, region: &Region) -> Result<[f64; 3]> {
        let processed = self.preprocess(region);
        let samples: Vec<Color> = processed.pixels().map(|pixel| Color::from(*pixel)).collect();
        let clustering = kmeans(&samples, &self.config.kmeans_settings())?;
        let dominant = clustering.dominant().ok_or_else(|| {
            Error::InvalidInput("clustering produced no clusters".to_string())
        })?;
        debug!(
            "dominant cluster holds {}/{} pixels at {:?}",
            dominant.members,
            clustering.total_members(),
            dominant.centroid
        );
        Ok(dominant.centroid)
    }

    /// Sets the calibration factor from a reference patch of known color.
    ///
    /// The factor is the mean of the per-channel ratios `known / max(detected, 1)`
    /// where `detected` is the patch's uncalibrated dominant color.
    ///
    /// `detected` is measured after preprocessing, so a patch whose true color is
    /// `known_color` yields a factor of 1.0 only when preprocessing is the
    /// identity. With the default contrast and brightness, a (100, 150, 200) patch
    /// is seen as about (130, 190, 250) and the factor comes out near 0.786.
    pub fn calibrate(&mut self, reference: &Region, known_color: Color) -> Result<f64> {
        if known_color.channels().iter().all(|&c| c == 0) {
            return Err(Error::InvalidInput(
                "calibration reference color is black; the factor would be zero".to_string(),
            ));
        }
        let detected = self.uncalibrated_dominant_color(reference)?;
        let ratio_sum: f64 = known_color
            .channels()
            .iter()
            .zip(detected.channels().iter())
            .map(|(&known, &seen)| known as f64 / seen.max(1) as f64)
            .sum();
        let factor = ratio_sum / 3.0;

        info!(
            "calibrated against {known_color}: detected {detected}, factor {:.4} -> {:.4}",
            self.calibration_factor, factor
        );
        self.calibration_factor = factor;
        Ok(factor)
    }

    /// Dominant color plus its name.
    pub fn analyze_clothing_color(&self, region: &Region) -> Result<ColorReport> {
        let color = self.dominant_color(region)?;
        let name = self.namer.name(&color);
        Ok(ColorReport {
            rgb: color.as_tuple(),
            name,
        })
    }

    /// Equalises brightness on the HSV value channel before naming. Regions that
    /// are not plain 3-channel color are named directly.
    pub fn handle_varied_lighting(&self, region: &Region) -> Result<ColorReport> {
        if !region.layout().is_three_channel() {
            warn!(
                "{:?} region is not 3-channel color; skipping lighting correction",
                region.layout()
            );
            return self.analyze_clothing_color(region);
        }
        let equalized = equalize_value_channel(&region.to_rgb_image(), &self.clahe);
        self.analyze_clothing_color(&Region::from_rgb_image(&equalized)?)
    }
}

/// One calibrated engine shared between threads. Analyses hold a read lock and
/// may run side by side; calibration holds the write lock, so no analysis ever
/// sees a factor change halfway through.
#[derive(Debug, Clone)]
pub struct SharedColorEngine {
    inner: Arc<RwLock<ColorEngine>>,
}

impl SharedColorEngine {
    pub fn new(engine: ColorEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    // A poisoned lock still guards a usable engine.
    fn read(&self) -> RwLockReadGuard<'_, ColorEngine> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ColorEngine> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calibrate(&self, reference: &Region, known_color: Color) -> Result<f64> {
        self.write().calibrate(reference, known_color)
    }

    pub fn reset_calibration(&self) {
        self.write().reset_calibration();
    }

    pub fn calibration_factor(&self) -> f64 {
        self.read().calibration_factor()
    }

    pub fn analyze_clothing_color(&self, region: &Region) -> Result<ColorReport> {
        self.read().analyze_clothing_color(region)
    }

    pub fn handle_varied_lighting(&self, region: &Region) -> Result<ColorReport> {
        self.read().handle_varied_lighting(region)
    }

    /// An independent copy of the engine in its current calibration state.
    pub fn snapshot(&self) -> ColorEngine {
        self.read().clone()
    }
}

/// Names the garment in `crop` with a fresh default engine, optionally calibrated
/// first against a reference patch of known color.
pub fn identify_clothing_color(
    crop: &Region,
    calibration: Option<(&Region, Color)>,
) -> Result<ColorReport> {
    let mut engine = ColorEngine::new(EngineConfig::default())?;
    if let Some((reference, known_color)) = calibration {
        engine.calibrate(reference, known_color)?;
    }
    engine.handle_varied_lighting(crop)
}
