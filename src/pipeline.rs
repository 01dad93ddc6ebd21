// THEORY:
// The `pipeline` module is the top-level "describe this person" API. A caller that
// owns detection hands over what it found for one person (a garment crop, a set
// of pose keypoints, or both) and gets back a single description that combines
// the garment color and the posture.
//
// The two components never talk to each other: the color engine only sees the
// crop, the posture classifier only sees the keypoints. The pipeline just runs
// whichever of them has input and joins the results.

use crate::core_modules::color::color::Color;
use crate::core_modules::color_engine::{ColorEngine, ColorReport, EngineConfig};
use crate::core_modules::posture::{Keypoint, Posture, PostureClassifier, PostureConfig};
use crate::core_modules::region::Region;
use crate::error::Result;
use log::debug;
use std::fmt;

/// Configuration for the DescriptionPipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    pub posture: PostureConfig,
    /// Equalise brightness before naming the garment color.
    pub correct_lighting: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            posture: PostureConfig::default(),
            correct_lighting: true,
        }
    }
}

/// What the detectors found for one person.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonObservation<'a> {
    pub garment: Option<Region<'a>>,
    pub keypoints: Option<&'a [Keypoint]>,
}

/// The combined result for one person.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonDescription {
    pub posture: Posture,
    pub garment: Option<ColorReport>,
}

impl PersonDescription {
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PersonDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.posture {
            Posture::Indeterminate => write!(f, "person")?,
            posture => write!(f, "person {posture}")?,
        }
        if let Some(garment) = &self.garment {
            write!(f, ", wearing {}", garment.name)?;
        }
        Ok(())
    }
}

/// The main, top-level struct for describing people.
#[derive(Debug, Clone)]
pub struct DescriptionPipeline {
    engine: ColorEngine,
    classifier: PostureClassifier,
    correct_lighting: bool,
}

impl DescriptionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            engine: ColorEngine::new(config.engine)?,
            classifier: PostureClassifier::new(config.posture)?,
            correct_lighting: config.correct_lighting,
        })
    }

    /// Builds a pipeline around an already configured (and possibly calibrated) engine.
    pub fn with_components(
        engine: ColorEngine,
        classifier: PostureClassifier,
        correct_lighting: bool,
    ) -> Self {
        Self {
            engine,
            classifier,
            correct_lighting,
        }
    }

    pub fn engine(&self) -> &ColorEngine {
        &self.engine
    }

    pub fn calibrate(&mut self, reference: &Region, known_color: Color) -> Result<f64> {
        self.engine.calibrate(reference, known_color)
    }

    pub fn describe_garment(&self, region: &Region) -> Result<ColorReport> {
        if self.correct_lighting {
            self.engine.handle_varied_lighting(region)
        } else {
            self.engine.analyze_clothing_color(region)
        }
    }

    pub fn describe(&self, observation: &PersonObservation) -> Result<PersonDescription> {
        let posture = match observation.keypoints {
            Some(keypoints) => self.classifier.classify_person(keypoints)?,
            None => Posture::Indeterminate,
        };
        let garment = observation
            .garment
            .as_ref()
            .map(|region| self.describe_garment(region))
            .transpose()?;

        let description = PersonDescription { posture, garment };
        debug!("described person: {description}");
        Ok(description)
    }
}
