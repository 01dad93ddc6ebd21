// THEORY:
// Posture is read from one leg. The knee is a hinge: a straight, load-bearing leg
// makes an angle near 180° between thigh and shin, a bent leg makes a much smaller
// one. Three joints (hip, knee, ankle) give two vectors meeting at the knee, and
// the included angle between them is
//
//     angle = acos( (v1 · v2) / (|v1| |v2|) ),  v1 = hip - knee,  v2 = ankle - knee
//
// Above 150° the person is standing, otherwise seated. This is a coarse binary
// heuristic: it cannot tell seated from crouching or kneeling.
//
// Failure is always explicit. A missing joint makes the sample indeterminate, a
// zero-length limb (two coincident joints) is degenerate geometry, and the cosine
// is clamped into [-1, 1] so rounding can never turn into NaN.
//
// Landmark providers such as YOLO-pose report 17 COCO keypoints per person with a
// confidence each. `PostureSample::from_coco_keypoints` picks one leg out of such
// a set and treats low-confidence points as missing.

use crate::error::{Error, Result};
use log::debug;
use std::fmt;

/// Knee angles strictly above this are "standing".
pub const STANDING_THRESHOLD_DEGREES: f64 = 150.0;

const COCO_LEFT_HIP: usize = 11;
const COCO_RIGHT_HIP: usize = 12;
const COCO_LEFT_KNEE: usize = 13;
const COCO_RIGHT_KNEE: usize = 14;
const COCO_LEFT_ANKLE: usize = 15;
const COCO_RIGHT_ANKLE: usize = 16;

/// A 2D joint position in normalised image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointPoint {
    pub x: f64,
    pub y: f64,
}

impl JointPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One landmark as reported by a pose model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl Keypoint {
    pub const fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LegSide {
    Left,
    Right,
}

impl LegSide {
    fn coco_indices(&self) -> (usize, usize, usize) {
        match self {
            LegSide::Left => (COCO_LEFT_HIP, COCO_LEFT_KNEE, COCO_LEFT_ANKLE),
            LegSide::Right => (COCO_RIGHT_HIP, COCO_RIGHT_KNEE, COCO_RIGHT_ANKLE),
        }
    }
}

/// The (hip, knee, ankle) triple of one leg. Any joint may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PostureSample {
    pub hip: Option<JointPoint>,
    pub knee: Option<JointPoint>,
    pub ankle: Option<JointPoint>,
}

impl PostureSample {
    pub fn new(hip: JointPoint, knee: JointPoint, ankle: JointPoint) -> Self {
        Self {
            hip: Some(hip),
            knee: Some(knee),
            ankle: Some(ankle),
        }
    }

    /// Reads one leg out of a COCO-17 keypoint set. Points below `min_confidence`
    /// or past the end of the slice are missing.
    pub fn from_coco_keypoints(keypoints: &[Keypoint], side: LegSide, min_confidence: f64) -> Self {
        let joint = |index: usize| {
            keypoints
                .get(index)
                .filter(|k| k.confidence >= min_confidence)
                .map(|k| JointPoint::new(k.x, k.y))
        };
        let (hip, knee, ankle) = side.coco_indices();
        Self {
            hip: joint(hip),
            knee: joint(knee),
            ankle: joint(ankle),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.hip.is_some() && self.knee.is_some() && self.ankle.is_some()
    }

    /// The knee angle in degrees. A missing joint is `InvalidInput`.
    pub fn knee_angle(&self) -> Result<f64> {
        match (self.hip, self.knee, self.ankle) {
            (Some(hip), Some(knee), Some(ankle)) => angle_calc(hip, knee, ankle),
            _ => Err(Error::InvalidInput(format!(
                "posture sample is missing a joint (hip: {}, knee: {}, ankle: {})",
                self.hip.is_some(),
                self.knee.is_some(),
                self.ankle.is_some()
            ))),
        }
    }
}

/// Included angle at `knee`, in degrees, between the limbs to `hip` and `ankle`.
pub fn angle_calc(hip: JointPoint, knee: JointPoint, ankle: JointPoint) -> Result<f64> {
    if !(hip.is_finite() && knee.is_finite() && ankle.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "joint coordinates must be finite: hip {hip:?}, knee {knee:?}, ankle {ankle:?}"
        )));
    }

    let (v1x, v1y) = (hip.x - knee.x, hip.y - knee.y);
    let (v2x, v2y) = (ankle.x - knee.x, ankle.y - knee.y);
    let thigh = v1x.hypot(v1y);
    let shin = v2x.hypot(v2y);
    if thigh == 0.0 || shin == 0.0 {
        return Err(Error::DegenerateGeometry(format!(
            "zero-length limb at knee {knee:?} (thigh {thigh}, shin {shin})"
        )));
    }

    let cosine = ((v1x * v2x + v1y * v2y) / (thigh * shin)).clamp(-1.0, 1.0);
    Ok(cosine.acos().to_degrees())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Posture {
    Standing,
    Seated,
    Indeterminate,
}

impl Posture {
    pub fn from_knee_angle(degrees: f64) -> Self {
        if degrees > STANDING_THRESHOLD_DEGREES {
            Posture::Standing
        } else {
            Posture::Seated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Posture::Standing => "standing",
            Posture::Seated => "seated",
            Posture::Indeterminate => "indeterminate",
        }
    }

    pub fn is_determinate(&self) -> bool {
        !matches!(self, Posture::Indeterminate)
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies one leg. Missing joints give `Indeterminate`; degenerate geometry
/// is an error.
pub fn classify(sample: &PostureSample) -> Result<Posture> {
    if !sample.is_complete() {
        return Ok(Posture::Indeterminate);
    }
    Ok(Posture::from_knee_angle(sample.knee_angle()?))
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PostureConfig {
    /// Keypoints below this confidence count as missing.
    pub min_keypoint_confidence: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            min_keypoint_confidence: 0.5,
        }
    }
}

/// Classifies whole people from their pose keypoints.
#[derive(Debug, Clone, Default)]
pub struct PostureClassifier {
    config: PostureConfig,
}

impl PostureClassifier {
    pub fn new(config: PostureConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.min_keypoint_confidence) {
            return Err(Error::Configuration(format!(
                "min_keypoint_confidence must be within [0, 1], got {}",
                config.min_keypoint_confidence
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PostureConfig {
        &self.config
    }

    pub fn classify(&self, sample: &PostureSample) -> Result<Posture> {
        classify(sample)
    }

    /// Tries the left leg, then the right, and returns the first determinate
    /// posture. A degenerate leg only fails the call when the other leg cannot
    /// answer either.
    pub fn classify_person(&self, keypoints: &[Keypoint]) -> Result<Posture> {
        let mut first_error = None;
        for side in [LegSide::Left, LegSide::Right] {
            let sample = PostureSample::from_coco_keypoints(
                keypoints,
                side,
                self.config.min_keypoint_confidence,
            );
            match classify(&sample) {
                Ok(posture) if posture.is_determinate() => return Ok(posture),
                Ok(_) => {}
                Err(error) => {
                    debug!("{side:?} leg unusable: {error}");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(Posture::Indeterminate),
        }
    }
}
