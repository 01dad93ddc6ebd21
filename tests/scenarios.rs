use garment_vision::{
    Color, ColorEngine, DescriptionPipeline, EngineConfig, Error, JointPoint, Keypoint,
    PersonObservation, PipelineConfig, Posture, PostureSample, Region, angle_calc,
    core_modules::posture::classify,
};
use image::RgbImage;

fn p(x: f64, y: f64) -> JointPoint {
    JointPoint::new(x, y)
}

#[test]
fn solid_red_region_is_vermelho() {
    let image = RgbImage::from_pixel(20, 20, image::Rgb([255, 0, 0]));
    let region = Region::from_rgb_image(&image).unwrap();

    let exact = ColorEngine::new(EngineConfig {
        blur_sigma: 0.0,
        contrast_gain: 1.0,
        brightness_offset: 0.0,
        ..EngineConfig::default()
    })
    .unwrap();
    assert_eq!(exact.dominant_color(&region).unwrap(), Color::new(255, 0, 0));

    let engine = ColorEngine::new(EngineConfig::default()).unwrap();
    let report = engine.analyze_clothing_color(&region).unwrap();
    assert_eq!(report.rgb.0, 255);
    assert_eq!(report.name, "vermelho");
}

#[test]
fn straight_leg_is_standing() {
    let angle = angle_calc(p(0.0, 1.0), p(0.0, 0.0), p(0.0, -1.0)).unwrap();
    assert!((angle - 180.0).abs() < 1e-9);
    let sample = PostureSample::new(p(0.0, 1.0), p(0.0, 0.0), p(0.0, -1.0));
    assert_eq!(classify(&sample).unwrap(), Posture::Standing);
}

#[test]
fn bent_leg_is_seated() {
    let angle = angle_calc(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)).unwrap();
    assert!((angle - 90.0).abs() < 1e-9);
    let sample = PostureSample::new(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0));
    assert_eq!(classify(&sample).unwrap(), Posture::Seated);
}

#[test]
fn knee_on_hip_is_degenerate() {
    let result = angle_calc(p(0.2, 0.4), p(0.2, 0.4), p(0.2, 0.9));
    assert!(matches!(result, Err(Error::DegenerateGeometry(_))));
}

#[test]
fn full_person_description() {
    let pipeline = DescriptionPipeline::new(PipelineConfig::default()).unwrap();
    let shirt = RgbImage::from_fn(16, 16, |x, y| {
        // Blue shirt with a small white logo.
        if (6..9).contains(&x) && (6..9).contains(&y) {
            image::Rgb([250, 250, 250])
        } else {
            image::Rgb([0, 0, 255])
        }
    });
    let mut keypoints = vec![Keypoint::new(0.0, 0.0, 0.0); 17];
    keypoints[12] = Keypoint::new(0.5, 0.5, 0.95);
    keypoints[14] = Keypoint::new(0.7, 0.5, 0.95);
    keypoints[16] = Keypoint::new(0.7, 0.7, 0.95);

    let observation = PersonObservation {
        garment: Some(Region::from_rgb_image(&shirt).unwrap()),
        keypoints: Some(&keypoints),
    };
    let description = pipeline.describe(&observation).unwrap();
    assert_eq!(description.posture, Posture::Seated);
    let garment = description.garment.as_ref().unwrap();
    assert!(garment.name.contains("azul"), "{}", garment.name);
    assert!(description.text().starts_with("person seated, wearing "));
}

#[test]
fn empty_region_is_invalid_input() {
    assert!(matches!(
        Region::from_channels(&[], 0, 0, 3),
        Err(Error::InvalidInput(_))
    ));
}
