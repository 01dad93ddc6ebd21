// Example runner for the `garment_vision` library: names the dominant color of a
// garment in an image file, optionally inside a pixel box.

use anyhow::{Context, bail};
use garment_vision::core_modules::region::crop_pixels;
use garment_vision::{ColorEngine, EngineConfig, Region};
use std::env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 && args.len() != 6 {
        println!("Usage: garment_vision <image_path> [x1 y1 x2 y2]");
        return Ok(());
    }
    let image_path = &args[1];

    // --- 2. Image Loading & Cropping ---
    let image = image::open(image_path)
        .with_context(|| format!("failed to open image {image_path}"))?
        .to_rgb8();

    let crop = if args.len() == 6 {
        let mut corners = [0u32; 4];
        for (corner, arg) in corners.iter_mut().zip(&args[2..6]) {
            *corner = arg
                .parse()
                .with_context(|| format!("box coordinate {arg:?} is not a non-negative integer"))?;
        }
        let [x1, y1, x2, y2] = corners;
        crop_pixels(&image, x1, y1, x2, y2)?
    } else {
        image
    };
    if crop.width() == 0 || crop.height() == 0 {
        bail!("image {image_path} has no pixels");
    }

    // --- 3. Color Analysis ---
    let engine = ColorEngine::new(EngineConfig::default())?;
    let region = Region::from_rgb_image(&crop)?;
    let report = engine.handle_varied_lighting(&region)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
