// THEORY:
// The namer turns a calibrated color into the word a person would say. It is a
// pure function of (color, palette): no hidden state, so the same color always
// gets the same name.
//
// 1.  **Weighted distance**: distance² = 2·Δr² + 4·Δg² + 3·Δb². Green carries the
//     most weight because the eye is most sensitive to it. The weights are fixed.
// 2.  **Nearest entry**: the palette entry with the smallest distance wins; on an
//     exact tie the earlier entry wins.
// 3.  **Weak matches**: beyond a distance of 100 the nearest name is only a rough
//     fit, so overall brightness decides an adjective. Very bright colors get
//     "claro", very dark ones "escuro", each appended to the last word of the
//     matched name unless the name already says so. Flat mid-brightness colors
//     fall back to "cinza claro" / "cinza escuro" when every channel agrees on
//     which side of 150 it sits.
// 4.  **Hue buckets**: a coarser vocabulary that ignores the palette. Weakly
//     saturated colors are branco/preto/cinza by value; the rest are named by
//     which hue range they fall in, then marked " escuro" or " claro" by value.

use crate::core_modules::color::color::{Color, Hsv};
use crate::core_modules::palette::{Palette, PaletteEntry};
use crate::error::{Error, Result};
use log::debug;
use std::sync::Arc;

const RED_WEIGHT: f64 = 2.0;
const GREEN_WEIGHT: f64 = 4.0;
const BLUE_WEIGHT: f64 = 3.0;

/// Nearest matches farther than this get an adjective.
pub const WEAK_MATCH_DISTANCE: f64 = 100.0;

const LIGHT_INTENSITY: f64 = 200.0;
const DARK_INTENSITY: f64 = 80.0;
const NEUTRAL_SPREAD: u8 = 30;
const NEUTRAL_BAND: (f64, f64) = (100.0, 200.0);
const GRAY_SPLIT: u8 = 150;

const LIGHT: &str = "claro";
const DARK: &str = "escuro";
const LIGHT_GRAY: &str = "cinza claro";
const DARK_GRAY: &str = "cinza escuro";
/// Only produced by an empty palette, which `Palette::new` already rejects.
pub const UNKNOWN: &str = "desconhecido";

const ACHROMATIC_SATURATION: f32 = 0.2;
const WHITE_VALUE: f32 = 0.9;
const BLACK_VALUE: f32 = 0.2;
const DARK_VALUE: f32 = 0.3;
const LIGHT_VALUE: f32 = 0.7;

/// Upper hue bound (inclusive, degrees) of each named range, checked in order.
/// Hues past the last bound wrap back to red.
const HUE_BUCKETS: [(f32, &str); 7] = [
    (15.0, "vermelho"),
    (45.0, "laranja"),
    (70.0, "amarelo"),
    (160.0, "verde"),
    (260.0, "azul"),
    (290.0, "roxo"),
    (330.0, "rosa"),
];
const WRAPPED_HUE: &str = "vermelho";

/// Perceptually weighted Euclidean distance between two colors.
pub fn distance(a: &Color, b: &Color) -> f64 {
    let dr = a.red as f64 - b.red as f64;
    let dg = a.green as f64 - b.green as f64;
    let db = a.blue as f64 - b.blue as f64;
    (RED_WEIGHT * dr * dr + GREEN_WEIGHT * dg * dg + BLUE_WEIGHT * db * db).sqrt()
}

/// Maps colors to names using a palette.
#[derive(Debug, Clone)]
pub struct ColorNamer {
    palette: Arc<Palette>,
}

impl ColorNamer {
    pub fn new(palette: Arc<Palette>) -> Result<Self> {
        if palette.is_empty() {
            return Err(Error::Configuration("color namer needs a non-empty palette".to_string()));
        }
        Ok(Self { palette })
    }

    pub fn with_extended_palette() -> Result<Self> {
        Self::new(Palette::extended()?)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The closest palette entry and its distance. First entry wins ties.
    pub fn nearest(&self, color: &Color) -> Option<(&PaletteEntry, f64)> {
        let mut best: Option<(&PaletteEntry, f64)> = None;
        for entry in self.palette.entries() {
            let d = distance(color, &entry.color);
            match best {
                Some((_, best_distance)) if d >= best_distance => {}
                _ => best = Some((entry, d)),
            }
        }
        best
    }

    /// Names a color, adding a brightness adjective when the palette match is weak.
    pub fn name(&self, color: &Color) -> String {
        let Some((entry, min_distance)) = self.nearest(color) else {
            return UNKNOWN.to_string();
        };
        debug!(
            "{} is nearest to \"{}\" {} at distance {:.1}",
            color, entry.name, entry.color, min_distance
        );

        if min_distance <= WEAK_MATCH_DISTANCE {
            return entry.name.clone();
        }

        let intensity = color.intensity();
        let base_name = entry.name.split_whitespace().last().unwrap_or(&entry.name);

        if intensity > LIGHT_INTENSITY {
            if !entry.name.contains(LIGHT) {
                return format!("{base_name} {LIGHT}");
            }
        } else if intensity < DARK_INTENSITY && !entry.name.contains(DARK) {
            return format!("{base_name} {DARK}");
        }

        let flat = color.spread() < NEUTRAL_SPREAD;
        if flat && intensity > NEUTRAL_BAND.0 && intensity < NEUTRAL_BAND.1 {
            let channels = color.channels();
            if channels.iter().all(|&c| c > GRAY_SPLIT) {
                return LIGHT_GRAY.to_string();
            }
            if channels.iter().all(|&c| c < GRAY_SPLIT) {
                return DARK_GRAY.to_string();
            }
        }

        entry.name.clone()
    }
}

/// Names a color by hue bucket instead of by palette.
pub fn hue_name(color: &Color) -> String {
    hsv_name(&color.to_hsv())
}

pub fn hsv_name(hsv: &Hsv) -> String {
    let value = hsv.value as f32 / 255.0;
    let base = if hsv.saturation < ACHROMATIC_SATURATION {
        if value > WHITE_VALUE {
            "branco"
        } else if value < BLACK_VALUE {
            "preto"
        } else {
            "cinza"
        }
    } else {
        HUE_BUCKETS
            .iter()
            .find(|(upper, _)| hsv.hue <= *upper)
            .map_or(WRAPPED_HUE, |(_, name)| *name)
    };

    if value < DARK_VALUE {
        format!("{base} {DARK}")
    } else if value > LIGHT_VALUE {
        format!("{base} {LIGHT}")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn random_color(rng: &mut StdRng) -> Color {
        Color::new(rng.random(), rng.random(), rng.random())
    }

    fn sparse_namer() -> ColorNamer {
        let palette = Palette::new(vec![
            PaletteEntry::new(Color::new(255, 0, 0), "vermelho"),
            PaletteEntry::new(Color::new(0, 0, 255), "azul"),
        ])
        .unwrap();
        ColorNamer::new(Arc::new(palette)).unwrap()
    }

    #[test]
    fn distance_uses_channel_weights() {
        assert_abs_diff_eq!(distance(&Color::new(0, 0, 0), &Color::new(1, 0, 0)), 2f64.sqrt());
        assert_abs_diff_eq!(distance(&Color::new(0, 0, 0), &Color::new(0, 1, 0)), 2.0);
        assert_abs_diff_eq!(distance(&Color::new(0, 0, 0), &Color::new(0, 0, 1)), 3f64.sqrt());
        assert_eq!(distance(&Color::new(9, 9, 9), &Color::new(9, 9, 9)), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = random_color(&mut rng);
            let b = random_color(&mut rng);
            assert_eq!(distance(&a, &b), distance(&b, &a));
        }
    }

    #[test]
    fn naming_is_deterministic() {
        let namer = ColorNamer::with_extended_palette().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..300 {
            let color = random_color(&mut rng);
            let first = namer.name(&color);
            assert!(!first.is_empty());
            assert_eq!(first, namer.name(&color));
            assert_eq!(first, namer.clone().name(&color));
        }
    }

    #[test]
    fn palette_colors_name_themselves() {
        let namer = ColorNamer::with_extended_palette().unwrap();
        for entry in namer.palette().entries() {
            assert_eq!(namer.name(&entry.color), entry.name);
        }
        assert_eq!(namer.name(&Color::new(255, 0, 0)), "vermelho");
        assert_eq!(namer.name(&Color::new(255, 10, 10)), "vermelho");
        assert_eq!(namer.name(&Color::new(130, 130, 130)), "cinza");
    }

    #[test]
    fn weak_bright_match_gets_light_adjective() {
        let namer = ColorNamer::with_extended_palette().unwrap();
        // Nearest is "azul celeste", more than 100 away.
        assert_eq!(namer.name(&Color::new(95, 255, 255)), "celeste claro");
        // Nearest already says "claro": kept unchanged.
        assert_eq!(namer.name(&Color::new(108, 255, 240)), "azul claro");
    }

    #[test]
    fn weak_dark_match_gets_dark_adjective() {
        let namer = ColorNamer::with_extended_palette().unwrap();
        assert_eq!(namer.name(&Color::new(0, 0, 60)), "preto escuro");
        assert_eq!(namer.name(&Color::new(0, 15, 195)), "azul escuro");
    }

    #[test]
    fn flat_mid_colors_fall_back_to_gray() {
        let namer = sparse_namer();
        assert_eq!(namer.name(&Color::new(170, 175, 165)), "cinza claro");
        assert_eq!(namer.name(&Color::new(120, 125, 115)), "cinza escuro");
        // Channels straddle 150: neither gray applies.
        let straddling = Color::new(140, 150, 160);
        let (nearest, _) = namer.nearest(&straddling).unwrap();
        assert_eq!(namer.name(&straddling), nearest.name);
    }

    #[test]
    fn basic_palette_names_coarse_colors() {
        let namer = ColorNamer::new(Palette::basic().unwrap()).unwrap();
        assert_eq!(namer.name(&Color::new(240, 20, 30)), "vermelho");
        assert_eq!(namer.name(&Color::new(130, 70, 25)), "marrom");
        assert_eq!(namer.name(&Color::new(250, 250, 250)), "branco");
    }

    #[test]
    fn first_entry_wins_exact_ties() {
        let palette = Palette::new(vec![
            PaletteEntry::new(Color::new(0, 0, 0), "primeiro"),
            PaletteEntry::new(Color::new(20, 0, 0), "segundo"),
        ])
        .unwrap();
        let namer = ColorNamer::new(Arc::new(palette)).unwrap();
        assert_eq!(namer.name(&Color::new(10, 0, 0)), "primeiro");
    }

    fn hsv(hue: f32, saturation: f32, value: u8) -> Hsv {
        Hsv {
            hue,
            saturation,
            value,
        }
    }

    #[test]
    fn hue_bounds_belong_to_the_lower_range() {
        let cases = [
            (0.0, "vermelho"),
            (15.0, "vermelho"),
            (15.01, "laranja"),
            (45.0, "laranja"),
            (45.01, "amarelo"),
            (70.0, "amarelo"),
            (70.01, "verde"),
            (160.0, "verde"),
            (160.01, "azul"),
            (260.0, "azul"),
            (260.01, "roxo"),
            (290.0, "roxo"),
            (290.01, "rosa"),
            (330.0, "rosa"),
            (330.01, "vermelho"),
            (359.9, "vermelho"),
        ];
        for (hue, expected) in cases {
            // Mid value: no brightness suffix.
            assert_eq!(hsv_name(&hsv(hue, 1.0, 128)), expected, "hue {hue}");
        }
    }

    #[test]
    fn low_saturation_is_named_by_value() {
        assert_eq!(hsv_name(&hsv(200.0, 0.19, 128)), "cinza");
        // 0.2 itself is chromatic.
        assert_eq!(hsv_name(&hsv(200.0, 0.2, 128)), "azul");
        assert_eq!(hsv_name(&hsv(0.0, 0.0, 235)), "branco claro");
        assert_eq!(hsv_name(&hsv(0.0, 0.0, 229)), "cinza claro");
        assert_eq!(hsv_name(&hsv(0.0, 0.0, 50)), "preto escuro");
        // 51/255 is exactly 0.2, which is not below it.
        assert_eq!(hsv_name(&hsv(0.0, 0.0, 51)), "cinza escuro");
    }

    #[test]
    fn value_adds_dark_and_light_suffixes() {
        assert_eq!(hsv_name(&hsv(100.0, 0.8, 76)), "verde escuro");
        assert_eq!(hsv_name(&hsv(100.0, 0.8, 77)), "verde");
        assert_eq!(hsv_name(&hsv(100.0, 0.8, 178)), "verde");
        assert_eq!(hsv_name(&hsv(100.0, 0.8, 179)), "verde claro");
    }

    #[test]
    fn hue_name_reads_rgb_colors() {
        assert_eq!(hue_name(&Color::new(255, 0, 0)), "vermelho claro");
        assert_eq!(hue_name(&Color::new(0, 0, 128)), "azul");
        assert_eq!(hue_name(&Color::new(255, 255, 255)), "branco claro");
        assert_eq!(hue_name(&Color::new(0, 0, 0)), "preto escuro");
        assert_eq!(hue_name(&Color::new(120, 120, 120)), "cinza");
        assert_eq!(hue_name(&Color::new(200, 100, 0)), "laranja claro");
    }
}
