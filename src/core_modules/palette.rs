// THEORY:
// A palette is the vocabulary of the color namer: an ordered list of reference
// colors, each with the Portuguese name a person would use for it. Naming is a
// nearest-neighbour lookup, so the order only matters for breaking exact distance
// ties (first entry wins), but the whole list must be enumerable so it can be
// checked.
//
// Palettes are validated once, when they are built: at least one entry, no blank
// names, and no color listed twice. A palette that passes validation can never
// make the namer fail at call time.
//
// The curated palette is process-wide immutable data, built on first use and
// shared through an `Arc` afterwards (same `OnceLock` idiom as a lookup table).

use crate::core_modules::color::color::Color;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// A named reference color.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaletteEntry {
    pub color: Color,
    pub name: String,
}

impl PaletteEntry {
    pub fn new(color: Color, name: impl Into<String>) -> Self {
        Self {
            color,
            name: name.into(),
        }
    }
}

/// An ordered, validated set of named colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

static EXTENDED_PALETTE: OnceLock<Arc<Palette>> = OnceLock::new();
static BASIC_PALETTE: OnceLock<Arc<Palette>> = OnceLock::new();

// Grouped by hue family. Each color appears once.
const EXTENDED_TABLE: &[((u8, u8, u8), &str)] = &[
    // Vermelhos
    ((139, 0, 0), "vermelho escuro"),
    ((220, 20, 60), "vermelho carmesim"),
    ((255, 0, 0), "vermelho"),
    ((255, 99, 71), "vermelho-coral"),
    ((255, 127, 80), "coral"),
    // Rosas
    ((255, 192, 203), "rosa claro"),
    ((255, 105, 180), "rosa choque"),
    ((219, 112, 147), "rosa violeta"),
    ((199, 21, 133), "rosa médio"),
    ((255, 20, 147), "rosa profundo"),
    // Laranjas
    ((255, 165, 0), "laranja"),
    ((255, 140, 0), "laranja escuro"),
    ((255, 69, 0), "vermelho-alaranjado"),
    // Amarelos
    ((255, 255, 0), "amarelo"),
    ((255, 215, 0), "dourado"),
    ((238, 232, 170), "amarelo claro"),
    ((240, 230, 140), "caqui"),
    // Verdes
    ((0, 128, 0), "verde"),
    ((34, 139, 34), "verde floresta"),
    ((50, 205, 50), "verde limão"),
    ((0, 255, 0), "verde claro"),
    ((152, 251, 152), "verde pálido"),
    ((0, 250, 154), "verde-água"),
    ((60, 179, 113), "verde-esmeralda"),
    ((46, 139, 87), "verde-mar"),
    ((128, 128, 0), "verde-oliva"),
    ((85, 107, 47), "verde musgo"),
    // Azuis
    ((0, 0, 255), "azul"),
    ((0, 0, 139), "azul escuro"),
    ((0, 0, 128), "azul-marinho"),
    ((25, 25, 112), "azul meia-noite"),
    ((65, 105, 225), "azul royal"),
    ((0, 191, 255), "azul céu"),
    ((135, 206, 235), "azul claro"),
    ((135, 206, 250), "azul celeste"),
    ((70, 130, 180), "azul aço"),
    ((100, 149, 237), "azul cornflower"),
    ((0, 128, 128), "azul-petróleo"),
    // Roxos
    ((128, 0, 128), "roxo"),
    ((148, 0, 211), "violeta"),
    ((153, 50, 204), "roxo orquídea"),
    ((186, 85, 211), "roxo médio"),
    ((221, 160, 221), "rosa-roxo"),
    ((238, 130, 238), "violeta claro"),
    ((218, 112, 214), "orquídea"),
    ((216, 191, 216), "lilás"),
    // Marrons
    ((165, 42, 42), "marrom"),
    ((139, 69, 19), "marrom sela"),
    ((210, 105, 30), "chocolate"),
    ((244, 164, 96), "marrom claro"),
    ((160, 82, 45), "siena"),
    ((205, 133, 63), "peru"),
    ((222, 184, 135), "bronzeado"),
    ((210, 180, 140), "marrom claro"),
    // Brancos e beges
    ((255, 255, 255), "branco"),
    ((255, 250, 250), "branco neve"),
    ((245, 245, 245), "cinza branqueado"),
    ((240, 255, 240), "branco-verde"),
    ((245, 255, 250), "branco menta"),
    ((240, 255, 255), "branco-azul"),
    ((255, 250, 240), "branco floral"),
    ((253, 245, 230), "branco antigo"),
    ((255, 245, 238), "branco-salmão"),
    ((245, 245, 220), "bege"),
    ((255, 228, 196), "bege antigo"),
    ((255, 235, 205), "bege claro"),
    ((255, 228, 225), "rosa misty"),
    ((250, 235, 215), "marfim antigo"),
    ((255, 239, 213), "papaia"),
    ((255, 218, 185), "pêssego"),
    // Cinzas e preto
    ((0, 0, 0), "preto"),
    ((105, 105, 105), "cinza escuro"),
    ((128, 128, 128), "cinza"),
    ((169, 169, 169), "cinza médio"),
    ((192, 192, 192), "cinza claro"),
    ((211, 211, 211), "cinza muito claro"),
    ((220, 220, 220), "cinza gainsboro"),
    ((112, 128, 144), "cinza ardósia"),
    ((119, 136, 153), "cinza ardósia claro"),
];

const BASIC_TABLE: &[((u8, u8, u8), &str)] = &[
    ((255, 0, 0), "vermelho"),
    ((0, 255, 0), "verde"),
    ((0, 0, 255), "azul"),
    ((0, 0, 0), "preto"),
    ((255, 255, 255), "branco"),
    ((255, 255, 0), "amarelo"),
    ((128, 0, 128), "roxo"),
    ((255, 165, 0), "laranja"),
    ((255, 192, 203), "rosa"),
    ((139, 69, 19), "marrom"),
];

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Configuration("palette has no entries".to_string()));
        }
        let mut seen: HashSet<Color> = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "palette entry {} has an empty name",
                    entry.color
                )));
            }
            if !seen.insert(entry.color) {
                return Err(Error::Configuration(format!(
                    "palette lists color {} more than once (\"{}\")",
                    entry.color, entry.name
                )));
            }
        }
        Ok(Self { entries })
    }

    fn from_table(table: &[((u8, u8, u8), &str)]) -> Result<Self> {
        Self::new(
            table
                .iter()
                .map(|(rgb, name)| PaletteEntry::new(Color::from(*rgb), *name))
                .collect(),
        )
    }

    /// The curated palette of garment colors, grouped by hue family.
    pub fn extended() -> Result<Arc<Palette>> {
        Self::shared(&EXTENDED_PALETTE, EXTENDED_TABLE)
    }

    /// A coarse ten-color palette of basic color words.
    pub fn basic() -> Result<Arc<Palette>> {
        Self::shared(&BASIC_PALETTE, BASIC_TABLE)
    }

    fn shared(
        cell: &'static OnceLock<Arc<Palette>>,
        table: &[((u8, u8, u8), &str)],
    ) -> Result<Arc<Palette>> {
        if let Some(palette) = cell.get() {
            return Ok(Arc::clone(palette));
        }
        let palette = Arc::new(Self::from_table(table)?);
        Ok(Arc::clone(cell.get_or_init(|| palette)))
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_palettes_are_valid() {
        let extended = Palette::extended().unwrap();
        assert!(extended.len() > 70);
        let mut colors = HashSet::new();
        for entry in extended.entries() {
            assert!(!entry.name.trim().is_empty());
            assert!(colors.insert(entry.color), "duplicate {}", entry.color);
        }

        let basic = Palette::basic().unwrap();
        assert_eq!(basic.len(), 10);
    }

    #[test]
    fn curated_palette_is_built_once() {
        let a = Palette::extended().unwrap();
        let b = Palette::extended().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn names_are_distinct_per_color() {
        let extended = Palette::extended().unwrap();
        let mut pairs = HashSet::new();
        for entry in extended.entries() {
            assert!(pairs.insert((entry.color, entry.name.clone())));
        }
    }

    #[test]
    fn rejects_invalid_palettes() {
        assert!(matches!(Palette::new(vec![]), Err(Error::Configuration(_))));
        assert!(matches!(
            Palette::new(vec![PaletteEntry::new(Color::new(1, 2, 3), "  ")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Palette::new(vec![
                PaletteEntry::new(Color::new(1, 2, 3), "a"),
                PaletteEntry::new(Color::new(1, 2, 3), "b"),
            ]),
            Err(Error::Configuration(_))
        ));
    }
}
