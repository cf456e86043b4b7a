//! Makeup palette lookup for a classified skin tone.
//!
//! Assets live under a palette directory laid out as
//! `<dir>/<CATEGORY>/<Product>/<Product>.png`, one folder per known category.
use std::path::PathBuf;

use serde::Serialize;

use skintone_core::classification::tone_category::ToneCategory;

pub const PALETTE_PRODUCTS: [&str; 3] = ["Blush", "Foundation", "Lipstick"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaletteAsset {
    pub product: &'static str,
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct PaletteCatalog {
    dir: PathBuf,
}

impl PaletteCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/skintone/palettes`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("skintone").join("palettes"))
    }

    /// Palette assets for `category`, or `None` when the tone is unknown.
    /// Missing asset files are logged but still listed.
    pub fn recommend(&self, category: ToneCategory) -> Option<Vec<PaletteAsset>> {
        if !category.is_known() {
            return None;
        }
        let assets = PALETTE_PRODUCTS
            .iter()
            .map(|&product| PaletteAsset {
                product,
                path: self
                    .dir
                    .join(category.as_str())
                    .join(product)
                    .join(format!("{product}.png")),
            })
            .collect::<Vec<_>>();
        for asset in assets.iter().filter(|a| !a.path.is_file()) {
            log::warn!("Palette asset missing: {}", asset.path.display());
        }
        Some(assets)
    }
}
