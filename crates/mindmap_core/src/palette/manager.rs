//! Palette manager.
//!
//! # Responsibility
//! - Add palettes, switch the active palette, merge loaded snapshots.
//! - Serialize/restore the process-wide palette blob.
//!
//! # Invariants
//! - Stored palettes are `colors ++ [reset sentinel]`.
//! - Merge never removes palettes, so the active name stays valid.
//! - Restore/reset fall back to the default active name when needed.

use crate::model::document::PaletteSet;
use crate::model::node::THEME_DEFAULT_COLOR;
use crate::palette::color::is_valid_color;
use crate::session::{LockedError, Operation, SessionState};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of the palette active on a fresh session.
pub const DEFAULT_PALETTE_NAME: &str = "Default";

/// Trailing entry of every palette; resets a node to the theme color.
pub const RESET_SENTINEL: &str = THEME_DEFAULT_COLOR;

const DEFAULT_PALETTES: &[(&str, &[&str])] = &[
    (
        DEFAULT_PALETTE_NAME,
        &["#ff9999", "#99ff99", "#9999ff", "#ffff99", "#ff99ff"],
    ),
    (
        "Blues",
        &["#87CEEB", "#4169E1", "#40E0D0", "#000080", "#89CFF0"],
    ),
    (
        "Dark",
        &["#4B0082", "#2F4F4F", "#8B0000", "#006400", "#4A4A4A"],
    ),
];

pub type PaletteResult<T> = Result<T, PaletteError>;

/// Palette operation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    Locked(LockedError),
    EmptyName,
    EmptyColors,
    InvalidColor(String),
    UnknownPalette(String),
    InvalidBlob(String),
}

impl Display for PaletteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(err) => write!(f, "{err}"),
            Self::EmptyName => write!(f, "palette name cannot be empty"),
            Self::EmptyColors => write!(f, "palette needs at least one color"),
            Self::InvalidColor(value) => write!(f, "invalid palette color: `{value}`"),
            Self::UnknownPalette(name) => write!(f, "palette not found: {name}"),
            Self::InvalidBlob(message) => write!(f, "invalid palette data: {message}"),
        }
    }
}

impl Error for PaletteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locked(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LockedError> for PaletteError {
    fn from(value: LockedError) -> Self {
        Self::Locked(value)
    }
}

/// Returns the built-in palette set.
pub fn default_palettes() -> PaletteSet {
    DEFAULT_PALETTES
        .iter()
        .map(|(name, colors)| (name.to_string(), with_sentinel(colors.iter().copied())))
        .collect()
}

fn with_sentinel<'a>(colors: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    colors
        .into_iter()
        .map(str::to_string)
        .chain(std::iter::once(RESET_SENTINEL.to_string()))
        .collect()
}

/// Owner of palette definitions and the active palette name.
#[derive(Debug, Clone)]
pub struct PaletteManager {
    palettes: PaletteSet,
    active: String,
}

impl Default for PaletteManager {
    fn default() -> Self {
        Self {
            palettes: default_palettes(),
            active: DEFAULT_PALETTE_NAME.to_string(),
        }
    }
}

impl PaletteManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores palettes from a cached JSON blob.
    ///
    /// Falls back to defaults when the blob is corrupt or empty.
    pub fn from_blob(blob: &str) -> Self {
        match serde_json::from_str::<PaletteSet>(blob) {
            Ok(palettes) => {
                let mut manager = Self {
                    palettes: PaletteSet::new(),
                    active: DEFAULT_PALETTE_NAME.to_string(),
                };
                manager.merge(&palettes);
                if manager.palettes.is_empty() {
                    return Self::default();
                }
                manager.repair_active();
                manager
            }
            Err(err) => {
                warn!(
                    "event=palette_restore module=palette status=error error_code=invalid_blob error={}",
                    err
                );
                Self::default()
            }
        }
    }

    pub fn palettes(&self) -> &PaletteSet {
        &self.palettes
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// Colors of the active palette.
    pub fn active_colors(&self) -> &[String] {
        self.palettes
            .get(&self.active)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Adds (or replaces) a palette and makes it active.
    pub fn add_palette(
        &mut self,
        session: &SessionState,
        name: &str,
        colors: &[String],
    ) -> PaletteResult<()> {
        session.ensure_unlocked(Operation::AddPalette)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(PaletteError::EmptyName);
        }
        if colors.is_empty() {
            return Err(PaletteError::EmptyColors);
        }
        if let Some(invalid) = colors.iter().find(|color| !is_valid_color(color)) {
            return Err(PaletteError::InvalidColor(invalid.clone()));
        }

        self.palettes.insert(
            name.to_string(),
            with_sentinel(colors.iter().map(|color| color.trim())),
        );
        self.active = name.to_string();
        info!(
            "event=palette_add module=palette status=ok color_count={} palette_count={}",
            colors.len(),
            self.palettes.len()
        );
        Ok(())
    }

    /// Switches the active palette to an existing name.
    pub fn set_active_palette(&mut self, session: &SessionState, name: &str) -> PaletteResult<()> {
        session.ensure_unlocked(Operation::ChangePalette)?;
        if !self.palettes.contains_key(name) {
            return Err(PaletteError::UnknownPalette(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    /// Merges a loaded snapshot; incoming names override colliding ones.
    ///
    /// Palettes without colors are skipped; the reset sentinel is appended
    /// where it is missing.
    pub fn merge(&mut self, incoming: &PaletteSet) {
        for (name, colors) in incoming {
            if colors.iter().all(|color| color == RESET_SENTINEL) {
                warn!(
                    "event=palette_merge module=palette status=skipped error_code=empty_palette"
                );
                continue;
            }
            let mut colors = colors.clone();
            if colors.last().map(String::as_str) != Some(RESET_SENTINEL) {
                colors.push(RESET_SENTINEL.to_string());
            }
            self.palettes.insert(name.clone(), colors);
        }
    }

    /// Restores the built-in palettes and default active name.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }

    /// JSON blob for the local cache.
    pub fn to_blob(&self) -> PaletteResult<String> {
        serde_json::to_string(&self.palettes)
            .map_err(|err| PaletteError::InvalidBlob(err.to_string()))
    }

    fn repair_active(&mut self) {
        if self.palettes.contains_key(&self.active) {
            return;
        }
        if !self.palettes.contains_key(DEFAULT_PALETTE_NAME) {
            self.merge(&default_palettes());
        }
        self.active = DEFAULT_PALETTE_NAME.to_string();
    }
}
