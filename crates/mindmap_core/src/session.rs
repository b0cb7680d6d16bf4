//! Process-wide session state shared by every component.
//!
//! # Responsibility
//! - Own the edit-lock flag and active theme.
//! - Provide the single lock gate used by all mutating operations.
//!
//! # Invariants
//! - While locked, graph and palette state is read-only.
//! - The lock toggle itself is always live.
//! - The lock is an edit-protection flag, not a concurrency primitive.

use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutating operation kinds, used to report which action the lock rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddNode,
    Connect,
    Relabel,
    Recolor,
    DeleteEdge,
    MoveNodes,
    ClearMap,
    NewMap,
    ChangePalette,
    AddPalette,
    ToggleTheme,
    RenameDocument,
    Save,
    Load,
    Import,
}

impl Operation {
    /// Stable short name used in log events and notices.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddNode => "add_node",
            Self::Connect => "connect",
            Self::Relabel => "relabel",
            Self::Recolor => "recolor",
            Self::DeleteEdge => "delete_edge",
            Self::MoveNodes => "move_nodes",
            Self::ClearMap => "clear_map",
            Self::NewMap => "new_map",
            Self::ChangePalette => "change_palette",
            Self::AddPalette => "add_palette",
            Self::ToggleTheme => "toggle_theme",
            Self::RenameDocument => "rename_document",
            Self::Save => "save",
            Self::Load => "load",
            Self::Import => "import",
        }
    }
}

/// Operation rejected because the edit lock is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedError {
    pub operation: Operation,
}

impl Display for LockedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "the map is locked; unlock it to {}",
            self.operation.as_str().replace('_', " ")
        )
    }
}

impl Error for LockedError {}

/// Visual theme persisted across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Cache value for this theme.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parses a cached theme value; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Explicit process-wide state injected into graph/palette/sync calls.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    locked: bool,
    theme: Theme,
}

impl SessionState {
    pub fn new(theme: Theme) -> Self {
        Self {
            locked: false,
            theme,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Sets the lock flag. Always allowed.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switches light/dark theme.
    pub fn toggle_theme(&mut self) -> Result<Theme, LockedError> {
        self.ensure_unlocked(Operation::ToggleTheme)?;
        self.theme = self.theme.toggled();
        Ok(self.theme)
    }

    /// Lock gate for mutating operations.
    pub fn ensure_unlocked(&self, operation: Operation) -> Result<(), LockedError> {
        if self.locked {
            info!(
                "event=lock_rejected module=session status=rejected operation={}",
                operation.as_str()
            );
            return Err(LockedError { operation });
        }
        Ok(())
    }
}
