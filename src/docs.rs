//! Docs navigation
//!
//! The docs page renders a shared configuration (`{ menu, ... }`) with a local
//! menu section prepended. The shared configuration is read once at startup
//! from a JSON file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::DocsSettings;

#[derive(Error, Debug)]
pub enum DocsError {
    #[error("failed to read docs config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid docs config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSection {
    pub label: String,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

/// Shared docs configuration. Keys other than `menu` are carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default)]
    pub menu: Vec<MenuSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocsConfig {
    /// Read the configuration from `path`, or an empty one when unset
    pub fn load(path: Option<&Path>) -> Result<Self, DocsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| DocsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|source| DocsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), sections = config.menu.len(), "Loaded docs config");

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub title: String,
    pub product: String,
    pub badge: Option<String>,
}

/// Props handed to the docs page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsPage {
    pub logo: Logo,
    pub color_from: String,
    pub color_to: String,
    pub text_color: String,
    pub config: DocsConfig,
}

pub fn local_menu(settings: &DocsSettings) -> MenuSection {
    let item = |label: &str, to: &str| MenuItem {
        label: label.to_string(),
        to: to.to_string(),
    };

    MenuSection {
        label: "Menu".to_string(),
        children: vec![
            item("Home", ".."),
            item("GitHub", &settings.repository_url),
            item("Discord", &settings.discord_url),
        ],
    }
}

/// Docs page props with the local menu ahead of every shared section
pub fn compose(shared: &DocsConfig, settings: &DocsSettings) -> DocsPage {
    let mut config = shared.clone();
    config.menu.insert(0, local_menu(settings));

    DocsPage {
        logo: Logo {
            title: "TanStack".to_string(),
            product: "Router".to_string(),
            badge: Some("BETA".to_string()),
        },
        color_from: "from-lime-500".to_string(),
        color_to: "to-emerald-500".to_string(),
        text_color: "text-emerald-500".to_string(),
        config,
    }
}
