use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;

use crate::entities::profile::ToolProfile;
use crate::entities::tool::{names_match, ToolDescriptor};

const BUILTIN: &str = include_str!("../../data/builtin.toml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Tool '{0}' is defined more than once")]
    Duplicate(String),
    #[error("Tool '{0}' has no executable name")]
    EmptyExecutable(String),
    #[error("Profile '{0}' is defined more than once")]
    DuplicateProfile(String),
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default, rename = "tool")]
    tools: Vec<ToolDescriptor>,
    #[serde(default, rename = "profile")]
    profiles: Vec<ToolProfile>,
}

/// The immutable set of tools the program knows about, plus the variable
/// profiles used to configure them.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
    profiles: Vec<ToolProfile>,
}

impl Catalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            profiles: Vec::new(),
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<ToolProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN)
    }

    /// Parses a catalog document made of `[[tool]]` and `[[profile]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = toml::from_str(content)?;

        let mut seen = BTreeSet::new();
        for tool in &document.tools {
            if tool.executable.trim().is_empty() {
                return Err(CatalogError::EmptyExecutable(tool.name.clone()));
            }
            if !seen.insert(tool.name.to_lowercase()) {
                return Err(CatalogError::Duplicate(tool.name.clone()));
            }
        }

        let mut seen_profiles = BTreeSet::new();
        for profile in &document.profiles {
            if !seen_profiles.insert(profile.tool.to_lowercase()) {
                return Err(CatalogError::DuplicateProfile(profile.tool.clone()));
            }
        }

        Ok(Self {
            tools: document.tools,
            profiles: document.profiles,
        })
    }

    /// Layers `overrides` on top of this catalog. Entries with a known name
    /// replace the existing ones in place; new names are appended.
    pub fn merge(mut self, overrides: Catalog) -> Self {
        for tool in overrides.tools {
            match self.tools.iter_mut().find(|t| names_match(&t.name, &tool.name)) {
                Some(existing) => *existing = tool,
                None => self.tools.push(tool),
            }
        }
        for profile in overrides.profiles {
            match self
                .profiles
                .iter_mut()
                .find(|p| names_match(&p.tool, &profile.tool))
            {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
        self
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| names_match(&t.name, name))
    }

    pub fn profile_for(&self, name: &str) -> Option<&ToolProfile> {
        self.profiles.iter().find(|p| names_match(&p.tool, name))
    }

    /// Distinct category labels, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.tools.iter().map(|t| t.category.as_str()).collect();
        set.into_iter().collect()
    }

    /// Tools of one category sorted by name. Category match ignores case.
    pub fn in_category(&self, category: &str) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<&ToolDescriptor> = self
            .tools
            .iter()
            .filter(|t| names_match(&t.category, category))
            .collect();
        tools.sort_by_key(|t| t.name.to_lowercase());
        tools
    }

    /// Stable 1-based numbering used by menus: categories alphabetically,
    /// tools alphabetically inside each category.
    pub fn numbered(&self) -> Vec<(usize, &ToolDescriptor)> {
        self.categories()
            .into_iter()
            .flat_map(|category| self.in_category(category))
            .enumerate()
            .map(|(idx, tool)| (idx + 1, tool))
            .collect()
    }
}
