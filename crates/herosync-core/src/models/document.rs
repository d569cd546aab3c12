//! Document payloads carried by queued changes and conflicts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Logical document category in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Character sheets
    Characters,
    /// Per-user editor preferences synced across devices
    Preferences,
}

impl Collection {
    /// Name used in storage keys and remote URLs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Preferences => "preferences",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "characters" | "character" => Ok(Self::Characters),
            "preferences" | "preference" => Ok(Self::Preferences),
            other => Err(Error::InvalidInput(format!("unknown collection '{other}'"))),
        }
    }
}

/// Payload written to the remote store, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentData {
    /// A full character sheet
    Character(CharacterSheet),
    /// Editor preferences
    Preferences(Preferences),
}

impl DocumentData {
    /// Collection this payload belongs to
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Character(_) => Collection::Characters,
            Self::Preferences(_) => Collection::Preferences,
        }
    }

    /// Check the payload's shape before it enters the queue
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Character(sheet) => sheet.validate(),
            Self::Preferences(preferences) => preferences.validate(),
        }
    }
}

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    const fn all(&self) -> [(&'static str, u8); 6] {
        [
            ("strength", self.strength),
            ("dexterity", self.dexterity),
            ("constitution", self.constitution),
            ("intelligence", self.intelligence),
            ("wisdom", self.wisdom),
            ("charisma", self.charisma),
        ]
    }
}

/// Current and maximum hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

/// A character sheet as stored in the `characters` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    /// Display name
    pub name: String,
    #[serde(default)]
    pub ancestry: String,
    #[serde(default)]
    pub class: String,
    /// Character level (1-20)
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub hit_points: HitPoints,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

const fn default_level() -> u8 {
    1
}

impl CharacterSheet {
    /// Create a level 1 character with default scores
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestry: String::new(),
            class: String::new(),
            level: default_level(),
            abilities: AbilityScores::default(),
            hit_points: HitPoints::default(),
            equipment: Vec::new(),
            notes: String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "character name must not be empty".to_string(),
            ));
        }
        if !(1..=20).contains(&self.level) {
            return Err(Error::InvalidInput(format!(
                "character level must be between 1 and 20 (got {})",
                self.level
            )));
        }
        if let Some((ability, score)) = self
            .abilities
            .all()
            .into_iter()
            .find(|(_, score)| !(1..=30).contains(score))
        {
            return Err(Error::InvalidInput(format!(
                "{ability} must be between 1 and 30 (got {score})"
            )));
        }
        if self.hit_points.max < 0 || self.hit_points.current > self.hit_points.max {
            return Err(Error::InvalidInput(format!(
                "hit points {}/{} are out of range",
                self.hit_points.current, self.hit_points.max
            )));
        }
        Ok(())
    }
}

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow system preference
    #[default]
    System,
}

/// Editor preferences as stored in the `preferences` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: ThemeMode,
    /// Font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Show computed ability modifiers next to raw scores
    #[serde(default = "default_show_modifiers")]
    pub show_modifiers: bool,
}

const fn default_font_size() -> u32 {
    14
}

const fn default_show_modifiers() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::System,
            font_size: default_font_size(),
            show_modifiers: default_show_modifiers(),
        }
    }
}

impl Preferences {
    fn validate(&self) -> Result<()> {
        if !(8..=48).contains(&self.font_size) {
            return Err(Error::InvalidInput(format!(
                "font size must be between 8 and 48 (got {})",
                self.font_size
            )));
        }
        Ok(())
    }
}
