// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! User preferences and their bulk export/import envelope
//!
//! # Envelope
//!
//! ```json
//! {
//!   "format_id": "keylayout-remap",
//!   "format_version": [1, 0],
//!   "preferences": { "preferred_input_layout": "AZERTY", ... }
//! }
//! ```
//!
//! Imports with another `format_id` or another major version are refused.
//! While emulation is active the layouts in use and the preferred layout
//! names survive an import unless the lock is explicitly ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::config::layouts::{LayoutCatalog, LayoutMerge};
use crate::config::ConfigError;
use crate::core::layouts::REFERENCE_LAYOUT;
use crate::core::{Journal, RemapOptions, Translation};

pub const PREFERENCES_FORMAT_ID: &str = "keylayout-remap";
pub const PREFERENCES_FORMAT_VERSION: (u32, u32) = (1, 0);

pub const DEFAULT_REAPPLY_DELAY_SECS: f64 = 3.0;
/// Longest wait before re-applying after a reload
pub const MAX_REAPPLY_DELAY_SECS: f64 = 600.0;

const CUSTOM_LAYOUTS_KEY: &str = "custom_layouts";
const JOURNAL_KEY: &str = "journal";

/// Imported as-is whenever present
const GENERAL_FIELDS: &[&str] = &[
    "allow_non_reference_target_layouts",
    "reapply_on_reload",
    "reapply_delay_secs",
    "allow_key_conflicts_in_input_layout",
    "logging_level",
];

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Unknown logging level '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Preferences {
    /// Layout the user physically types on
    pub preferred_input_layout: String,
    /// Layout whose shortcuts should be triggered
    pub preferred_target_layout: String,
    pub allow_non_reference_target_layouts: bool,
    /// Re-apply whenever the host reloads its bindings
    pub reapply_on_reload: bool,
    /// Wait before re-applying after a reload, in seconds
    pub reapply_delay_secs: f64,
    pub allow_key_conflicts_in_input_layout: bool,
    pub logging_level: LogLevel,
    pub is_emulation_active: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_input_layout: REFERENCE_LAYOUT.to_string(),
            preferred_target_layout: REFERENCE_LAYOUT.to_string(),
            allow_non_reference_target_layouts: false,
            reapply_on_reload: true,
            reapply_delay_secs: DEFAULT_REAPPLY_DELAY_SECS,
            allow_key_conflicts_in_input_layout: false,
            logging_level: LogLevel::Warn,
            is_emulation_active: false,
        }
    }
}

/// Options for `Preferences::import_from_json`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub layouts: LayoutMerge,
    /// Replace the journal with the imported one
    pub import_journal: bool,
    /// Take `is_emulation_active` from the import; the caller reverts before
    /// and re-applies after as needed
    pub import_emulation_status: bool,
    /// Overwrite layouts in use even while emulation is active
    pub ignore_emulation_lock: bool,
}

#[derive(Deserialize, Serialize)]
struct PreferencesEnvelope {
    format_id: String,
    format_version: (u32, u32),
    #[serde(default)]
    preferences: Map<String, Value>,
}

impl Preferences {
    pub fn from_json_or_default(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(text).unwrap_or_else(|e| {
            warn!("Ignoring malformed preferences: {}", e);
            Self::default()
        })
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resets layout names the catalogue does not know to the reference layout
    ///
    /// A non-reference target without `allow_non_reference_target_layouts`
    /// is reset too, unless emulation is active, in which case the flag is
    /// turned on instead so the running emulation stays consistent.
    /// The re-apply delay is clamped to `0..=MAX_REAPPLY_DELAY_SECS`.
    pub fn sanitize(&mut self, catalog: &LayoutCatalog) {
        if !self.reapply_delay_secs.is_finite() {
            warn!("Invalid re-apply delay, using {}s", DEFAULT_REAPPLY_DELAY_SECS);
            self.reapply_delay_secs = DEFAULT_REAPPLY_DELAY_SECS;
        }
        self.reapply_delay_secs = self.reapply_delay_secs.clamp(0.0, MAX_REAPPLY_DELAY_SECS);

        for name in [&mut self.preferred_input_layout, &mut self.preferred_target_layout] {
            if !catalog.contains(name) {
                warn!("Unknown layout '{}', using {}", name, REFERENCE_LAYOUT);
                *name = REFERENCE_LAYOUT.to_string();
            }
        }

        if !self.allow_non_reference_target_layouts
            && self.preferred_target_layout != REFERENCE_LAYOUT
        {
            if self.is_emulation_active {
                self.allow_non_reference_target_layouts = true;
            } else {
                self.preferred_target_layout = REFERENCE_LAYOUT.to_string();
            }
        }
    }

    /// Wait before re-applying after a reload.
    pub fn reapply_delay(&self) -> Duration {
        let secs = self.reapply_delay_secs.clamp(0.0, MAX_REAPPLY_DELAY_SECS);
        Duration::try_from_secs_f64(secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REAPPLY_DELAY_SECS))
    }

    pub fn input_translation(&self, catalog: &LayoutCatalog) -> Translation {
        catalog
            .translation(&self.preferred_input_layout)
            .unwrap_or_default()
    }

    pub fn target_translation(&self, catalog: &LayoutCatalog) -> Translation {
        catalog
            .translation(&self.preferred_target_layout)
            .unwrap_or_default()
    }

    /// Translation applied to bindings for the preferred layouts.
    pub fn effective_translation(&self, catalog: &LayoutCatalog) -> Translation {
        Translation::from_input_to_target(
            &self.input_translation(catalog),
            &self.target_translation(catalog),
        )
    }

    /// True when the preferred layouts can be applied
    ///
    /// An invalid target never applies; an invalid input only with key
    /// conflicts allowed. A trivial (identity) translation counts only
    /// with `ignore_trivial`.
    pub fn is_applicable(&self, catalog: &LayoutCatalog, ignore_trivial: bool) -> bool {
        let target = self.target_translation(catalog);
        if !target.is_valid() {
            return false;
        }
        let input = self.input_translation(catalog);
        if !self.allow_key_conflicts_in_input_layout && !input.is_valid() {
            return false;
        }
        ignore_trivial || !Translation::from_input_to_target(&input, &target).is_identity()
    }

    pub fn remap_options(&self) -> RemapOptions {
        RemapOptions {
            allow_conflicts: self.allow_key_conflicts_in_input_layout,
        }
    }

    /// User layouts that must not change while emulation runs.
    pub fn layouts_in_use(&self) -> Vec<&str> {
        if !self.is_emulation_active {
            return Vec::new();
        }
        vec![
            self.preferred_input_layout.as_str(),
            self.preferred_target_layout.as_str(),
        ]
    }

    /// Wraps these preferences in the export envelope
    ///
    /// User layouts and the journal are included only when given.
    pub fn export_to_json(
        &self,
        catalog: Option<&LayoutCatalog>,
        journal: Option<&Journal>,
    ) -> Result<String, ConfigError> {
        let Value::Object(mut preferences) = serde_json::to_value(self)? else {
            return Err(ConfigError::UnsupportedPreferences(
                "preferences did not serialize to an object".to_string(),
            ));
        };
        if let Some(catalog) = catalog {
            preferences.insert(
                CUSTOM_LAYOUTS_KEY.to_string(),
                serde_json::to_value(catalog.custom_layouts())?,
            );
        }
        if let Some(journal) = journal {
            preferences.insert(JOURNAL_KEY.to_string(), serde_json::to_value(journal)?);
        }

        let envelope = PreferencesEnvelope {
            format_id: PREFERENCES_FORMAT_ID.to_string(),
            format_version: PREFERENCES_FORMAT_VERSION,
            preferences,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Imports an exported envelope into these preferences, the catalogue
    /// and the journal
    ///
    /// Nothing changes unless the whole import is valid.
    pub fn import_from_json(
        &mut self,
        text: &str,
        catalog: &mut LayoutCatalog,
        journal: &mut Journal,
        options: &ImportOptions,
    ) -> Result<(), ConfigError> {
        let envelope: PreferencesEnvelope = serde_json::from_str(text)
            .map_err(|e| ConfigError::UnsupportedPreferences(e.to_string()))?;
        if envelope.format_id != PREFERENCES_FORMAT_ID {
            return Err(ConfigError::UnsupportedPreferences(format!(
                "format '{}' is not '{}'",
                envelope.format_id, PREFERENCES_FORMAT_ID
            )));
        }
        if envelope.format_version.0 != PREFERENCES_FORMAT_VERSION.0 {
            return Err(ConfigError::UnsupportedPreferences(format!(
                "version {}.{} is not supported",
                envelope.format_version.0, envelope.format_version.1
            )));
        }
        let imported = envelope.preferences;

        let Value::Object(mut merged) = serde_json::to_value(&*self)? else {
            return Err(ConfigError::UnsupportedPreferences(
                "preferences did not serialize to an object".to_string(),
            ));
        };
        let mut take = |key: &str| {
            if let Some(value) = imported.get(key) {
                merged.insert(key.to_string(), value.clone());
            }
        };

        for key in GENERAL_FIELDS.iter().copied() {
            take(key);
        }
        let unlocked = options.import_emulation_status || options.ignore_emulation_lock;
        if !self.is_emulation_active || unlocked {
            take("preferred_input_layout");
            take("preferred_target_layout");
            if unlocked {
                take("is_emulation_active");
            }
        }
        let mut updated: Preferences = serde_json::from_value(Value::Object(merged))?;

        let preserve: Vec<&str> = if options.ignore_emulation_lock {
            Vec::new()
        } else {
            self.layouts_in_use()
        };
        let imported_layouts = imported
            .get(CUSTOM_LAYOUTS_KEY)
            .map(LayoutCatalog::from_value)
            .unwrap_or_default();
        let mut merged_catalog = catalog.clone();
        merged_catalog.merge(&imported_layouts, options.layouts, &preserve);

        let imported_journal = if options.import_journal {
            Some(match imported.get(JOURNAL_KEY) {
                Some(value) => serde_json::from_value::<Journal>(value.clone())?,
                None => Journal::new(),
            })
        } else {
            None
        };

        updated.sanitize(&merged_catalog);
        merged_catalog.set_locked(updated.is_emulation_active);

        *self = updated;
        *catalog = merged_catalog;
        if let Some(imported_journal) = imported_journal {
            *journal = imported_journal;
        }
        Ok(())
    }
}
