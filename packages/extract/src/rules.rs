//! Declarative field rule table.
//!
//! Each [`EventField`] (and each voyage [`MetadataField`]) maps to an
//! ordered list of [`Matcher`]s. The rule
//! table is plain data (TOML) so the matching policy can be read, replaced,
//! and tested one field at a time. The built-in table is embedded at
//! compile time from `rules/fields.toml`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use sof_events_document_models::{
    EventField, EventRecord, FieldValue, MetadataField, VoyageMetadata,
};

use crate::ExtractError;

const BUILTIN_RULES_TOML: &str = include_str!("../rules/fields.toml");

static BUILTIN_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::from_toml(BUILTIN_RULES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse built-in field rules: {e}"))
});

/// A matcher as written in the TOML rule table, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatcherDef {
    /// Take the value from the `value` capture group, or group 1 if the
    /// pattern has no `value` group.
    Capture {
        /// Regex pattern.
        pattern: String,
    },
    /// Set a fixed value whenever the anchor matches.
    Keyword {
        /// Regex anchor.
        pattern: String,
        /// Value assigned to the field on a match.
        value: String,
    },
}

impl MatcherDef {
    fn pattern(&self) -> &str {
        match self {
            Self::Capture { pattern } | Self::Keyword { pattern, .. } => pattern,
        }
    }
}

/// Which part of a capture match supplies the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueGroup {
    /// The `value` named group.
    Named,
    /// The first capture group.
    First,
    /// The whole match.
    Whole,
}

impl ValueGroup {
    fn of(regex: &Regex) -> Self {
        if regex.capture_names().any(|name| name == Some("value")) {
            Self::Named
        } else if regex.captures_len() > 1 {
            Self::First
        } else {
            Self::Whole
        }
    }
}

/// A compiled matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regex whose capture supplies the field value.
    Capture {
        /// Compiled pattern.
        regex: Regex,
        /// Group read from each match.
        group: ValueGroup,
    },
    /// Regex anchor that supplies a fixed value.
    Keyword {
        /// Compiled anchor.
        anchor: Regex,
        /// Value assigned on a match.
        value: String,
    },
}

impl Matcher {
    /// Compiles a matcher definition. Patterns are always case-insensitive
    /// and multi-line.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the pattern fails to compile.
    pub fn compile(def: &MatcherDef) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(def.pattern())
            .case_insensitive(true)
            .multi_line(true)
            .build()?;

        Ok(match def {
            MatcherDef::Capture { .. } => Self::Capture {
                group: ValueGroup::of(&regex),
                regex,
            },
            MatcherDef::Keyword { value, .. } => Self::Keyword {
                anchor: regex,
                value: value.clone(),
            },
        })
    }

    /// Returns the value for the earliest occurrence in `text`, if any.
    ///
    /// Occurrences whose value group is blank or did not take part in the
    /// match are skipped.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<String> {
        match self {
            Self::Capture { regex, group } => regex.captures_iter(text).find_map(|caps| {
                let m = match group {
                    ValueGroup::Named => caps.name("value"),
                    ValueGroup::First => caps.get(1),
                    ValueGroup::Whole => caps.get(0),
                }?;
                let value = m.as_str().trim();
                (!value.is_empty()).then(|| value.to_owned())
            }),
            Self::Keyword { anchor, value } => anchor.is_match(text).then(|| value.clone()),
        }
    }
}

/// A top-level key of the rule table.
#[derive(Debug, Clone, Copy)]
enum RuleKey {
    Event(EventField),
    Metadata(MetadataField),
}

impl RuleKey {
    fn parse(name: &str) -> Option<Self> {
        name.parse()
            .map(Self::Event)
            .or_else(|_| name.parse().map(Self::Metadata))
            .ok()
    }
}

/// The ordered matchers for every [`EventField`] and [`MetadataField`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    fields: BTreeMap<EventField, Vec<Matcher>>,
    metadata: BTreeMap<MetadataField, Vec<Matcher>>,
}

impl RuleSet {
    /// Returns the built-in rule table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the table is embedded).
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_RULES.clone()
    }

    /// Parses and compiles a rule table from TOML.
    ///
    /// Fields without an entry get no matchers and always resolve to the
    /// sentinel.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::RuleTable`] if the TOML is malformed or names an
    ///   unknown field
    /// * [`ExtractError::InvalidPattern`] if any pattern fails to compile
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractError> {
        let defs: BTreeMap<String, Vec<MatcherDef>> =
            toml::de::from_str(toml_str).map_err(|e| ExtractError::RuleTable(e.to_string()))?;

        let mut fields: BTreeMap<EventField, Vec<Matcher>> = EventField::all()
            .iter()
            .map(|&field| (field, Vec::new()))
            .collect();
        let mut metadata: BTreeMap<MetadataField, Vec<Matcher>> = MetadataField::all()
            .iter()
            .map(|&field| (field, Vec::new()))
            .collect();

        for (name, matcher_defs) in defs {
            let key = RuleKey::parse(&name)
                .ok_or_else(|| ExtractError::RuleTable(format!("unknown field '{name}'")))?;

            let matchers = matcher_defs
                .iter()
                .map(|def| {
                    Matcher::compile(def).map_err(|source| ExtractError::InvalidPattern {
                        field: name.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            match key {
                RuleKey::Event(field) => fields.insert(field, matchers),
                RuleKey::Metadata(field) => metadata.insert(field, matchers),
            };
        }

        log::debug!(
            "Loaded field rules: {}",
            fields
                .iter()
                .map(|(field, matchers)| format!("{field}={}", matchers.len()))
                .chain(
                    metadata
                        .iter()
                        .map(|(field, matchers)| format!("{field}={}", matchers.len()))
                )
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { fields, metadata })
    }

    /// Reads a rule table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be read, or any error
    /// from [`Self::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, ExtractError> {
        let toml_str = std::fs::read_to_string(path)?;
        log::info!("Loading field rules from {}", path.display());
        Self::from_toml(&toml_str)
    }

    /// The matchers for `field`, in priority order.
    #[must_use]
    pub fn matchers(&self, field: EventField) -> &[Matcher] {
        self.fields
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves a single field: the first matcher that matches wins.
    #[must_use]
    pub fn resolve(&self, field: EventField, text: &str) -> FieldValue {
        self.matchers(field)
            .iter()
            .find_map(|matcher| matcher.find(text))
            .into()
    }

    /// Applies every field's matchers to `text`.
    #[must_use]
    pub fn apply(&self, text: &str) -> EventRecord {
        EventRecord::from_fn(|field| self.resolve(field, text))
    }

    /// The matchers for a voyage metadata field, in priority order.
    #[must_use]
    pub fn metadata_matchers(&self, field: MetadataField) -> &[Matcher] {
        self.metadata
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves the voyage ports from `text`.
    #[must_use]
    pub fn apply_metadata(&self, text: &str) -> VoyageMetadata {
        VoyageMetadata::from_fn(|field| {
            self.metadata_matchers(field)
                .iter()
                .find_map(|matcher| matcher.find(text))
                .into()
        })
    }
}
