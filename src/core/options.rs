//! Option model
//!
//! Declares the workspace toggles, their domains and defaults, and the
//! platform-conditioned removal rules. Resolution is a pure function of
//! (schema, platform, overrides) with value priority: CLI > Manifest > Default.
//!
//! Removal rules run in a fixed order: every platform-stage rule first, then
//! every cross-option rule, each stage in declaration order. A removed option
//! is absent from the result; looking it up yields
//! [`OptionError::NotApplicable`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::platform::Platform;
use crate::core::target::Target;
use crate::error::OptionError;

/// A concrete option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Choice(s) => f.write_str(s),
        }
    }
}

/// Set of values an option accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDomain {
    Bool,
    Choice(Vec<String>),
}

impl OptionDomain {
    fn describe(&self) -> String {
        match self {
            OptionDomain::Bool => "boolean".to_string(),
            OptionDomain::Choice(choices) => format!("one of {choices:?}"),
        }
    }
}

/// Declaration of one option
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDefinition {
    pub name: String,
    pub domain: OptionDomain,
    pub default: OptionValue,
    pub description: String,
}

impl OptionDefinition {
    /// Boolean option
    pub fn boolean(name: &str, default: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
            description: description.to_string(),
        }
    }

    /// Enumerated option; `default` must be one of `choices`
    pub fn choice(name: &str, choices: &[&str], default: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: OptionDomain::Choice(choices.iter().map(|c| (*c).to_string()).collect()),
            default: OptionValue::Choice(default.to_string()),
            description: description.to_string(),
        }
    }
}

/// Stage a removal rule runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RemovalStage {
    Platform,
    CrossOption,
}

/// Predicate deciding whether an option is removed
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalCondition {
    /// Platform has no position-independent-code concept
    PlatformLacksFpic,
    /// Another (still present) option holds the given value
    OptionEquals { name: String, value: OptionValue },
}

impl RemovalCondition {
    pub fn stage(&self) -> RemovalStage {
        match self {
            RemovalCondition::PlatformLacksFpic => RemovalStage::Platform,
            RemovalCondition::OptionEquals { .. } => RemovalStage::CrossOption,
        }
    }

    fn holds(&self, platform: &Platform, values: &BTreeMap<String, ResolvedOption>) -> bool {
        match self {
            RemovalCondition::PlatformLacksFpic => !platform.supports_fpic(),
            RemovalCondition::OptionEquals { name, value } => {
                values.get(name).is_some_and(|opt| &opt.value == value)
            }
        }
    }

    fn describe(&self, platform: &Platform) -> String {
        match self {
            RemovalCondition::PlatformLacksFpic => {
                format!("platform '{platform}' has no position-independent code")
            }
            RemovalCondition::OptionEquals { name, value } => format!("implied by {name}={value}"),
        }
    }
}

/// `{condition, effect}` pair: remove `option` when `condition` holds
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalRule {
    pub option: String,
    pub condition: RemovalCondition,
}

/// Immutable option schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSchema {
    definitions: Vec<OptionDefinition>,
    removal_rules: Vec<RemovalRule>,
}

impl OptionSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option
    #[must_use]
    pub fn with_option(mut self, definition: OptionDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Declare a removal rule
    #[must_use]
    pub fn with_removal(mut self, option: &str, condition: RemovalCondition) -> Self {
        self.removal_rules.push(RemovalRule {
            option: option.to_string(),
            condition,
        });
        self
    }

    /// The workspace's declared options
    pub fn workspace() -> Self {
        Self::new()
            .with_option(OptionDefinition::boolean(
                "with_fmt",
                true,
                "Link the formatting library into the application core",
            ))
            .with_option(OptionDefinition::boolean(
                Target::ApplicationCore.toggle_option(),
                true,
                "Build the Cortex-A55 application core",
            ))
            .with_option(OptionDefinition::boolean(
                Target::McuCore.toggle_option(),
                true,
                "Build the Cortex-M33 microcontroller firmware",
            ))
            .with_option(OptionDefinition::boolean(
                "shared",
                false,
                "Produce shared libraries",
            ))
            .with_option(OptionDefinition::boolean(
                "fPIC",
                true,
                "Compile position-independent code",
            ))
            .with_option(OptionDefinition::choice(
                "build_type",
                &["Debug", "Release", "RelWithDebInfo", "MinSizeRel"],
                "Release",
                "Native build configuration",
            ))
            .with_removal("fPIC", RemovalCondition::PlatformLacksFpic)
            .with_removal(
                "fPIC",
                RemovalCondition::OptionEquals {
                    name: "shared".to_string(),
                    value: OptionValue::Bool(true),
                },
            )
    }

    /// Declared options in declaration order
    pub fn definitions(&self) -> &[OptionDefinition] {
        &self.definitions
    }

    /// Look up a declaration by name
    pub fn definition(&self, name: &str) -> Option<&OptionDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Removal rules in evaluation order (stable by stage)
    pub fn ordered_rules(&self) -> Vec<&RemovalRule> {
        let mut rules: Vec<&RemovalRule> = self.removal_rules.iter().collect();
        rules.sort_by_key(|r| r.condition.stage());
        rules
    }
}

/// Option value source for resolution priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSource {
    /// Value from CLI argument (highest priority)
    Cli,
    /// Value from the workspace manifest
    Manifest,
    /// Default value from option definition (lowest priority)
    Default,
}

/// Resolved option value with its source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOption {
    /// The resolved value
    pub value: OptionValue,
    /// Where the value came from
    pub source: OptionSource,
}

/// User-supplied overrides, one layer per source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionOverrides {
    pub cli: BTreeMap<String, toml::Value>,
    pub manifest: BTreeMap<String, toml::Value>,
}

impl OptionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CLI override
    #[must_use]
    pub fn cli(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.cli.insert(name.to_string(), value.into());
        self
    }

    /// Add a manifest override
    #[must_use]
    pub fn manifest(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.manifest.insert(name.to_string(), value.into());
        self
    }
}

/// Parse a `name=value` CLI override
///
/// `true`/`false` in any case become booleans, everything else stays a string.
pub fn parse_override(raw: &str) -> Result<(String, toml::Value), OptionError> {
    let (name, value) = raw
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| OptionError::MalformedOverride {
            raw: raw.to_string(),
        })?;

    let value = value.trim();
    let value = match value.to_ascii_lowercase().as_str() {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => toml::Value::String(value.to_string()),
    };
    Ok((name.trim().to_string(), value))
}

/// Options after defaults, overrides and removal rules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    values: BTreeMap<String, ResolvedOption>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    removed: BTreeMap<String, String>,
}

impl ResolvedOptions {
    /// Value of a present option
    pub fn get(&self, name: &str) -> Result<&OptionValue, OptionError> {
        if let Some(opt) = self.values.get(name) {
            return Ok(&opt.value);
        }
        match self.removed.get(name) {
            Some(reason) => Err(OptionError::NotApplicable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(OptionError::UnknownOption {
                name: name.to_string(),
            }),
        }
    }

    /// Value of a present boolean option
    pub fn get_bool(&self, name: &str) -> Result<bool, OptionError> {
        match self.get(name)? {
            OptionValue::Bool(b) => Ok(*b),
            OptionValue::Choice(_) => Err(OptionError::NotBoolean {
                name: name.to_string(),
            }),
        }
    }

    /// True only if the option is present and set to `true`
    pub fn is_enabled(&self, name: &str) -> bool {
        matches!(self.get(name), Ok(OptionValue::Bool(true)))
    }

    /// Whether the option survived removal
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Where a present option's value came from
    pub fn source(&self, name: &str) -> Option<OptionSource> {
        self.values.get(name).map(|opt| opt.source)
    }

    /// Present options, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedOption)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Removed options with the reason they were removed
    pub fn removed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.removed.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolve an option value with priority: CLI > Manifest > Default
///
/// Every layer that supplies a value is validated, including shadowed ones.
pub fn resolve_option_value(
    definition: &OptionDefinition,
    cli_value: Option<&toml::Value>,
    manifest_value: Option<&toml::Value>,
) -> Result<ResolvedOption, OptionError> {
    let manifest = manifest_value
        .map(|v| validate_option(definition, v))
        .transpose()?;
    let cli = cli_value
        .map(|v| validate_option(definition, v))
        .transpose()?;

    Ok(match (cli, manifest) {
        (Some(value), _) => ResolvedOption {
            value,
            source: OptionSource::Cli,
        },
        (None, Some(value)) => ResolvedOption {
            value,
            source: OptionSource::Manifest,
        },
        (None, None) => ResolvedOption {
            value: definition.default.clone(),
            source: OptionSource::Default,
        },
    })
}

/// Resolve all options for a platform
pub fn resolve_options(
    schema: &OptionSchema,
    platform: &Platform,
    overrides: &OptionOverrides,
) -> Result<ResolvedOptions, OptionError> {
    for name in overrides.manifest.keys().chain(overrides.cli.keys()) {
        if schema.definition(name).is_none() {
            return Err(OptionError::UnknownOption { name: name.clone() });
        }
    }

    let mut values = BTreeMap::new();
    for def in schema.definitions() {
        let resolved = resolve_option_value(
            def,
            overrides.cli.get(&def.name),
            overrides.manifest.get(&def.name),
        )?;
        values.insert(def.name.clone(), resolved);
    }

    let mut removed = BTreeMap::new();
    for rule in schema.ordered_rules() {
        if !values.contains_key(&rule.option) || !rule.condition.holds(platform, &values) {
            continue;
        }
        if let Some(dropped) = values.remove(&rule.option) {
            let reason = rule.condition.describe(platform);
            if dropped.source != OptionSource::Default {
                tracing::debug!(
                    "Ignoring {:?} override {}={}: {reason}",
                    dropped.source,
                    rule.option,
                    dropped.value
                );
            }
            removed.insert(rule.option.clone(), reason);
        }
    }

    Ok(ResolvedOptions { values, removed })
}

/// Validate an option value against its definition
pub fn validate_option(
    definition: &OptionDefinition,
    value: &toml::Value,
) -> Result<OptionValue, OptionError> {
    match &definition.domain {
        OptionDomain::Bool => validate_bool(definition, value),
        OptionDomain::Choice(choices) => validate_choice(definition, value, choices),
    }
}

fn invalid(definition: &OptionDefinition, value: &toml::Value) -> OptionError {
    let shown = match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    OptionError::InvalidValue {
        name: definition.name.clone(),
        value: shown,
        expected: definition.domain.describe(),
    }
}

fn validate_bool(definition: &OptionDefinition, value: &toml::Value) -> Result<OptionValue, OptionError> {
    value
        .as_bool()
        .map(OptionValue::Bool)
        .ok_or_else(|| invalid(definition, value))
}

fn validate_choice(
    definition: &OptionDefinition,
    value: &toml::Value,
    choices: &[String],
) -> Result<OptionValue, OptionError> {
    match value.as_str() {
        Some(s) if choices.iter().any(|c| c == s) => Ok(OptionValue::Choice(s.to_string())),
        _ => Err(invalid(definition, value)),
    }
}
