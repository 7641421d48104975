//! Requirement resolution
//!
//! Selects the external dependencies implied by the resolved options and
//! enforces version pins between them. Output order is declaration order so
//! generated build descriptors are reproducible across runs.

use semver::{Version, VersionReq};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::options::ResolvedOptions;
use crate::core::target::Target;
use crate::error::ResolverError;

/// When a declared requirement is included
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InclusionCondition {
    Always,
    /// Included when the named boolean option is present and true
    OptionEnabled(String),
}

impl InclusionCondition {
    fn holds(&self, options: &ResolvedOptions) -> bool {
        match self {
            InclusionCondition::Always => true,
            InclusionCondition::OptionEnabled(name) => options.is_enabled(name),
        }
    }
}

/// Declared requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementDecl {
    pub name: String,
    pub version: Version,
    pub condition: InclusionCondition,
    /// Targets that consume this requirement
    pub scope: BTreeSet<Target>,
}

/// "`source` at `source_versions` requires `pinned` at `pinned_version`"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRule {
    pub source: String,
    pub source_versions: VersionReq,
    pub pinned: String,
    pub pinned_version: VersionReq,
}

/// Fixed requirement declarations plus their compatibility pins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSchema {
    requirements: Vec<RequirementDecl>,
    pins: Vec<PinRule>,
}

impl RequirementSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a requirement
    #[must_use]
    pub fn with_requirement(
        mut self,
        name: &str,
        version: Version,
        condition: InclusionCondition,
        scope: &[Target],
    ) -> Self {
        self.requirements.push(RequirementDecl {
            name: name.to_string(),
            version,
            condition,
            scope: scope.iter().copied().collect(),
        });
        self
    }

    /// Declare a compatibility pin
    #[must_use]
    pub fn with_pin(
        mut self,
        source: &str,
        source_versions: VersionReq,
        pinned: &str,
        pinned_version: VersionReq,
    ) -> Self {
        self.pins.push(PinRule {
            source: source.to_string(),
            source_versions,
            pinned: pinned.to_string(),
            pinned_version,
        });
        self
    }

    /// The workspace's requirements: spdlog 1.14.1 is built against fmt 10.2.1
    pub fn workspace() -> Self {
        let app = [Target::ApplicationCore];
        Self::new()
            .with_requirement(
                "fmt",
                Version::new(10, 2, 1),
                InclusionCondition::OptionEnabled("with_fmt".to_string()),
                &app,
            )
            .with_requirement(
                "spdlog",
                Version::new(1, 14, 1),
                InclusionCondition::Always,
                &app,
            )
            .with_pin(
                "spdlog",
                VersionReq {
                    comparators: vec![exact(&Version::new(1, 14, 1))],
                },
                "fmt",
                VersionReq {
                    comparators: vec![exact(&Version::new(10, 2, 1))],
                },
            )
    }

    /// Declared requirements in declaration order
    pub fn requirements(&self) -> &[RequirementDecl] {
        &self.requirements
    }

    /// Declared pins
    pub fn pins(&self) -> &[PinRule] {
        &self.pins
    }
}

fn exact(version: &Version) -> semver::Comparator {
    semver::Comparator {
        op: semver::Op::Exact,
        major: version.major,
        minor: Some(version.minor),
        patch: Some(version.patch),
        pre: version.pre.clone(),
    }
}

/// Who chose a requirement's version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrigin {
    Declared,
    Override,
}

/// A selected requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub version: Version,
    pub origin: VersionOrigin,
    pub scope: BTreeSet<Target>,
}

impl Requirement {
    /// Whether `target` consumes this requirement
    pub fn applies_to(&self, target: Target) -> bool {
        self.scope.contains(&target)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Parse `name/version` (CLI `--require`)
pub fn parse_requirement_override(raw: &str) -> Result<(String, Version), ResolverError> {
    let (name, version) = raw.split_once('/').unwrap_or((raw, ""));
    let version = Version::parse(version.trim()).map_err(|e| ResolverError::InvalidVersion {
        name: name.to_string(),
        version: version.to_string(),
        reason: e.to_string(),
    })?;
    Ok((name.trim().to_string(), version))
}

/// Resolve the requirement set for the given options
///
/// `version_overrides` force a version for a declared requirement; a forced
/// version that breaks a pin is a [`ResolverError::VersionConflict`].
pub fn resolve_requirements(
    schema: &RequirementSchema,
    options: &ResolvedOptions,
    version_overrides: &BTreeMap<String, Version>,
) -> Result<Vec<Requirement>, ResolverError> {
    for name in version_overrides.keys() {
        if !schema.requirements().iter().any(|r| &r.name == name) {
            return Err(ResolverError::UnknownRequirement { name: name.clone() });
        }
    }

    let selected: Vec<Requirement> = schema
        .requirements()
        .iter()
        .filter(|decl| decl.condition.holds(options))
        .map(|decl| match version_overrides.get(&decl.name) {
            Some(version) => Requirement {
                name: decl.name.clone(),
                version: version.clone(),
                origin: VersionOrigin::Override,
                scope: decl.scope.clone(),
            },
            None => Requirement {
                name: decl.name.clone(),
                version: decl.version.clone(),
                origin: VersionOrigin::Declared,
                scope: decl.scope.clone(),
            },
        })
        .collect();

    check_pins(schema, &selected)?;

    tracing::debug!(
        "Resolved requirements: [{}]",
        selected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(selected)
}

fn check_pins(schema: &RequirementSchema, selected: &[Requirement]) -> Result<(), ResolverError> {
    let find = |name: &str| selected.iter().find(|r| r.name == name);

    for source in selected {
        let rules: Vec<&PinRule> = schema
            .pins()
            .iter()
            .filter(|p| p.source == source.name)
            .collect();

        for pinned_name in rules.iter().map(|p| p.pinned.as_str()).collect::<BTreeSet<_>>() {
            let Some(pinned) = find(pinned_name) else {
                continue;
            };

            let rule = rules
                .iter()
                .filter(|p| p.pinned == pinned_name)
                .find(|p| p.source_versions.matches(&source.version))
                .ok_or_else(|| ResolverError::UnknownCompatibility {
                    source_name: source.name.clone(),
                    version: source.version.to_string(),
                    pinned: pinned_name.to_string(),
                })?;

            if !rule.pinned_version.matches(&pinned.version) {
                let selected_by = match pinned.origin {
                    VersionOrigin::Override => "version override".to_string(),
                    VersionOrigin::Declared => "declaration".to_string(),
                };
                return Err(ResolverError::VersionConflict {
                    package: pinned.name.clone(),
                    selected: pinned.version.to_string(),
                    selected_by,
                    constraint: rule.pinned_version.to_string(),
                    required_by: source.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::{resolve_options, OptionOverrides, OptionSchema};
    use crate::core::platform::{Os, Platform};
    use proptest::prelude::*;
    use crate::test_utils::generators::semver_version;

    fn options(overrides: &OptionOverrides) -> ResolvedOptions {
        resolve_options(
            &OptionSchema::workspace(),
            &Platform::new(Os::Linux, "armv8"),
            overrides,
        )
        .unwrap()
    }

    fn names(reqs: &[Requirement]) -> Vec<String> {
        reqs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_with_fmt_selects_pinned_version_first() {
        let reqs = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(names(&reqs), vec!["fmt/10.2.1", "spdlog/1.14.1"]);
    }

    #[test]
    fn test_without_fmt_only_logging_library() {
        let reqs = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new().cli("with_fmt", false)),
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(names(&reqs), vec!["spdlog/1.14.1"]);
    }

    #[test]
    fn test_conflicting_override_names_both_sources() {
        let overrides = BTreeMap::from([("fmt".to_string(), Version::new(11, 0, 2))]);
        let err = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &overrides,
        )
        .unwrap_err();

        match err {
            ResolverError::VersionConflict {
                package,
                selected,
                selected_by,
                constraint,
                required_by,
            } => {
                assert_eq!(package, "fmt");
                assert_eq!(selected, "11.0.2");
                assert_eq!(selected_by, "version override");
                assert_eq!(constraint, "=10.2.1");
                assert_eq!(required_by, "spdlog/1.14.1");
            }
            other => panic!("Expected VersionConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_matching_override_is_accepted() {
        let overrides = BTreeMap::from([("fmt".to_string(), Version::new(10, 2, 1))]);
        let reqs = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &overrides,
        )
        .unwrap();
        assert_eq!(reqs[0].origin, VersionOrigin::Override);
        assert_eq!(reqs[0].version, Version::new(10, 2, 1));
    }

    #[test]
    fn test_fmt_override_ignored_when_fmt_disabled() {
        let overrides = BTreeMap::from([("fmt".to_string(), Version::new(11, 0, 0))]);
        let reqs = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new().cli("with_fmt", false)),
            &overrides,
        )
        .unwrap();
        assert_eq!(names(&reqs), vec!["spdlog/1.14.1"]);
    }

    #[test]
    fn test_moving_pin_source_without_rule_is_rejected() {
        let overrides = BTreeMap::from([("spdlog".to_string(), Version::new(1, 15, 0))]);
        let err = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &overrides,
        )
        .unwrap_err();
        assert!(matches!(err, ResolverError::UnknownCompatibility { .. }));
    }

    #[test]
    fn test_unknown_override_rejected() {
        let overrides = BTreeMap::from([("boost".to_string(), Version::new(1, 85, 0))]);
        let err = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &overrides,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResolverError::UnknownRequirement {
                name: "boost".to_string()
            }
        );
    }

    #[test]
    fn test_requirements_scoped_to_application_core() {
        let reqs = resolve_requirements(
            &RequirementSchema::workspace(),
            &options(&OptionOverrides::new()),
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(reqs.iter().all(|r| r.applies_to(Target::ApplicationCore)));
        assert!(reqs.iter().all(|r| !r.applies_to(Target::McuCore)));
    }

    #[test]
    fn test_parse_requirement_override() {
        assert_eq!(
            parse_requirement_override("fmt/10.2.1").unwrap(),
            ("fmt".to_string(), Version::new(10, 2, 1))
        );
        assert!(parse_requirement_override("fmt").is_err());
        assert!(parse_requirement_override("fmt/ten").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: with fmt enabled, the pinned version is always selected
        #[test]
        fn prop_fmt_always_pinned(shared: bool, m33: bool, a55: bool) {
            let opts = options(
                &OptionOverrides::new()
                    .cli("with_fmt", true)
                    .cli("shared", shared)
                    .cli("build_m33", m33)
                    .cli("build_a55", a55),
            );
            let reqs = resolve_requirements(&RequirementSchema::workspace(), &opts, &BTreeMap::new()).unwrap();
            let fmt = reqs.iter().find(|r| r.name == "fmt").unwrap();
            prop_assert_eq!(&fmt.version, &Version::new(10, 2, 1));
        }

        /// Property: any fmt override other than the pin conflicts
        #[test]
        fn prop_conflicting_fmt_override_fails(raw in semver_version()) {
            let (name, version) = parse_requirement_override(&format!("fmt/{raw}")).unwrap();
            prop_assume!(version != Version::new(10, 2, 1));
            let overrides = BTreeMap::from([(name, version)]);
            let result = resolve_requirements(
                &RequirementSchema::workspace(),
                &options(&OptionOverrides::new()),
                &overrides,
            );
            let is_conflict = matches!(result, Err(ResolverError::VersionConflict { .. }));
            prop_assert!(is_conflict);
        }
    }
}
