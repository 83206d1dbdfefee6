// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Per-argument validation rules and the post-scan dependency checks.

use {
    crate::{
        definition::ArgumentDefinition,
        error::{DefinitionError, DependencyKind, ParseError},
    },
    regex::Regex,
    std::fmt,
};

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// A user supplied check, identified by name.
///
/// `Ok(false)` rejects the value; `Err` reports a failure inside the check
/// itself.
#[derive(Clone, Copy)]
pub struct CustomCheck {
    /// Name reported in validation errors.
    pub name: &'static str,
    /// The check, applied to the raw value.
    pub check: fn(&str) -> Result<bool, String>,
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomCheck").field(&self.name).finish()
    }
}

// Checks are compared by name; function addresses aren't stable.
impl PartialEq for CustomCheck {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(feature = "serde")]
impl Serialize for CustomCheck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// A rule checked against bound values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Validator {
    /// Inclusive numeric bounds.
    Range {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// The raw value must match this regular expression.
    Pattern(String),
    /// Inclusive bounds on the number of characters in the raw value.
    Length {
        /// Lower bound.
        min: Option<usize>,
        /// Upper bound.
        max: Option<usize>,
    },
    /// Inclusive bounds on the number of collected elements.
    Count {
        /// Lower bound.
        min: Option<usize>,
        /// Upper bound.
        max: Option<usize>,
    },
    /// The value may be neither null nor empty.
    NotNullOrEmpty,
    /// A named user check.
    Custom(CustomCheck),
}

impl Validator {
    /// `Custom` from a name and a check.
    pub fn custom(name: &'static str, check: fn(&str) -> Result<bool, String>) -> Self {
        Validator::Custom(CustomCheck { name, check })
    }

    /// Whether the rule is evaluated once after the scan rather than per bind.
    pub fn is_post_scan(&self) -> bool {
        matches!(self, Validator::Count { .. })
    }
}

fn write_bounds<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    what: &str,
    min: &Option<T>,
    max: &Option<T>,
) -> fmt::Result {
    match (min, max) {
        (Some(min), Some(max)) => write!(f, "{} must be between {} and {}", what, min, max),
        (Some(min), None) => write!(f, "{} must be at least {}", what, min),
        (None, Some(max)) => write!(f, "{} must be at most {}", what, max),
        (None, None) => write!(f, "{} is unbounded", what),
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Range { min, max } => write_bounds(f, "value", min, max),
            Validator::Pattern(pattern) => write!(f, "value must match `{}`", pattern),
            Validator::Length { min, max } => write_bounds(f, "length", min, max),
            Validator::Count { min, max } => write_bounds(f, "number of values", min, max),
            Validator::NotNullOrEmpty => f.write_str("value must not be null or empty"),
            Validator::Custom(custom) => write!(f, "value must satisfy `{}`", custom.name),
        }
    }
}

/// What a validator gets to look at for one bound value.
pub(crate) struct Candidate<'a> {
    /// Raw text, `None` for the null sentinel.
    pub raw: Option<&'a str>,
    /// Numeric view of the converted value, when it has one.
    pub numeric: Option<f64>,
}

/// A validator with its regular expression compiled.
pub(crate) enum CompiledValidator {
    Range { min: Option<f64>, max: Option<f64> },
    Pattern(Regex),
    Length { min: Option<usize>, max: Option<usize> },
    Count { min: Option<usize>, max: Option<usize> },
    NotNullOrEmpty,
    Custom(CustomCheck),
}

/// How a check went, beyond pass/fail.
pub(crate) enum Verdict {
    Pass,
    Fail,
    Broken(String),
}

fn within<T: PartialOrd>(value: T, min: &Option<T>, max: &Option<T>) -> bool {
    min.as_ref().is_none_or(|min| value >= *min) && max.as_ref().is_none_or(|max| value <= *max)
}

impl CompiledValidator {
    pub(crate) fn compile(
        definition: &ArgumentDefinition,
        validator: &Validator,
    ) -> Result<Self, DefinitionError> {
        let invalid = |message: String| DefinitionError::InvalidValidator {
            name: definition.name.clone(),
            rule: validator.to_string(),
            message,
        };
        Ok(match validator {
            Validator::Range { min, max } => CompiledValidator::Range { min: *min, max: *max },
            Validator::Pattern(pattern) => {
                CompiledValidator::Pattern(Regex::new(pattern).map_err(|e| invalid(e.to_string()))?)
            }
            Validator::Length { min, max } => CompiledValidator::Length { min: *min, max: *max },
            Validator::Count { min, max } => {
                if !definition.arity.is_collection() {
                    return Err(invalid(
                        "only multi-value and dictionary arguments have a count".to_owned(),
                    ));
                }
                CompiledValidator::Count { min: *min, max: *max }
            }
            Validator::NotNullOrEmpty => CompiledValidator::NotNullOrEmpty,
            Validator::Custom(custom) => CompiledValidator::Custom(*custom),
        })
    }

    /// Check one bound value. Null values pass everything except
    /// `NotNullOrEmpty`.
    pub(crate) fn check(&self, candidate: &Candidate<'_>) -> Verdict {
        let Some(raw) = candidate.raw else {
            return match self {
                CompiledValidator::NotNullOrEmpty => Verdict::Fail,
                _ => Verdict::Pass,
            };
        };
        let pass = match self {
            CompiledValidator::Range { min, max } => {
                match candidate.numeric.or_else(|| raw.trim().parse::<f64>().ok()) {
                    Some(value) => within(value, min, max),
                    None => false,
                }
            }
            CompiledValidator::Pattern(regex) => regex.is_match(raw),
            CompiledValidator::Length { min, max } => within(raw.chars().count(), min, max),
            CompiledValidator::Count { .. } => true,
            CompiledValidator::NotNullOrEmpty => !raw.is_empty(),
            CompiledValidator::Custom(custom) => match (custom.check)(raw) {
                Ok(pass) => pass,
                Err(message) => return Verdict::Broken(message),
            },
        };
        if pass { Verdict::Pass } else { Verdict::Fail }
    }

    /// Check the number of collected elements.
    pub(crate) fn check_count(&self, count: usize) -> bool {
        match self {
            CompiledValidator::Count { min, max } => within(count, min, max),
            _ => true,
        }
    }
}

/// Run the dependency rules, in order: every `Requires`, then every
/// `RequiresAny` group, then every `Prohibits`. Only the first violation is
/// reported.
pub(crate) fn check_dependencies(
    definitions: &[&ArgumentDefinition],
    requires_any: &[Vec<String>],
    is_bound: impl Fn(&str) -> bool,
) -> Result<(), ParseError> {
    for definition in definitions.iter().filter(|d| is_bound(&d.name)) {
        if let Some(missing) = definition.requires.iter().find(|name| !is_bound(name)) {
            return Err(ParseError::DependencyNotMet {
                name: Some(definition.name.clone()),
                kind: DependencyKind::Requires,
                related: vec![missing.clone()],
            });
        }
    }

    for group in requires_any {
        if !group.iter().any(|name| is_bound(name)) {
            return Err(ParseError::DependencyNotMet {
                name: None,
                kind: DependencyKind::RequiresAny,
                related: group.clone(),
            });
        }
    }

    for definition in definitions.iter().filter(|d| is_bound(&d.name)) {
        if let Some(conflict) = definition.prohibits.iter().find(|name| is_bound(name)) {
            return Err(ParseError::DependencyNotMet {
                name: Some(conflict.clone()),
                kind: DependencyKind::Prohibits,
                related: vec![definition.name.clone()],
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definition::{Arity, ValueDescriptor};

    fn definition(name: &str) -> ArgumentDefinition {
        ArgumentDefinition::new(name, Arity::Single, ValueDescriptor::scalar::<String>())
    }

    fn compile(validator: Validator) -> CompiledValidator {
        CompiledValidator::compile(&definition("x"), &validator).unwrap()
    }

    fn passes(validator: &CompiledValidator, raw: Option<&str>, numeric: Option<f64>) -> bool {
        matches!(validator.check(&Candidate { raw, numeric }), Verdict::Pass)
    }

    #[test]
    fn range_prefers_converted_value() {
        let range = compile(Validator::Range { min: Some(1.0), max: Some(10.0) });
        assert!(passes(&range, Some("5"), Some(5.0)));
        assert!(!passes(&range, Some("5"), Some(11.0)));
        assert!(passes(&range, Some("10"), None));
        assert!(!passes(&range, Some("ten"), None));
        assert!(passes(&range, None, None));
    }

    #[test]
    fn pattern_and_length() {
        let pattern = compile(Validator::Pattern("^[a-z]+$".to_owned()));
        assert!(passes(&pattern, Some("abc"), None));
        assert!(!passes(&pattern, Some("abc1"), None));

        let length = compile(Validator::Length { min: Some(2), max: Some(3) });
        assert!(passes(&length, Some("ab"), None));
        assert!(!passes(&length, Some("abcd"), None));
        assert!(passes(&length, Some("äöü"), None));
    }

    #[test]
    fn bad_pattern_is_a_definition_error() {
        let err = CompiledValidator::compile(&definition("x"), &Validator::Pattern("(".to_owned()));
        assert!(matches!(err, Err(DefinitionError::InvalidValidator { .. })));
    }

    #[test]
    fn count_needs_a_collection() {
        let count = Validator::Count { min: Some(1), max: None };
        let err = CompiledValidator::compile(&definition("x"), &count);
        assert!(matches!(err, Err(DefinitionError::InvalidValidator { .. })));
    }

    #[test]
    fn not_null_or_empty() {
        let rule = compile(Validator::NotNullOrEmpty);
        assert!(!passes(&rule, None, None));
        assert!(!passes(&rule, Some(""), None));
        assert!(passes(&rule, Some("x"), None));
    }

    #[test]
    fn custom_failures_are_reported() {
        fn even(value: &str) -> Result<bool, String> {
            let n: i64 = value.parse().map_err(|_| "not a number".to_owned())?;
            Ok(n % 2 == 0)
        }
        let rule = compile(Validator::custom("even", even));
        assert!(passes(&rule, Some("4"), None));
        assert!(matches!(rule.check(&Candidate { raw: Some("3"), numeric: None }), Verdict::Fail));
        assert!(matches!(
            rule.check(&Candidate { raw: Some("x"), numeric: None }),
            Verdict::Broken(ref message) if message == "not a number"
        ));
    }

    #[test]
    fn dependency_order() {
        let mut a = definition("a");
        a.requires = vec!["b".to_owned()];
        a.prohibits = vec!["c".to_owned()];
        let (b, c) = (definition("b"), definition("c"));
        let defs = vec![&a, &b, &c];
        let bound =
            |names: &'static [&'static str]| move |name: &str| names.iter().any(|n| *n == name);

        assert_eq!(check_dependencies(&defs, &[], bound(&[])), Ok(()));
        assert_eq!(check_dependencies(&defs, &[], bound(&["b"])), Ok(()));
        assert_eq!(
            check_dependencies(&defs, &[], bound(&["a", "c"])),
            Err(ParseError::DependencyNotMet {
                name: Some("a".to_owned()),
                kind: DependencyKind::Requires,
                related: vec!["b".to_owned()],
            })
        );
        assert_eq!(
            check_dependencies(&defs, &[], bound(&["a", "b", "c"])),
            Err(ParseError::DependencyNotMet {
                name: Some("c".to_owned()),
                kind: DependencyKind::Prohibits,
                related: vec!["a".to_owned()],
            })
        );

        let groups = vec![vec!["b".to_owned(), "c".to_owned()]];
        assert!(check_dependencies(&defs, &groups, bound(&[])).is_err());
        assert_eq!(check_dependencies(&defs, &groups, bound(&["c"])), Ok(()));
    }
}
