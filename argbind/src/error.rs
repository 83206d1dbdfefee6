// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Errors for definition problems and for rejected command lines.

use thiserror::Error;

/// Broad classification of a [`ParseError`], for callers that only need to
/// branch on what went wrong.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// See [`ParseError::UnknownArgument`].
    UnknownArgument,
    /// See [`ParseError::MissingRequiredArgument`].
    MissingRequiredArgument,
    /// See [`ParseError::MissingNamedArgumentValue`].
    MissingNamedArgumentValue,
    /// See [`ParseError::TooManyArguments`].
    TooManyArguments,
    /// See [`ParseError::DuplicateArgument`].
    DuplicateArgument,
    /// See [`ParseError::ValidationFailed`].
    ValidationFailed,
    /// See [`ParseError::NullArgumentValue`].
    NullArgumentValue,
    /// See [`ParseError::DependencyNotMet`].
    DependencyNotMet,
    /// See [`ParseError::AmbiguousName`].
    AmbiguousName,
    /// See [`ParseError::ConversionFailed`].
    ConversionFailed,
    /// See [`ParseError::CombinedShortNameNonSwitch`].
    CombinedShortNameNonSwitch,
    /// See [`ParseError::ArgumentValueError`].
    ArgumentValueError,
}

/// Which dependency rule was violated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `Requires(A, B...)`: A was supplied without B.
    Requires,
    /// `RequiresAny(B...)`: none of the group was supplied.
    RequiresAny,
    /// `Prohibits(A, B)`: A and B were both supplied.
    Prohibits,
}

/// The single failure reported by a parse.
///
/// Every failure from inside a converter, validator or sink is wrapped into
/// one of these variants; nothing else escapes the parser.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A named argument that matches no definition.
    #[error("Unrecognized argument: {name}{}", did_you_mean(.suggestion))]
    UnknownArgument {
        /// The name as supplied, without its prefix.
        name: String,
        /// The closest known name, if any is close.
        suggestion: Option<String>,
    },

    /// A required argument was not supplied.
    #[error("Required argument '{name}' not provided.")]
    MissingRequiredArgument {
        /// The first unbound required argument, in definition order.
        name: String,
    },

    /// A named argument that needs a value was the last token.
    #[error("No value provided for argument '{name}'.")]
    MissingNamedArgumentValue {
        /// The argument.
        name: String,
    },

    /// A positional token with no open positional slot.
    #[error("Too many arguments; unexpected '{value}'.")]
    TooManyArguments {
        /// The extra token.
        value: String,
    },

    /// An argument or dictionary key supplied more than once.
    #[error("Argument '{name}' was supplied more than once{}.", key_suffix(.key))]
    DuplicateArgument {
        /// The argument.
        name: String,
        /// The repeated dictionary key.
        key: Option<String>,
    },

    /// A validator rejected a bound value.
    #[error("Invalid value '{value}' for argument '{name}': {rule}.")]
    ValidationFailed {
        /// The argument.
        name: String,
        /// Description of the rule that failed.
        rule: String,
        /// The offending raw value.
        value: String,
    },

    /// The null sentinel on a destination that can't hold it.
    #[error("Argument '{name}' does not accept a null value.")]
    NullArgumentValue {
        /// The argument.
        name: String,
    },

    /// A `Requires`, `RequiresAny` or `Prohibits` rule was violated.
    #[error("{}", describe_dependency(.kind, .name, .related))]
    DependencyNotMet {
        /// The argument at fault; `None` for `RequiresAny`.
        name: Option<String>,
        /// The violated rule.
        kind: DependencyKind,
        /// The missing or conflicting arguments.
        related: Vec<String>,
    },

    /// An abbreviation that matches more than one argument.
    #[error("Ambiguous argument '{name}' could be any of: {}.", .candidates.join(", "))]
    AmbiguousName {
        /// The name as supplied.
        name: String,
        /// Every matching argument, in definition order.
        candidates: Vec<String>,
    },

    /// The converter rejected a raw value.
    #[error("Error parsing argument '{name}' with value '{value}': {message}")]
    ConversionFailed {
        /// The argument.
        name: String,
        /// The raw value.
        value: String,
        /// The converter's message.
        message: String,
    },

    /// A run of combined short switches contained a non-switch.
    #[error("Combined short name '-{token}' contains '{short}', which is not a switch.")]
    CombinedShortNameNonSwitch {
        /// The combined names as supplied.
        token: String,
        /// The offending short name.
        short: char,
    },

    /// A sink, callback, constructor or custom validator failed.
    #[error("Error applying argument '{name}': {message}")]
    ArgumentValueError {
        /// The argument, or the destination type for constructor failures.
        name: String,
        /// The failure reported by user code.
        message: String,
    },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(suggestion) => ["\nDid you mean '", suggestion, "'?"].concat(),
        None => String::new(),
    }
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => [" with key '", key, "'"].concat(),
        None => String::new(),
    }
}

fn describe_dependency(kind: &DependencyKind, name: &Option<String>, related: &[String]) -> String {
    let name = name.as_deref().unwrap_or_default();
    match kind {
        DependencyKind::Requires => {
            ["Argument '", name, "' requires '", &related.join("', '"), "'."].concat()
        }
        DependencyKind::RequiresAny => {
            ["At least one of these arguments is required: ", &related.join(", "), "."].concat()
        }
        DependencyKind::Prohibits => {
            ["Argument '", name, "' cannot be used with '", &related.join("', '"), "'."].concat()
        }
    }
}

impl ParseError {
    /// The error's category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseError::UnknownArgument { .. } => ErrorCategory::UnknownArgument,
            ParseError::MissingRequiredArgument { .. } => ErrorCategory::MissingRequiredArgument,
            ParseError::MissingNamedArgumentValue { .. } => {
                ErrorCategory::MissingNamedArgumentValue
            }
            ParseError::TooManyArguments { .. } => ErrorCategory::TooManyArguments,
            ParseError::DuplicateArgument { .. } => ErrorCategory::DuplicateArgument,
            ParseError::ValidationFailed { .. } => ErrorCategory::ValidationFailed,
            ParseError::NullArgumentValue { .. } => ErrorCategory::NullArgumentValue,
            ParseError::DependencyNotMet { .. } => ErrorCategory::DependencyNotMet,
            ParseError::AmbiguousName { .. } => ErrorCategory::AmbiguousName,
            ParseError::ConversionFailed { .. } => ErrorCategory::ConversionFailed,
            ParseError::CombinedShortNameNonSwitch { .. } => {
                ErrorCategory::CombinedShortNameNonSwitch
            }
            ParseError::ArgumentValueError { .. } => ErrorCategory::ArgumentValueError,
        }
    }

    /// The argument the error is attributed to, if any.
    pub fn argument_name(&self) -> Option<&str> {
        match self {
            ParseError::UnknownArgument { name, .. }
            | ParseError::MissingRequiredArgument { name }
            | ParseError::MissingNamedArgumentValue { name }
            | ParseError::DuplicateArgument { name, .. }
            | ParseError::ValidationFailed { name, .. }
            | ParseError::NullArgumentValue { name }
            | ParseError::AmbiguousName { name, .. }
            | ParseError::ConversionFailed { name, .. }
            | ParseError::ArgumentValueError { name, .. } => Some(name),
            ParseError::DependencyNotMet { name, .. } => name.as_deref(),
            ParseError::TooManyArguments { .. } | ParseError::CombinedShortNameNonSwitch { .. } => {
                None
            }
        }
    }

    /// The raw text involved, if any.
    pub fn raw_value(&self) -> Option<&str> {
        match self {
            ParseError::TooManyArguments { value }
            | ParseError::ValidationFailed { value, .. }
            | ParseError::ConversionFailed { value, .. } => Some(value),
            ParseError::DuplicateArgument { key, .. } => key.as_deref(),
            ParseError::CombinedShortNameNonSwitch { token, .. } => Some(token),
            _ => None,
        }
    }
}

/// A schema that violates the definition invariants.
///
/// These are reported when a [`Parser`](crate::Parser) is built, never while
/// parsing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// An argument name is empty, starts with a prefix or contains a separator.
    #[error("Invalid argument name '{name}': {reason}.")]
    InvalidName {
        /// The offending name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Two arguments share a name or alias under the configured comparison.
    #[error("Duplicate argument name '{name}'.")]
    DuplicateName {
        /// The shared name.
        name: String,
    },

    /// Two arguments share a short name.
    #[error("Duplicate short name '{short}'.")]
    DuplicateShortName {
        /// The shared short name.
        short: char,
    },

    /// A user argument uses a name reserved for a built-in switch.
    #[error("Argument name '{name}' is reserved.")]
    ReservedName {
        /// The reserved name.
        name: String,
    },

    /// Positional indices are not contiguous from zero, or repeat.
    #[error("Positional argument '{name}' has index {position}, expected {expected}.")]
    PositionalGap {
        /// The argument at the bad index.
        name: String,
        /// Its index.
        position: usize,
        /// The next free index.
        expected: usize,
    },

    /// A multi-value or dictionary positional that isn't last.
    #[error("Positional argument '{name}' collects multiple values and must be last.")]
    CollectionPositionalNotLast {
        /// The argument.
        name: String,
    },

    /// A required positional after an optional one.
    #[error("Required positional argument '{name}' follows an optional positional argument.")]
    RequiredAfterOptional {
        /// The argument.
        name: String,
    },

    /// A required argument with a default value.
    #[error("Required argument '{name}' cannot have a default value.")]
    RequiredWithDefault {
        /// The argument.
        name: String,
    },

    /// A default value that the argument's converter rejects.
    #[error("Default value '{value}' for argument '{name}' is invalid: {message}")]
    InvalidDefault {
        /// The argument.
        name: String,
        /// The default text.
        value: String,
        /// The converter's message.
        message: String,
    },

    /// A dependency on an argument that doesn't exist.
    #[error("Argument '{name}' depends on unknown argument '{dependency}'.")]
    UnknownDependency {
        /// The argument declaring the dependency.
        name: String,
        /// The unknown name.
        dependency: String,
    },

    /// A `requires_any` group naming an argument that doesn't exist.
    #[error("Argument group {group} names unknown argument '{dependency}'.")]
    UnknownGroupMember {
        /// Index of the group, in declaration order.
        group: usize,
        /// The unknown name.
        dependency: String,
    },

    /// A sink that can't be used with the argument's arity.
    #[error("Argument '{name}' cannot use a callback sink with multiple values.")]
    CallbackOnCollection {
        /// The argument.
        name: String,
    },

    /// A validator that can't apply to the argument.
    #[error("Invalid validator '{rule}' on argument '{name}': {message}")]
    InvalidValidator {
        /// The argument.
        name: String,
        /// The validator.
        rule: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Either failure a [`FromArgs`](crate::FromArgs) convenience call can produce.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The derived schema is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// The arguments didn't parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
