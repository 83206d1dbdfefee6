// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Parser configuration.
//!
//! [`ParseOptions`] can be built in code or, with the `serde` feature,
//! loaded from a configuration file; missing keys keep their defaults.

use crate::convert::Locale;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The naming convention used to recognize named arguments.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
pub enum ParsingMode {
    /// One set of prefixes (`-name`) for every name and alias.
    #[default]
    Default,
    /// `--long` names and `-s` single character names.
    LongShort,
}

/// What to do when a single-valued argument is supplied more than once.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
pub enum DuplicatePolicy {
    /// Fail with [`ParseError::DuplicateArgument`](crate::ParseError::DuplicateArgument).
    #[default]
    Error,
    /// The later value wins.
    Allow,
    /// The later value wins and a warning is logged.
    Warn,
}

/// Settings that control how tokens are recognized and bound.
///
/// Every field has a default, so a configuration file only needs to mention
/// what it changes:
///
/// ```toml
/// mode = "long-short"
/// case_sensitive = true
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ParseOptions {
    /// Naming convention.
    pub mode: ParsingMode,
    /// Prefixes for named arguments in [`ParsingMode::Default`].
    pub prefixes: Vec<String>,
    /// Prefix for long names in [`ParsingMode::LongShort`].
    pub long_prefix: String,
    /// Prefixes for short names in [`ParsingMode::LongShort`].
    pub short_prefixes: Vec<String>,
    /// Characters separating a name from an inline value.
    pub name_value_separators: Vec<char>,
    /// Whether long names are compared case sensitively. Short names always are.
    pub case_sensitive: bool,
    /// Handling of repeated single-valued arguments.
    pub duplicates: DuplicatePolicy,
    /// Whether a named argument's value may be the following token.
    pub allow_whitespace_separator: bool,
    /// Whether an unambiguous leading part of a long name selects it.
    pub auto_prefix_aliases: bool,
    /// Whether the built-in help switch is added.
    pub auto_help_argument: bool,
    /// Names user arguments may not take.
    pub reserved_names: Vec<String>,
    /// Text standing for "no value"; `None` disables the sentinel.
    pub null_sentinel: Option<String>,
    /// Whether a bare `--` ends named argument processing.
    pub prefix_termination: bool,
    /// Number formatting used by converters.
    pub locale: Locale,
}

/// Name of the built-in help switch.
pub const HELP_NAME: &str = "help";

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            mode: ParsingMode::Default,
            prefixes: vec!["-".to_owned()],
            long_prefix: "--".to_owned(),
            short_prefixes: vec!["-".to_owned()],
            name_value_separators: vec![':', '='],
            case_sensitive: false,
            duplicates: DuplicatePolicy::Error,
            allow_whitespace_separator: true,
            auto_prefix_aliases: true,
            auto_help_argument: true,
            reserved_names: vec![HELP_NAME.to_owned()],
            null_sentinel: Some("(null)".to_owned()),
            prefix_termination: false,
            locale: Locale::invariant(),
        }
    }
}

impl ParseOptions {
    /// Defaults, switched to [`ParsingMode::LongShort`].
    pub fn long_short() -> Self {
        ParseOptions { mode: ParsingMode::LongShort, ..Default::default() }
    }

    /// Every prefix that can introduce a named argument in the current mode.
    pub(crate) fn all_prefixes(&self) -> Vec<&str> {
        match self.mode {
            ParsingMode::Default => self.prefixes.iter().map(String::as_str).collect(),
            ParsingMode::LongShort => std::iter::once(self.long_prefix.as_str())
                .chain(self.short_prefixes.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Whether the null sentinel is `value`.
    pub(crate) fn is_null(&self, value: &str) -> bool {
        self.null_sentinel.as_deref() == Some(value)
    }
}
