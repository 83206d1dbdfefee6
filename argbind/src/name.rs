// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Mapping raw token names to definitions.

use {
    crate::{
        definition::ArgumentDefinition,
        options::{ParseOptions, ParsingMode},
    },
    rust_fuzzy_search::fuzzy_search_best_n,
};

/// The result of looking up a possibly abbreviated name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<K> {
    /// The name matched a candidate exactly.
    Exact(K),
    /// The name is the leading part of exactly one candidate's names.
    Abbreviated(K),
    /// The name is the leading part of several candidates' names, listed in
    /// the order they were offered.
    Ambiguous(Vec<K>),
    /// Nothing matched.
    Unknown,
}

impl<K> Resolution<K> {
    /// The selected candidate, if exactly one was.
    pub fn selected(self) -> Option<K> {
        match self {
            Resolution::Exact(key) | Resolution::Abbreviated(key) => Some(key),
            Resolution::Ambiguous(_) | Resolution::Unknown => None,
        }
    }
}

fn eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive { a == b } else { a.to_lowercase() == b.to_lowercase() }
}

fn is_prefix(prefix: &str, name: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        name.starts_with(prefix)
    } else {
        name.to_lowercase().starts_with(&prefix.to_lowercase())
    }
}

/// Resolve `name` against `(key, name)` candidates.
///
/// An exact match on any name wins. Otherwise, if `abbreviate` is set, a
/// `name` that starts exactly one key's names selects that key. Several keys
/// may share a name list (aliases); they are only reported once.
///
/// This is exposed so that subcommand dispatchers resolve their own names the
/// same way arguments are resolved:
///
/// ```
/// use argbind::{resolve_prefix, Resolution};
///
/// let commands = [("build", "build"), ("bench", "bench"), ("bench", "b")];
/// assert_eq!(resolve_prefix("bu", commands, false, true), Resolution::Abbreviated("build"));
/// assert_eq!(resolve_prefix("B", commands, false, true), Resolution::Exact("bench"));
/// assert_eq!(resolve_prefix("x", commands, false, true), Resolution::Unknown);
/// ```
pub fn resolve_prefix<'a, K, I>(
    name: &str,
    candidates: I,
    case_sensitive: bool,
    abbreviate: bool,
) -> Resolution<K>
where
    K: Copy + PartialEq,
    I: IntoIterator<Item = (K, &'a str)>,
{
    let mut matches: Vec<K> = Vec::new();
    for (key, candidate) in candidates {
        if eq(name, candidate, case_sensitive) {
            return Resolution::Exact(key);
        }
        if abbreviate && is_prefix(name, candidate, case_sensitive) && !matches.contains(&key) {
            matches.push(key);
        }
    }
    match matches.len() {
        0 => Resolution::Unknown,
        1 => Resolution::Abbreviated(matches[0]),
        _ => Resolution::Ambiguous(matches),
    }
}

/// How a single token presents itself.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// `-name`, `--name`, with an optional inline value.
    Long { name: &'a str, value: Option<&'a str> },
    /// `-s` or a run of combined short names, Long/Short mode only.
    Short { names: &'a str, value: Option<&'a str> },
    /// Anything else.
    Value,
}

/// The name lookup tables for one parser.
pub(crate) struct NameTable {
    long: Vec<(usize, String)>,
    short: Vec<(char, usize)>,
    mode: ParsingMode,
    case_sensitive: bool,
    abbreviate: bool,
}

impl NameTable {
    pub(crate) fn new(definitions: &[&ArgumentDefinition], options: &ParseOptions) -> Self {
        let mut long = Vec::new();
        let mut short = Vec::new();
        for (index, definition) in definitions.iter().enumerate() {
            long.extend(definition.long_names().map(|name| (index, name.to_owned())));
            if options.mode == ParsingMode::LongShort {
                short.extend(definition.short_names().map(|c| (c, index)));
            }
        }
        NameTable {
            long,
            short,
            mode: options.mode,
            case_sensitive: options.case_sensitive,
            abbreviate: options.auto_prefix_aliases,
        }
    }

    pub(crate) fn resolve_long(&self, name: &str) -> Resolution<usize> {
        let candidates = self.long.iter().map(|(index, name)| (*index, name.as_str()));
        resolve_prefix(name, candidates, self.case_sensitive, self.abbreviate)
    }

    pub(crate) fn resolve_short(&self, short: char) -> Option<usize> {
        self.short.iter().find(|(c, _)| *c == short).map(|(_, index)| *index)
    }

    /// The closest visible long name to `name`.
    pub(crate) fn suggest(&self, name: &str, visible: impl Fn(usize) -> bool) -> Option<String> {
        let names: Vec<&str> = self
            .long
            .iter()
            .filter(|(index, _)| visible(*index))
            .map(|(_, name)| name.as_str())
            .collect();
        fuzzy_search_best_n(name, &names, 1)
            .into_iter()
            .find(|(_, score)| *score > 0.0)
            .map(|(name, _)| name.to_owned())
    }

    pub(crate) fn mode(&self) -> ParsingMode {
        self.mode
    }
}

fn split_value<'a>(rest: &'a str, separators: &[char]) -> (&'a str, Option<&'a str>) {
    match rest.find(|c: char| separators.contains(&c)) {
        Some(at) => {
            let separator_len = rest[at..].chars().next().map_or(1, char::len_utf8);
            (&rest[..at], Some(&rest[at + separator_len..]))
        }
        None => (rest, None),
    }
}

fn strip_longest<'a>(token: &'a str, prefixes: &[String]) -> Option<&'a str> {
    prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty() && token.len() > prefix.len())
        .filter_map(|prefix| token.strip_prefix(prefix.as_str()).map(|rest| (prefix.len(), rest)))
        .max_by_key(|(len, _)| *len)
        .map(|(_, rest)| rest)
}

/// Split a token into its prefix-stripped name and inline value.
pub(crate) fn classify<'a>(token: &'a str, options: &ParseOptions) -> Token<'a> {
    let separators = &options.name_value_separators;
    match options.mode {
        ParsingMode::Default => match strip_longest(token, &options.prefixes) {
            Some(rest) => match split_value(rest, separators) {
                ("", _) => Token::Value,
                (name, value) => Token::Long { name, value },
            },
            None => Token::Value,
        },
        ParsingMode::LongShort => {
            if token == options.long_prefix {
                return Token::Value;
            }
            if token.len() > options.long_prefix.len() && token.starts_with(&options.long_prefix) {
                return match split_value(&token[options.long_prefix.len()..], separators) {
                    ("", _) => Token::Value,
                    (name, value) => Token::Long { name, value },
                };
            }
            match strip_longest(token, &options.short_prefixes) {
                Some(rest) => match split_value(rest, separators) {
                    ("", _) => Token::Value,
                    (names, value) => Token::Short { names, value },
                },
                None => Token::Value,
            }
        }
    }
}

/// Validate a name against the configured prefixes and separators.
pub(crate) fn name_problem(name: &str, options: &ParseOptions) -> Option<&'static str> {
    if name.is_empty() {
        Some("names must not be empty")
    } else if options.all_prefixes().iter().any(|p| !p.is_empty() && name.starts_with(p)) {
        Some("names must not start with an argument prefix")
    } else if name.contains(options.name_value_separators.as_slice()) {
        Some("names must not contain a name/value separator")
    } else if name.chars().any(char::is_whitespace) {
        Some("names must not contain whitespace")
    } else {
        None
    }
}

/// Whether two long names collide under the configured comparison.
pub(crate) fn same_name(a: &str, b: &str, options: &ParseOptions) -> bool {
    eq(a, b, options.case_sensitive)
}
