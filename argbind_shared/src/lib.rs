// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Shared functionality between argbind_derive and the argbind runtime.
//!
//! Argument names are computed at compile time by the derive and at build
//! time by the runtime schema builder. Both go through this crate so that
//! identical declarations yield identical names.

use {
    heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase},
    std::{fmt, str::FromStr},
};

/// How identifiers are turned into argument names.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NameTransform {
    /// The identifier is used as-is.
    #[default]
    None,
    /// `SomeName`
    PascalCase,
    /// `someName`
    CamelCase,
    /// `some_name`
    SnakeCase,
    /// `some-name`
    DashCase,
}

impl NameTransform {
    /// All transforms, in declaration order.
    pub const ALL: [NameTransform; 5] = [
        NameTransform::None,
        NameTransform::PascalCase,
        NameTransform::CamelCase,
        NameTransform::SnakeCase,
        NameTransform::DashCase,
    ];

    /// Apply the transform to `name`.
    ///
    /// Characters outside `[A-Za-z0-9_]` are hard boundaries: they are copied
    /// through unchanged and the identifier segments on either side of them
    /// are transformed independently. This keeps generic-looking names such
    /// as `Foo<Bar, Baz>` intact apart from the identifiers inside them.
    pub fn apply(self, name: &str) -> String {
        if self == NameTransform::None {
            return name.to_owned();
        }

        let mut out = String::with_capacity(name.len());
        let mut segment_start = 0;
        for (index, c) in name.char_indices() {
            if !is_identifier_char(c) {
                out.push_str(&self.apply_segment(&name[segment_start..index]));
                out.push(c);
                segment_start = index + c.len_utf8();
            }
        }
        out.push_str(&self.apply_segment(&name[segment_start..]));
        out
    }

    // Words are split at underscore runs and at uppercase boundaries.
    fn apply_segment(self, segment: &str) -> String {
        if segment.is_empty() {
            return String::new();
        }
        match self {
            NameTransform::None => segment.to_owned(),
            NameTransform::PascalCase => segment.to_upper_camel_case(),
            NameTransform::CamelCase => segment.to_lower_camel_case(),
            NameTransform::SnakeCase => segment.to_snake_case(),
            NameTransform::DashCase => segment.to_kebab_case(),
        }
    }

    /// The canonical spelling accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            NameTransform::None => "none",
            NameTransform::PascalCase => "PascalCase",
            NameTransform::CamelCase => "camelCase",
            NameTransform::SnakeCase => "snake_case",
            NameTransform::DashCase => "dash-case",
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl fmt::Display for NameTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NameTransform::ALL
            .iter()
            .copied()
            .find(|transform| transform.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                [
                    "Unknown name transform `",
                    s,
                    "`, expected one of: none, PascalCase, camelCase, snake_case, dash-case",
                ]
                .concat()
            })
    }
}

/// The short name used when one is requested without naming a character:
/// the first character of the (already transformed) long name.
pub fn default_short_name(name: &str) -> Option<char> {
    name.chars().next()
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLES: &[&str] = &[
        "SomeName",
        "some_name",
        "someName",
        "__leading_underscores",
        "trailing__",
        "XMLParser",
        "Foo<Bar, Baz>",
        "value2",
        "a",
        "",
    ];

    #[test]
    fn none_is_identity() {
        for sample in SAMPLES {
            assert_eq!(NameTransform::None.apply(sample), *sample);
        }
    }

    #[test]
    fn transforms_are_idempotent() {
        for transform in NameTransform::ALL {
            for sample in SAMPLES {
                let once = transform.apply(sample);
                assert_eq!(transform.apply(&once), once, "{} on {:?}", transform, sample);
            }
        }
    }

    #[test]
    fn splits_words() {
        assert_eq!(NameTransform::DashCase.apply("SomeName"), "some-name");
        assert_eq!(NameTransform::DashCase.apply("some__name"), "some-name");
        assert_eq!(NameTransform::SnakeCase.apply("someName"), "some_name");
        assert_eq!(NameTransform::PascalCase.apply("some_name"), "SomeName");
        assert_eq!(NameTransform::CamelCase.apply("SomeName"), "someName");
        assert_eq!(NameTransform::CamelCase.apply("_some_name"), "someName");
    }

    #[test]
    fn hard_boundaries_are_preserved() {
        assert_eq!(NameTransform::DashCase.apply("Foo<BarBaz, Qux>"), "foo<bar-baz, qux>");
        assert_eq!(NameTransform::PascalCase.apply("some_name<other_name>"), "SomeName<OtherName>");
        assert_eq!(NameTransform::SnakeCase.apply("outer.InnerValue"), "outer.inner_value");
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("dash-case".parse::<NameTransform>(), Ok(NameTransform::DashCase));
        assert_eq!("SNAKE_CASE".parse::<NameTransform>(), Ok(NameTransform::SnakeCase));
        assert!("kebab".parse::<NameTransform>().is_err());
    }

    #[test]
    fn short_name_is_first_char() {
        assert_eq!(default_short_name("verbose"), Some('v'));
        assert_eq!(default_short_name(""), None);
    }
}
