// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The value conversion boundary.

use std::{
    any::{Any, TypeId},
    str::FromStr,
    sync::Arc,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number formatting conventions used while converting values.
///
/// Conversion never consults ambient state; the locale is part of the
/// [`ParseOptions`](crate::ParseOptions) and handed to every converter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Locale {
    /// Identifier such as `de-DE`; empty for the invariant locale.
    pub name: String,
    /// Separates the integer and fractional parts.
    pub decimal_separator: char,
    /// Separates digit groups, if the locale uses one.
    pub group_separator: Option<char>,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::invariant()
    }
}

impl Locale {
    /// The culture-independent locale: `.` decimals, no digit grouping.
    pub fn invariant() -> Self {
        Locale { name: String::new(), decimal_separator: '.', group_separator: None }
    }

    /// A named locale.
    pub fn new(
        name: impl Into<String>,
        decimal_separator: char,
        group_separator: Option<char>,
    ) -> Self {
        Locale { name: name.into(), decimal_separator, group_separator }
    }

    /// Whether this is the invariant locale.
    pub fn is_invariant(&self) -> bool {
        self.decimal_separator == '.' && self.group_separator.is_none()
    }

    /// Rewrites locale formatted numeric text into the invariant form: group
    /// separators are dropped and the decimal separator becomes `.`.
    ///
    /// A `.` that is neither of the locale's separators is an error.
    pub fn normalize_number(&self, value: &str) -> Result<String, String> {
        let mut normalized = String::with_capacity(value.len());
        for c in value.chars() {
            if Some(c) == self.group_separator {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
            } else if c == '.' {
                return Err(format!(
                    "unexpected `.` in `{}`; the decimal separator is `{}`",
                    value, self.decimal_separator
                ));
            } else {
                normalized.push(c);
            }
        }
        Ok(normalized)
    }

    /// Parse `value` with `FromStr`.
    ///
    /// Numeric types are read in this locale's number format. Everything
    /// else sees the text unchanged.
    pub fn parse<T>(&self, value: &str) -> Result<T, String>
    where
        T: FromStr + 'static,
        T::Err: std::fmt::Display,
    {
        if self.is_invariant() || !is_number::<T>() {
            return T::from_str(value).map_err(|x| x.to_string());
        }
        T::from_str(&self.normalize_number(value)?).map_err(|x| x.to_string())
    }
}

/// Types which can be constructed from a single commandline value.
///
/// A blanket implementation exists for types implementing
/// `FromStr<Err: Display>`. Arguments that need something else can supply
/// their own converter instead.
pub trait FromArgValue: Sized {
    /// Construct the type from a commandline value, returning an error string
    /// on failure.
    fn from_arg_value(value: &str, locale: &Locale) -> Result<Self, String>;
}

impl<T> FromArgValue for T
where
    T: FromStr + 'static,
    T::Err: std::fmt::Display,
{
    fn from_arg_value(value: &str, locale: &Locale) -> Result<Self, String> {
        locale.parse(value)
    }
}

/// A shared, type-specific converter.
pub type Converter<V> = Arc<dyn Fn(&str, &Locale) -> Result<V, String> + Send + Sync>;

/// The converter `FromArgValue` provides for `V`.
pub fn default_converter<V: FromArgValue + 'static>() -> Converter<V> {
    Arc::new(V::from_arg_value)
}

/// Wrap a plain `fn(&str) -> Result<T, String>` parser as a converter.
pub fn from_str_fn<V: 'static>(parse: fn(&str) -> Result<V, String>) -> Converter<V> {
    Arc::new(move |value, _locale| parse(value))
}

/// Parses the inline value of a switch: `true` or `false`, in any case.
pub(crate) fn parse_switch(value: &str) -> Result<bool, String> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(["expected `true` or `false`, found `", value, "`"].concat())
    }
}

/// Whether `T` is one of the primitive number types.
fn is_number<T: 'static>() -> bool {
    macro_rules! any_of {
        ($($ty:ty,)*) => {
            [$(TypeId::of::<$ty>(),)*].contains(&TypeId::of::<T>())
        }
    }

    any_of![u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,]
}

/// A numeric view of a converted value, for range validation.
pub(crate) fn numeric_value(value: &dyn Any) -> Option<f64> {
    macro_rules! try_numeric {
        ($($ty:ty,)*) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(*v as f64);
                }
            )*
        }
    }

    try_numeric![u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,];
    None
}
