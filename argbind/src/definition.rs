// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Immutable argument descriptors.
//!
//! An [`ArgumentDefinition`] is plain data: everything a renderer or a
//! conformance test needs to know about one bindable slot. The behavior
//! attached to it (converters and sinks) lives next to it in the
//! [`Schema`](crate::Schema).

use crate::validate::Validator;

#[cfg(feature = "serde")]
use serde::Serialize;

/// How many values an argument takes and how they accumulate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Arity {
    /// No value, or an optional inline boolean.
    Switch,
    /// Exactly one value.
    Single,
    /// Repeated occurrences accumulate into an ordered sequence.
    MultiValue,
    /// Repeated `key=value` occurrences accumulate into a key-unique mapping.
    Dictionary,
}

impl Arity {
    /// Whether the argument accumulates values across occurrences.
    pub fn is_collection(self) -> bool {
        matches!(self, Arity::MultiValue | Arity::Dictionary)
    }
}

/// The type a raw value is converted into.
///
/// Type names come from [`std::any::type_name`], so both metadata providers
/// agree on them for the same declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ValueDescriptor {
    /// A plain value.
    Scalar(String),
    /// A value that may also be absent (`Option<T>`).
    Nullable(String),
    /// The element type of a multi-value argument.
    Collection(String),
    /// The key and value types of a dictionary argument.
    Dictionary {
        /// Key type.
        key: String,
        /// Value type.
        value: String,
    },
}

impl ValueDescriptor {
    /// `Scalar` for `T`.
    pub fn scalar<T: ?Sized>() -> Self {
        ValueDescriptor::Scalar(std::any::type_name::<T>().to_owned())
    }

    /// `Nullable` for `T`.
    pub fn nullable<T: ?Sized>() -> Self {
        ValueDescriptor::Nullable(std::any::type_name::<T>().to_owned())
    }

    /// `Collection` with element `T`.
    pub fn collection<T: ?Sized>() -> Self {
        ValueDescriptor::Collection(std::any::type_name::<T>().to_owned())
    }

    /// `Dictionary` from `K` to `V`.
    pub fn dictionary<K: ?Sized, V: ?Sized>() -> Self {
        ValueDescriptor::Dictionary {
            key: std::any::type_name::<K>().to_owned(),
            value: std::any::type_name::<V>().to_owned(),
        }
    }
}

/// Number of parameters a callback sink takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CallbackArity {
    /// `Fn()`
    Zero,
    /// `Fn(&value)`
    Value,
    /// `Fn(&value, &mut ParseContext)`
    ValueAndContext,
}

/// Where a bound value ends up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SinkKind {
    /// Set on the constructed destination.
    Member,
    /// Passed to the destination's constructor.
    ConstructorParameter,
    /// Handed to a callback as soon as it is bound.
    Callback(CallbackArity),
    /// Bound and validated but not delivered anywhere.
    Discard,
}

/// Descriptor of one bindable slot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ArgumentDefinition {
    /// The argument's primary (long) name.
    pub name: String,
    /// Single character name, used in Long/Short mode.
    pub short_name: Option<char>,
    /// Additional long names.
    pub aliases: Vec<String>,
    /// Additional short names.
    pub short_aliases: Vec<char>,
    /// Positional index, `None` for named-only arguments.
    pub position: Option<usize>,
    /// How values accumulate.
    pub arity: Arity,
    /// The converted type.
    pub value_type: ValueDescriptor,
    /// Whether the argument must be supplied.
    pub required: bool,
    /// Text converted when the argument is not supplied.
    pub default_value: Option<String>,
    /// Whether the null sentinel may be bound.
    pub allow_null: bool,
    /// Whether a repeated dictionary key overwrites the earlier value.
    pub allow_duplicate_keys: bool,
    /// Splits a single raw value into several elements.
    pub separator: Option<String>,
    /// Splits a dictionary entry into key and value.
    pub key_value_separator: Option<String>,
    /// Binding this argument ends parsing.
    pub cancel_parsing: bool,
    /// Omitted from usage output.
    pub hidden: bool,
    /// Human readable description.
    pub description: String,
    /// Placeholder for the value in usage output.
    pub value_description: Option<String>,
    /// Rules checked against every bound value.
    pub validators: Vec<Validator>,
    /// Arguments that must be present whenever this one is.
    pub requires: Vec<String>,
    /// Arguments that must be absent whenever this one is present.
    pub prohibits: Vec<String>,
    /// Where the bound value goes.
    pub sink: SinkKind,
}

/// Key-value separator used for dictionaries that don't name one.
pub const DEFAULT_KEY_VALUE_SEPARATOR: &str = "=";

impl ArgumentDefinition {
    /// A named-only, optional definition with no validators.
    pub fn new(name: impl Into<String>, arity: Arity, value_type: ValueDescriptor) -> Self {
        ArgumentDefinition {
            name: name.into(),
            short_name: None,
            aliases: Vec::new(),
            short_aliases: Vec::new(),
            position: None,
            arity,
            value_type,
            required: false,
            default_value: None,
            allow_null: false,
            allow_duplicate_keys: false,
            separator: None,
            key_value_separator: match arity {
                Arity::Dictionary => Some(DEFAULT_KEY_VALUE_SEPARATOR.to_owned()),
                _ => None,
            },
            cancel_parsing: false,
            hidden: false,
            description: String::new(),
            value_description: None,
            validators: Vec::new(),
            requires: Vec::new(),
            prohibits: Vec::new(),
            sink: SinkKind::Member,
        }
    }

    /// Whether the argument is matched by position.
    pub fn is_positional(&self) -> bool {
        self.position.is_some()
    }

    /// Primary name followed by the aliases.
    pub fn long_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Short name followed by the short aliases.
    pub fn short_names(&self) -> impl Iterator<Item = char> + '_ {
        self.short_name.into_iter().chain(self.short_aliases.iter().copied())
    }

    /// Key-value separator, falling back to the default.
    pub fn key_value_separator(&self) -> &str {
        self.key_value_separator.as_deref().unwrap_or(DEFAULT_KEY_VALUE_SEPARATOR)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dictionary_gets_default_separator() {
        let def = ArgumentDefinition::new(
            "d",
            Arity::Dictionary,
            ValueDescriptor::dictionary::<String, u32>(),
        );
        assert_eq!(def.key_value_separator.as_deref(), Some("="));
        let def = ArgumentDefinition::new("s", Arity::Single, ValueDescriptor::scalar::<u32>());
        assert_eq!(def.key_value_separator, None);
        assert_eq!(def.key_value_separator(), "=");
    }

    #[test]
    fn names_iterate_primary_first() {
        let mut def =
            ArgumentDefinition::new("verbose", Arity::Switch, ValueDescriptor::scalar::<bool>());
        def.aliases = vec!["loud".to_owned()];
        def.short_name = Some('v');
        def.short_aliases = vec!['l'];
        assert_eq!(def.long_names().collect::<Vec<_>>(), ["verbose", "loud"]);
        assert_eq!(def.short_names().collect::<Vec<_>>(), ['v', 'l']);
    }

    #[test]
    fn descriptors_use_type_names() {
        assert_eq!(ValueDescriptor::scalar::<u32>(), ValueDescriptor::Scalar("u32".to_owned()));
        assert_eq!(
            ValueDescriptor::dictionary::<String, i64>(),
            ValueDescriptor::Dictionary {
                key: "alloc::string::String".to_owned(),
                value: "i64".to_owned()
            }
        );
    }
}
