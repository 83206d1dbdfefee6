// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Typed storage for bound values.
//!
//! A [`SlotKind`] describes how an argument's values accumulate and which
//! type they end up as. Each parse asks the kind for a fresh [`ValueSlot`]
//! and feeds it one raw element at a time.

use {
    crate::{
        convert::{default_converter, numeric_value, parse_switch, Converter, FromArgValue, Locale},
        definition::{Arity, ValueDescriptor},
    },
    std::{any::Any, sync::Arc},
};

/// One raw element handed to a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Element<'a> {
    /// A value.
    Value(&'a str),
    /// The null sentinel.
    Null,
    /// A dictionary entry, already split at the key-value separator.
    Entry {
        /// Key text.
        key: &'a str,
        /// Value text, `None` for the null sentinel.
        value: Option<&'a str>,
    },
}

/// What a slot reports about an element it accepted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Accepted {
    /// Numeric view of the converted value, for range checks.
    pub numeric: Option<f64>,
}

/// Why a slot refused an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotError {
    /// The converter failed.
    Conversion(String),
    /// The slot can't hold a null value.
    Null,
    /// A dictionary key was already bound.
    DuplicateKey(String),
    /// The element has the wrong shape for the slot.
    Shape,
}

/// Per-parse storage for one argument.
pub trait ValueSlot {
    /// Convert and store one element.
    fn accept(
        &mut self,
        element: Element<'_>,
        allow_duplicate_keys: bool,
    ) -> Result<Accepted, SlotError>;

    /// Whether anything was stored.
    fn is_bound(&self) -> bool;

    /// Number of elements stored.
    fn len(&self) -> usize;

    /// Whether nothing was stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored value, as the kind's output type.
    fn current(&self) -> Option<&dyn Any>;

    /// Move the stored value out, as the kind's output type.
    fn take(&mut self) -> Option<Box<dyn Any>>;
}

/// How an argument's values are converted and accumulated.
pub trait SlotKind: Clone + Send + Sync + 'static {
    /// The type handed to sinks.
    type Output: Any;

    /// The arity arguments of this kind have.
    const ARITY: Arity;

    /// Describes the converted type.
    fn descriptor() -> ValueDescriptor;

    /// Whether the null sentinel can be stored, as the value or as
    /// collection elements and dictionary values.
    fn allows_null(&self) -> bool {
        false
    }

    /// Fresh storage for one parse, converting under `locale`.
    fn new_slot(&self, locale: &Locale) -> Box<dyn ValueSlot>;
}

fn convert<V>(converter: &Converter<V>, raw: &str, locale: &Locale) -> Result<V, SlotError> {
    converter(raw, locale).map_err(SlotError::Conversion)
}

fn accepted<V: Any>(value: &V) -> Accepted {
    Accepted { numeric: numeric_value(value) }
}

/// A single required or defaulted value.
pub struct Scalar<V> {
    pub(crate) converter: Converter<V>,
}

/// A single value that may be absent or null.
pub struct Nullable<V> {
    pub(crate) converter: Converter<V>,
}

/// A boolean flag.
#[derive(Clone, Copy, Debug, Default)]
pub struct Switch;

/// Values accumulated in order.
pub struct Multi<V> {
    pub(crate) converter: Converter<V>,
    null: Option<fn() -> V>,
}

/// Key-value entries accumulated in insertion order.
pub struct Dictionary<K, V> {
    pub(crate) key_converter: Converter<K>,
    pub(crate) value_converter: Converter<V>,
    null_value: Option<fn() -> V>,
}

fn some<V: 'static>(converter: Converter<V>) -> Converter<Option<V>> {
    Arc::new(move |raw: &str, locale: &Locale| converter(raw, locale).map(Some))
}

macro_rules! impl_kind_basics {
    ($($kind:ident),*) => {$(
        impl<V: FromArgValue + 'static> Default for $kind<V> {
            fn default() -> Self {
                $kind { converter: default_converter() }
            }
        }

        impl<V> Clone for $kind<V> {
            fn clone(&self) -> Self {
                $kind { converter: self.converter.clone() }
            }
        }

        impl<V> $kind<V> {
            /// Use `converter` instead of the type's default conversion.
            pub fn with_converter(converter: Converter<V>) -> Self {
                $kind { converter }
            }
        }
    )*};
}

impl_kind_basics!(Scalar, Nullable);

impl<V: FromArgValue + 'static> Default for Multi<V> {
    fn default() -> Self {
        Multi::with_converter(default_converter())
    }
}

impl<V> Clone for Multi<V> {
    fn clone(&self) -> Self {
        Multi { converter: self.converter.clone(), null: self.null }
    }
}

impl<V> Multi<V> {
    /// Use `converter` instead of the type's default conversion.
    pub fn with_converter(converter: Converter<V>) -> Self {
        Multi { converter, null: None }
    }
}

impl<V: 'static> Multi<Option<V>> {
    /// Elements may be the null sentinel, collected as `None`.
    pub fn nullable() -> Self
    where
        V: FromArgValue,
    {
        Multi::nullable_with(default_converter())
    }

    /// Like [`nullable`](Self::nullable), converting other elements with
    /// `converter`.
    pub fn nullable_with(converter: Converter<V>) -> Self {
        let null: fn() -> Option<V> = || None;
        Multi { converter: some(converter), null: Some(null) }
    }
}

impl<K: FromArgValue + 'static, V: FromArgValue + 'static> Default for Dictionary<K, V> {
    fn default() -> Self {
        Dictionary {
            key_converter: default_converter(),
            value_converter: default_converter(),
            null_value: None,
        }
    }
}

impl<K: FromArgValue + 'static, V: FromArgValue + 'static> Dictionary<K, Option<V>> {
    /// Values may be the null sentinel, stored as `None`. Keys never may.
    pub fn nullable_values() -> Self {
        let null: fn() -> Option<V> = || None;
        Dictionary {
            key_converter: default_converter(),
            value_converter: some(default_converter()),
            null_value: Some(null),
        }
    }
}

impl<K, V> Clone for Dictionary<K, V> {
    fn clone(&self) -> Self {
        Dictionary {
            key_converter: self.key_converter.clone(),
            value_converter: self.value_converter.clone(),
            null_value: self.null_value,
        }
    }
}

struct ScalarSlot<V> {
    converter: Converter<V>,
    locale: Locale,
    value: Option<V>,
}

impl<V: Any> ValueSlot for ScalarSlot<V> {
    fn accept(&mut self, element: Element<'_>, _: bool) -> Result<Accepted, SlotError> {
        match element {
            Element::Value(raw) => {
                let value = convert(&self.converter, raw, &self.locale)?;
                let accepted = accepted(&value);
                self.value = Some(value);
                Ok(accepted)
            }
            Element::Null => Err(SlotError::Null),
            Element::Entry { .. } => Err(SlotError::Shape),
        }
    }

    fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    fn len(&self) -> usize {
        usize::from(self.value.is_some())
    }

    fn current(&self) -> Option<&dyn Any> {
        self.value.as_ref().map(|v| v as &dyn Any)
    }

    fn take(&mut self) -> Option<Box<dyn Any>> {
        self.value.take().map(|v| Box::new(v) as Box<dyn Any>)
    }
}

impl<V: Any> SlotKind for Scalar<V> {
    type Output = V;
    const ARITY: Arity = Arity::Single;

    fn descriptor() -> ValueDescriptor {
        ValueDescriptor::scalar::<V>()
    }

    fn new_slot(&self, locale: &Locale) -> Box<dyn ValueSlot> {
        Box::new(ScalarSlot {
            converter: self.converter.clone(),
            locale: locale.clone(),
            value: None,
        })
    }
}

struct NullableSlot<V> {
    converter: Converter<V>,
    locale: Locale,
    value: Option<Option<V>>,
}

impl<V: Any> ValueSlot for NullableSlot<V> {
    fn accept(&mut self, element: Element<'_>, _: bool) -> Result<Accepted, SlotError> {
        match element {
            Element::Value(raw) => {
                let value = convert(&self.converter, raw, &self.locale)?;
                let accepted = accepted(&value);
                self.value = Some(Some(value));
                Ok(accepted)
            }
            Element::Null => {
                self.value = Some(None);
                Ok(Accepted::default())
            }
            Element::Entry { .. } => Err(SlotError::Shape),
        }
    }

    fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    fn len(&self) -> usize {
        usize::from(self.value.is_some())
    }

    fn current(&self) -> Option<&dyn Any> {
        self.value.as_ref().map(|v| v as &dyn Any)
    }

    fn take(&mut self) -> Option<Box<dyn Any>> {
        self.value.take().map(|v| Box::new(v) as Box<dyn Any>)
    }
}

impl<V: Any> SlotKind for Nullable<V> {
    type Output = Option<V>;
    const ARITY: Arity = Arity::Single;

    fn descriptor() -> ValueDescriptor {
        ValueDescriptor::nullable::<V>()
    }

    fn allows_null(&self) -> bool {
        true
    }

    fn new_slot(&self, locale: &Locale) -> Box<dyn ValueSlot> {
        Box::new(NullableSlot {
            converter: self.converter.clone(),
            locale: locale.clone(),
            value: None,
        })
    }
}

#[derive(Default)]
struct SwitchSlot {
    value: Option<bool>,
}

impl ValueSlot for SwitchSlot {
    fn accept(&mut self, element: Element<'_>, _: bool) -> Result<Accepted, SlotError> {
        match element {
            Element::Value(raw) => {
                self.value = Some(parse_switch(raw).map_err(SlotError::Conversion)?);
                Ok(Accepted::default())
            }
            Element::Null => Err(SlotError::Null),
            Element::Entry { .. } => Err(SlotError::Shape),
        }
    }

    fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    fn len(&self) -> usize {
        usize::from(self.value.is_some())
    }

    fn current(&self) -> Option<&dyn Any> {
        self.value.as_ref().map(|v| v as &dyn Any)
    }

    fn take(&mut self) -> Option<Box<dyn Any>> {
        self.value.take().map(|v| Box::new(v) as Box<dyn Any>)
    }
}

impl SlotKind for Switch {
    type Output = bool;
    const ARITY: Arity = Arity::Switch;

    fn descriptor() -> ValueDescriptor {
        ValueDescriptor::scalar::<bool>()
    }

    fn new_slot(&self, _: &Locale) -> Box<dyn ValueSlot> {
        Box::new(SwitchSlot::default())
    }
}

struct MultiSlot<V> {
    converter: Converter<V>,
    null: Option<fn() -> V>,
    locale: Locale,
    values: Option<Vec<V>>,
}

impl<V: Any> ValueSlot for MultiSlot<V> {
    fn accept(&mut self, element: Element<'_>, _: bool) -> Result<Accepted, SlotError> {
        match element {
            Element::Value(raw) => {
                let value = convert(&self.converter, raw, &self.locale)?;
                let accepted = accepted(&value);
                self.values.get_or_insert_with(Vec::new).push(value);
                Ok(accepted)
            }
            Element::Null => {
                let null = self.null.ok_or(SlotError::Null)?;
                self.values.get_or_insert_with(Vec::new).push(null());
                Ok(Accepted::default())
            }
            Element::Entry { .. } => Err(SlotError::Shape),
        }
    }

    fn is_bound(&self) -> bool {
        self.values.is_some()
    }

    fn len(&self) -> usize {
        self.values.as_ref().map_or(0, Vec::len)
    }

    fn current(&self) -> Option<&dyn Any> {
        self.values.as_ref().map(|v| v as &dyn Any)
    }

    fn take(&mut self) -> Option<Box<dyn Any>> {
        self.values.take().map(|v| Box::new(v) as Box<dyn Any>)
    }
}

impl<V: Any> SlotKind for Multi<V> {
    type Output = Vec<V>;
    const ARITY: Arity = Arity::MultiValue;

    fn descriptor() -> ValueDescriptor {
        ValueDescriptor::collection::<V>()
    }

    fn allows_null(&self) -> bool {
        self.null.is_some()
    }

    fn new_slot(&self, locale: &Locale) -> Box<dyn ValueSlot> {
        Box::new(MultiSlot {
            converter: self.converter.clone(),
            null: self.null,
            locale: locale.clone(),
            values: None,
        })
    }
}

struct DictionarySlot<K, V> {
    key_converter: Converter<K>,
    value_converter: Converter<V>,
    null_value: Option<fn() -> V>,
    locale: Locale,
    entries: Option<Vec<(K, V)>>,
}

impl<K: Any + PartialEq, V: Any> ValueSlot for DictionarySlot<K, V> {
    fn accept(
        &mut self,
        element: Element<'_>,
        allow_duplicate_keys: bool,
    ) -> Result<Accepted, SlotError> {
        let Element::Entry { key: raw_key, value: raw_value } = element else {
            return Err(match element {
                Element::Null => SlotError::Null,
                _ => SlotError::Shape,
            });
        };
        let key = convert(&self.key_converter, raw_key, &self.locale)?;
        let (value, accepted) = match raw_value {
            Some(raw_value) => {
                let value = convert(&self.value_converter, raw_value, &self.locale)?;
                let accepted = accepted(&value);
                (value, accepted)
            }
            None => {
                let null = self.null_value.ok_or(SlotError::Null)?;
                (null(), Accepted::default())
            }
        };
        let entries = self.entries.get_or_insert_with(Vec::new);
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(_) if !allow_duplicate_keys => {
                return Err(SlotError::DuplicateKey(raw_key.to_owned()));
            }
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        Ok(accepted)
    }

    fn is_bound(&self) -> bool {
        self.entries.is_some()
    }

    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    fn current(&self) -> Option<&dyn Any> {
        self.entries.as_ref().map(|v| v as &dyn Any)
    }

    fn take(&mut self) -> Option<Box<dyn Any>> {
        self.entries.take().map(|v| Box::new(v) as Box<dyn Any>)
    }
}

impl<K: Any + PartialEq, V: Any> SlotKind for Dictionary<K, V> {
    type Output = Vec<(K, V)>;
    const ARITY: Arity = Arity::Dictionary;

    fn descriptor() -> ValueDescriptor {
        ValueDescriptor::dictionary::<K, V>()
    }

    fn allows_null(&self) -> bool {
        self.null_value.is_some()
    }

    fn new_slot(&self, locale: &Locale) -> Box<dyn ValueSlot> {
        Box::new(DictionarySlot {
            key_converter: self.key_converter.clone(),
            value_converter: self.value_converter.clone(),
            null_value: self.null_value,
            locale: locale.clone(),
            entries: None,
        })
    }
}
