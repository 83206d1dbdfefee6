// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Schemas and the runtime schema builder.
//!
//! A [`Schema`] is the normalized list of argument definitions for one
//! destination type, together with the converters and sinks that bind values
//! into it. Schemas come from a [`SchemaProvider`]: either a [`SchemaBuilder`]
//! assembled at runtime, or [`Derived`] for types with `#[derive(FromArgs)]`.

use {
    crate::{
        context::ParseContext,
        convert::{from_str_fn, Converter, FromArgValue, Locale},
        definition::{ArgumentDefinition, CallbackArity, SinkKind},
        slot::{Dictionary, Multi, Nullable, Scalar, SlotKind, Switch, ValueSlot},
        validate::Validator,
        FromArgs,
    },
    argbind_shared::{default_short_name, NameTransform},
    std::{any::Any, collections::HashMap, fmt, marker::PhantomData, sync::Arc},
};

pub(crate) type MemberFn<T> = Arc<dyn Fn(&mut T, Box<dyn Any>) -> Result<(), String> + Send + Sync>;
pub(crate) type CallbackFn =
    Arc<dyn Fn(Option<&dyn Any>, &mut ParseContext<'_>) -> Result<bool, String> + Send + Sync>;
pub(crate) type SlotFactory = Arc<dyn Fn(&Locale) -> Box<dyn ValueSlot> + Send + Sync>;
type ConstructorFn<T> = Arc<dyn Fn(&mut ConstructorArgs) -> Result<T, String> + Send + Sync>;

/// Where a bound value goes.
pub(crate) enum Sink<T> {
    Member(MemberFn<T>),
    ConstructorParameter,
    Callback(CallbackFn),
    Discard,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        match self {
            Sink::Member(set) => Sink::Member(set.clone()),
            Sink::ConstructorParameter => Sink::ConstructorParameter,
            Sink::Callback(callback) => Sink::Callback(callback.clone()),
            Sink::Discard => Sink::Discard,
        }
    }
}

/// How the destination instance is created.
pub(crate) enum Constructor<T> {
    Default(fn() -> T),
    Parameters(ConstructorFn<T>),
}

/// One argument in a schema: its definition plus the behavior bound to it.
pub(crate) struct Entry<T> {
    pub(crate) definition: ArgumentDefinition,
    pub(crate) factory: SlotFactory,
    pub(crate) sink: Sink<T>,
}

/// The normalized argument definitions for `T`, with everything needed to
/// bind values into it.
pub struct Schema<T> {
    pub(crate) type_name: &'static str,
    pub(crate) description: String,
    pub(crate) entries: Vec<Entry<T>>,
    pub(crate) requires_any: Vec<Vec<String>>,
    pub(crate) constructor: Constructor<T>,
}

impl<T> Schema<T> {
    /// The argument definitions, in definition order.
    pub fn definitions(&self) -> impl Iterator<Item = &ArgumentDefinition> {
        self.entries.iter().map(|entry| &entry.definition)
    }

    /// The definition called `name`.
    pub fn definition(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.definitions().find(|definition| definition.name == name)
    }

    /// Groups of arguments of which at least one must be supplied.
    pub fn requires_any(&self) -> &[Vec<String>] {
        &self.requires_any
    }

    /// Description of the destination.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the destination type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("description", &self.description)
            .field("definitions", &self.definitions().collect::<Vec<_>>())
            .field("requires_any", &self.requires_any)
            .finish()
    }
}

/// Anything that can produce the schema for `T`.
pub trait SchemaProvider<T> {
    /// Produce the schema.
    fn schema(self) -> Schema<T>;
}

impl<T> SchemaProvider<T> for Schema<T> {
    fn schema(self) -> Schema<T> {
        self
    }
}

impl<T: 'static> SchemaProvider<T> for SchemaBuilder<T> {
    fn schema(self) -> Schema<T> {
        self.build()
    }
}

/// The compile-time provider: the schema `#[derive(FromArgs)]` generated
/// for `T`.
pub struct Derived<T>(PhantomData<fn() -> T>);

impl<T> Derived<T> {
    /// The provider for `T`.
    pub fn new() -> Self {
        Derived(PhantomData)
    }
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Derived::new()
    }
}

impl<T: FromArgs> SchemaProvider<T> for Derived<T> {
    fn schema(self) -> Schema<T> {
        T::schema()
    }
}

/// Values collected for constructor-parameter arguments, keyed by argument
/// name.
#[derive(Default)]
pub struct ConstructorArgs {
    values: HashMap<String, Box<dyn Any>>,
}

impl fmt::Debug for ConstructorArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl ConstructorArgs {
    pub(crate) fn insert(&mut self, name: &str, value: Box<dyn Any>) {
        self.values.insert(name.to_owned(), value);
    }

    /// Whether a value was collected for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Take the value for `name`, if one was bound or defaulted.
    pub fn take<C: 'static>(&mut self, name: &str) -> Result<Option<C>, String> {
        match self.values.remove(name) {
            Some(value) => value
                .downcast::<C>()
                .map(|value| Some(*value))
                .map_err(|_| {
                    ["argument '", name, "' is not a ", std::any::type_name::<C>()].concat()
                }),
            None => Ok(None),
        }
    }

    /// Take the value for `name`, failing if there is none.
    pub fn take_required<C: 'static>(&mut self, name: &str) -> Result<C, String> {
        self.take(name)?.ok_or_else(|| ["no value for argument '", name, "'"].concat())
    }

    /// Take the value for `name`, or `C::default()`.
    pub fn take_or_default<C: Default + 'static>(&mut self, name: &str) -> Result<C, String> {
        Ok(self.take(name)?.unwrap_or_default())
    }
}

/// What a callback may return: `()`, `bool`, `Result<(), String>` or
/// `Result<bool, String>`. `false` cancels parsing.
pub trait IntoCompletion {
    /// Whether to continue, or the failure.
    fn into_completion(self) -> Result<bool, String>;
}

impl IntoCompletion for () {
    fn into_completion(self) -> Result<bool, String> {
        Ok(true)
    }
}

impl IntoCompletion for bool {
    fn into_completion(self) -> Result<bool, String> {
        Ok(self)
    }
}

impl IntoCompletion for Result<(), String> {
    fn into_completion(self) -> Result<bool, String> {
        self.map(|()| true)
    }
}

impl IntoCompletion for Result<bool, String> {
    fn into_completion(self) -> Result<bool, String> {
        self
    }
}

fn member<T, O, F>(set: F) -> MemberFn<T>
where
    T: 'static,
    O: 'static,
    F: Fn(&mut T, O) -> Result<(), String> + Send + Sync + 'static,
{
    Arc::new(move |target: &mut T, value: Box<dyn Any>| {
        let value = value
            .downcast::<O>()
            .map_err(|_| ["expected a value of type ", std::any::type_name::<O>()].concat())?;
        set(target, *value)
    })
}

pub(crate) fn callback<F>(f: F) -> CallbackFn
where
    F: Fn(Option<&dyn Any>, &mut ParseContext<'_>) -> Result<bool, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn bound_value<O: 'static>(value: Option<&dyn Any>) -> Result<&O, String> {
    value
        .and_then(|value| value.downcast_ref::<O>())
        .ok_or_else(|| ["expected a bound value of type ", std::any::type_name::<O>()].concat())
}

/// Configures one argument; see [`SchemaBuilder::argument`].
pub struct ArgumentBuilder<T, K> {
    kind: K,
    definition: ArgumentDefinition,
    explicit_name: bool,
    short_from_name: bool,
    sink: Sink<T>,
}

impl<T: 'static, K: SlotKind> ArgumentBuilder<T, K> {
    fn new(identifier: &str, kind: K) -> Self {
        let mut definition = ArgumentDefinition::new(identifier, K::ARITY, K::descriptor());
        definition.allow_null = kind.allows_null();
        definition.sink = SinkKind::Discard;
        ArgumentBuilder {
            kind,
            definition,
            explicit_name: false,
            short_from_name: false,
            sink: Sink::Discard,
        }
    }

    /// Use `name` as is, instead of transforming the identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.definition.name = name.into();
        self.explicit_name = true;
        self
    }

    /// Set the short name.
    pub fn short(mut self, short: char) -> Self {
        self.definition.short_name = Some(short);
        self.short_from_name = false;
        self
    }

    /// Use the first character of the final name as the short name.
    pub fn short_from_name(mut self) -> Self {
        self.short_from_name = true;
        self
    }

    /// Add a long alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.definition.aliases.push(alias.into());
        self
    }

    /// Add a short alias.
    pub fn short_alias(mut self, short: char) -> Self {
        self.definition.short_aliases.push(short);
        self
    }

    /// Also match the argument by position.
    pub fn position(mut self, position: usize) -> Self {
        self.definition.position = Some(position);
        self
    }

    /// The argument must be supplied.
    pub fn required(mut self) -> Self {
        self.definition.required = true;
        self
    }

    /// Text converted and bound when the argument is not supplied.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.definition.default_value = Some(value.into());
        self
    }

    /// Split each raw value on `separator`.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.definition.separator = Some(separator.into());
        self
    }

    /// Binding this argument ends parsing.
    pub fn cancel_parsing(mut self) -> Self {
        self.definition.cancel_parsing = true;
        self
    }

    /// Leave the argument out of usage output.
    pub fn hidden(mut self) -> Self {
        self.definition.hidden = true;
        self
    }

    /// Human readable description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = description.into();
        self
    }

    /// Placeholder for the value in usage output.
    pub fn value_description(mut self, value_description: impl Into<String>) -> Self {
        self.definition.value_description = Some(value_description.into());
        self
    }

    /// Add a validation rule.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.definition.validators.push(validator);
        self
    }

    /// `name` must be supplied whenever this argument is. Accepts an
    /// identifier or a final name.
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.definition.requires.push(name.into());
        self
    }

    /// `name` must not be supplied whenever this argument is.
    pub fn prohibits(mut self, name: impl Into<String>) -> Self {
        self.definition.prohibits.push(name.into());
        self
    }

    /// Store the value on the constructed destination.
    pub fn field<F>(self, set: F) -> Self
    where
        F: Fn(&mut T, K::Output) + Send + Sync + 'static,
    {
        self.try_field(move |target, value| {
            set(target, value);
            Ok(())
        })
    }

    /// Like [`field`](Self::field), with a setter that can fail.
    pub fn try_field<F>(mut self, set: F) -> Self
    where
        F: Fn(&mut T, K::Output) -> Result<(), String> + Send + Sync + 'static,
    {
        self.definition.sink = SinkKind::Member;
        self.sink = Sink::Member(member::<T, K::Output, F>(set));
        self
    }

    /// Hand the value to the schema's constructor, under the argument's name.
    pub fn parameter(mut self) -> Self {
        self.definition.sink = SinkKind::ConstructorParameter;
        self.sink = Sink::ConstructorParameter;
        self
    }

    /// Call `f` every time the argument is bound.
    pub fn invoke<R, F>(mut self, f: F) -> Self
    where
        R: IntoCompletion,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.definition.sink = SinkKind::Callback(CallbackArity::Zero);
        self.sink = Sink::Callback(callback(move |_, _| f().into_completion()));
        self
    }

    /// Call `f` with the value every time the argument is bound.
    pub fn invoke_with<R, F>(mut self, f: F) -> Self
    where
        R: IntoCompletion,
        F: Fn(&K::Output) -> R + Send + Sync + 'static,
    {
        self.definition.sink = SinkKind::Callback(CallbackArity::Value);
        self.sink = Sink::Callback(callback(move |value, _| {
            f(bound_value::<K::Output>(value)?).into_completion()
        }));
        self
    }

    /// Call `f` with the value and the parse in progress every time the
    /// argument is bound.
    pub fn invoke_with_context<R, F>(mut self, f: F) -> Self
    where
        R: IntoCompletion,
        F: Fn(&K::Output, &mut ParseContext<'_>) -> R + Send + Sync + 'static,
    {
        self.definition.sink = SinkKind::Callback(CallbackArity::ValueAndContext);
        self.sink = Sink::Callback(callback(move |value, context| {
            f(bound_value::<K::Output>(value)?, context).into_completion()
        }));
        self
    }

    /// Bind and validate the value without delivering it.
    pub fn discard(mut self) -> Self {
        self.definition.sink = SinkKind::Discard;
        self.sink = Sink::Discard;
        self
    }
}

macro_rules! impl_converter_methods {
    ($($kind:ident),*) => {$(
        impl<T: 'static, V: 'static> ArgumentBuilder<T, $kind<V>> {
            /// Convert raw values with `converter`.
            pub fn converter<F>(mut self, converter: F) -> Self
            where
                F: Fn(&str, &Locale) -> Result<V, String> + Send + Sync + 'static,
            {
                self.kind.converter = Arc::new(converter);
                self
            }

            /// Convert raw values with a plain parsing function, ignoring the locale.
            pub fn from_str_fn(mut self, parse: fn(&str) -> Result<V, String>) -> Self {
                self.kind.converter = from_str_fn(parse);
                self
            }
        }
    )*};
}

impl_converter_methods!(Scalar, Nullable, Multi);

impl<T: 'static, DK: 'static, DV: 'static> ArgumentBuilder<T, Dictionary<DK, DV>> {
    /// Split each entry into key and value on `separator` instead of `=`.
    pub fn key_value_separator(mut self, separator: impl Into<String>) -> Self {
        self.definition.key_value_separator = Some(separator.into());
        self
    }

    /// A repeated key overwrites the earlier value instead of failing.
    pub fn allow_duplicate_keys(mut self) -> Self {
        self.definition.allow_duplicate_keys = true;
        self
    }

    /// Convert keys with `converter`.
    pub fn key_converter(mut self, converter: Converter<DK>) -> Self {
        self.kind.key_converter = converter;
        self
    }

    /// Convert values with `converter`.
    pub fn value_converter(mut self, converter: Converter<DV>) -> Self {
        self.kind.value_converter = converter;
        self
    }
}

struct Pending<T> {
    identifier: String,
    explicit_name: bool,
    short_from_name: bool,
    entry: Entry<T>,
}

/// Assembles a [`Schema`] at runtime.
///
/// ```
/// use argbind::{ParseOptions, ParseOutcome, Parser, SchemaBuilder};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Jump {
///     height: u32,
///     pilot_nickname: Option<String>,
/// }
///
/// let schema = SchemaBuilder::<Jump>::new()
///     .name_transform(argbind::NameTransform::DashCase)
///     .single::<u32>("height", |a| a.required().field(|o, v| o.height = v))
///     .nullable::<String>("pilot_nickname", |a| a.field(|o, v| o.pilot_nickname = v))
///     .build();
/// let parser = Parser::new(schema, ParseOptions::default()).unwrap();
///
/// let outcome = parser.parse(&["-height", "5", "-pilot-nickname", "Wes"], 0).unwrap();
/// assert_eq!(
///     outcome,
///     ParseOutcome::Success(Jump { height: 5, pilot_nickname: Some("Wes".to_owned()) }),
/// );
/// ```
pub struct SchemaBuilder<T> {
    description: String,
    name_transform: NameTransform,
    arguments: Vec<Pending<T>>,
    requires_any: Vec<Vec<String>>,
    constructor: Constructor<T>,
}

impl<T: Default + 'static> SchemaBuilder<T> {
    /// A builder whose destination is created with `T::default()`.
    pub fn new() -> Self {
        SchemaBuilder::from_constructor(Constructor::Default(T::default))
    }
}

impl<T: Default + 'static> Default for SchemaBuilder<T> {
    fn default() -> Self {
        SchemaBuilder::new()
    }
}

impl<T: 'static> SchemaBuilder<T> {
    fn from_constructor(constructor: Constructor<T>) -> Self {
        SchemaBuilder {
            description: String::new(),
            name_transform: NameTransform::None,
            arguments: Vec::new(),
            requires_any: Vec::new(),
            constructor,
        }
    }

    /// A builder whose destination is created by `construct`, from the
    /// values of the constructor-parameter arguments.
    pub fn with_constructor<F>(construct: F) -> Self
    where
        F: Fn(&mut ConstructorArgs) -> Result<T, String> + Send + Sync + 'static,
    {
        SchemaBuilder::from_constructor(Constructor::Parameters(Arc::new(construct)))
    }

    /// Describe the destination.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Transform applied to argument identifiers (not explicit names) when
    /// the schema is built.
    pub fn name_transform(mut self, transform: NameTransform) -> Self {
        self.name_transform = transform;
        self
    }

    /// At least one of `names` must be supplied.
    pub fn requires_any<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.requires_any.push(names.iter().map(|name| name.as_ref().to_owned()).collect());
        self
    }

    /// Add an argument of any kind.
    pub fn argument<K: SlotKind>(
        mut self,
        identifier: &str,
        kind: K,
        configure: impl FnOnce(ArgumentBuilder<T, K>) -> ArgumentBuilder<T, K>,
    ) -> Self {
        let builder = configure(ArgumentBuilder::new(identifier, kind));
        let kind = builder.kind;
        self.arguments.push(Pending {
            identifier: identifier.to_owned(),
            explicit_name: builder.explicit_name,
            short_from_name: builder.short_from_name,
            entry: Entry {
                definition: builder.definition,
                factory: Arc::new(move |locale: &Locale| kind.new_slot(locale)),
                sink: builder.sink,
            },
        });
        self
    }

    /// Add a switch.
    pub fn switch(
        self,
        identifier: &str,
        configure: impl FnOnce(ArgumentBuilder<T, Switch>) -> ArgumentBuilder<T, Switch>,
    ) -> Self {
        self.argument(identifier, Switch, configure)
    }

    /// Add a single-valued argument.
    pub fn single<V: FromArgValue + 'static>(
        self,
        identifier: &str,
        configure: impl FnOnce(ArgumentBuilder<T, Scalar<V>>) -> ArgumentBuilder<T, Scalar<V>>,
    ) -> Self {
        self.argument(identifier, Scalar::default(), configure)
    }

    /// Add a single-valued argument that may be omitted or null.
    pub fn nullable<V: FromArgValue + 'static>(
        self,
        identifier: &str,
        configure: impl FnOnce(ArgumentBuilder<T, Nullable<V>>) -> ArgumentBuilder<T, Nullable<V>>,
    ) -> Self {
        self.argument(identifier, Nullable::default(), configure)
    }

    /// Add a multi-value argument.
    pub fn multi<V: FromArgValue + 'static>(
        self,
        identifier: &str,
        configure: impl FnOnce(ArgumentBuilder<T, Multi<V>>) -> ArgumentBuilder<T, Multi<V>>,
    ) -> Self {
        self.argument(identifier, Multi::default(), configure)
    }

    /// Add a multi-value argument whose elements may be null.
    pub fn multi_nullable<V: FromArgValue + 'static>(
        self,
        identifier: &str,
        configure: impl FnOnce(
            ArgumentBuilder<T, Multi<Option<V>>>,
        ) -> ArgumentBuilder<T, Multi<Option<V>>>,
    ) -> Self {
        self.argument(identifier, Multi::nullable(), configure)
    }

    /// Add a dictionary argument.
    pub fn dictionary<DK, DV>(
        self,
        identifier: &str,
        configure: impl FnOnce(
            ArgumentBuilder<T, Dictionary<DK, DV>>,
        ) -> ArgumentBuilder<T, Dictionary<DK, DV>>,
    ) -> Self
    where
        DK: FromArgValue + PartialEq + 'static,
        DV: FromArgValue + 'static,
    {
        self.argument(identifier, Dictionary::default(), configure)
    }

    /// Add a dictionary argument whose values may be null.
    pub fn dictionary_nullable<DK, DV>(
        self,
        identifier: &str,
        configure: impl FnOnce(
            ArgumentBuilder<T, Dictionary<DK, Option<DV>>>,
        ) -> ArgumentBuilder<T, Dictionary<DK, Option<DV>>>,
    ) -> Self
    where
        DK: FromArgValue + PartialEq + 'static,
        DV: FromArgValue + 'static,
    {
        self.argument(identifier, Dictionary::nullable_values(), configure)
    }

    /// Apply names and produce the schema.
    pub fn build(self) -> Schema<T> {
        let transform = self.name_transform;
        let mut arguments = self.arguments;
        for pending in &mut arguments {
            let definition = &mut pending.entry.definition;
            if !pending.explicit_name {
                definition.name = transform.apply(&pending.identifier);
            }
            if pending.short_from_name {
                definition.short_name = default_short_name(&definition.name);
            }
        }

        // Dependencies may name an argument by identifier.
        let names: Vec<(String, String)> = arguments
            .iter()
            .map(|pending| (pending.identifier.clone(), pending.entry.definition.name.clone()))
            .collect();
        let resolve = |reference: &mut String| {
            if let Some((_, name)) =
                names.iter().find(|(identifier, _)| *identifier == *reference)
            {
                reference.clone_from(name);
            }
        };
        for pending in &mut arguments {
            let definition = &mut pending.entry.definition;
            definition.requires.iter_mut().for_each(resolve);
            definition.prohibits.iter_mut().for_each(resolve);
        }
        let mut requires_any = self.requires_any;
        requires_any.iter_mut().flatten().for_each(resolve);

        tracing::debug!(
            destination = std::any::type_name::<T>(),
            arguments = arguments.len(),
            "built argument schema"
        );

        Schema {
            type_name: std::any::type_name::<T>(),
            description: self.description,
            entries: arguments.into_iter().map(|pending| pending.entry).collect(),
            requires_any,
            constructor: self.constructor,
        }
    }
}
