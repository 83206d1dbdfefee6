// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The tokenizer, matcher and binder.

use {
    crate::{
        context::ParseContext,
        convert::Locale,
        definition::{Arity, ArgumentDefinition, CallbackArity, SinkKind},
        error::{DefinitionError, ParseError},
        name::{classify, name_problem, same_name, NameTable, Resolution, Token},
        options::{DuplicatePolicy, ParseOptions, ParsingMode, HELP_NAME},
        schema::{callback, Constructor, ConstructorArgs, Entry, Schema, SchemaProvider, Sink},
        slot::{Element, SlotError, SlotKind, Switch, ValueSlot},
        validate::{check_dependencies, Candidate, CompiledValidator, Verdict},
    },
    std::{any::Any, sync::Arc},
};

/// What a completed parse produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// Every token was consumed and the destination was built.
    Success(T),
    /// An argument stopped parsing early.
    Cancelled(Cancellation),
}

impl<T> ParseOutcome<T> {
    /// The destination, if parsing wasn't cancelled.
    pub fn success(self) -> Option<T> {
        match self {
            ParseOutcome::Success(value) => Some(value),
            ParseOutcome::Cancelled(_) => None,
        }
    }

    /// Whether parsing was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ParseOutcome::Cancelled(_))
    }
}

/// Details of a cancelled parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cancellation {
    /// The argument that cancelled parsing.
    pub argument: String,
    /// Whether help should be shown.
    pub help_requested: bool,
    /// Tokens after the cancelling one, unconsumed.
    pub remaining: Vec<String>,
}

enum Flow {
    Continue,
    Cancel(usize),
}

/// Per-invocation state. Never shared between parses.
struct ParseState {
    slots: Vec<Box<dyn ValueSlot>>,
    matched: Vec<bool>,
    match_order: Vec<usize>,
    cursor: usize,
    help_requested: bool,
}

/// Parses token lists into `T`.
///
/// A parser is built once per destination type and is immutable afterwards;
/// it can be shared between threads and used for any number of parses.
pub struct Parser<T> {
    schema: Schema<T>,
    options: ParseOptions,
    names: NameTable,
    argument_names: Vec<String>,
    validators: Vec<Vec<CompiledValidator>>,
    positionals: Vec<usize>,
}

fn help_entry<T>(options: &ParseOptions, taken_shorts: &[char]) -> Entry<T> {
    let mut definition = ArgumentDefinition::new(HELP_NAME, Arity::Switch, Switch::descriptor());
    match options.mode {
        ParsingMode::Default => definition.aliases.push("?".to_owned()),
        ParsingMode::LongShort => {
            definition.short_name = Some('?');
            if !taken_shorts.contains(&'h') {
                definition.short_aliases.push('h');
            }
        }
    }
    definition.cancel_parsing = true;
    definition.description = "Show help information".to_owned();
    definition.sink = SinkKind::Callback(CallbackArity::Zero);
    Entry {
        definition,
        factory: Arc::new(|locale: &Locale| Switch.new_slot(locale)),
        sink: Sink::Callback(callback(|_, context| {
            context.request_help();
            Ok(false)
        })),
    }
}

impl<T> Parser<T> {
    /// Check the schema's invariants and prepare it for parsing.
    pub fn new(
        provider: impl SchemaProvider<T>,
        options: ParseOptions,
    ) -> Result<Self, DefinitionError> {
        let mut schema = provider.schema();

        for definition in schema.definitions() {
            for name in definition.long_names() {
                if let Some(reason) = name_problem(name, &options) {
                    return Err(DefinitionError::InvalidName { name: name.to_owned(), reason });
                }
                if options
                    .reserved_names
                    .iter()
                    .any(|reserved| same_name(reserved, name, &options))
                {
                    return Err(DefinitionError::ReservedName { name: name.to_owned() });
                }
            }
        }

        if options.auto_help_argument {
            let shorts: Vec<char> = schema.definitions().flat_map(|d| d.short_names()).collect();
            schema.entries.push(help_entry(&options, &shorts));
        }

        let definitions: Vec<&ArgumentDefinition> = schema.definitions().collect();
        check_unique_names(&definitions, &options)?;
        let positionals = check_positionals(&definitions)?;

        let mut validators = Vec::with_capacity(definitions.len());
        for (entry, definition) in schema.entries.iter().zip(&definitions) {
            if definition.required && definition.default_value.is_some() {
                return Err(DefinitionError::RequiredWithDefault { name: definition.name.clone() });
            }
            if matches!(definition.sink, SinkKind::Callback(_))
                && definition.arity.is_collection()
            {
                return Err(DefinitionError::CallbackOnCollection { name: definition.name.clone() });
            }
            if let Some(default) = &definition.default_value {
                if definition.arity.is_collection() {
                    tracing::warn!(
                        argument = %definition.name,
                        "default values are ignored for multi-value and dictionary arguments"
                    );
                } else {
                    let mut slot = (entry.factory)(&options.locale);
                    convert_default(&mut *slot, definition, default, &options).map_err(|message| {
                        DefinitionError::InvalidDefault {
                            name: definition.name.clone(),
                            value: default.clone(),
                            message,
                        }
                    })?;
                }
            }
            for dependency in definition.requires.iter().chain(&definition.prohibits) {
                if !definitions.iter().any(|d| d.name == *dependency) {
                    return Err(DefinitionError::UnknownDependency {
                        name: definition.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            validators.push(
                definition
                    .validators
                    .iter()
                    .map(|validator| CompiledValidator::compile(definition, validator))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
        for (group, members) in schema.requires_any.iter().enumerate() {
            if let Some(dependency) =
                members.iter().find(|member| !definitions.iter().any(|d| d.name == **member))
            {
                return Err(DefinitionError::UnknownGroupMember {
                    group,
                    dependency: dependency.clone(),
                });
            }
        }

        let names = NameTable::new(&definitions, &options);
        let argument_names = definitions.iter().map(|d| d.name.clone()).collect();
        tracing::debug!(
            destination = schema.type_name,
            arguments = definitions.len(),
            mode = ?options.mode,
            "built parser"
        );

        Ok(Parser { schema, options, names, argument_names, validators, positionals })
    }

    /// The schema being parsed into, including the built-in help switch.
    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    /// Every argument definition, including the built-in help switch.
    pub fn definitions(&self) -> impl Iterator<Item = &ArgumentDefinition> {
        self.schema.definitions()
    }

    /// The options this parser was built with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse the process arguments, skipping the program name.
    ///
    /// Arguments that aren't valid Unicode are converted lossily.
    pub fn parse_env(&self) -> Result<ParseOutcome<T>, ParseError> {
        let args: Vec<String> =
            std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()).collect();
        self.parse(&args, 1)
    }

    /// Parse `args`, starting at `start`.
    pub fn parse<S: AsRef<str>>(
        &self,
        args: &[S],
        start: usize,
    ) -> Result<ParseOutcome<T>, ParseError> {
        let args: Vec<&str> = args.iter().skip(start).map(AsRef::as_ref).collect();
        tracing::debug!(
            destination = self.schema.type_name,
            tokens = args.len(),
            "parsing arguments"
        );

        let count = self.schema.entries.len();
        let mut state = ParseState {
            slots: self
                .schema
                .entries
                .iter()
                .map(|entry| (entry.factory)(&self.options.locale))
                .collect(),
            matched: vec![false; count],
            match_order: Vec::new(),
            cursor: 0,
            help_requested: false,
        };

        let mut index = 0;
        let mut named_done = false;
        while index < args.len() {
            let token = args[index];
            index += 1;
            tracing::trace!(token, "matching token");

            if self.options.prefix_termination && !named_done && token == "--" {
                named_done = true;
                continue;
            }

            let flow = if named_done {
                self.bind_positional(token, &mut state)?
            } else {
                self.consume(token, &args, &mut index, &mut state)?
            };

            if let Flow::Cancel(cancelled) = flow {
                let argument = self.argument_names[cancelled].clone();
                tracing::debug!(
                    %argument,
                    help_requested = state.help_requested,
                    "parsing cancelled"
                );
                return Ok(ParseOutcome::Cancelled(Cancellation {
                    argument,
                    help_requested: state.help_requested,
                    remaining: args[index..].iter().map(|arg| (*arg).to_owned()).collect(),
                }));
            }
        }

        self.check_post_scan(&state)?;
        let value = self.bind(state)?;
        tracing::debug!(destination = self.schema.type_name, "parsed arguments");
        Ok(ParseOutcome::Success(value))
    }

    fn definition(&self, index: usize) -> &ArgumentDefinition {
        &self.schema.entries[index].definition
    }

    fn consume<'a>(
        &self,
        token: &'a str,
        args: &[&'a str],
        index: &mut usize,
        state: &mut ParseState,
    ) -> Result<Flow, ParseError> {
        match classify(token, &self.options) {
            Token::Value => self.bind_positional(token, state),
            Token::Long { name, value } => match self.names.resolve_long(name) {
                Resolution::Exact(found) | Resolution::Abbreviated(found) => {
                    self.bind_named(found, value, args, index, state)
                }
                Resolution::Ambiguous(candidates) => Err(ParseError::AmbiguousName {
                    name: name.to_owned(),
                    candidates: candidates
                        .into_iter()
                        .map(|c| self.argument_names[c].clone())
                        .collect(),
                }),
                Resolution::Unknown => self.unknown(token, name, state),
            },
            Token::Short { names, value } => {
                let mut chars = names.chars();
                match (chars.next(), chars.next()) {
                    (Some(short), None) => match self.names.resolve_short(short) {
                        Some(found) => self.bind_named(found, value, args, index, state),
                        None => self.unknown(token, names, state),
                    },
                    _ => self.bind_combined(token, names, value, state),
                }
            }
        }
    }

    fn unknown(&self, token: &str, name: &str, state: &mut ParseState) -> Result<Flow, ParseError> {
        if looks_like_number(token) && self.open_positional(state).is_some() {
            return self.bind_positional(token, state);
        }
        Err(ParseError::UnknownArgument {
            name: name.to_owned(),
            suggestion: self.names.suggest(name, |index| !self.definition(index).hidden),
        })
    }

    /// `-abc`: every character must be a switch.
    fn bind_combined(
        &self,
        token: &str,
        names: &str,
        value: Option<&str>,
        state: &mut ParseState,
    ) -> Result<Flow, ParseError> {
        debug_assert_eq!(self.names.mode(), ParsingMode::LongShort);
        if looks_like_number(token) && self.open_positional(state).is_some() {
            return self.bind_positional(token, state);
        }
        let mut found = Vec::new();
        for short in names.chars() {
            match self.names.resolve_short(short) {
                Some(index) if self.definition(index).arity == Arity::Switch => found.push(index),
                Some(_) => {
                    return Err(ParseError::CombinedShortNameNonSwitch {
                        token: names.to_owned(),
                        short,
                    });
                }
                None => {
                    return Err(ParseError::UnknownArgument {
                        name: short.to_string(),
                        suggestion: None,
                    });
                }
            }
        }
        for index in found {
            if let Flow::Cancel(index) = self.bind_value(index, value.unwrap_or("true"), state)? {
                return Ok(Flow::Cancel(index));
            }
        }
        Ok(Flow::Continue)
    }

    fn bind_named<'a>(
        &self,
        found: usize,
        inline: Option<&'a str>,
        args: &[&'a str],
        index: &mut usize,
        state: &mut ParseState,
    ) -> Result<Flow, ParseError> {
        let definition = self.definition(found);
        let raw = match (definition.arity, inline) {
            (_, Some(value)) => value,
            (Arity::Switch, None) => "true",
            (_, None) if self.options.allow_whitespace_separator && *index < args.len() => {
                *index += 1;
                args[*index - 1]
            }
            (_, None) => {
                return Err(ParseError::MissingNamedArgumentValue { name: definition.name.clone() });
            }
        };
        self.bind_value(found, raw, state)
    }

    /// The next positional slot that can take a value, and the cursor
    /// position it sits at.
    fn open_positional(&self, state: &ParseState) -> Option<(usize, usize)> {
        let mut cursor = state.cursor;
        while let Some(&index) = self.positionals.get(cursor) {
            if self.definition(index).arity.is_collection() || !state.slots[index].is_bound() {
                return Some((cursor, index));
            }
            cursor += 1;
        }
        None
    }

    fn bind_positional(&self, token: &str, state: &mut ParseState) -> Result<Flow, ParseError> {
        let Some((cursor, index)) = self.open_positional(state) else {
            return Err(ParseError::TooManyArguments { value: token.to_owned() });
        };
        state.cursor =
            if self.definition(index).arity.is_collection() { cursor } else { cursor + 1 };
        self.bind_value(index, token, state)
    }

    fn bind_value(
        &self,
        index: usize,
        raw: &str,
        state: &mut ParseState,
    ) -> Result<Flow, ParseError> {
        let entry = &self.schema.entries[index];
        let definition = &entry.definition;

        if state.matched[index] && !definition.arity.is_collection() {
            match self.options.duplicates {
                DuplicatePolicy::Error => {
                    return Err(ParseError::DuplicateArgument {
                        name: definition.name.clone(),
                        key: None,
                    });
                }
                DuplicatePolicy::Warn => tracing::warn!(
                    argument = %definition.name,
                    "argument supplied more than once; the last value is used"
                ),
                DuplicatePolicy::Allow => {}
            }
        }
        if !state.matched[index] {
            state.matched[index] = true;
            state.match_order.push(index);
        }

        match definition.separator.as_deref() {
            Some(separator) if definition.arity.is_collection() && !separator.is_empty() => {
                for piece in raw.split(separator) {
                    self.bind_element(index, piece, state)?;
                }
            }
            _ => self.bind_element(index, raw, state)?,
        }

        if let Sink::Callback(callback) = &entry.sink {
            let value = state.slots[index].current();
            let mut context = ParseContext {
                names: &self.argument_names,
                slots: &state.slots,
                help_requested: &mut state.help_requested,
            };
            let proceed = callback(value, &mut context).map_err(|message| {
                ParseError::ArgumentValueError { name: definition.name.clone(), message }
            })?;
            if !proceed {
                return Ok(Flow::Cancel(index));
            }
        }

        if definition.cancel_parsing { Ok(Flow::Cancel(index)) } else { Ok(Flow::Continue) }
    }

    fn bind_element(
        &self,
        index: usize,
        piece: &str,
        state: &mut ParseState,
    ) -> Result<(), ParseError> {
        let definition = self.definition(index);
        let name = || definition.name.clone();

        let (element, shown) = if definition.arity == Arity::Dictionary {
            let separator = definition.key_value_separator();
            let Some((key, value)) = piece.split_once(separator) else {
                return Err(ParseError::ConversionFailed {
                    name: name(),
                    value: piece.to_owned(),
                    message: format!("expected an entry of the form 'key{}value'", separator),
                });
            };
            if self.options.is_null(key) {
                return Err(ParseError::NullArgumentValue { name: name() });
            }
            if !self.options.is_null(value) {
                (Element::Entry { key, value: Some(value) }, Some(value))
            } else if definition.allow_null {
                (Element::Entry { key, value: None }, None)
            } else {
                return Err(ParseError::NullArgumentValue { name: name() });
            }
        } else if self.options.is_null(piece) {
            if !definition.allow_null {
                return Err(ParseError::NullArgumentValue { name: name() });
            }
            (Element::Null, None)
        } else {
            (Element::Value(piece), Some(piece))
        };

        let accepted = state.slots[index].accept(element, definition.allow_duplicate_keys).map_err(
            |err| match err {
                SlotError::Conversion(message) => {
                    ParseError::ConversionFailed { name: name(), value: piece.to_owned(), message }
                }
                SlotError::Null => ParseError::NullArgumentValue { name: name() },
                SlotError::DuplicateKey(key) => {
                    ParseError::DuplicateArgument { name: name(), key: Some(key) }
                }
                SlotError::Shape => ParseError::ConversionFailed {
                    name: name(),
                    value: piece.to_owned(),
                    message: "value has the wrong shape for this argument".to_owned(),
                },
            },
        )?;

        let candidate = Candidate { raw: shown, numeric: accepted.numeric };
        for (validator, compiled) in definition.validators.iter().zip(&self.validators[index]) {
            match compiled.check(&candidate) {
                Verdict::Pass => {}
                Verdict::Fail => {
                    return Err(ParseError::ValidationFailed {
                        name: name(),
                        rule: validator.to_string(),
                        value: piece.to_owned(),
                    });
                }
                Verdict::Broken(message) => {
                    return Err(ParseError::ArgumentValueError { name: name(), message });
                }
            }
        }
        Ok(())
    }

    fn check_post_scan(&self, state: &ParseState) -> Result<(), ParseError> {
        let definitions: Vec<&ArgumentDefinition> = self.schema.definitions().collect();

        if let Some(missing) = definitions
            .iter()
            .zip(&state.slots)
            .find(|(definition, slot)| definition.required && !slot.is_bound())
        {
            return Err(ParseError::MissingRequiredArgument { name: missing.0.name.clone() });
        }

        let is_bound = |name: &str| {
            self.argument_names
                .iter()
                .position(|candidate| candidate == name)
                .is_some_and(|i| state.slots[i].is_bound())
        };
        check_dependencies(&definitions, &self.schema.requires_any, is_bound)?;

        for ((definition, compiled), slot) in
            definitions.iter().zip(&self.validators).zip(&state.slots)
        {
            for (validator, compiled) in definition.validators.iter().zip(compiled) {
                if !compiled.check_count(slot.len()) {
                    return Err(ParseError::ValidationFailed {
                        name: definition.name.clone(),
                        rule: validator.to_string(),
                        value: slot.len().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Construct the destination and deliver values: constructor parameters
    /// first, then members in match order, then defaulted members in
    /// definition order.
    fn bind(&self, mut state: ParseState) -> Result<T, ParseError> {
        let mut values: Vec<Option<Box<dyn Any>>> =
            state.slots.iter_mut().map(|slot| slot.take()).collect();
        let mut defaulted = Vec::new();
        for (index, entry) in self.schema.entries.iter().enumerate() {
            let definition = &entry.definition;
            let Some(default) = &definition.default_value else { continue };
            if values[index].is_some() || definition.arity.is_collection() {
                continue;
            }
            let mut slot = (entry.factory)(&self.options.locale);
            convert_default(&mut *slot, definition, default, &self.options).map_err(|message| {
                ParseError::ConversionFailed {
                    name: definition.name.clone(),
                    value: default.clone(),
                    message,
                }
            })?;
            values[index] = slot.take();
            defaulted.push(index);
        }

        let mut parameters = ConstructorArgs::default();
        for (index, entry) in self.schema.entries.iter().enumerate() {
            if matches!(entry.sink, Sink::ConstructorParameter) {
                if let Some(value) = values[index].take() {
                    parameters.insert(&entry.definition.name, value);
                }
            }
        }

        let mut target = match &self.schema.constructor {
            Constructor::Default(construct) => construct(),
            Constructor::Parameters(construct) => construct(&mut parameters).map_err(|message| {
                ParseError::ArgumentValueError { name: self.schema.type_name.to_owned(), message }
            })?,
        };

        for index in state.match_order.iter().chain(&defaulted).copied() {
            let entry = &self.schema.entries[index];
            if let (Sink::Member(set), Some(value)) = (&entry.sink, values[index].take()) {
                set(&mut target, value).map_err(|message| ParseError::ArgumentValueError {
                    name: entry.definition.name.clone(),
                    message,
                })?;
            }
        }
        Ok(target)
    }
}

/// `-5`, `-1.5e3` or `-.5`, but not `-inf` or `-NaN`.
fn looks_like_number(token: &str) -> bool {
    let unsigned = token.trim_start_matches(['-', '+']);
    unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') && token.parse::<f64>().is_ok()
}

fn convert_default(
    slot: &mut dyn ValueSlot,
    definition: &ArgumentDefinition,
    default: &str,
    options: &ParseOptions,
) -> Result<(), String> {
    let element = if options.is_null(default) && definition.allow_null {
        Element::Null
    } else {
        Element::Value(default)
    };
    slot.accept(element, false).map(drop).map_err(|err| match err {
        SlotError::Conversion(message) => message,
        SlotError::Null => "null is not allowed".to_owned(),
        SlotError::DuplicateKey(_) | SlotError::Shape => "not a single value".to_owned(),
    })
}

fn check_unique_names(
    definitions: &[&ArgumentDefinition],
    options: &ParseOptions,
) -> Result<(), DefinitionError> {
    let mut seen: Vec<&str> = Vec::new();
    for name in definitions.iter().flat_map(|d| d.long_names()) {
        if seen.iter().any(|other| same_name(other, name, options)) {
            return Err(DefinitionError::DuplicateName { name: name.to_owned() });
        }
        seen.push(name);
    }
    if options.mode == ParsingMode::LongShort {
        let mut seen: Vec<char> = Vec::new();
        for short in definitions.iter().flat_map(|d| d.short_names()) {
            if seen.contains(&short) {
                return Err(DefinitionError::DuplicateShortName { short });
            }
            seen.push(short);
        }
    }
    Ok(())
}

/// Positional entries ordered by position.
fn check_positionals(definitions: &[&ArgumentDefinition]) -> Result<Vec<usize>, DefinitionError> {
    let mut positionals: Vec<(usize, usize)> = definitions
        .iter()
        .enumerate()
        .filter_map(|(index, d)| d.position.map(|position| (position, index)))
        .collect();
    positionals.sort();

    let mut optional_seen = false;
    for (expected, &(position, index)) in positionals.iter().enumerate() {
        let definition = definitions[index];
        if position != expected {
            return Err(DefinitionError::PositionalGap {
                name: definition.name.clone(),
                position,
                expected,
            });
        }
        if definition.arity.is_collection() && expected + 1 != positionals.len() {
            return Err(DefinitionError::CollectionPositionalNotLast {
                name: definition.name.clone(),
            });
        }
        if definition.required && optional_seen {
            return Err(DefinitionError::RequiredAfterOptional { name: definition.name.clone() });
        }
        optional_seen |= !definition.required;
    }
    Ok(positionals.into_iter().map(|(_, index)| index).collect())
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            error::{DependencyKind, ErrorCategory},
            schema::SchemaBuilder,
            validate::Validator,
        },
    };

    #[derive(Default, Debug, PartialEq)]
    struct Opts {
        name: String,
        count: u32,
        verbose: bool,
        values: Vec<String>,
        nick: Option<String>,
        pairs: Vec<(String, i32)>,
    }

    fn builder() -> SchemaBuilder<Opts> {
        SchemaBuilder::<Opts>::new()
            .single::<String>("name", |a| a.position(0).field(|o, v| o.name = v))
            .single::<u32>("count", |a| a.short('c').default_value("1").field(|o, v| o.count = v))
            .switch("verbose", |a| a.short('v').field(|o, v| o.verbose = v))
            .multi::<String>("values", |a| a.short('x').field(|o, v| o.values = v))
            .nullable::<String>("nick", |a| a.field(|o, v| o.nick = v))
            .dictionary::<String, i32>("pairs", |a| a.field(|o, v| o.pairs = v))
    }

    fn parse(options: ParseOptions, args: &[&str]) -> Result<ParseOutcome<Opts>, ParseError> {
        Parser::new(builder(), options).unwrap().parse(args, 0)
    }

    fn success(args: &[&str]) -> Opts {
        parse(ParseOptions::default(), args).unwrap().success().unwrap()
    }

    fn error(args: &[&str]) -> ParseError {
        parse(ParseOptions::default(), args).unwrap_err()
    }

    #[test]
    fn parser_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser<Opts>>();
    }

    #[test]
    fn inline_and_separate_values_agree() {
        assert_eq!(success(&["-count:5"]), success(&["-count", "5"]));
        assert_eq!(success(&["-count=5"]).count, 5);
    }

    #[test]
    fn defaults_apply_to_unbound_members() {
        let opts = success(&["bob"]);
        assert_eq!(opts.name, "bob");
        assert_eq!(opts.count, 1);
        assert!(!opts.verbose);
    }

    #[test]
    fn switches_take_inline_booleans() {
        assert!(success(&["-verbose"]).verbose);
        assert!(!success(&["-verbose:false"]).verbose);
        assert!(success(&["-verbose:TRUE", "n"]).verbose);
        assert_eq!(success(&["-verbose", "n"]).name, "n");
    }

    #[test]
    fn multi_values_keep_order() {
        let values = success(&["-values", "a", "-values", "b", "-values", "c"]).values;
        assert_eq!(values, ["a", "b", "c"]);
    }

    #[test]
    fn dictionary_merges_entries() {
        let opts = success(&["-pairs", "a=1", "-pairs", "b=2"]);
        assert_eq!(opts.pairs, [("a".to_owned(), 1), ("b".to_owned(), 2)]);
        assert_eq!(
            error(&["-pairs", "a=1", "-pairs", "a=2"]),
            ParseError::DuplicateArgument { name: "pairs".to_owned(), key: Some("a".to_owned()) }
        );
        assert_eq!(error(&["-pairs", "a"]).category(), ErrorCategory::ConversionFailed);
    }

    #[test]
    fn null_sentinel() {
        assert_eq!(success(&["-nick", "(null)"]).nick, None);
        assert_eq!(success(&["-nick", "x"]).nick.as_deref(), Some("x"));
        let null = |name: &str| ParseError::NullArgumentValue { name: name.to_owned() };
        assert_eq!(error(&["-count", "(null)"]), null("count"));
        assert_eq!(error(&["-pairs", "(null)=1"]), null("pairs"));
    }

    #[test]
    fn duplicate_policy() {
        assert_eq!(
            error(&["-count", "1", "-count", "2"]),
            ParseError::DuplicateArgument { name: "count".to_owned(), key: None }
        );
        let options = ParseOptions { duplicates: DuplicatePolicy::Allow, ..Default::default() };
        let opts = parse(options, &["-count", "1", "-count", "2"]).unwrap().success().unwrap();
        assert_eq!(opts.count, 2);
    }

    #[test]
    fn unknown_and_missing_values() {
        assert_eq!(
            error(&["-vrebose"]),
            ParseError::UnknownArgument {
                name: "vrebose".to_owned(),
                suggestion: Some("verbose".to_owned()),
            }
        );
        assert_eq!(
            error(&["-count"]),
            ParseError::MissingNamedArgumentValue { name: "count".to_owned() }
        );
        assert_eq!(error(&["a", "b"]), ParseError::TooManyArguments { value: "b".to_owned() });
        assert_eq!(success(&["-5"]).name, "-5");
        assert_eq!(success(&["-.5"]).name, "-.5");
    }

    #[test]
    fn special_floats_are_not_numbers() {
        for token in ["-inf", "-NaN", "-infinity"] {
            assert_eq!(error(&[token]).category(), ErrorCategory::UnknownArgument, "{}", token);
        }
        assert!(looks_like_number("-1e3"));
        assert!(!looks_like_number("--5"));
    }

    #[test]
    fn whitespace_separator_can_be_disabled() {
        let options = ParseOptions { allow_whitespace_separator: false, ..Default::default() };
        assert_eq!(
            parse(options, &["-count", "5"]).unwrap_err(),
            ParseError::MissingNamedArgumentValue { name: "count".to_owned() }
        );
    }

    #[test]
    fn abbreviations() {
        assert!(success(&["-verb"]).verbose);
        assert_eq!(success(&["-cou", "3"]).count, 3);
        let options = ParseOptions { auto_prefix_aliases: false, ..Default::default() };
        let category = parse(options, &["-verb"]).unwrap_err().category();
        assert_eq!(category, ErrorCategory::UnknownArgument);
    }

    #[test]
    fn long_short_mode() {
        let opts = parse(ParseOptions::long_short(), &["--count=4", "-v", "-x", "a"])
            .unwrap()
            .success()
            .unwrap();
        assert_eq!(opts.count, 4);
        assert!(opts.verbose);
        assert_eq!(opts.values, ["a"]);
    }

    #[test]
    fn combined_short_switches() {
        let schema = SchemaBuilder::<(bool, bool)>::new()
            .switch("a", |a| a.short('a').field(|o, v| o.0 = v))
            .switch("b", |a| a.short('b').field(|o, v| o.1 = v))
            .single::<u32>("n", |a| a.short('n'));
        let parser = Parser::new(schema, ParseOptions::long_short()).unwrap();
        assert_eq!(parser.parse(&["-ab"], 0).unwrap(), ParseOutcome::Success((true, true)));
        assert_eq!(
            parser.parse(&["-an"], 0).unwrap_err(),
            ParseError::CombinedShortNameNonSwitch { token: "an".to_owned(), short: 'n' }
        );
    }

    #[test]
    fn help_cancels() {
        let outcome = parse(ParseOptions::default(), &["-count", "x1", "-?", "rest"]);
        assert_eq!(outcome.unwrap_err().category(), ErrorCategory::ConversionFailed);

        let outcome = parse(ParseOptions::default(), &["-?", "rest"]).unwrap();
        assert_eq!(
            outcome,
            ParseOutcome::Cancelled(Cancellation {
                argument: "help".to_owned(),
                help_requested: true,
                remaining: vec!["rest".to_owned()],
            })
        );

        let outcome = parse(ParseOptions::long_short(), &["-h"]).unwrap();
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn prefix_termination() {
        let options = ParseOptions { prefix_termination: true, ..Default::default() };
        let opts = parse(options, &["--", "-verbose"]).unwrap().success().unwrap();
        assert_eq!(opts.name, "-verbose");
    }

    #[test]
    fn start_offset_skips_tokens() {
        let parser = Parser::new(builder(), ParseOptions::default()).unwrap();
        let opts = parser.parse(&["program", "bob"], 1).unwrap().success().unwrap();
        assert_eq!(opts.name, "bob");
    }

    #[test]
    fn post_scan_order() {
        #[derive(Default, Debug, PartialEq)]
        struct Deps;
        let schema = SchemaBuilder::<Deps>::new()
            .single::<String>("a", |a| a.requires("b").prohibits("c"))
            .single::<String>("b", |a| a)
            .single::<String>("c", |a| a)
            .single::<String>("r", |a| a.required());
        let parser = Parser::new(schema, ParseOptions::default()).unwrap();

        assert_eq!(
            parser.parse(&["-a", "1"], 0).unwrap_err(),
            ParseError::MissingRequiredArgument { name: "r".to_owned() }
        );
        assert_eq!(
            parser.parse(&["-a", "1", "-r", "x"], 0).unwrap_err(),
            ParseError::DependencyNotMet {
                name: Some("a".to_owned()),
                kind: DependencyKind::Requires,
                related: vec!["b".to_owned()],
            }
        );
        assert!(parser.parse(&["-r", "x"], 0).is_ok());
    }

    #[test]
    fn validators_run_per_bind() {
        let range = Validator::Range { min: Some(1.0), max: Some(5.0) };
        let schema = builder().single::<u8>("level", |a| a.validate(range));
        let parser = Parser::new(schema, ParseOptions::default()).unwrap();
        assert!(parser.parse(&["-level", "3"], 0).is_ok());
        assert_eq!(
            parser.parse(&["-level", "9"], 0).unwrap_err(),
            ParseError::ValidationFailed {
                name: "level".to_owned(),
                rule: "value must be between 1 and 5".to_owned(),
                value: "9".to_owned(),
            }
        );
    }

    #[test]
    fn definition_errors() {
        let err = |schema: SchemaBuilder<Opts>| Parser::new(schema, ParseOptions::default()).err();
        assert_eq!(
            err(builder().single::<u32>("Count", |a| a)),
            Some(DefinitionError::DuplicateName { name: "Count".to_owned() })
        );
        assert_eq!(
            err(builder().switch("help", |a| a)),
            Some(DefinitionError::ReservedName { name: "help".to_owned() })
        );
        assert_eq!(
            err(builder().single::<u32>("x", |a| a.position(2))),
            Some(DefinitionError::PositionalGap { name: "x".to_owned(), position: 2, expected: 1 })
        );
        assert!(matches!(
            err(builder().single::<u32>("x", |a| a.default_value("nope"))),
            Some(DefinitionError::InvalidDefault { .. })
        ));
        assert!(matches!(
            err(builder().single::<u32>("x", |a| a.requires("missing"))),
            Some(DefinitionError::UnknownDependency { .. })
        ));
        assert_eq!(
            err(builder().multi::<u32>("x", |a| a.invoke(|| ()))),
            Some(DefinitionError::CallbackOnCollection { name: "x".to_owned() })
        );
    }
}
