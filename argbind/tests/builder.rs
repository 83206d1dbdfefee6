// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use {
    argbind::{
        ConstructorArgs, DefinitionError, DuplicatePolicy, Locale, ParseContext, ParseError,
        ParseOptions, ParseOutcome, Parser, SchemaBuilder, Validator,
    },
    std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

#[derive(Default, Debug, PartialEq)]
struct Empty;

#[test]
fn members_are_set_in_match_order_then_defaults() {
    #[derive(Default, Debug)]
    struct Log {
        order: Vec<&'static str>,
    }

    let schema = SchemaBuilder::<Log>::new()
        .single::<u32>("a", |a| a.default_value("1").field(|o, _| o.order.push("a")))
        .single::<u32>("b", |a| a.field(|o, _| o.order.push("b")))
        .single::<u32>("c", |a| a.field(|o, _| o.order.push("c")));
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    let log = parser.parse(&["-c", "1", "-b", "2"], 0).unwrap().success().unwrap();
    assert_eq!(log.order, ["c", "b", "a"]);
}

#[test]
fn failing_setters_are_reported() {
    #[derive(Default, Debug)]
    struct Target {
        path: String,
    }

    let schema = SchemaBuilder::<Target>::new().single::<String>("path", |a| {
        a.try_field(|o, v| {
            if v.is_empty() {
                return Err("empty path".to_owned());
            }
            o.path = v;
            Ok(())
        })
    });
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    assert_eq!(parser.parse(&["-path", "/tmp"], 0).unwrap().success().unwrap().path, "/tmp");
    assert_eq!(
        parser.parse(&["-path", ""], 0).unwrap_err(),
        ParseError::ArgumentValueError { name: "path".to_owned(), message: "empty path".to_owned() }
    );
}

#[test]
fn constructor_parameters() {
    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
        label: Option<String>,
    }

    let schema = SchemaBuilder::<Point>::with_constructor(|args: &mut ConstructorArgs| {
        let x: i32 = args.take_required("x")?;
        if x > 100 {
            return Err("x is out of bounds".to_owned());
        }
        Ok(Point { x, y: args.take_required("y")?, label: None })
    })
    .single::<i32>("x", |a| a.position(0).required().parameter())
    .single::<i32>("y", |a| a.position(1).default_value("0").parameter())
    .nullable::<String>("label", |a| a.field(|p, v| p.label = v));
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    assert_eq!(
        parser.parse(&["3", "-4"], 0).unwrap(),
        ParseOutcome::Success(Point { x: 3, y: -4, label: None })
    );
    assert_eq!(
        parser.parse(&["3", "-label", "p"], 0).unwrap(),
        ParseOutcome::Success(Point { x: 3, y: 0, label: Some("p".to_owned()) })
    );
    match parser.parse(&["101"], 0) {
        Err(ParseError::ArgumentValueError { message, .. }) => {
            assert_eq!(message, "x is out of bounds")
        }
        other => panic!("expected a constructor failure, got {:?}", other),
    }
}

#[test]
fn callbacks_run_as_values_bind() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (tick_counter, seen_values) = (ticks.clone(), seen.clone());

    let schema = SchemaBuilder::<Empty>::new()
        .switch("tick", |a| {
            a.invoke(move || {
                tick_counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .single::<u32>("n", |a| a.invoke_with(move |n: &u32| seen_values.lock().unwrap().push(*n)));
    let options = ParseOptions { duplicates: DuplicatePolicy::Allow, ..Default::default() };
    let parser = Parser::new(schema, options).unwrap();

    let outcome = parser.parse(&["-tick", "-n", "1", "-tick", "-n", "2"], 0).unwrap();
    assert_eq!(outcome, ParseOutcome::Success(Empty));
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), [1, 2]);
}

#[test]
fn callbacks_see_the_parse_so_far() {
    let schema = SchemaBuilder::<Empty>::new()
        .single::<String>("mode", |a| a)
        .switch("explain", |a| {
            a.invoke_with_context(|_, context: &mut ParseContext<'_>| {
                if context.value::<String>("mode").map(String::as_str) == Some("strict") {
                    return Err("strict mode cannot explain".to_owned());
                }
                Ok(true)
            })
        });
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    assert_eq!(
        parser.parse(&["-mode", "strict", "-explain"], 0).unwrap_err(),
        ParseError::ArgumentValueError {
            name: "explain".to_owned(),
            message: "strict mode cannot explain".to_owned(),
        }
    );
    assert!(parser.parse(&["-explain", "-mode", "strict"], 0).is_ok());
}

#[test]
fn callbacks_can_request_help_and_cancel() {
    let schema = SchemaBuilder::<Empty>::new().single::<u32>("n", |a| a).switch("usage", |a| {
        a.invoke_with_context(|_, context: &mut ParseContext<'_>| {
            assert!(context.is_bound("n"));
            assert!(!context.help_requested());
            context.request_help();
            false
        })
    });
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    match parser.parse(&["-n", "1", "-usage", "more"], 0).unwrap() {
        ParseOutcome::Cancelled(cancellation) => {
            assert_eq!(cancellation.argument, "usage");
            assert!(cancellation.help_requested);
            assert_eq!(cancellation.remaining, ["more"]);
        }
        ParseOutcome::Success(_) => panic!("expected parsing to be cancelled"),
    }
}

#[test]
fn discarded_values_are_still_validated() {
    let schema = SchemaBuilder::<Empty>::new()
        .single::<u32>("ignored", |a| a.validate(Validator::Range { min: None, max: Some(5.0) }));
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();

    assert!(parser.parse(&["-ignored", "3"], 0).is_ok());
    assert_eq!(
        parser.parse(&["-ignored", "9"], 0).unwrap_err(),
        ParseError::ValidationFailed {
            name: "ignored".to_owned(),
            rule: "value must be at most 5".to_owned(),
            value: "9".to_owned(),
        }
    );
}

#[test]
fn converters() {
    #[derive(Default, Debug)]
    struct Settings {
        ratio: f64,
        mask: u32,
        weights: Vec<(String, u32)>,
    }

    let schema = SchemaBuilder::<Settings>::new()
        .single::<f64>("ratio", |a| a.field(|o, v| o.ratio = v))
        .single::<u32>("mask", |a| {
            a.converter(|raw: &str, _: &Locale| {
                u32::from_str_radix(raw.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
            })
            .field(|o, v| o.mask = v)
        })
        .dictionary::<String, u32>("weight", |a| {
            a.key_converter(Arc::new(|raw: &str, _: &Locale| Ok::<_, String>(raw.to_uppercase())))
                .allow_duplicate_keys()
                .field(|o, v| o.weights = v)
        });
    let options =
        ParseOptions { locale: Locale::new("de-DE", ',', Some('.')), ..Default::default() };
    let parser = Parser::new(schema, options).unwrap();

    let args = ["-ratio", "1.234,5", "-mask", "0xff"];
    let weights = ["-weight", "a=1", "-weight", "b=2", "-weight", "A=3"];
    let settings = parser
        .parse(&[&args[..], &weights[..]].concat(), 0)
        .unwrap()
        .success()
        .unwrap();
    assert_eq!(settings.ratio, 1234.5);
    assert_eq!(settings.mask, 255);
    assert_eq!(settings.weights, [("A".to_owned(), 3), ("B".to_owned(), 2)]);
}

#[test]
fn locale_decides_how_numbers_read() {
    let schema = SchemaBuilder::<Vec<f64>>::new().multi::<f64>("x", |a| a.field(|o, v| *o = v));
    let options =
        ParseOptions { locale: Locale::new("de-DE", ',', Some('.')), ..Default::default() };
    let parser = Parser::new(schema, options).unwrap();

    let args = ["-x", "1.000", "-x", "1.000,5", "-x", "0,25"];
    let values = parser.parse(&args, 0).unwrap().success().unwrap();
    assert_eq!(values, [1000.0, 1000.5, 0.25]);
}

#[test]
fn nullable_collection_elements() {
    #[derive(Default, Debug, PartialEq)]
    struct Sparse {
        slots: Vec<Option<u32>>,
        env: Vec<(String, Option<String>)>,
    }

    let schema = SchemaBuilder::<Sparse>::new()
        .multi_nullable::<u32>("slot", |a| a.separator(",").field(|o, v| o.slots = v))
        .dictionary_nullable::<String, String>("env", |a| a.field(|o, v| o.env = v));
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();
    assert!(parser.definitions().take(2).all(|d| d.allow_null));

    let sparse = parser
        .parse(&["-slot", "1,(null),3", "-env", "A=(null)", "-env", "B=x"], 0)
        .unwrap()
        .success()
        .unwrap();
    assert_eq!(
        sparse,
        Sparse {
            slots: vec![Some(1), None, Some(3)],
            env: vec![("A".to_owned(), None), ("B".to_owned(), Some("x".to_owned()))],
        }
    );
    assert_eq!(
        parser.parse(&["-env", "(null)=x"], 0).unwrap_err(),
        ParseError::NullArgumentValue { name: "env".to_owned() }
    );
}

#[test]
fn definition_errors() {
    let new =
        |schema: SchemaBuilder<Empty>, options: ParseOptions| Parser::new(schema, options).err();
    let default = ParseOptions::default;

    assert_eq!(
        new(
            SchemaBuilder::new().single::<u32>("x", |a| a.required().default_value("1")),
            default(),
        ),
        Some(DefinitionError::RequiredWithDefault { name: "x".to_owned() })
    );
    assert_eq!(
        new(
            SchemaBuilder::new()
                .multi::<u32>("xs", |a| a.position(0))
                .single::<u32>("y", |a| a.position(1)),
            default(),
        ),
        Some(DefinitionError::CollectionPositionalNotLast { name: "xs".to_owned() })
    );
    assert_eq!(
        new(
            SchemaBuilder::new()
                .nullable::<u32>("x", |a| a.position(0))
                .single::<u32>("y", |a| a.position(1).required()),
            default(),
        ),
        Some(DefinitionError::RequiredAfterOptional { name: "y".to_owned() })
    );
    assert!(matches!(
        new(SchemaBuilder::new().switch("a b", |a| a), default()),
        Some(DefinitionError::InvalidName { .. })
    ));
    assert!(matches!(
        new(SchemaBuilder::new().switch("x=y", |a| a), default()),
        Some(DefinitionError::InvalidName { .. })
    ));
    assert!(matches!(
        new(
            SchemaBuilder::new()
                .single::<u32>("n", |a| a.validate(Validator::Count { min: None, max: Some(1) })),
            default(),
        ),
        Some(DefinitionError::InvalidValidator { .. })
    ));
    assert!(matches!(
        new(
            SchemaBuilder::new()
                .nullable::<String>("x", |a| a.validate(Validator::Pattern("(".to_owned()))),
            default(),
        ),
        Some(DefinitionError::InvalidValidator { .. })
    ));
    assert_eq!(
        new(
            SchemaBuilder::new()
                .single::<u32>("a", |a| a)
                .requires_any(&["a"])
                .requires_any(&["a", "nothing"]),
            default(),
        ),
        Some(DefinitionError::UnknownGroupMember { group: 1, dependency: "nothing".to_owned() })
    );
}

#[test]
fn short_names_only_collide_in_long_short_mode() {
    let schema = || {
        SchemaBuilder::<Empty>::new()
            .switch("extract", |a| a.short('x'))
            .switch("exclude", |a| a.short('x'))
    };
    assert!(Parser::new(schema(), ParseOptions::default()).is_ok());
    assert_eq!(
        Parser::new(schema(), ParseOptions::long_short()).err(),
        Some(DefinitionError::DuplicateShortName { short: 'x' })
    );
}

#[test]
fn reserved_names_and_the_help_switch() {
    let options = ParseOptions {
        reserved_names: vec!["help".to_owned(), "version".to_owned()],
        ..Default::default()
    };
    assert_eq!(
        Parser::new(SchemaBuilder::<Empty>::new().switch("Version", |a| a), options).err(),
        Some(DefinitionError::ReservedName { name: "Version".to_owned() })
    );

    let options =
        ParseOptions { auto_help_argument: false, reserved_names: vec![], ..Default::default() };
    let parser = Parser::new(SchemaBuilder::<Empty>::new().switch("help", |a| a), options).unwrap();
    assert_eq!(parser.definitions().count(), 1);
    assert_eq!(parser.parse(&["-help"], 0).unwrap(), ParseOutcome::Success(Empty));
}

#[test]
fn case_sensitive_names() {
    #[derive(Default, Debug, PartialEq)]
    struct Pair {
        upper: bool,
        lower: bool,
    }

    let schema = || {
        SchemaBuilder::<Pair>::new()
            .switch("Name", |a| a.field(|o, v| o.upper = v))
            .switch("name", |a| a.field(|o, v| o.lower = v))
    };
    assert_eq!(
        Parser::new(schema(), ParseOptions::default()).err(),
        Some(DefinitionError::DuplicateName { name: "name".to_owned() })
    );

    let options = ParseOptions { case_sensitive: true, ..Default::default() };
    let parser = Parser::new(schema(), options).unwrap();
    assert_eq!(
        parser.parse(&["-name"], 0).unwrap(),
        ParseOutcome::Success(Pair { upper: false, lower: true })
    );
}

#[test]
fn default_values_on_collections_are_ignored() {
    #[derive(Default, Debug)]
    struct Target {
        values: Vec<u32>,
    }

    let schema = SchemaBuilder::<Target>::new()
        .multi::<u32>("values", |a| a.default_value("not a number").field(|o, v| o.values = v));
    let parser = Parser::new(schema, ParseOptions::default()).unwrap();
    assert!(parser.parse::<&str>(&[], 0).unwrap().success().unwrap().values.is_empty());
}
