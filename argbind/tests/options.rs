// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![cfg(feature = "serde")]

use {
    argbind::{DuplicatePolicy, FromArgs, Locale, ParseOptions, ParseOutcome, Parser, ParsingMode},
    once_cell::sync::Lazy,
};

#[derive(FromArgs, Debug, PartialEq)]
/// Server settings.
#[argbind(name_transform = "dash-case")]
struct Serve {
    /// port to listen on
    #[argbind(option, short, default = "8080")]
    port: u16,

    /// load factor
    #[argbind(option, default = "0.5")]
    load_factor: f64,

    /// log verbosely
    #[argbind(switch, short)]
    verbose: bool,
}

static PARSER: Lazy<Parser<Serve>> =
    Lazy::new(|| Serve::parser(ParseOptions::long_short()).expect("valid schema"));

#[test]
fn options_load_from_toml() {
    let options: ParseOptions = toml::from_str(
        r#"
            mode = "long-short"
            case_sensitive = true
            duplicates = "warn"
            null_sentinel = "NULL"

            [locale]
            name = "de-DE"
            decimal_separator = ","
            group_separator = "."
        "#,
    )
    .unwrap();

    assert_eq!(options.mode, ParsingMode::LongShort);
    assert!(options.case_sensitive);
    assert_eq!(options.duplicates, DuplicatePolicy::Warn);
    assert_eq!(options.null_sentinel.as_deref(), Some("NULL"));
    assert_eq!(options.locale, Locale::new("de-DE", ',', Some('.')));
    // Everything else keeps its default.
    assert_eq!(options.long_prefix, ParseOptions::default().long_prefix);
    assert_eq!(options.reserved_names, ["help"]);

    let parser = Serve::parser(options).unwrap();
    let serve = parser.parse(&["--load-factor", "0,75", "-p", "1", "-p", "2"], 0).unwrap();
    assert_eq!(serve, ParseOutcome::Success(Serve { port: 2, load_factor: 0.75, verbose: false }));
}

#[test]
fn empty_toml_is_the_default() {
    let options: ParseOptions = toml::from_str("").unwrap();
    assert_eq!(options, ParseOptions::default());
}

#[test]
fn options_round_trip_through_json() {
    let options = ParseOptions::long_short();
    let json = serde_json::to_string(&options).unwrap();
    assert!(json.contains(r#""mode":"long-short""#));
    assert_eq!(serde_json::from_str::<ParseOptions>(&json).unwrap(), options);
}

#[test]
fn one_parser_serves_many_threads() {
    std::thread::scope(|scope| {
        for port in 1000..1008u16 {
            scope.spawn(move || {
                let port_text = port.to_string();
                let verbose = port % 2 == 0;
                let mut args = vec!["--port", port_text.as_str()];
                if verbose {
                    args.push("-v");
                }
                let serve = PARSER.parse(&args, 0).unwrap().success().unwrap();
                assert_eq!(serve, Serve { port, load_factor: 0.5, verbose });
            });
        }
    });
}
