// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Typed command line binding with validation and dependency constraints.
//!
//! A destination type describes its arguments once, either with the
//! `FromArgs` derive or at runtime with a [`SchemaBuilder`]. Both produce the
//! same [`Schema`], and a [`Parser`] built from it turns a token list into an
//! instance of the type, or into a structured [`ParseError`].
//!
//! ## Basic Example
//!
//! ```rust
//! use argbind::{FromArgs, ParseOutcome};
//!
//! #[derive(FromArgs, Debug, PartialEq)]
//! /// Reach new heights.
//! #[argbind(name_transform = "dash-case")]
//! struct GoUp {
//!     /// whether or not to jump
//!     #[argbind(switch, short = 'j')]
//!     jump: bool,
//!
//!     /// how high to go
//!     #[argbind(option, range(min = 1, max = 100))]
//!     height: usize,
//!
//!     /// an optional nickname for the pilot
//!     #[argbind(option)]
//!     pilot_nickname: Option<String>,
//! }
//!
//! let up = GoUp::from_args(&["-height", "5", "-pilot-nickname:Wes"]).unwrap();
//! assert_eq!(
//!     up,
//!     ParseOutcome::Success(GoUp { jump: false, height: 5, pilot_nickname: Some("Wes".into()) }),
//! );
//! ```
//!
//! Switches, like `jump`, are optional and will be set to true if provided.
//!
//! Options, like `height` and `pilot_nickname`, can be either required,
//! optional, repeating or keyed, depending on whether they are contained in
//! an `Option`, a `Vec` or a `HashMap`/`BTreeMap`. Default values are given
//! as text with `#[argbind(default = "...")]` and go through the same
//! conversion as values from the command line.
//!
//! ```rust
//! use {argbind::FromArgs, std::collections::BTreeMap};
//!
//! #[derive(FromArgs)]
//! /// Build things.
//! struct Build {
//!     /// files to build
//!     #[argbind(positional)]
//!     files: Vec<String>,
//!
//!     /// number of jobs
//!     #[argbind(option, default = "4")]
//!     jobs: u32,
//!
//!     /// build settings
//!     #[argbind(option, name = "D")]
//!     defines: BTreeMap<String, String>,
//! }
//!
//! let build = Build::from_args(&["a.rs", "b.rs", "-D", "opt=3", "-D:debug=false"])
//!     .unwrap()
//!     .success()
//!     .unwrap();
//! assert_eq!(build.files, ["a.rs", "b.rs"]);
//! assert_eq!(build.jobs, 4);
//! assert_eq!(build.defines["opt"], "3");
//! ```
//!
//! ## Runtime schemas
//!
//! Where the arguments aren't known at compile time, the same schema can be
//! assembled with a [`SchemaBuilder`], and values can be routed to callbacks
//! instead of fields:
//!
//! ```rust
//! use {
//!     argbind::{ParseOptions, Parser, SchemaBuilder, Validator},
//!     std::sync::{atomic::{AtomicU32, Ordering}, Arc},
//! };
//!
//! #[derive(Default)]
//! struct Empty;
//!
//! let seen = Arc::new(AtomicU32::new(0));
//! let counter = seen.clone();
//! let schema = SchemaBuilder::<Empty>::new()
//!     .single::<u32>("level", |a| {
//!         a.validate(Validator::Range { min: Some(1.0), max: Some(3.0) })
//!             .invoke_with(move |level: &u32| counter.store(*level, Ordering::SeqCst))
//!     })
//!     .build();
//! let parser = Parser::new(schema, ParseOptions::default()).unwrap();
//!
//! parser.parse(&["-level", "2"], 0).unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 2);
//! assert!(parser.parse(&["-level", "7"], 0).is_err());
//! ```
//!
//! ## Parsing rules
//!
//! In the default mode every named argument is introduced by one of the
//! [`ParseOptions::prefixes`], and names may be abbreviated to any unique
//! prefix. In [`ParsingMode::LongShort`] long names use
//! [`ParseOptions::long_prefix`] and single character names can be combined,
//! as in `-abc`. Values follow the name either inline after a separator
//! (`-name:value`, `-name=value`) or as the next token.
//!
//! Every failure is reported as a [`ParseError`] with a stable
//! [`ErrorCategory`]; problems with the schema itself are reported once, when
//! the [`Parser`] is built, as a [`DefinitionError`].

#![deny(missing_docs)]

mod context;
mod convert;
mod definition;
mod error;
mod name;
mod options;
mod parser;
mod schema;
pub mod slot;
mod validate;

pub use {
    crate::{
        context::ParseContext,
        convert::{default_converter, from_str_fn, Converter, FromArgValue, Locale},
        definition::*,
        error::*,
        name::{resolve_prefix, Resolution},
        options::*,
        parser::{Cancellation, ParseOutcome, Parser},
        schema::{
            ArgumentBuilder, ConstructorArgs, Derived, IntoCompletion, Schema, SchemaBuilder,
            SchemaProvider,
        },
        validate::{CustomCheck, Validator},
    },
    argbind_derive::FromArgs,
    argbind_shared::{default_short_name, NameTransform},
};

/// Types whose argument schema is known at compile time.
///
/// This trait is implemented by `#[derive(FromArgs)]`; implementing it by
/// hand is only needed for types that want to expose a builder-made schema
/// through the same entry points.
pub trait FromArgs: Sized + 'static {
    /// The schema for `Self`.
    fn schema() -> Schema<Self>;

    /// A parser for `Self` with the given options.
    fn parser(options: ParseOptions) -> Result<Parser<Self>, DefinitionError> {
        Parser::new(Derived::<Self>::new(), options)
    }

    /// Parse `args` with the default options.
    ///
    /// Building the parser validates the schema on every call; keep a
    /// [`Parser`] around to parse repeatedly.
    fn from_args<S: AsRef<str>>(args: &[S]) -> Result<ParseOutcome<Self>, Error> {
        Ok(Self::parser(ParseOptions::default())?.parse(args, 0)?)
    }
}

/// Parse the program's arguments, skipping the program name, into `T` with
/// the default options.
pub fn from_env<T: FromArgs>() -> Result<ParseOutcome<T>, Error> {
    Ok(T::parser(ParseOptions::default())?.parse_env()?)
}
