// Copyright (c) 2022 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use {
    argbind::{FromArgs, ParseOutcome},
    std::{collections::BTreeMap, process::ExitCode},
};

#[derive(FromArgs)]
/// Copy files somewhere else.
#[argbind(name_transform = "dash-case")]
struct Copy {
    /// files to copy
    #[argbind(positional, count(min = 1))]
    sources: Vec<String>,

    /// where to put them
    #[argbind(option, short, aliases = ["to"])]
    destination: String,

    /// how many copies to run at once
    #[argbind(option, short, default = "4", range(min = 1, max = 64))]
    jobs: u32,

    /// extra metadata, as key=value
    #[argbind(option)]
    meta: BTreeMap<String, String>,

    /// replace existing files
    #[argbind(switch, short)]
    force: bool,
}

fn main() -> ExitCode {
    match argbind::from_env::<Copy>() {
        Ok(ParseOutcome::Success(copy)) => {
            println!(
                "copying {:?} to {} with {} jobs{}",
                copy.sources,
                copy.destination,
                copy.jobs,
                if copy.force { ", replacing existing files" } else { "" },
            );
            for (key, value) in &copy.meta {
                println!("  {} = {}", key, value);
            }
            ExitCode::SUCCESS
        }
        Ok(ParseOutcome::Cancelled(cancellation)) => {
            if cancellation.help_requested {
                for definition in Copy::schema().definitions().filter(|d| !d.hidden) {
                    println!("  -{:<14} {}", definition.name, definition.description);
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
