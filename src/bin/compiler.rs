//! `allbuild-compiler`: a drop-in compiler wrapper that dispatches the
//! wrapped invocation to a worker pool instead of running it locally.
//!
//! Every argument that isn't one of allbuild's own flags is forwarded
//! verbatim as part of the compile command, so this binary can be pointed
//! at by `CC`/`CXX` (or an MSVC-style `cl` shim) unmodified.

extern crate allbuild;
extern crate clap;
extern crate env_logger;
extern crate log;

use std::process;

use clap::{App, AppSettings, Arg};
use log::error;

use allbuild::broker::RedisBroker;
use allbuild::config::{self, ClientOverrides};
use allbuild::errors::*;
use allbuild::client;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let matches = App::new("allbuild-compiler")
        .setting(AppSettings::TrailingVarArg)
        .setting(AppSettings::AllowLeadingHyphen)
        .arg(Arg::with_name("task-database").long("allbuild-task-database").takes_value(true))
        .arg(Arg::with_name("tag").long("allbuild-tag").takes_value(true))
        .arg(Arg::with_name("compiler").long("allbuild-compiler").takes_value(true))
        .arg(Arg::with_name("command").multiple(true).required(true))
        .get_matches();

    let overrides = ClientOverrides {
        task_database: matches.value_of("task-database").map(str::to_owned),
        tag: matches.value_of("tag").map(str::to_owned),
        compiler: matches.value_of("compiler").map(str::to_owned),
    };
    let cfg = config::load_client_config(overrides)?;

    let command: Vec<String> = matches
        .values_of("command")
        .map(|vals| vals.map(str::to_owned).collect())
        .unwrap_or_default();

    let request = client::build_request(&command, &cfg.tag, &cfg.compiler)?;
    let broker = RedisBroker::connect(&cfg.task_database)?;
    let response = client::dispatch(request, &broker)?;
    client::apply_response(&response)
}
