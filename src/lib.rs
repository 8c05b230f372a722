//! Core library shared by the `allbuild-compiler` client and
//! `allbuild-executor` worker binaries.
//!
//! The client parses a wrapped compiler invocation, harvests the files it
//! touches, and hands a self-contained request to the broker. The worker
//! pulls requests off the broker, replays them inside a disposable
//! sandbox, and returns the compiler's output. Everything either side
//! needs to agree on — the wire envelope, the two command-line dialects,
//! relocation — lives here so both binaries stay thin.

#[macro_use]
extern crate error_chain;
extern crate env_logger;
extern crate log;
extern crate num_cpus;
extern crate redis;
extern crate serde;
extern crate serde_derive;
extern crate serde_json;
extern crate serde_yaml;
extern crate tempfile;
extern crate uuid;
extern crate walkdir;

pub mod args;
pub mod broker;
pub mod client;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod worker;

pub use errors::{Error, ErrorKind, Result};
