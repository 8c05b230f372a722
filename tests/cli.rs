//! Black-box tests of the `allbuild-compiler` binary driven as a subprocess.
//! These avoid needing a running broker by only exercising paths that fail
//! before the broker is ever contacted.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn unknown_compiler_dialect_fails_before_touching_the_broker() {
    let mut cmd = Command::cargo_bin("allbuild-compiler").unwrap();
    cmd.args(["--allbuild-compiler", "tcc", "--allbuild-tag", "gcc", "foo.c"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown compiler dialect"));
}

#[test]
fn missing_command_is_rejected_by_argument_parsing() {
    let mut cmd = Command::cargo_bin("allbuild-compiler").unwrap();
    cmd.assert().failure();
}
