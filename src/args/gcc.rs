//! The GCC/Clang command-line grammar.

use super::{parse_with_tables, ArgKind, Argument, ArgumentList, Dialect};

const INPUT_FLAGS: &[(&str, ArgKind)] = &[("-I", ArgKind::Input), ("-isystem", ArgKind::Input)];
const OUTPUT_FLAGS: &[(&str, ArgKind)] = &[("-o", ArgKind::Output)];
const SIGILS: &[char] = &['-'];

pub struct Gcc;

impl Dialect for Gcc {
    fn name(&self) -> &'static str {
        "gcc"
    }

    fn parse(&self, args: &[String]) -> ArgumentList {
        let mut flags = Vec::with_capacity(INPUT_FLAGS.len() + OUTPUT_FLAGS.len());
        flags.extend_from_slice(INPUT_FLAGS);
        flags.extend_from_slice(OUTPUT_FLAGS);
        let mut list = parse_with_tables(args, &flags, SIGILS);
        infer_output(&mut list);
        ArgumentList(list)
    }
}

fn is_source_positional(arg: &Argument) -> bool {
    arg.command.is_empty() && (arg.parameter.ends_with(".c") || arg.parameter.ends_with(".cpp"))
}

fn has_compile_only_flag(list: &[Argument]) -> bool {
    list.iter().any(|a| a.kind == ArgKind::Opaque && a.command == "-c")
}

/// If no `-o` was given and either a source file or `-c` is present, append
/// a synthetic `-o a.out`. This deliberately matches gcc's historical
/// default output name even when `-c` is present, rather than the
/// per-input `.o` name a naive reimplementation might assume.
fn infer_output(list: &mut Vec<Argument>) {
    let has_output = list.iter().any(|a| a.kind == ArgKind::Output);
    if has_output {
        return;
    }
    let has_source = list.iter().any(is_source_positional);
    if has_source || has_compile_only_flag(list) {
        list.push(Argument {
            command: "-o".to_owned(),
            parameter: "a.out".to_owned(),
            kind: ArgKind::Output,
            base: None,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inline_include_and_explicit_output() {
        let args = strs(&["-Iinclude", "foo.c", "-o", "foo.o"]);
        let list = Gcc.parse(&args);
        assert_eq!(list.inputs(), strs(&["include", "foo.c"]));
        assert_eq!(list.outputs(), strs(&["foo.o"]));
    }

    #[test]
    fn longest_prefix_wins_over_shorter_flag() {
        let args = strs(&["-isystem/usr/local/include"]);
        let list = Gcc.parse(&args);
        assert_eq!(list.0[0].command, "-isystem");
        assert_eq!(list.0[0].parameter, "/usr/local/include");
    }

    #[test]
    fn synthesises_a_out_for_bare_source() {
        let args = strs(&["foo.c"]);
        let list = Gcc.parse(&args);
        assert_eq!(list.outputs(), strs(&["a.out"]));
    }

    #[test]
    fn compile_only_without_output_still_gets_a_out() {
        let args = strs(&["-c", "foo.c"]);
        let list = Gcc.parse(&args);
        assert_eq!(list.outputs(), strs(&["a.out"]));
    }

    #[test]
    fn explicit_output_is_never_overridden() {
        let args = strs(&["-c", "foo.c", "-o", "bar.o"]);
        let list = Gcc.parse(&args);
        assert_eq!(list.outputs(), strs(&["bar.o"]));
    }

    #[test]
    fn output_inference_is_idempotent() {
        let args = strs(&["-c", "foo.c"]);
        let first = Gcc.parse(&args).outputs();
        let second = Gcc.parse(&args).outputs();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn chroot_relocates_include_and_source() {
        let args = strs(&["-Iinclude", "foo.c", "-o", "foo.o"]);
        let mut list = Gcc.parse(&args);
        list.chroot(Path::new("/tmp/box"));
        assert_eq!(list.stringify(), strs(&["-I/tmp/box/include", "/tmp/box/foo.c", "-o/tmp/box/foo.o"]));
    }
}
