//! The MSVC (`cl.exe`) command-line grammar.
//!
//! Flags are accepted with either sigil (`-I` or `/I`) since `cl.exe` treats
//! them interchangeably. `-imsvc`/`/imsvc` are included among the input
//! flags on the authority of the compile-request contract, even though the
//! dialect this was distilled from only recognised `-I`/`-external:I`.

use super::{parse_with_tables, ArgKind, Argument, ArgumentList, Dialect};

const INPUT_FLAGS: &[(&str, ArgKind)] = &[
    ("-I", ArgKind::Input),
    ("/I", ArgKind::Input),
    ("-external:I", ArgKind::Input),
    ("/external:I", ArgKind::Input),
    ("-imsvc", ArgKind::Input),
    ("/imsvc", ArgKind::Input),
];
const OUTPUT_FLAGS: &[(&str, ArgKind)] = &[("-Fo", ArgKind::Output), ("/Fo", ArgKind::Output)];
const SIGILS: &[char] = &['-', '/'];

pub struct Msvc;

impl Dialect for Msvc {
    fn name(&self) -> &'static str {
        "msvc"
    }

    fn parse(&self, args: &[String]) -> ArgumentList {
        let mut flags = Vec::with_capacity(INPUT_FLAGS.len() + OUTPUT_FLAGS.len());
        flags.extend_from_slice(INPUT_FLAGS);
        flags.extend_from_slice(OUTPUT_FLAGS);
        let mut list = parse_with_tables(args, &flags, SIGILS);
        infer_outputs(&mut list);
        ArgumentList(list)
    }
}

fn has_compile_only_flag(list: &[Argument]) -> bool {
    list.iter().any(|a| a.kind == ArgKind::Opaque && (a.command == "-c" || a.command == "/c"))
}

fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) if idx > 0 => &path[..idx],
        _ => path,
    }
}

/// One synthetic `-Fo` per bare positional input, named after the input
/// stem, suffixed `.obj` when compiling only or `.exe` when linking.
fn infer_outputs(list: &mut Vec<Argument>) {
    if list.iter().any(|a| a.kind == ArgKind::Output) {
        return;
    }
    let suffix = if has_compile_only_flag(list) { ".obj" } else { ".exe" };
    let positionals: Vec<String> = list
        .iter()
        .filter(|a| a.kind == ArgKind::Opaque && a.command.is_empty())
        .map(|a| a.parameter.clone())
        .collect();
    for input in positionals {
        let stem = strip_extension(&input).to_owned();
        list.push(Argument {
            command: "-Fo".to_owned(),
            parameter: format!("{}{}", stem, suffix),
            kind: ArgKind::Output,
            base: None,
        });
    }
}
