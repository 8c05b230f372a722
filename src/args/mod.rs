//! A dialect-agnostic model of a parsed compiler command line.
//!
//! An [`ArgumentList`] is the result of running a raw argument vector through
//! one of the two concrete dialects ([`gcc`] or [`msvc`]). It can be walked
//! for its input/output paths, rebased onto a sandbox directory with
//! [`ArgumentList::chroot`], and reconstructed into a command line with
//! [`ArgumentList::stringify`].

pub mod gcc;
pub mod msvc;

use std::path::{Path, PathBuf};

use log::trace;

use errors::*;

/// What an [`Argument`]'s parameter refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// An include/search root, e.g. the `dir` in `-I dir`.
    Input,
    /// A produced artifact path, e.g. the `foo.o` in `-o foo.o`.
    Output,
    /// Anything else: a flag with no filesystem meaning, or its value.
    Opaque,
}

/// A single token (or flag+value pair) of a parsed command line.
///
/// Exactly one of `command`/`parameter` is ever absent: a pure flag (`-c`)
/// has an empty `parameter`, and a value-only token (a bare positional, or
/// the value half of a split flag+value pair) has an empty `command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub command: String,
    pub parameter: String,
    pub kind: ArgKind,
    pub base: Option<PathBuf>,
}

impl Argument {
    fn flag(command: &str, parameter: &str, kind: ArgKind) -> Self {
        Argument {
            command: command.to_owned(),
            parameter: parameter.to_owned(),
            kind,
            base: None,
        }
    }

    fn opaque_flag(token: &str) -> Self {
        Argument {
            command: token.to_owned(),
            parameter: String::new(),
            kind: ArgKind::Opaque,
            base: None,
        }
    }

    fn positional(token: &str) -> Self {
        Argument {
            command: String::new(),
            parameter: token.to_owned(),
            kind: ArgKind::Opaque,
            base: None,
        }
    }

    /// Whether this argument's parameter denotes a filesystem path that
    /// relocation should rebase.
    fn path_bearing(&self) -> bool {
        matches!(self.kind, ArgKind::Input | ArgKind::Output) || self.command.is_empty()
    }

    /// The parameter as it should appear on the command line: rebased onto
    /// `base` for path-bearing arguments once a base has been set, otherwise
    /// unchanged.
    pub fn effective_parameter(&self) -> String {
        if self.parameter.is_empty() {
            return String::new();
        }
        match &self.base {
            Some(base) if self.path_bearing() => join_preserving_absolute(base, &self.parameter),
            _ => self.parameter.clone(),
        }
    }

    fn to_token(&self) -> String {
        let param = self.effective_parameter();
        match (self.command.is_empty(), param.is_empty()) {
            (false, false) => format!("{}{}", self.command, param),
            (false, true) => self.command.clone(),
            (true, false) => param,
            (true, true) => String::new(),
        }
    }
}

/// `base.join(parameter)`, which on every supported platform anchors on the
/// parameter when it is itself absolute. Host-absolute input paths therefore
/// escape the sandbox by design; see the design notes on relocation.
fn join_preserving_absolute(base: &Path, parameter: &str) -> String {
    base.join(parameter).to_string_lossy().into_owned()
}

/// An ordered, flat sequence of [`Argument`]s — the parse of one command
/// line. Order is the canonical serialisation order and is preserved through
/// parse -> chroot -> stringify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentList(pub Vec<Argument>);

impl ArgumentList {
    /// Rebase every path-bearing argument onto `base`.
    pub fn chroot(&mut self, base: &Path) {
        for arg in &mut self.0 {
            arg.base = Some(base.to_path_buf());
        }
    }

    /// Reconstruct the command line.
    pub fn stringify(&self) -> Vec<String> {
        self.0.iter().map(Argument::to_token).collect()
    }

    /// The effective parameters of every input-bearing argument, in order,
    /// including bare positionals.
    pub fn inputs(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|a| a.kind == ArgKind::Input || a.command.is_empty())
            .map(Argument::effective_parameter)
            .collect()
    }

    /// The effective parameters of every output-bearing argument, in order.
    pub fn outputs(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|a| a.kind == ArgKind::Output)
            .map(Argument::effective_parameter)
            .collect()
    }
}

/// A closed, finite set of recognised command-line grammars.
pub trait Dialect {
    fn name(&self) -> &'static str;
    fn parse(&self, args: &[String]) -> ArgumentList;
}

/// Resolve a dialect name (`gcc` or `msvc`) to its parser.
pub fn dialect_for(name: &str) -> Result<Box<dyn Dialect>> {
    match name {
        "gcc" => Ok(Box::new(gcc::Gcc)),
        "msvc" => Ok(Box::new(msvc::Msvc)),
        other => Err(ErrorKind::UnknownCompiler(other.to_owned()).into()),
    }
}

/// Shared two-state parse loop: `flags` pairs a flag token with the kind it
/// introduces. Flags sharing a prefix are tried longest-first so that, e.g.,
/// a hypothetical `-I` does not swallow the first two characters of a
/// longer flag like `-isystem` when both can attach inline.
pub(crate) fn parse_with_tables(args: &[String], flags: &[(&str, ArgKind)], sigils: &[char]) -> Vec<Argument> {
    let mut table: Vec<(&str, ArgKind)> = flags.to_vec();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let tok = args[i].as_str();

        if let Some(&(flag, kind)) = table.iter().find(|(f, _)| *f == tok) {
            if i + 1 < args.len() {
                trace!("'{}' is a known flag taking '{}' as its {:?} parameter", flag, args[i + 1], kind);
                out.push(Argument::flag(flag, &args[i + 1], kind));
                i += 2;
            } else {
                // No parameter token follows; nothing sensible to attach.
                trace!("'{}' is a known flag with no following parameter; treating as opaque", tok);
                out.push(Argument::opaque_flag(tok));
                i += 1;
            }
            continue;
        }

        if let Some(&(flag, kind)) = table.iter().find(|(f, _)| tok.starts_with(f)) {
            let remainder = &tok[flag.len()..];
            trace!("'{}' splits into flag '{}' and inline {:?} parameter '{}'", tok, flag, kind, remainder);
            out.push(Argument::flag(flag, remainder, kind));
            i += 1;
            continue;
        }

        if sigils.iter().any(|&sigil| tok.starts_with(sigil)) {
            trace!("'{}' carries a flag sigil but matches no known flag; opaque", tok);
            out.push(Argument::opaque_flag(tok));
        } else {
            trace!("'{}' has no flag sigil; treating as a bare positional input", tok);
            out.push(Argument::positional(tok));
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn opaque_round_trip() {
        let args = strs(&["-c", "-fabc", "-mxyz"]);
        let list = ArgumentList(parse_with_tables(&args, &[("-o", ArgKind::Output)], &['-']));
        assert_eq!(list.stringify(), args);
    }

    #[test]
    fn classification_totality() {
        let args = strs(&["-I", "inc", "-c", "foo.c"]);
        let list = ArgumentList(parse_with_tables(
            &args,
            &[("-I", ArgKind::Input), ("-o", ArgKind::Output)],
            &['-'],
        ));
        for arg in &list.0 {
            match arg.kind {
                ArgKind::Input | ArgKind::Output => assert!(!arg.parameter.is_empty()),
                ArgKind::Opaque => {}
            }
            assert!(!arg.command.is_empty() || !arg.parameter.is_empty());
        }
    }

    #[test]
    fn relocation_monotonicity() {
        let args = strs(&["-I", "include", "foo.c", "-o", "foo.o"]);
        let mut list = ArgumentList(parse_with_tables(
            &args,
            &[("-I", ArgKind::Input), ("-o", ArgKind::Output)],
            &['-'],
        ));
        list.chroot(Path::new("/tmp/box"));
        for token in list.stringify() {
            if token.starts_with('-') {
                continue;
            }
            assert!(Path::new(&token).is_absolute());
        }
        assert_eq!(list.stringify(), strs(&["-I/tmp/box/include", "/tmp/box/foo.c", "-o/tmp/box/foo.o"]));
    }
}
