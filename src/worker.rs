//! The task handler run by `allbuild-executor`: materialise a sandbox,
//! relocate the command into it, run the compiler, and harvest outputs.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use log::{debug, error, trace, warn};

use args;
use config::ToolEntry;
use errors::*;
use protocol::{CompileRequest, CompileResponse, FileRecord};

/// Maps a request's `tag` to the executable the worker should invoke.
pub struct ToolTable(HashMap<String, String>);

impl ToolTable {
    pub fn new(tools: &[ToolEntry]) -> Self {
        ToolTable(tools.iter().map(|t| (t.tag.clone(), t.executable.clone())).collect())
    }
}

/// Run one compile task, turning any internal failure into a `returnCode`
/// of `-1` rather than letting it propagate to the broker as a delivery
/// failure.
pub fn handle(request: &CompileRequest, tools: &ToolTable) -> CompileResponse {
    match handle_inner(request, tools) {
        Ok(response) => response,
        Err(err) => {
            error!("task for tag '{}' failed: {}", request.tag, err);
            CompileResponse {
                return_code: -1,
                stdout: String::new(),
                stderr: err.to_string(),
                files: Vec::new(),
            }
        }
    }
}

fn handle_inner(request: &CompileRequest, tools: &ToolTable) -> Result<CompileResponse> {
    let executable = tools
        .0
        .get(&request.tag)
        .ok_or_else(|| ErrorKind::UnknownTool(request.tag.clone()))?;

    let sandbox = ::tempfile::Builder::new()
        .prefix("allbuild-")
        .tempdir()
        .chain_err(|| ErrorKind::SandboxSetup("could not create sandbox directory".to_owned()))?;

    for file in &request.inputs {
        materialize(sandbox.path(), file)?;
    }
    for output in &request.outputs {
        let dest = sandbox_join(sandbox.path(), output);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).chain_err(|| ErrorKind::SandboxSetup(format!("could not create {}", parent.display())))?;
            set_dir_mode(parent)?;
        }
    }

    let dialect = args::dialect_for(&request.compiler)?;
    let mut parsed = dialect.parse(&request.command);
    parsed.chroot(sandbox.path());
    let relocated = parsed.stringify();
    debug!("resolved tool '{}' -> {}; relocated command: {:?}", request.tag, executable, relocated);

    let mut child = Command::new(executable)
        .args(&relocated)
        .current_dir(sandbox.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .chain_err(|| ErrorKind::SpawnFailure(format!("could not spawn '{}'", executable)))?;

    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");

    // Drain both pipes concurrently: the child can fill either buffer and
    // block on the other before a single-threaded reader gets to it.
    let stdout_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });
    let mut stderr_buf = Vec::new();
    let _ = stderr_pipe.read_to_end(&mut stderr_buf);
    let stdout_buf = stdout_reader.join().unwrap_or_default();

    let status = child.wait().chain_err(|| ErrorKind::SpawnFailure("compiler process failed".to_owned()))?;

    let mut files = Vec::new();
    for output in &request.outputs {
        let dest = sandbox_join(sandbox.path(), output);
        match harvest(&dest, output) {
            Ok(Some(record)) => files.push(record),
            Ok(None) => warn!("declared output '{}' was not produced", output),
            Err(err) => warn!("failed to harvest output '{}': {}", output, err),
        }
    }

    Ok(CompileResponse {
        return_code: exit_code(&status),
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        files,
    })
}

/// `base.join(path)`, sharing the same absolute-path-escapes-the-sandbox
/// behaviour as argument relocation.
fn sandbox_join(base: &Path, path: &str) -> PathBuf {
    base.join(path)
}

fn materialize(sandbox: &Path, file: &FileRecord) -> Result<()> {
    let dest = sandbox_join(sandbox, &file.path);
    trace!("writing sandbox file {} ({} bytes, mode {:o})", dest.display(), file.content.len(), file.chmod);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).chain_err(|| ErrorKind::SandboxSetup(format!("could not create {}", parent.display())))?;
        set_dir_mode(parent)?;
    }
    fs::write(&dest, &file.content).chain_err(|| ErrorKind::SandboxSetup(format!("could not write {}", dest.display())))?;
    set_mode(&dest, file.chmod)?;
    Ok(())
}

fn harvest(path: &Path, declared_path: &str) -> Result<Option<FileRecord>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read(path).chain_err(|| format!("failed to read {}", path.display()))?;
    let chmod = mode_of(path)?;
    Ok(Some(FileRecord {
        path: declared_path.to_owned(),
        chmod,
        content,
    }))
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).chain_err(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).chain_err(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn mode_of(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).chain_err(|| format!("failed to stat {}", path.display()))?;
    Ok(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_of(_path: &Path) -> Result<u32> {
    Ok(0o644)
}

/// A clean exit yields its status code. A signalled child is encoded as
/// `128 + signal`, matching shell convention; platforms without signal
/// introspection fall back to `-1`.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_exit_code(status)
}

#[cfg(unix)]
fn signal_exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|s| 128 + s).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sandbox_join_follows_absolute_escape_rule() {
        let joined = sandbox_join(Path::new("/tmp/box"), "/etc/passwd");
        assert_eq!(joined, Path::new("/etc/passwd"));
    }

    #[test]
    fn sandbox_join_rebases_relative_paths() {
        let joined = sandbox_join(Path::new("/tmp/box"), "src/foo.c");
        assert_eq!(joined, Path::new("/tmp/box/src/foo.c"));
    }

    #[test]
    fn unknown_tag_turns_into_minus_one_response() {
        let tools = ToolTable::new(&[]);
        let request = CompileRequest {
            tag: "missing".to_owned(),
            command: vec!["foo.c".to_owned()],
            inputs: vec![],
            outputs: vec![],
            environment: vec![],
            compiler: "gcc".to_owned(),
        };
        let response = handle(&request, &tools);
        assert_eq!(response.return_code, -1);
        assert!(response.files.is_empty());
    }
}
