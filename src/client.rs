//! The request builder and broker round-trip driven by the `allbuild-compiler`
//! wrapper.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{info, trace};
use walkdir::WalkDir;

use args;
use broker::{Broker, TaskState};
use errors::*;
use protocol::{CompileRequest, CompileResponse, FileRecord};

/// How long a completed result is kept around for the client to collect.
pub const RESULT_RETENTION: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Parse `raw_args`, harvest every file reachable from its input paths, and
/// assemble a self-contained request.
pub fn build_request(raw_args: &[String], tag: &str, compiler: &str) -> Result<CompileRequest> {
    let dialect = args::dialect_for(compiler)?;
    let parsed = dialect.parse(raw_args);

    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    for input in parsed.inputs() {
        let root = Path::new(&input);
        let walk_root = if root.is_dir() { root } else { root.parent().unwrap_or_else(|| Path::new(".")) };
        for entry in WalkDir::new(walk_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();
            if !seen.insert(path.clone()) {
                continue;
            }
            trace!("harvesting input file {}", path.display());
            inputs.push(read_file_record(&path)?);
        }
    }

    info!("built compile request for tag '{}' with {} input file(s)", tag, inputs.len());
    Ok(CompileRequest {
        tag: tag.to_owned(),
        command: raw_args.to_vec(),
        inputs,
        outputs: parsed.outputs(),
        environment: Vec::new(),
        compiler: compiler.to_owned(),
    })
}

fn read_file_record(path: &Path) -> Result<FileRecord> {
    let content = fs::read(path).chain_err(|| format!("failed to read input file {}", path.display()))?;
    let chmod = permission_bits(path)?;
    Ok(FileRecord {
        path: path.to_string_lossy().into_owned(),
        chmod,
        content,
    })
}

#[cfg(unix)]
fn permission_bits(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).chain_err(|| format!("failed to stat {}", path.display()))?;
    Ok(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_path: &Path) -> Result<u32> {
    Ok(0o644)
}

#[cfg(unix)]
fn set_permission_bits(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).chain_err(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
fn set_permission_bits(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Enqueue `request` and block, polling the broker at a fixed short
/// interval, until the worker's response is available.
pub fn dispatch(request: CompileRequest, broker: &dyn Broker) -> Result<CompileResponse> {
    let payload = ::serde_json::to_vec(&request).chain_err(|| "failed to encode compile request")?;
    let id = broker.enqueue(&request.tag, payload, RESULT_RETENTION)?;
    info!("enqueued task {} on tag '{}'", id.0, request.tag);
    loop {
        match broker.poll(&id)? {
            TaskState::Completed(bytes) => {
                let response: CompileResponse = ::serde_json::from_slice(&bytes).chain_err(|| "failed to decode compile response")?;
                info!("task {} completed with return code {}", id.0, response.return_code);
                return Ok(response);
            }
            TaskState::Pending => thread::sleep(POLL_INTERVAL),
        }
    }
}

/// Materialize the worker's output files and replay its stdout/stderr.
/// Returns the exit code to propagate.
pub fn apply_response(response: &CompileResponse) -> Result<i32> {
    for file in &response.files {
        let path = PathBuf::from(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).chain_err(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &file.content).chain_err(|| format!("failed to write {}", path.display()))?;
        set_permission_bits(&path, file.chmod)?;
    }
    io::stdout().write_all(response.stdout.as_bytes()).chain_err(|| "failed to write stdout")?;
    io::stderr().write_all(response.stderr.as_bytes()).chain_err(|| "failed to write stderr")?;
    Ok(response.return_code)
}
