//! Configuration loading: a YAML file merged with environment variables
//! and command-line overrides.
//!
//! Precedence is resolved independently per key: command-line flag, then
//! `ALLBUILD_<UPPER_SNAKE_KEY>` environment variable, then the first
//! matching file in the search order, then a built-in default. Binaries
//! gather their own CLI flags with `clap` and pass them in as the
//! `cli_*` overrides below; this module has no CLI dependency of its own.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

use errors::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    pub tag: String,
    pub executable: String,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(rename = "task-database")]
    task_database: Option<String>,
    tag: Option<String>,
    compiler: Option<String>,
    concurrency: Option<usize>,
    tools: Option<Vec<ToolEntry>>,
}

fn load_first_existing(paths: &[PathBuf]) -> Result<FileConfig> {
    for path in paths {
        if let Ok(contents) = fs::read_to_string(path) {
            return ::serde_yaml::from_str(&contents).chain_err(|| format!("malformed config file: {}", path.display()));
        }
    }
    Ok(FileConfig::default())
}

fn env_override(key: &str) -> Option<String> {
    let var = format!("ALLBUILD_{}", key.to_uppercase().replace('-', "_"));
    env::var(var).ok()
}

fn resolve_string(cli: Option<String>, key: &str, file_val: Option<String>, default: &str) -> String {
    cli.or_else(|| env_override(key)).or(file_val).unwrap_or_else(|| default.to_owned())
}

fn resolve_usize(cli: Option<usize>, key: &str, file_val: Option<usize>, default: usize) -> usize {
    cli.or_else(|| env_override(key).and_then(|v| v.parse().ok())).or(file_val).unwrap_or(default)
}

pub const DEFAULT_TASK_DATABASE: &str = "127.0.0.1:6379";
pub const DEFAULT_TAG: &str = "default";
pub const DEFAULT_COMPILER: &str = "gcc";

/// The client (`allbuild-compiler`) configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub task_database: String,
    pub tag: String,
    pub compiler: String,
}

/// Overrides supplied on the client's own command line, independent of the
/// wrapped compiler invocation.
#[derive(Debug, Default)]
pub struct ClientOverrides {
    pub task_database: Option<String>,
    pub tag: Option<String>,
    pub compiler: Option<String>,
}

fn client_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    paths.push(PathBuf::from("compiler.yaml"));
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join("compiler.yaml"));
        }
    }
    paths.push(PathBuf::from("configs/compiler.yaml"));
    paths
}

pub fn load_client_config(overrides: ClientOverrides) -> Result<ClientConfig> {
    let file = load_first_existing(&client_search_paths())?;
    Ok(ClientConfig {
        task_database: resolve_string(overrides.task_database, "task-database", file.task_database, DEFAULT_TASK_DATABASE),
        tag: resolve_string(overrides.tag, "tag", file.tag, DEFAULT_TAG),
        compiler: resolve_string(overrides.compiler, "compiler", file.compiler, DEFAULT_COMPILER),
    })
}

/// The worker (`allbuild-executor`) configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub task_database: String,
    pub concurrency: usize,
    pub tools: Vec<ToolEntry>,
}

#[derive(Debug, Default)]
pub struct WorkerOverrides {
    pub task_database: Option<String>,
    pub concurrency: Option<usize>,
}

fn worker_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("executor.yaml"),
        PathBuf::from("configs/executor.yaml"),
        Path::new("/etc/allbuild/executor.yaml").to_path_buf(),
    ]
}

pub fn load_worker_config(overrides: WorkerOverrides) -> Result<WorkerConfig> {
    let file = load_first_existing(&worker_search_paths())?;
    let default_concurrency = ::num_cpus::get();
    Ok(WorkerConfig {
        task_database: resolve_string(overrides.task_database, "task-database", file.task_database, DEFAULT_TASK_DATABASE),
        concurrency: resolve_usize(overrides.concurrency, "concurrency", file.concurrency, default_concurrency),
        tools: file.tools.unwrap_or_default(),
    })
}

/// Queue names in descending priority order, paired with their weight.
/// Earlier-declared tools take priority over later ones, matching how the
/// worker iterates `tools` when polling.
pub fn queue_priorities(tools: &[ToolEntry]) -> HashMap<String, usize> {
    let n = tools.len();
    tools
        .iter()
        .enumerate()
        .map(|(i, tool)| (tool.tag.clone(), n - i))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cli_override_wins_over_file_and_default() {
        let resolved = resolve_string(Some("from-cli".to_owned()), "tag", Some("from-file".to_owned()), "from-default");
        assert_eq!(resolved, "from-cli");
    }

    #[test]
    fn file_value_wins_over_default_when_no_cli_or_env() {
        let resolved = resolve_string(None, "tag-not-set-in-env", Some("from-file".to_owned()), "from-default");
        assert_eq!(resolved, "from-file");
    }

    #[test]
    fn default_applies_when_nothing_else_is_set() {
        let resolved = resolve_string(None, "tag-not-set-in-env", None, "from-default");
        assert_eq!(resolved, "from-default");
    }

    #[test]
    fn earlier_declared_tools_get_higher_priority() {
        let tools = vec![
            ToolEntry { tag: "gcc".to_owned(), executable: "/usr/bin/gcc".to_owned() },
            ToolEntry { tag: "msvc".to_owned(), executable: "cl.exe".to_owned() },
        ];
        let priorities = queue_priorities(&tools);
        assert!(priorities["gcc"] > priorities["msvc"]);
    }
}
