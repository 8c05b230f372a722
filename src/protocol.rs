//! The wire envelope exchanged with the broker.
//!
//! Both structs are plain, self-describing JSON so that a worker on a
//! different build of this crate (or, in principle, a different language
//! entirely) can decode a request queued by an older client.

use serde_derive::{Deserialize, Serialize};

/// The task type name used to tag broker queues and payloads.
pub const TASK_TYPE: &str = "compile";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub chmod: u32,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    pub tag: String,
    pub command: Vec<String>,
    pub inputs: Vec<FileRecord>,
    pub outputs: Vec<String>,
    pub environment: Vec<String>,
    pub compiler: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileResponse {
    #[serde(rename = "returnCode")]
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub files: Vec<FileRecord>,
}
