extern crate allbuild;
extern crate tempfile;

use std::fs;
use std::io::Write;

use allbuild::config::ToolEntry;
use allbuild::protocol;
use allbuild::worker::{self, ToolTable};

/// A minimal in-repo stand-in for a `gcc` tag: a shell script that writes
/// a fixed literal to its `-o` target, regardless of its other arguments.
fn write_fake_compiler(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("fake-gcc.sh");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "out=\"\"").unwrap();
    writeln!(file, "while [ $# -gt 0 ]; do").unwrap();
    writeln!(file, "  case \"$1\" in -o*) out=\"${{1#-o}}\";; esac").unwrap();
    writeln!(file, "  shift").unwrap();
    writeln!(file, "done").unwrap();
    writeln!(file, "printf 'OBJ' > \"$out\"").unwrap();
    file.sync_all().unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

#[cfg(unix)]
#[test]
fn compile_request_round_trips_through_worker_handler() {
    // Mirrors the reference end-to-end scenario: a gcc-tagged request whose
    // worker script writes a fixed literal to its declared output.
    let workdir = tempfile::tempdir().unwrap();
    let script = write_fake_compiler(workdir.path());

    let request = protocol::CompileRequest {
        tag: "gcc".to_owned(),
        command: vec!["-c".to_owned(), "a.c".to_owned(), "-o".to_owned(), "a.o".to_owned()],
        inputs: vec![protocol::FileRecord {
            path: "a.c".to_owned(),
            chmod: 0o644,
            content: b"int main(){}".to_vec(),
        }],
        outputs: vec!["a.o".to_owned()],
        environment: vec![],
        compiler: "gcc".to_owned(),
    };
    let tools = ToolTable::new(&[ToolEntry {
        tag: "gcc".to_owned(),
        executable: script.to_string_lossy().into_owned(),
    }]);
    let response = worker::handle(&request, &tools);

    assert_eq!(response.return_code, 0);
    assert_eq!(response.stdout, "");
    assert_eq!(response.stderr, "");
    assert_eq!(response.files.len(), 1);
    assert_eq!(response.files[0].path, "a.o");
    assert_eq!(response.files[0].content, b"OBJ".to_vec());
}

#[cfg(unix)]
#[test]
fn unresolvable_tag_yields_minus_one_without_touching_filesystem() {
    let request = protocol::CompileRequest {
        tag: "nonexistent".to_owned(),
        command: vec!["foo.c".to_owned()],
        inputs: vec![],
        outputs: vec!["a.out".to_owned()],
        environment: vec![],
        compiler: "gcc".to_owned(),
    };
    let tools = ToolTable::new(&[]);
    let response = worker::handle(&request, &tools);
    assert_eq!(response.return_code, -1);
    assert!(response.files.is_empty());
}

#[cfg(unix)]
#[test]
fn signalled_child_is_reported_with_shell_convention() {
    // A command killed by SIGKILL (9) from within the subprocess itself.
    let workdir = tempfile::tempdir().unwrap();
    let script = workdir.path().join("self-destruct.sh");
    let mut file = fs::File::create(&script).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "kill -9 $$").unwrap();
    file.sync_all().unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }

    let request = protocol::CompileRequest {
        tag: "gcc".to_owned(),
        command: vec!["a.c".to_owned(), "-o".to_owned(), "a.o".to_owned()],
        inputs: vec![],
        outputs: vec![],
        environment: vec![],
        compiler: "gcc".to_owned(),
    };
    let tools = ToolTable::new(&[ToolEntry {
        tag: "gcc".to_owned(),
        executable: script.to_string_lossy().into_owned(),
    }]);
    let response = worker::handle(&request, &tools);
    assert_eq!(response.return_code, 128 + 9);
}
