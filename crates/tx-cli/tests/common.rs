#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

/// Creates a temp project containing the given `tx.toml`.
pub fn project_with_manifest(prefix: &str, manifest: &str) -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir");
    let project = temp.path().join("proj");
    fs::create_dir_all(&project).expect("project dir");
    fs::write(project.join("tx.toml"), manifest).expect("write manifest");
    (temp, project)
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir");
    }
    fs::write(path, contents).expect("write file");
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout_text(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn stderr_text(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr")
}

/// A real interpreter for tests that build venvs; callers skip when absent.
pub fn find_python() -> Option<String> {
    for candidate in ["python3", "python"] {
        let works = Command::new(candidate)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if works {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Writes an executable stand-in for `python` that handles the two calls the
/// packaging pipeline makes: `setup.py sdist --dist-dir D` and
/// `-m pip wheel --no-deps --wheel-dir D SDIST`.
#[cfg(unix)]
pub fn stub_python(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
out=""
mode="$1"
while [ $# -gt 0 ]; do
    case "$1" in
        --dist-dir|--wheel-dir) out="$2"; shift 2 ;;
        *) shift ;;
    esac
done
mkdir -p "$out"
case "$mode" in
    setup.py) printf 'sdist' > "$out/demo-0.1.0.tar.gz" ;;
    -m) printf 'wheel' > "$out/demo-0.1.0-py3-none-any.whl" ;;
esac
"#;
    let path = dir.join("python-stub");
    fs::write(&path, script).expect("write stub");
    let mut perms = fs::metadata(&path).expect("stub metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("make stub executable");
    path
}

/// Like [`stub_python`] but every invocation fails with the given code.
#[cfg(unix)]
pub fn failing_python(dir: &Path, code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!("#!/bin/sh\necho 'build exploded' >&2\nexit {code}\n");
    let path = dir.join("python-fails");
    fs::write(&path, script).expect("write stub");
    let mut perms = fs::metadata(&path).expect("stub metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("make stub executable");
    path
}
