//! Command-line behavior of the `httpsync` binary.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use assert_cmd::Command;
use httpsync::sync::{content_hash, manifest, HashAlgorithm};

fn httpsync() -> Command {
    let mut cmd = Command::cargo_bin("httpsync").unwrap();
    for var in [
        "HTTPSYNC_URL",
        "HTTPSYNC_ROOT",
        "HTTPSYNC_MANIFEST",
        "HTTPSYNC_ALGORITHM",
        "HTTPSYNC_TIMEOUT",
        "HTTPSYNC_CONFIG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_version_json() {
    let output = httpsync().args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["default_algorithm"], "md5");
}

#[test]
fn test_manifest_written_next_to_files() {
    let public = tempfile::tempdir().unwrap();
    fs::write(public.path().join("a.txt"), "abcd").unwrap();
    fs::create_dir_all(public.path().join("sub")).unwrap();
    fs::write(public.path().join("sub/b.txt"), "b").unwrap();
    // Left over from a previous run; must not list itself.
    fs::write(public.path().join("md5"), "{}").unwrap();
    let output_path = public.path().join("md5");

    let output = httpsync()
        .arg("manifest")
        .arg(public.path())
        .arg("--output")
        .arg(&output_path)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let inventory = manifest::parse(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(inventory.len(), 2);
    let record = inventory.get("a.txt").unwrap();
    assert_eq!(record.content_hash, content_hash(b"abcd", HashAlgorithm::Md5));
    assert_eq!(record.size_bytes, 4);
    assert!(inventory.contains("sub/b.txt"));
    assert!(!inventory.contains("md5"));
}

#[test]
fn test_manifest_to_stdout_with_sha256() {
    let public = tempfile::tempdir().unwrap();
    fs::write(public.path().join("x.bin"), "x").unwrap();

    let output = httpsync()
        .arg("manifest")
        .arg(public.path())
        .args(["--algorithm", "sha256"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let inventory = manifest::parse(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(
        inventory.get("x.bin").unwrap().content_hash,
        content_hash(b"x", HashAlgorithm::Sha256)
    );
}

#[test]
fn test_manifest_rejects_missing_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    httpsync()
        .arg("manifest")
        .arg(temp_dir.path().join("missing"))
        .assert()
        .code(4);
}

#[test]
fn test_sync_without_url_is_invalid_argument() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();

    let output = httpsync()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--root"])
        .arg(temp_dir.path().join("root"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let error: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn test_sync_with_broken_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, "not json").unwrap();

    httpsync()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--url", "http://127.0.0.1:9/"])
        .assert()
        .code(7);
}

/// Last stderr line; earlier lines may be log output.
fn structured_error(stderr: &[u8]) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(stderr);
    let line = stderr.lines().last().unwrap_or_default();
    serde_json::from_str(line).unwrap()
}

/// Serve `body` as the response to every request on a localhost port.
fn serve_fixed(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://127.0.0.1:{port}/")
}

#[test]
fn test_sync_unreachable_server_is_transport_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    let root = temp_dir.path().join("root");

    let output = httpsync()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--url", "http://127.0.0.1:9/", "--timeout", "2", "--root"])
        .arg(&root)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], false);
    let error = structured_error(&output.stderr);
    assert_eq!(error["error"]["code"], "TRANSPORT_ERROR");
    assert_eq!(error["error"]["retryable"], true);
    assert!(root.is_dir());
}

#[test]
fn test_sync_malformed_manifest_is_format_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    let root = temp_dir.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("keep.txt"), "mine").unwrap();
    let url = serve_fixed("[1, 2, 3]");

    let output = httpsync()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--url", &url, "--timeout", "5", "--root"])
        .arg(&root)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    let error = structured_error(&output.stderr);
    assert_eq!(error["error"]["code"], "MANIFEST_FORMAT_ERROR");
    assert!(root.join("keep.txt").exists());
}
