//! End-to-end provisioning tests against local HTTP servers.

use flate2::write::GzEncoder;
use flate2::Compression;
use httpmock::prelude::*;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use toolshed::artifact::{Artifact, InstallSource};
use toolshed::deadline::Deadline;
use toolshed::fetch::Fetcher;
use toolshed::prefix::Prefix;
use toolshed::provision::Orchestrator;
use toolshed::ToolshedError;

/// A tar.gz archive holding a single shell script at `inner_path`.
fn script_tar_gz(inner_path: &str, script: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let data = script.as_bytes();
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, inner_path, data).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn make_prefix(temp: &TempDir, extra_entries: &[PathBuf]) -> Prefix {
    let mut search_path = vec![temp.path().join("bin")];
    search_path.extend_from_slice(extra_entries);
    search_path.push(PathBuf::from("/usr/bin"));
    search_path.push(PathBuf::from("/bin"));
    let prefix = Prefix::new(temp.path().to_path_buf(), search_path).unwrap();
    prefix.prepare_tmp().unwrap();
    prefix
}

fn download_artifact(name: &str, url: String, sha256: String, version: &str) -> Artifact {
    Artifact {
        name: name.into(),
        source: InstallSource::DirectDownload { url, sha256 },
        version: Some(version.into()),
        version_flag: "--version".into(),
        health: None,
        retain_dir: false,
    }
}

#[test]
fn provisions_a_tool_from_an_archive_and_is_idempotent() {
    let archive = script_tar_gz("ripgrep-14.1.0/rg", "#!/bin/sh\necho 14.1.0\n");
    let sha256 = digest(&archive);

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/rg.tar.gz");
        then.status(200)
            .header(
                "content-disposition",
                "attachment; filename=\"ripgrep-14.1.0.tar.gz\"",
            )
            .body(&archive);
    });

    let temp = TempDir::new().unwrap();
    let prefix = make_prefix(&temp, &[]);
    let artifact = download_artifact("rg", server.url("/rg.tar.gz"), sha256, "14.1.0");
    let orchestrator = Orchestrator::with_deadlines(Duration::from_secs(30), Duration::from_secs(20));

    let report = orchestrator.provision(&[artifact.clone()], &prefix).unwrap();
    assert_eq!(report.installed, vec!["rg"]);
    assert!(prefix.bin_destination("rg").is_file());
    mock.assert_hits(1);

    // Second run finds the tool healthy and never touches the network.
    let report = orchestrator.provision(&[artifact], &prefix).unwrap();
    assert_eq!(report.skipped, vec!["rg"]);
    assert!(report.installed.is_empty());
    mock.assert_hits(1);
}

#[test]
fn retained_tool_lands_under_share_with_its_tree() {
    let archive = script_tar_gz("mytool-2.0/bin/mytool", "#!/bin/sh\necho 2.0\n");
    let sha256 = digest(&archive);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/mytool.tar.gz");
        then.status(200)
            .header(
                "content-disposition",
                "attachment; filename=\"mytool-2.0.tar.gz\"",
            )
            .body(&archive);
    });

    let temp = TempDir::new().unwrap();
    let tool_bin = temp.path().join("share/mytool/bin");
    let prefix = make_prefix(&temp, &[tool_bin.clone()]);
    let mut artifact =
        download_artifact("mytool", server.url("/mytool.tar.gz"), sha256, "2.0");
    artifact.retain_dir = true;

    let orchestrator = Orchestrator::with_deadlines(Duration::from_secs(30), Duration::from_secs(20));
    let report = orchestrator.provision(&[artifact], &prefix).unwrap();
    assert_eq!(report.installed, vec!["mytool"]);
    assert!(tool_bin.join("mytool").is_file());
    assert!(!prefix.bin_destination("mytool").exists());
}

/// Serves one canned raw HTTP response per connection, in order.
fn scripted_server(responses: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(&response);
        }
    });
    format!("http://{addr}/tool.tar.gz")
}

fn http_response(status_line: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status_line}\r\n\
         Content-Disposition: attachment; filename=\"tool.tar.gz\"\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

#[test]
fn download_survives_a_server_error_and_a_corrupt_payload() {
    let archive = script_tar_gz("tool", "#!/bin/sh\necho ok\n");
    let sha256 = digest(&archive);

    let url = scripted_server(vec![
        http_response("503 Service Unavailable", b"try later"),
        http_response("200 OK", b"not the archive you expected"),
        http_response("200 OK", &archive),
    ]);

    let temp = TempDir::new().unwrap();
    let fetcher = Fetcher::new();
    let deadline = Deadline::after(Duration::from_secs(60));
    let path = fetcher
        .fetch("tool", &url, &sha256, temp.path(), deadline)
        .expect("third attempt should succeed");
    assert_eq!(std::fs::read(path).unwrap(), archive);
}

#[test]
fn stalled_download_is_cut_off_by_the_deadline() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept() {
            held.push(stream);
        }
    });

    let temp = TempDir::new().unwrap();
    let prefix = make_prefix(&temp, &[]);
    let artifact = download_artifact(
        "stuck",
        format!("http://{addr}/stuck.tar.gz"),
        "ab".repeat(32),
        "1.0",
    );

    let started = Instant::now();
    let orchestrator =
        Orchestrator::with_deadlines(Duration::from_millis(800), Duration::from_millis(400));
    let err = orchestrator.provision(&[artifact], &prefix).unwrap_err();
    assert!(matches!(err, ToolshedError::ProvisionIncomplete { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn mixed_run_installs_custom_and_download_artifacts() {
    let archive = script_tar_gz("pkg/dl", "#!/bin/sh\necho 1.0\n");
    let sha256 = digest(&archive);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/dl.tar.gz");
        then.status(200)
            .header("content-disposition", "attachment; filename=\"dl.tar.gz\"")
            .body(&archive);
    });

    let temp = TempDir::new().unwrap();
    let prefix = make_prefix(&temp, &[]);
    let download = download_artifact("dl", server.url("/dl.tar.gz"), sha256, "1.0");
    let custom = Artifact {
        name: "scripted".into(),
        source: InstallSource::Custom {
            commands: vec![
                "printf '#!/bin/sh\\necho ok\\n' > \"$TOOLSHED_BIN/scripted\"".into(),
                "chmod 755 \"$TOOLSHED_BIN/scripted\"".into(),
            ],
        },
        version: None,
        version_flag: "--version".into(),
        health: None,
        retain_dir: false,
    };

    let orchestrator = Orchestrator::with_deadlines(Duration::from_secs(30), Duration::from_secs(20));
    let report = orchestrator.provision(&[download, custom], &prefix).unwrap();
    assert_eq!(report.installed.len(), 2);
    assert!(prefix.bin_destination("dl").is_file());
    assert!(prefix.bin_destination("scripted").is_file());
}
