use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use etherparse::PacketBuilder;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;
use wsshark_core::{Linktype, Opcode, RawPacket, encode_frame, encode_pcapng};

const MASK: [u8; 4] = [9, 8, 7, 6];

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("wsshark"))
}

fn tcp(ts_us: u64, to_server: bool, payload: &[u8]) -> RawPacket {
    let (client, server) = (([172, 16, 0, 5], 41000), ([172, 16, 0, 1], 9000));
    let (from, to) = if to_server {
        (client, server)
    } else {
        (server, client)
    };
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 5], [2, 0, 0, 0, 0, 1])
        .ipv4(from.0, to.0, 64)
        .tcp(from.1, to.1, 1, 8192);
    let mut data = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut data, payload).unwrap();
    RawPacket::new(ts_us, Linktype::ETHERNET, data)
}

fn session(extra: Option<RawPacket>) -> Vec<RawPacket> {
    let request = b"GET /ws HTTP/1.1\r\nHost: 172.16.0.1\r\nUpgrade: websocket\r\n\
Connection: Upgrade\r\nSec-WebSocket-Key: AQIDBAUGBwgJCgsMDQ4PEA==\r\n\
Sec-WebSocket-Version: 13\r\n\r\n";
    let response = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\
Connection: Upgrade\r\n\r\n";
    let mut packets = vec![
        tcp(1_000_000, true, request),
        tcp(1_001_000, false, response),
        tcp(1_002_000, true, &encode_frame(true, Opcode::Text, Some(MASK), b"ping?")),
    ];
    packets.extend(extra);
    packets.push(tcp(
        1_010_000,
        true,
        &encode_frame(true, Opcode::Close, Some(MASK), &[0x03, 0xe8]),
    ));
    packets
}

fn write_capture(dir: &Path, name: &str, packets: &[RawPacket]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode_pcapng(Linktype::ETHERNET, 65535, packets).unwrap()).unwrap();
    path
}

fn sample_capture(dir: &Path) -> PathBuf {
    write_capture(dir, "input.pcapng", &session(None))
}

#[test]
fn help_supports_analyse_and_analyze() {
    cmd()
        .arg("pcap")
        .arg("analyse")
        .arg("--help")
        .assert()
        .success();
    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--archive-dir"));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.pcapng");
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.txt");
    fs::write(&input, b"not a capture").unwrap();

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format"));
}

#[test]
fn stdout_outputs_json_and_archives_session() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());
    let archives = temp.path().join("archives");

    let assert = cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .arg("--archive-dir")
        .arg(&archives)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let report: Value = serde_json::from_str(&stdout).expect("valid json");

    assert_eq!(report["tool"]["name"], "wsshark");
    assert_eq!(report["sessions"][0]["state"], "closed");
    assert_eq!(report["sessions"][0]["client"], "172.16.0.5:41000");
    assert!(
        archives
            .join("websock__172.16.0.5_41000__172.16.0.1_9000__19700101T000001.000000Z.pcapng")
            .is_file()
    );
}

#[test]
fn report_file_is_written() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyse")
        .arg(input)
        .arg("-o")
        .arg(&report)
        .arg("--pretty")
        .arg("--archive-dir")
        .arg(temp.path().join("archives"))
        .assert()
        .success()
        .stderr(contains("OK: report written"));

    let text = fs::read_to_string(&report).unwrap();
    assert!(text.contains('\n'));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["capture_summary"]["packets_total"], 4);
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_must_differ_from_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .code(2)
        .stderr(contains("report path must differ from input"));
}

#[test]
fn glob_must_match_one_file() {
    let temp = TempDir::new().expect("tempdir");
    write_capture(temp.path(), "a.pcapng", &session(None));
    write_capture(temp.path(), "b.pcapng", &session(None));
    let pattern = temp.path().join("*.pcapng");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match pattern").and(contains("hint:")));
}

#[test]
fn quiet_suppresses_ok_message_and_logs() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--archive-dir")
        .arg(temp.path().join("archives"))
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not().and(contains("text payload").not()));
}

#[test]
fn list_sessions_outputs_endpoints() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(temp.path());

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .arg("--archive-dir")
        .arg(temp.path().join("archives"))
        .arg("--list-sessions")
        .assert()
        .success()
        .stderr(contains("Sessions:").and(contains("172.16.0.5:41000 -> 172.16.0.1:9000 closed")));
}

#[test]
fn strict_fails_when_anomalies_present() {
    let temp = TempDir::new().expect("tempdir");
    // Header claims 16 payload bytes, segment carries 2.
    let broken = tcp(1_005_000, false, &[0x82, 0x10, 0xaa, 0xbb]);
    let input = write_capture(temp.path(), "broken.pcapng", &session(Some(broken)));

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .arg("--archive-dir")
        .arg(temp.path().join("archives"))
        .arg("--strict")
        .assert()
        .code(2)
        .stderr(contains("frame anomalies or archive failures detected"));
}
