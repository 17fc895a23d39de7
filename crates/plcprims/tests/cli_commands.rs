#![cfg(feature = "cli")]

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

use plcprims_driver::Df1Codec;
use plcprims_frame::{FrameReader, FrameWriter};

const SPEED_FRAME: &str = "0300000b01000001006402";

fn plcprims(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plcprims"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("plcprims should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn unique_temp_file(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "plcprims-{tag}-{}-{}.bin",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

/// Accept one connection and answer every read with `value` until EOF.
fn spawn_fake_plc(value: i16) -> (String, thread::JoinHandle<Vec<u16>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr").to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept should succeed");
        let mut reader = FrameReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = FrameWriter::new(stream);
        let mut seen = Vec::new();

        while let Ok(frame) = reader.read_frame() {
            let command = Df1Codec
                .decode_command(&frame.payload)
                .expect("client should send a valid command");
            seen.push(command.transaction_id);

            let mut reply = vec![0x41, 0x00];
            reply.extend_from_slice(&command.transaction_id.to_be_bytes());
            reply.extend_from_slice(&value.to_be_bytes());
            if writer.send(&reply).is_err() {
                break;
            }
        }
        seen
    });

    (addr, handle)
}

#[test]
fn version_prints_package_version() {
    let output = plcprims(&["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_reports_protocols() {
    let output = plcprims(&["version", "--extended"]);
    assert!(output.status.success());

    let info: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("version output is json");
    assert_eq!(info["name"], "plcprims");
    assert_eq!(info["protocols"][1], "df1");
    assert_eq!(info["features"]["cli"], true);
}

#[test]
fn encode_prints_framed_read_command() {
    let output = plcprims(&["encode", "--field", "DB1/DB100=100:INTEGER"]);
    assert!(output.status.success());

    let record: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("encode output is json");
    assert_eq!(record["field"], "DB1/DB100");
    assert_eq!(record["transaction_id"], 1);
    assert_eq!(record["frame"], SPEED_FRAME);
}

#[test]
fn encode_numbers_fields_from_tns() {
    let output = plcprims(&[
        "encode",
        "--tns",
        "9",
        "--field",
        "a=100:INTEGER",
        "--field",
        "b=102:INTEGER",
    ]);
    assert!(output.status.success());

    let ids: Vec<u64> = stdout(&output)
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line).expect("json line");
            record["transaction_id"].as_u64().expect("numeric id")
        })
        .collect();
    assert_eq!(ids, vec![9, 10]);
}

#[test]
fn encode_logical_address_is_usage_error() {
    let output = plcprims(&["encode", "--field", "count=N7:0:INTEGER"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stdout(&output).is_empty());
}

#[test]
fn encode_to_file_then_decode_file() {
    let path = unique_temp_file("capture");
    let path_arg = path.to_string_lossy().into_owned();

    let output = plcprims(&[
        "encode",
        "--field",
        "a=100:INTEGER",
        "--field",
        "b=7:BIT",
        "--out",
        &path_arg,
    ]);
    assert!(output.status.success());

    let output = plcprims(&["decode", "--file", &path_arg]);
    assert!(output.status.success());
    let text = stdout(&output);
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["message"], "read_request");
    assert_eq!(records[0]["address"], "100");
    assert_eq!(records[1]["data_type"], "BIT");
    assert_eq!(records[1]["transaction_id"], 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn decode_hex_reply() {
    let output = plcprims(&["decode", "0300000a41000001002a"]);
    assert!(output.status.success());

    let record: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("decode output is json");
    assert_eq!(record["message"], "read_reply");
    assert_eq!(record["transaction_id"], 1);
    assert_eq!(record["status"], 0);
    assert_eq!(record["data"], "002a");
}

#[test]
fn decode_bad_magic_is_data_invalid() {
    let output = plcprims(&["decode", "0400000b01000001006402"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_unknown_command_reports_invalid_record() {
    let output = plcprims(&["decode", "0300000899000001"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(stdout(&output).contains("\"message\":\"invalid\""));
}

#[test]
fn decode_bad_hex_is_usage_error() {
    let output = plcprims(&["decode", "03zz"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn read_against_fake_plc() {
    let (addr, plc) = spawn_fake_plc(42);

    let output = plcprims(&[
        "read",
        &addr,
        "--field",
        "speed=100:INTEGER",
        "--timeout",
        "3s",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("read output is json");
    assert_eq!(result["target"], addr.as_str());
    assert_eq!(result["fields"][0]["field"], "speed");
    assert_eq!(result["fields"][0]["status"], "OK");
    assert_eq!(result["fields"][0]["value"]["integer"], 42);

    let seen = plc.join().expect("fake plc thread");
    assert_eq!(seen, vec![1]);
}

#[test]
fn read_refused_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);

    let output = plcprims(&["read", &addr, "--field", "speed=100:INTEGER", "--timeout", "2s"]);
    assert_eq!(output.status.code(), Some(3));
}
