use std::fs::File;
use std::io::BufReader;

use plcprims_driver::{Codec, CodecError, Df1Codec, ReplyKind};
use plcprims_field::{PlcValue, RequestKind};
use plcprims_frame::{FrameConfig, FrameReader};
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::hex;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "message", rename_all = "snake_case")]
enum Decoded {
    ReadRequest {
        transaction_id: u16,
        address: String,
        data_type: String,
    },
    WriteRequest {
        transaction_id: u16,
        address: String,
        data_type: String,
        value: Option<PlcValue>,
    },
    ReadReply {
        transaction_id: u16,
        status: u8,
        data: String,
    },
    WriteReply {
        transaction_id: u16,
        status: u8,
    },
    Invalid {
        error: String,
        payload: String,
    },
}

#[derive(Serialize)]
struct Record {
    index: usize,
    payload_size: usize,
    #[serde(flatten)]
    decoded: Decoded,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = FrameConfig {
        strict_length: args.strict,
        ..FrameConfig::default()
    };

    let payloads: Vec<Vec<u8>> = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
            FrameReader::with_config(BufReader::new(file), config)
                .read_to_end()
                .map_err(|err| frame_error("read capture", err))?
                .into_iter()
                .map(|frame| frame.payload.to_vec())
                .collect()
        }
        None => {
            if args.frames.is_empty() {
                return Err(CliError::new(USAGE, "provide HEX frames or --file"));
            }
            args.frames
                .iter()
                .map(|text| {
                    let record =
                        hex::decode(text).map_err(|err| CliError::new(USAGE, err))?;
                    let (payload, _) = config
                        .decode(&record)
                        .map_err(|err| frame_error("invalid frame", err))?;
                    Ok(payload.to_vec())
                })
                .collect::<CliResult<_>>()?
        }
    };

    let records: Vec<Record> = payloads
        .iter()
        .enumerate()
        .map(|(index, payload)| Record {
            index,
            payload_size: payload.len(),
            decoded: describe(payload),
        })
        .collect();
    print_records(&records, format);

    let any_invalid = records
        .iter()
        .any(|record| matches!(record.decoded, Decoded::Invalid { .. }));
    Ok(if any_invalid { DATA_INVALID } else { SUCCESS })
}

/// Requests are tried first; a command byte they do not know may be a reply.
fn describe(payload: &[u8]) -> Decoded {
    let codec = Df1Codec;
    let invalid = |err: CodecError| Decoded::Invalid {
        error: err.to_string(),
        payload: hex::encode(payload),
    };

    match codec.decode_command(payload) {
        Ok(command) => {
            let address = command.field.address().to_string();
            let data_type = command.field.data_type().to_string();
            match command.kind {
                RequestKind::Read => Decoded::ReadRequest {
                    transaction_id: command.transaction_id,
                    address,
                    data_type,
                },
                RequestKind::Write => Decoded::WriteRequest {
                    transaction_id: command.transaction_id,
                    address,
                    data_type,
                    value: command.value,
                },
            }
        }
        Err(CodecError::UnknownCommand(_)) => match codec.decode(payload) {
            Ok(reply) => match reply.kind {
                ReplyKind::Read => Decoded::ReadReply {
                    transaction_id: reply.transaction_id,
                    status: reply.status,
                    data: hex::encode(&reply.data),
                },
                ReplyKind::Write => Decoded::WriteReply {
                    transaction_id: reply.transaction_id,
                    status: reply.status,
                },
            },
            Err(err) => invalid(err),
        },
        Err(err) => invalid(err),
    }
}

fn print_records(records: &[Record], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                print_json(record);
            }
        }
        OutputFormat::Table => print_table(
            &["#", "MESSAGE", "TNS", "DETAIL"],
            records.iter().map(|record| {
                let (message, tns, detail) = summarize(&record.decoded);
                vec![record.index.to_string(), message.to_string(), tns, detail]
            }),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for record in records {
                let (message, tns, detail) = summarize(&record.decoded);
                println!("#{} {message} tns={tns} {detail}", record.index);
            }
        }
    }
}

fn summarize(decoded: &Decoded) -> (&'static str, String, String) {
    match decoded {
        Decoded::ReadRequest {
            transaction_id,
            address,
            data_type,
        } => (
            "read_request",
            transaction_id.to_string(),
            format!("{address}:{data_type}"),
        ),
        Decoded::WriteRequest {
            transaction_id,
            address,
            data_type,
            value,
        } => (
            "write_request",
            transaction_id.to_string(),
            match value {
                Some(value) => format!("{address}:{data_type} = {value}"),
                None => format!("{address}:{data_type}"),
            },
        ),
        Decoded::ReadReply {
            transaction_id,
            status,
            data,
        } => (
            "read_reply",
            transaction_id.to_string(),
            format!("status=0x{status:02x} data={data}"),
        ),
        Decoded::WriteReply {
            transaction_id,
            status,
        } => (
            "write_reply",
            transaction_id.to_string(),
            format!("status=0x{status:02x}"),
        ),
        Decoded::Invalid { error, payload } => ("invalid", "-".to_string(), format!("{error} ({payload})")),
    }
}
