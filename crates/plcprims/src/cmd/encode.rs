use std::fs::File;
use std::io::BufWriter;

use bytes::{Bytes, BytesMut};
use plcprims_driver::{Codec, Command, Df1Codec};
use plcprims_field::RequestKind;
use plcprims_frame::{encode_frame, FrameWriter};
use serde::Serialize;

use crate::cmd::{parse_fields, EncodeArgs};
use crate::exit::{codec_error, frame_error, io_error, CliResult, SUCCESS};
use crate::hex;
use crate::output::{print_json, print_raw, print_table, OutputFormat};

#[derive(Serialize)]
struct EncodedCommand {
    field: String,
    address: String,
    data_type: String,
    transaction_id: u16,
    frame: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut transaction_id = args.tns;
    let mut frames = Vec::with_capacity(args.fields.len());

    for field in parse_fields(&args.fields)? {
        let command = Command {
            transaction_id,
            kind: RequestKind::Read,
            field,
            value: None,
        };
        let mut payload = BytesMut::new();
        Df1Codec
            .encode(&command, &mut payload)
            .map_err(|err| codec_error(command.field.name(), err))?;
        frames.push((command, payload.freeze()));
        transaction_id = transaction_id.checked_add(1).unwrap_or(1);
    }

    if let Some(path) = &args.out {
        let file = File::create(path)
            .map_err(|err| io_error(&format!("create {}", path.display()), err))?;
        let mut writer = FrameWriter::new(BufWriter::new(file));
        for (_, payload) in &frames {
            writer
                .send(payload)
                .map_err(|err| frame_error("write frame", err))?;
        }
        tracing::info!(count = frames.len(), path = %path.display(), "frames written");
        return Ok(SUCCESS);
    }

    let mut wire = Vec::with_capacity(frames.len());
    for (command, payload) in &frames {
        wire.push((command, framed(payload)?));
    }

    match format {
        OutputFormat::Json => {
            for (command, bytes) in &wire {
                print_json(&EncodedCommand {
                    field: command.field.name().to_string(),
                    address: command.field.address().to_string(),
                    data_type: command.field.data_type().to_string(),
                    transaction_id: command.transaction_id,
                    frame: hex::encode(bytes),
                });
            }
        }
        OutputFormat::Table => print_table(
            &["FIELD", "ADDRESS", "TYPE", "TNS", "FRAME"],
            wire.iter().map(|(command, bytes)| {
                vec![
                    command.field.name().to_string(),
                    command.field.address().to_string(),
                    command.field.data_type().to_string(),
                    command.transaction_id.to_string(),
                    hex::encode(bytes),
                ]
            }),
        ),
        OutputFormat::Pretty => {
            for (command, bytes) in &wire {
                println!("{} {}", command.field, hex::encode(bytes));
            }
        }
        OutputFormat::Raw => {
            for (_, bytes) in &wire {
                print_raw(bytes);
            }
        }
    }

    Ok(SUCCESS)
}

fn framed(payload: &Bytes) -> CliResult<Bytes> {
    let mut buf = BytesMut::new();
    encode_frame(payload, &mut buf).map_err(|err| frame_error("frame command", err))?;
    Ok(buf.freeze())
}
