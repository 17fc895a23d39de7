use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use plcprims_field::{AddressParser, Df1AddressParser, FieldDescriptor};

use crate::exit::{field_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod read;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read fields from a DF1 controller over ISO-on-TCP.
    Read(ReadArgs),
    /// Print the framed DF1 read commands for fields without sending them.
    Encode(EncodeArgs),
    /// Decode framed DF1 commands and replies.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Controller address (HOST:PORT).
    #[arg(env = "PLCPRIMS_TARGET")]
    pub target: String,
    /// Field to read as NAME=ADDRESS, e.g. `DB1/DB100=100:INTEGER`. Repeatable.
    #[arg(long = "field", short = 'f', value_name = "NAME=ADDRESS", required = true)]
    pub fields: Vec<String>,
    /// Connect and reply timeout (e.g. 5s, 500ms).
    #[arg(long, env = "PLCPRIMS_TIMEOUT", default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Field to encode as NAME=ADDRESS. Repeatable.
    #[arg(long = "field", short = 'f', value_name = "NAME=ADDRESS", required = true)]
    pub fields: Vec<String>,
    /// Transaction id of the first command; later fields count up.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub tns: u16,
    /// Write the raw frames to a file instead of printing them.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded frames, one record per argument.
    #[arg(value_name = "HEX", conflicts_with = "file")]
    pub frames: Vec<String>,
    /// Read back-to-back frames from a capture file.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
    /// Reject frames whose declared length differs from their size.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `NAME=ADDRESS` arguments. A `/` in NAME separates container and element.
pub fn parse_fields(args: &[String]) -> CliResult<Vec<FieldDescriptor>> {
    args
        .iter()
        .map(|arg| {
            let (name, address) = arg.split_once('=').ok_or_else(|| {
                CliError::new(USAGE, format!("field must be NAME=ADDRESS: {arg}"))
            })?;
            let (container, element) = name.split_once('/').unwrap_or(("", name));
            Df1AddressParser
                .parse(container, element, address)
                .map_err(|err| field_error(arg, err))
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
