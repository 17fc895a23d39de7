use std::time::Duration;

use plcprims_driver::{Df1Codec, Driver, DriverConfig};
use plcprims_field::{PlcValue, Request, Response};
use serde::Serialize;
use tokio::net::TcpStream;

use crate::cmd::{parse_duration, parse_fields, ReadArgs};
use crate::exit::{driver_error, field_error, io_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct FieldRow<'a> {
    field: &'a str,
    transaction_id: u16,
    status: String,
    value: Option<&'a PlcValue>,
}

#[derive(Serialize)]
struct ReadOutput<'a> {
    target: &'a str,
    fields: Vec<FieldRow<'a>>,
}

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let request = parse_fields(&args.fields)?
        .into_iter()
        .fold(Request::read(), |builder, field| builder.field(field))
        .build()
        .map_err(|err| field_error("invalid request", err))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime start failed", err))?;
    let response = runtime.block_on(read_once(&args.target, &request, timeout))?;

    print_response(&args.target, &response, format);
    let all_ok = response.iter().all(|(_, outcome)| outcome.code.is_ok());
    Ok(if all_ok { SUCCESS } else { FAILURE })
}

async fn read_once(target: &str, request: &Request, timeout: Duration) -> CliResult<Response> {
    let stream = match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => return Err(io_error(&format!("connect to {target} failed"), err)),
        Err(_) => {
            return Err(CliError::new(
                TIMEOUT,
                format!("connect to {target} timed out after {timeout:?}"),
            ))
        }
    };
    if let Err(err) = stream.set_nodelay(true) {
        tracing::debug!(error = %err, "TCP_NODELAY not applied");
    }
    tracing::info!(peer = target, fields = request.len(), "connected");

    let config = DriverConfig::default().with_request_timeout(Some(timeout));
    let driver = Driver::from_stream(stream, Df1Codec, config);
    let result = driver.submit(request).await;
    driver.close().await;
    tracing::debug!(stats = ?driver.stats(), "session finished");

    result.map_err(|err| driver_error("read failed", err))
}

fn print_response(target: &str, response: &Response, format: OutputFormat) {
    let rows: Vec<FieldRow<'_>> = response
        .iter()
        .map(|(name, outcome)| FieldRow {
            field: name,
            transaction_id: outcome.transaction_id,
            status: outcome.code.to_string(),
            value: outcome.value.as_ref(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&ReadOutput {
            target,
            fields: rows,
        }),
        OutputFormat::Table => print_table(
            &["FIELD", "TNS", "STATUS", "VALUE"],
            rows.iter().map(|row| {
                vec![
                    row.field.to_string(),
                    row.transaction_id.to_string(),
                    row.status.clone(),
                    display_value(row.value),
                ]
            }),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "{}={} (tns={}, {})",
                    row.field,
                    display_value(row.value),
                    row.transaction_id,
                    row.status
                );
            }
        }
    }
}

fn display_value(value: Option<&PlcValue>) -> String {
    value.map_or_else(|| "-".to_string(), PlcValue::to_string)
}
