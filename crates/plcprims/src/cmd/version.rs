use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    protocols: &'static [&'static str],
    features: Features,
}

#[derive(Serialize)]
struct Features {
    driver: bool,
    r#async: bool,
    cli: bool,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("plcprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = BuildInfo {
        name: "plcprims",
        version: env!("CARGO_PKG_VERSION"),
        target: option_env!("PLCPRIMS_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("PLCPRIMS_BUILD_PROFILE").unwrap_or("unknown"),
        protocols: &["iso-on-tcp", "df1"],
        features: Features {
            driver: cfg!(feature = "driver"),
            r#async: cfg!(feature = "async"),
            cli: true,
        },
    };

    match format {
        OutputFormat::Json => print_json(&info),
        _ => {
            println!("name: {}", info.name);
            println!("version: {}", info.version);
            println!("target: {}", info.target);
            println!("profile: {}", info.profile);
            println!("protocols: {}", info.protocols.join(", "));
            println!(
                "features: driver={}, async={}, cli={}",
                info.features.driver, info.features.r#async, info.features.cli
            );
        }
    }

    Ok(SUCCESS)
}
