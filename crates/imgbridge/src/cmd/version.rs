use imgbridge_schema::{MessageType, LATEST_STATE_CAPACITY, REPEATABLE_CAPACITY};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("imgbridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: imgbridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("IMGBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("endian: {}", if cfg!(target_endian = "little") { "little" } else { "big" });
    println!("usize_bytes: {}", std::mem::size_of::<usize>());
    println!(
        "message_types: {}",
        MessageType::ALL
            .iter()
            .map(|ty| format!("{}={}", ty.name(), ty.as_raw()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("queue_capacity: latest_state={LATEST_STATE_CAPACITY}, repeatable={REPEATABLE_CAPACITY}");
    println!("features: peer={}, cli=true", cfg!(feature = "peer"));

    Ok(SUCCESS)
}
