use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("msgcomm {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: msgcomm");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("MSGCOMM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: actor={}, cli=true",
        cfg!(feature = "actor")
    );
    println!(
        "limits: max_timeout_secs={}, default_chunk_size={}",
        msgcomm::channel::MAX_TIMEOUT_SECS,
        msgcomm::channel::DEFAULT_CHUNK_SIZE
    );

    Ok(SUCCESS)
}
