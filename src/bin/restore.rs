use anyhow::Result;
use clap::Parser;

use stowaway::cli::{run_restore, RestoreArgs};
use stowaway::logging::init_logger;

fn main() -> Result<()> {
    let args = RestoreArgs::parse();
    init_logger(args.verbose);

    if !run_restore(&args)? {
        std::process::exit(1);
    }
    Ok(())
}
