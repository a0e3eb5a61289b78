use anyhow::Result;
use clap::Parser;

use stowaway::cli::{run_analyze, AnalyzeArgs};
use stowaway::logging::init_logger;

fn main() -> Result<()> {
    let args = AnalyzeArgs::parse();
    init_logger(args.verbose);

    run_analyze(&args)?;
    Ok(())
}
