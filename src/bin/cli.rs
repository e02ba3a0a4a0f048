// src/bin/cli.rs
use attendance_sync::{cli, log::init_file_logger};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_file_logger()?;

    let args = cli::Cli::parse();
    if !cli::run(args).await? {
        std::process::exit(1);
    }
    Ok(())
}
