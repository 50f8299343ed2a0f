//! Stakeline CLI
//!
//! Offline operator utilities over exported delegation data:
//! - reconciling the local intermediate store and printing the merged view
//! - building unsigned unbonding and withdrawal PSBTs for external signing

use std::process;

mod args;
mod cmd;
mod context;

use args::{Args, Command};

fn main() {
    if let Err(e) = run() {
        eprintln!("stakeline-cli: {e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let ctx = context::CliContext::load(&args.config)?;
    ctx.init_logging()?;

    let output = match args.command {
        Command::View(args) => cmd::view::view(&ctx, args)?,
        Command::BuildPsbt(args) => cmd::build_psbt::build_psbt(&ctx, args)?,
    };
    println!("{output}");

    Ok(())
}
