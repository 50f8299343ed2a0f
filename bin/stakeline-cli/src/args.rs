use std::path::PathBuf;

use argh::FromArgs;

use crate::cmd::{build_psbt::BuildPsbtArgs, view::ViewArgs};

/// Stakeline delegation lifecycle tool.
#[derive(FromArgs, PartialEq, Debug)]
pub(crate) struct Args {
    /// path to the TOML config file
    #[argh(option, short = 'c')]
    pub(crate) config: PathBuf,

    #[argh(subcommand)]
    pub(crate) command: Command,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum Command {
    View(ViewArgs),
    BuildPsbt(BuildPsbtArgs),
}
