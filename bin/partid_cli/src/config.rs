use crate::cli::{Cli, Command};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sys_block_root: PathBuf,
    pub dev_root: PathBuf,
    pub skip_virtual: bool,
    /// Read partition tables; off means geometry only.
    pub probe: bool,
    pub compact: bool,
}

impl Config {
    pub fn new(cli: &Cli) -> Self {
        let (skip_virtual, no_probe) = match &cli.command {
            Command::List {
                skip_virtual,
                no_probe,
            } => (*skip_virtual, *no_probe),
            _ => (false, false),
        };
        Self {
            sys_block_root: cli.sys_block_root.clone(),
            dev_root: cli.dev_root.clone(),
            skip_virtual,
            probe: !no_probe,
            compact: cli.compact,
        }
    }
}
