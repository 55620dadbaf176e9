//! CLI argument parsing for partid

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "partid")]
#[command(about = "List block devices with their PTUUID/PARTUUID")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// sysfs block directory to enumerate
    #[arg(long, default_value = "/sys/block", global = true)]
    pub sys_block_root: PathBuf,

    /// Directory holding the device nodes to probe
    #[arg(long, default_value = "/dev", global = true)]
    pub dev_root: PathBuf,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    pub compact: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every block device with its partitions
    List {
        /// Hide loop, ram, zram, dm, md and optical devices
        #[arg(long)]
        skip_virtual: bool,

        /// Report sysfs geometry only, without reading partition tables
        #[arg(long)]
        no_probe: bool,
    },

    /// Show a single device by kernel name or /dev path
    Show {
        /// e.g. sda or /dev/nvme0n1
        target: String,
    },

    /// Probe the partition table of a device node or disk image
    Probe { path: PathBuf },
}
