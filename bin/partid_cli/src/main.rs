use anyhow::{Context, Result};
use clap::Parser;
use partid_core::{
    enrich_all, enrich_device, find_all, find_by_device_path, find_by_name, probe_path,
    BlockDeviceInfo, DevNodeOpener,
};
use serde::Serialize;
use std::path::Path;

mod cli;
mod config;
mod logging;

use cli::{Cli, Command};
use config::Config;

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = Config::new(&cli);

    match &cli.command {
        Command::List { .. } => {
            let devices = list(&config)?;
            print_json(&devices, config.compact)?;
        }
        Command::Show { target } => {
            let device = show(&config, target)?;
            print_json(&device, config.compact)?;
        }
        Command::Probe { path } => {
            let table = probe_path(path)
                .with_context(|| format!("probing {}", path.display()))?;
            print_json(&table, config.compact)?;
        }
    }

    Ok(())
}

fn list(config: &Config) -> Result<Vec<BlockDeviceInfo>> {
    let root = &config.sys_block_root;
    let mut devices = find_all(root, config.skip_virtual)
        .with_context(|| format!("enumerating block devices under {}", root.display()))?;
    if config.probe {
        let opener = DevNodeOpener::new(&config.dev_root);
        let outcomes = enrich_all(&opener, &mut devices);
        let probed = outcomes.iter().filter(|o| o.is_probed()).count();
        log::info!("probed {} of {} device(s)", probed, devices.len());
    }
    Ok(devices)
}

fn show(config: &Config, target: &str) -> Result<BlockDeviceInfo> {
    let mut device = if target.contains('/') {
        find_by_device_path(&config.sys_block_root, Path::new(target))
    } else {
        find_by_name(&config.sys_block_root, target)
    }
    .with_context(|| format!("looking up {}", target))?;

    enrich_device(&DevNodeOpener::new(&config.dev_root), &mut device);
    Ok(device)
}

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}
