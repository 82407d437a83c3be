// CLASSIFICATION: COMMUNITY
// Filename: fsboot.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! fsboot command-line tool: inspect, boot, update and reset the boot config.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Env;

use fsboot::bootflow::{self, CommandLauncher};
use fsboot::config;
use fsboot::context::FsbContext;
use fsboot::formatter::CommandFormatter;
use fsboot::select;
use fsboot::update;
use fsboot::wire::{BootConfig, SlotId};

#[derive(Parser)]
#[command(name = "fsboot", about = "Failsafe-boot slot management")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the active boot config and the slot that would boot next
    Show,
    /// Pick a slot, record the attempt and hand control to its boot command
    Boot,
    /// Flash an image into the inactive OS copy and promote it
    Update { image: PathBuf },
    /// Reset the boot config to the factory default
    Reset,
}

fn cmd_show() -> anyhow::Result<()> {
    let config = config::load_active();
    let store = fsboot::open_store(&config.partitions)?;
    let ctx = FsbContext::load(store);
    let active = ctx.active();

    println!("chosen: {}", active.chosen);
    println!("next:   {}", select::pick_slot(active));
    for id in SlotId::ALL {
        let slot = active.slot(id);
        println!(
            "{:<9} priority={:<2} tries_remaining={:<2} successful_boot={} force={}",
            id,
            slot.priority,
            slot.tries_remaining,
            u8::from(slot.successful_boot),
            u8::from(slot.force)
        );
    }
    Ok(())
}

fn cmd_boot() -> anyhow::Result<()> {
    let config = config::load_active();
    let store = fsboot::open_store(&config.partitions)?;
    let mut ctx = FsbContext::load(store);
    let mut launcher = CommandLauncher::new(config.boot);
    let slot = bootflow::run_boot(&mut ctx, &mut launcher)?;
    println!("booted {slot}");
    Ok(())
}

fn cmd_update(image: PathBuf) -> anyhow::Result<()> {
    let config = config::load_active();
    let store = fsboot::open_store(&config.partitions)?;
    let mut ctx = FsbContext::load(store);
    let mut formatter = CommandFormatter::new(&config.update);
    let bytes = std::fs::read(&image)?;
    let slot = update::apply_update(&mut ctx, &mut formatter, &bytes)?;
    println!("updated {slot}");
    Ok(())
}

fn cmd_reset() -> anyhow::Result<()> {
    let config = config::load_active();
    let store = fsboot::open_store(&config.partitions)?;
    let mut ctx = FsbContext::load(store);
    *ctx.working_mut() = BootConfig::default();
    ctx.save()?;
    println!("boot config reset to factory default");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Show => cmd_show(),
        Cmd::Boot => cmd_boot(),
        Cmd::Update { image } => cmd_update(image),
        Cmd::Reset => cmd_reset(),
    }
}
