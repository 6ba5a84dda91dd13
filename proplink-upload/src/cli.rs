// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use proplink_common::LoadArgs;

use crate::commands;
use crate::plug::{LoaderBlobs, PlugSession};
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "proplink-upload")]
#[command(about = "Propeller image upload tool for the proplink bridge or a Prop Plug")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// Drive a Prop Plug style USB-serial adapter directly; DTR resets the target
    #[arg(long)]
    pub plug: bool,

    /// Directory holding the second-stage loader binaries (plug mode only)
    #[arg(long, value_name = "DIR", default_value = "loader")]
    pub loader_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Link options shared by the load commands.
#[derive(Args, Clone, Copy, Debug)]
pub struct LinkArgs {
    /// Baud rate for the boot ROM handshake [default: 115200]
    #[arg(long)]
    pub initial_baud: Option<u32>,

    /// Baud rate left on the link after the load [default: initial baud]
    #[arg(long)]
    pub final_baud: Option<u32>,

    /// Baud rate for the second-stage packet exchange [default: 921600]
    #[arg(long)]
    pub second_stage_baud: Option<u32>,

    /// Bridge GPIO wired to the target's reset input [default: 12]
    #[arg(long)]
    pub reset_pin: Option<u8>,
}

impl From<LinkArgs> for LoadArgs {
    fn from(a: LinkArgs) -> Self {
        LoadArgs {
            initial_baud: a.initial_baud,
            final_baud: a.final_baud,
            second_stage_baud: a.second_stage_baud,
            reset_pin: a.reset_pin,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Get bridge status
    Status,

    /// Load an image through the second-stage loader
    Load {
        /// Propeller binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// What the target does with the image once verified
        #[arg(
            short,
            long,
            default_value = "run",
            value_parser = ["run", "program", "program-and-run"]
        )]
        command: String,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Load a small image (up to 2048 bytes) through the boot ROM alone and run it
    RomLoad {
        /// Propeller binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        link: LinkArgs,
    },

    /// Abort the bridge's current session
    Abort,
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    if cli.plug {
        return run_plug(cli);
    }

    let mut transport = Transport::new(&cli.port)?;

    match cli.command {
        Commands::Status => commands::status(&mut transport),
        Commands::Load {
            file,
            command,
            link,
        } => commands::load(&mut transport, &file, &command, &link.into()),
        Commands::RomLoad { file, link } => {
            commands::rom_load(&mut transport, &file, &link.into())
        }
        Commands::Abort => commands::abort(&mut transport),
    }
}

fn run_plug(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Load {
            file,
            command,
            link,
        } => {
            let blobs = LoaderBlobs::read(&cli.loader_dir)?;
            let mut session = PlugSession::open(&cli.port, blobs.stage())?;
            commands::load(&mut session, &file, &command, &link.into())
        }
        Commands::RomLoad { file, link } => {
            let blobs = LoaderBlobs::default();
            let mut session = PlugSession::open(&cli.port, blobs.stage())?;
            commands::rom_load(&mut session, &file, &link.into())
        }
        Commands::Status | Commands::Abort => {
            bail!("status and abort need the bridge; drop --plug")
        }
    }
}
