//
// args.rs
// Copyright (C) 2022 matthew <matthew@matthew-VirtualBox>
// Distributed under terms of the MIT license.
//

use std::path::PathBuf;

use clap::Parser;

/// # Rust based vim variant
///
/// A terminal frontend over `vim-engine`: implements `HostBridge` on top of
/// a `Vec<String>` buffer and crossterm, the way `core/src/args.rs` wires
/// its own `vim-core` up to the `rust-vim` binary.
#[derive(Debug, Parser)]
#[clap(version, author, about)]
pub struct Args {
    /// File to open; a scratch buffer is used if omitted.
    pub file: Option<PathBuf>,
    #[clap(short = 'R', long)]
    pub read_only: bool,
    #[clap(short, long)]
    pub command: Vec<String>,
}
