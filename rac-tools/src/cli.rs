//! Root CLI structure for rac-tools

use clap::{Parser, Subcommand, ValueEnum};
use rac_data::Game;

#[derive(Parser)]
#[command(name = "rac-tools")]
#[command(about = "Command-line tools for Ratchet & Clank PS2 asset files", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// WAD archive operations
    Wad {
        #[command(subcommand)]
        command: crate::commands::wad::WadCommands,
    },

    /// LZ compressed block operations
    Lz {
        #[command(subcommand)]
        command: crate::commands::lz::LzCommands,
    },

    /// Moby class operations
    Moby {
        #[command(subcommand)]
        command: crate::commands::moby::MobyCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Game selector accepted by `--game`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GameArg {
    /// Ratchet & Clank
    Rac1,
    /// Going Commando
    Rac2,
    /// Up Your Arsenal
    Rac3,
    /// Deadlocked
    Dl,
}

impl From<GameArg> for Game {
    fn from(game: GameArg) -> Self {
        match game {
            GameArg::Rac1 => Self::Rac1,
            GameArg::Rac2 => Self::Rac2,
            GameArg::Rac3 => Self::Rac3,
            GameArg::Dl => Self::Dl,
        }
    }
}
