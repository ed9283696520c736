//! bl2save CLI - Borderlands 2 save file editor
//!
//! A Pure Rust decode/edit/encode pipeline for Borderlands 2 player save files.

mod commands;
mod utils;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use commands::{cmd_decode, cmd_encode, cmd_export_items, cmd_fix_challenges, cmd_get_rich};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bl2save")]
#[command(author, version, about = "Borderlands 2 save file editor")]
#[command(long_about = "
bl2save decodes, edits, and re-encodes Borderlands 2 player save files.

Examples:
  bl2save decode Save0001.sav decoded.bin
  bl2save encode decoded.bin Save0001.sav
  bl2save get-rich Save0001.sav rich.sav
  bl2save export-items Save0001.sav
  bl2save fix-challenges Save0001.sav fixed.sav
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a save file into its raw protobuf player message
    Decode {
        /// Input save file
        input: PathBuf,

        /// Output file for the raw protobuf bytes
        output: PathBuf,

        /// Overwrite the output file without prompting
        #[arg(short, long)]
        force: bool,
    },

    /// Encode a raw protobuf player message back into a save file
    Encode {
        /// Input raw protobuf bytes
        input: PathBuf,

        /// Output save file
        output: PathBuf,

        /// Write a big-endian (PS/Xbox) save instead of little-endian (PC)
        #[arg(short, long)]
        big_endian: bool,

        /// Overwrite the output file without prompting
        #[arg(short, long)]
        force: bool,
    },

    /// Set money, eridium, seraph crystals, and torgue tokens to their max
    GetRich {
        /// Input save file
        input: PathBuf,

        /// Output save file
        output: PathBuf,

        /// Force the output to big-endian (PS/Xbox) regardless of the input
        #[arg(short, long)]
        big_endian: bool,

        /// Overwrite the output file without prompting
        #[arg(short, long)]
        force: bool,
    },

    /// Print every non-pseudo item and weapon as a BL2(<base64>) code
    ExportItems {
        /// Input save file
        input: PathBuf,
    },

    /// Repair challenge values that overflowed into huge numbers
    FixChallenges {
        /// Input save file
        input: PathBuf,

        /// Output save file
        output: PathBuf,

        /// Overwrite the output file without prompting
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completion scripts
    #[command(hide = true)]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode { input, output, force } => cmd_decode(&input, &output, force),
        Commands::Encode { input, output, big_endian, force } => {
            cmd_encode(&input, &output, big_endian, force)
        }
        Commands::GetRich { input, output, big_endian, force } => {
            cmd_get_rich(&input, &output, big_endian, force)
        }
        Commands::ExportItems { input } => cmd_export_items(&input),
        Commands::FixChallenges { input, output, force } => cmd_fix_challenges(&input, &output, force),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "bl2save", &mut io::stdout());
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
