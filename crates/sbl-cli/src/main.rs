//! `sbl`: the secure-boot signing toolchain's command-line surface
//! (spec.md §6). Argument parsing, file I/O and passphrase prompting are
//! this binary's job; every cryptographic operation it performs is a thin
//! call into `sbl-core`.

mod codec;
mod commands;
mod date;
mod keystore;
mod shares;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sbl", about = "Secure-boot firmware signing toolchain", version)]
struct Cli {
    /// Path to the `.sbl/` keystore; defaults to searching upward from
    /// the current directory for an existing one (spec.md §6).
    #[arg(long, global = true)]
    sbl: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh Ed25519 signing key and split it K-of-N.
    Keygen {
        /// Quorum and share count as "K,N".
        #[arg(long)]
        split: String,
        /// Print the key and shares without persisting anything.
        #[arg(long)]
        test: bool,
        /// Write shares/pubkey as "<prefix>.share.<x>.txt"/"<prefix>.pub"
        /// in the current directory instead of the keystore.
        #[arg(long)]
        export_prefix: Option<String>,
        /// Keystore entry name (default "root").
        name: Option<String>,
    },
    /// Reconstruct an existing key from shares and re-shard it.
    Resplit {
        #[arg(long)]
        split: String,
        #[arg(long = "key", required = true, num_args = 1..)]
        key: Vec<String>,
        name: Option<String>,
    },
    /// Sign a child public key, producing a one-level certificate.
    Certgen {
        #[arg(long = "key", required = true, num_args = 1..)]
        key: Vec<String>,
        /// Child public key to certify (32-byte hex file).
        #[arg(long = "pub")]
        pub_key: PathBuf,
        /// An existing certificate to embed as this cert's parent.
        #[arg(long)]
        chain: Option<PathBuf>,
        /// POSIX seconds or %Y-%m-%dT%H:%M:%S%z; defaults to now.
        #[arg(long)]
        date: Option<String>,
        /// Output file for the hex-encoded certificate (default: stdout).
        file: Option<PathBuf>,
    },
    /// Sign a firmware image, prepending the 512-byte signature block.
    Sign {
        #[arg(long = "key", required = true, num_args = 1..)]
        key: Vec<String>,
        /// Firmware payload (binary, or Intel HEX by `.hex`/`.ihex` extension).
        #[arg(long)]
        code: PathBuf,
        /// This signing key's certificate chain (104 or 208 bytes, hex).
        #[arg(long)]
        cert: PathBuf,
        #[arg(long)]
        date: Option<String>,
        /// Output path for the signed image.
        out: PathBuf,
    },
    /// Verify a signed firmware image against a root public key.
    Verify {
        /// Root public key (32-byte hex file).
        #[arg(long)]
        root: PathBuf,
        /// Print the intermediate certificate's date/public key alongside
        /// the result.
        #[arg(long)]
        debug: bool,
        code: PathBuf,
    },
    /// Check that a set of shares reconstructs a given public key.
    Verifykey {
        #[arg(long = "key", required = true, num_args = 1..)]
        key: Vec<String>,
        /// Expected public key (32-byte hex file).
        pub_key: PathBuf,
    },
    /// Embed a root public key and memory-map config into a bootloader
    /// image, or (with `-v`) read one back and verify it.
    Config {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value_t = 0)]
        manu_data_size: u32,
        #[arg(long, default_value_t = 0)]
        max_app_size: u32,
        #[arg(short = 'v')]
        verify: bool,
        code: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::init();
    let result = match &cli.cmd {
        Command::Keygen { split, test, export_prefix, name } => {
            commands::keygen::run(split, *test, export_prefix.as_deref(), name.as_deref(), cli.sbl.as_deref())
        }
        Command::Resplit { split, key, name } => commands::resplit::run(split, key, name.as_deref(), cli.sbl.as_deref()),
        Command::Certgen { key, pub_key, chain, date, file } => {
            commands::certgen::run(key, pub_key, chain.as_deref(), date.as_deref(), file.as_deref())
        }
        Command::Sign { key, code, cert, date, out } => commands::sign::run(key, code, cert, date.as_deref(), out),
        Command::Verify { root, debug, code } => commands::verify::run(root, *debug, code),
        Command::Verifykey { key, pub_key } => commands::verifykey::run(key, pub_key),
        Command::Config { root, manu_data_size, max_app_size, verify, code } => {
            commands::config::run(root, *manu_data_size, *max_app_size, *verify, code)
        }
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
