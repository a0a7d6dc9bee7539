use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Encryption and decryption tool for configuration values.
#[derive(Parser, Debug)]
#[command(
    name = "sealconf",
    about = "Encrypt and decrypt configuration values with a named certificate",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Encrypt the given string with the given certificate.
    Encrypt {
        /// The certificate file to encrypt the configuration value.
        #[arg(short, long)]
        cert: PathBuf,
        /// The passphrase of the certificate's private key, if protected.
        #[arg(short, long)]
        password: Option<String>,
        /// The string value to be encrypted.
        #[arg(short, long)]
        string: String,
    },
    /// Decrypt the given envelope with the given certificate.
    Decrypt {
        /// The certificate file holding the decryption private key.
        #[arg(short, long)]
        cert: PathBuf,
        /// The passphrase of the certificate's private key, if protected.
        #[arg(short, long)]
        password: Option<String>,
        /// The string value to be decrypted; plain strings pass through.
        #[arg(short = 'e', long)]
        encrypted_string: String,
    },
}
