mod cli;

use anyhow::Result;
use clap::Parser;
use sealconf::{EnvelopeCodec, FileCertificateResolver};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Command::Encrypt {
            cert,
            password,
            string,
        } => println!("{}", encrypt(&cert, password.as_deref(), &string)?),
        cli::Command::Decrypt {
            cert,
            password,
            encrypted_string,
        } => println!("{}", decrypt(&cert, password.as_deref(), &encrypted_string)?),
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters; stay quiet by default so the result is
    // the only stdout line.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn encrypt(cert: &Path, password: Option<&str>, value: &str) -> Result<String> {
    let resolver = FileCertificateResolver::open(cert, password)?;
    let certificate = Arc::clone(resolver.certificate());
    let codec = EnvelopeCodec::new(Arc::new(resolver));
    Ok(codec.encode(value, &certificate)?)
}

fn decrypt(cert: &Path, password: Option<&str>, value: &str) -> Result<String> {
    let resolver = FileCertificateResolver::open(cert, password)?;
    let codec = EnvelopeCodec::new(Arc::new(resolver));
    Ok(codec.decode_or_passthrough(value)?)
}
