// Path: crates/cli/src/commands/keys.rs

use crate::util::{read_bytes, read_text, write_text};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stitch_crypto::sign::ecdsa::{
    der_to_signature, export_private_pem, export_public_pem, pem_to_key_handle, sign_to_der,
    verify, KeyHandle,
};
use stitch_crypto::{Curve, PrivateKeyHandle};

#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[clap(subcommand)]
    pub command: KeysCommands,
}

#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// Generate a new EC key pair as PKCS#8 and SPKI PEM.
    Generate {
        #[clap(long, value_enum, default_value = "p256")]
        curve: CurveArg,
        /// Writes `<out>.key` and `<out>.pub` instead of printing.
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Sign a file with a private key; prints the DER signature as hex.
    Sign {
        #[clap(long)]
        key: PathBuf,
        input: PathBuf,
    },
    /// Verify a hex DER signature with a public key, certificate or private key.
    Verify {
        #[clap(long)]
        key: PathBuf,
        #[clap(long)]
        signature: String,
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CurveArg {
    P256,
    P384,
    P521,
}

impl From<CurveArg> for Curve {
    fn from(value: CurveArg) -> Self {
        match value {
            CurveArg::P256 => Curve::P256,
            CurveArg::P384 => Curve::P384,
            CurveArg::P521 => Curve::P521,
        }
    }
}

pub fn run(args: KeysArgs) -> Result<()> {
    match args.command {
        KeysCommands::Generate { curve, out } => {
            let key = PrivateKeyHandle::generate(curve.into());
            let private_pem = export_private_pem(&key)?;
            let public_pem = export_public_pem(&key.public_key()?)?;
            match out {
                Some(prefix) => {
                    let key_path = prefix.with_extension("key");
                    let pub_path = prefix.with_extension("pub");
                    write_text(&key_path, &private_pem)?;
                    write_text(&pub_path, &public_pem)?;
                    println!("Wrote {} and {}", key_path.display(), pub_path.display());
                }
                None => {
                    print!("{private_pem}");
                    print!("{public_pem}");
                }
            }
        }
        KeysCommands::Sign { key, input } => {
            println!("{}", sign_file(&key, &input)?);
        }
        KeysCommands::Verify {
            key,
            signature,
            input,
        } => {
            if verify_file(&key, &signature, &input)? {
                println!("Signature OK");
            } else {
                return Err(anyhow!("Signature does not verify"));
            }
        }
    }
    Ok(())
}

fn sign_file(key: &Path, input: &Path) -> Result<String> {
    let KeyHandle::Private(handle) = pem_to_key_handle(&read_text(key)?)? else {
        return Err(anyhow!("{} is not a private key", key.display()));
    };
    Ok(hex::encode(sign_to_der(&handle, &read_bytes(input)?)?))
}

fn verify_file(key: &Path, signature_hex: &str, input: &Path) -> Result<bool> {
    let handle = pem_to_key_handle(&read_text(key)?)?.public_key()?;
    let der = hex::decode(signature_hex.trim()).context("Signature is not hex")?;
    let signature = der_to_signature(&der)?;
    Ok(verify(&handle, &signature, &read_bytes(input)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_file_verifies_with_generated_key() {
        let dir = tempfile::tempdir().unwrap();
        let key = PrivateKeyHandle::generate(Curve::P384);
        let key_path = dir.path().join("id.key");
        let pub_path = dir.path().join("id.pub");
        let input = dir.path().join("payload.bin");
        std::fs::write(&key_path, export_private_pem(&key).unwrap()).unwrap();
        std::fs::write(&pub_path, export_public_pem(&key.public_key().unwrap()).unwrap()).unwrap();
        std::fs::write(&input, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();

        let signature = sign_file(&key_path, &input).unwrap();
        assert!(verify_file(&pub_path, &signature, &input).unwrap());
        assert!(verify_file(&key_path, &signature, &input).unwrap());

        std::fs::write(&input, b"tampered").unwrap();
        assert!(!verify_file(&pub_path, &signature, &input).unwrap());
        assert!(sign_file(&pub_path, &input).is_err());
    }
}
