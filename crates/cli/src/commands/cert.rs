// Path: crates/cli/src/commands/cert.rs

use crate::util::{print_json, read_text, write_text};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use stitch_crypto::der::cert::parse_certificate;
use stitch_crypto::der::csr::parse_csr;
use stitch_crypto::der::key::{self, KeyMaterial};
use stitch_crypto::der::san::GeneralName;
use stitch_crypto::pem::{self, PemKind};
use stitch_crypto::sign::ecdsa::{pem_to_key_handle, KeyHandle};
use stitch_crypto::sign::x509::{build_csr, verify_csr};
use stitch_crypto::trust::find_trusted_root;

#[derive(Parser, Debug)]
pub struct CertArgs {
    #[clap(subcommand)]
    pub command: CertCommands,
}

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// Print a certificate, CSR or key as JSON.
    Inspect { path: PathBuf },
    /// Build a CSR signed by a private key.
    Csr {
        #[clap(long)]
        key: PathBuf,
        /// e.g. `CN=admin,O=Org1`.
        #[clap(long)]
        subject: String,
        /// `dns:host`, `ip:10.0.0.1`, `email:a@b`, `uri:...`; repeatable.
        #[clap(long = "san")]
        sans: Vec<String>,
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Report which root in a bundle signed a certificate.
    Trust {
        #[clap(long)]
        roots: Vec<PathBuf>,
        cert: PathBuf,
    },
}

pub fn run(args: CertArgs) -> Result<()> {
    match args.command {
        CertCommands::Inspect { path } => print_json(&inspect(&read_text(&path)?)?),
        CertCommands::Csr {
            key,
            subject,
            sans,
            out,
        } => {
            let csr = csr(&key, &subject, &sans)?;
            match out {
                Some(path) => write_text(&path, &csr),
                None => {
                    print!("{csr}");
                    Ok(())
                }
            }
        }
        CertCommands::Trust { roots, cert } => {
            let bundles = roots
                .iter()
                .map(|p| read_text(p))
                .collect::<Result<Vec<_>>>()?;
            let refs: Vec<&str> = bundles.iter().map(String::as_str).collect();
            match find_trusted_root(&read_text(&cert)?, &refs)? {
                Some(root) => {
                    println!("Trusted by {} (serial {})", root.subject, root.serial_hex());
                    Ok(())
                }
                None => Err(anyhow!("{} is not signed by any given root", cert.display())),
            }
        }
    }
}

fn inspect(text: &str) -> Result<serde_json::Value> {
    let (kind, _) = pem::decode(text)?;
    if kind == PemKind::CertificateRequest {
        let csr = parse_csr(text)?;
        return Ok(json!({
            "kind": "certificate_request",
            "subject": csr.subject.to_string(),
            "subject_alt_names": csr.subject_alt_names,
            "public_key": csr.public_key,
            "signature_valid": verify_csr(&csr)?,
        }));
    }
    Ok(match key::parse(text)? {
        KeyMaterial::Certificate(_) => {
            let mut value = serde_json::to_value(parse_certificate(text)?)?;
            if let Some(map) = value.as_object_mut() {
                map.insert("kind".into(), json!("certificate"));
            }
            value
        }
        KeyMaterial::Private(k) => json!({ "kind": "private_key", "curve": k.curve, "has_public_point": k.has_public_point() }),
        KeyMaterial::Public(k) => json!({ "kind": "public_key", "public_key": k.to_public() }),
    })
}

fn csr(key: &Path, subject: &str, sans: &[String]) -> Result<String> {
    let KeyHandle::Private(handle) = pem_to_key_handle(&read_text(key)?)? else {
        return Err(anyhow!("{} is not a private key", key.display()));
    };
    let names = sans
        .iter()
        .map(|s| GeneralName::parse_str(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(build_csr(&handle, subject, &names)?)
}
