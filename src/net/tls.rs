use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest::{digest, SHA256};
use std::path::Path;
use tracing::{info, warn};
use wtransport::tls::{Certificate, CertificateChain, PrivateKey};
use wtransport::Identity;

// Dev certificate paths
const DEV_CERT_FILE: &str = "certs/cert.pem";
const DEV_KEY_FILE: &str = "certs/key.pem";

/// Hostnames placed in the generated certificate
const SELF_SIGNED_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// TLS configuration for WebTransport server
pub struct TlsConfig {
    /// The wtransport Identity containing certificate and key
    pub identity: Identity,
    /// Base64-encoded SHA-256 hash of the certificate (for browser flag)
    pub cert_hash: String,
}

impl TlsConfig {
    /// Load TLS configuration
    ///
    /// Explicit paths win, then `certs/`, then a fresh in-memory
    /// self-signed certificate.
    pub async fn load(cert_path: Option<&str>, key_path: Option<&str>) -> Result<Self> {
        if let (Some(cert_path), Some(key_path)) = (cert_path, key_path) {
            info!("Loading TLS certificate from {}", cert_path);
            return Self::load_from_paths(cert_path, key_path).await;
        }

        if Path::new(DEV_CERT_FILE).exists() && Path::new(DEV_KEY_FILE).exists() {
            info!("Loading dev certificate from certs/");
            return Self::load_from_paths(DEV_CERT_FILE, DEV_KEY_FILE).await;
        }

        warn!("No TLS certificate configured, generating a self-signed one");
        Self::generate_self_signed()
    }

    /// Load certificate from PEM file paths
    async fn load_from_paths(cert_path: &str, key_path: &str) -> Result<Self> {
        let identity = Identity::load_pemfiles(cert_path, key_path)
            .await
            .context("Failed to load certificate from PEM files")?;

        Ok(Self::from_identity(identity))
    }

    /// Generate a self-signed certificate valid for local development
    pub fn generate_self_signed() -> Result<Self> {
        let names = SELF_SIGNED_NAMES.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        let generated =
            rcgen::generate_simple_self_signed(names).context("Failed to generate certificate")?;

        let certificate = Certificate::from_der(generated.cert.der().to_vec())
            .context("Generated certificate rejected")?;
        let key = PrivateKey::from_der_pkcs8(generated.signing_key.serialize_der());
        let identity = Identity::new(CertificateChain::new(vec![certificate]), key);

        Ok(Self::from_identity(identity))
    }

    fn from_identity(identity: Identity) -> Self {
        let cert_hash = Self::compute_cert_hash(&identity);
        Self::log_cert_info(&cert_hash);
        Self {
            identity,
            cert_hash,
        }
    }

    fn compute_cert_hash(identity: &Identity) -> String {
        identity
            .certificate_chain()
            .as_slice()
            .first()
            .map(|cert| {
                let hash = digest(&SHA256, cert.der());
                STANDARD.encode(hash.as_ref())
            })
            .unwrap_or_default()
    }

    fn log_cert_info(cert_hash: &str) {
        info!("Certificate hash: {}", cert_hash);
        info!(
            "Chrome flag: --ignore-certificate-errors-spki-list={}",
            cert_hash
        );
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        &self.cert_hash
    }
}
