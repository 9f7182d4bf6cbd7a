//! TLS setup for `wss://` endpoints.

use crate::error::SessionError;
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_tungstenite::Connector;

/// TLS options for the live endpoint.
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// PEM-encoded CA certificate(s). Bundled webpki roots when unset.
    pub ca_cert_path: Option<PathBuf>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }
}

/// Builds the connector handed to tokio-tungstenite.
///
/// The ring provider is pinned explicitly so the process never depends on a
/// globally installed default.
pub fn create_connector(config: &TlsClientConfig) -> Result<Connector, SessionError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SessionError::TlsConfig(e.to_string()))?;

    let client_config = builder
        .with_root_certificates(root_store(config)?)
        .with_no_client_auth();

    Ok(Connector::Rustls(Arc::new(client_config)))
}

fn root_store(config: &TlsClientConfig) -> Result<RootCertStore, SessionError> {
    let mut store = RootCertStore::empty();
    match config.ca_cert_path {
        Some(ref path) => {
            let certs = load_certs(path)?;
            if certs.is_empty() {
                return Err(SessionError::TlsConfig(format!(
                    "no certificates found in {:?}",
                    path
                )));
            }
            for cert in certs {
                store
                    .add(cert)
                    .map_err(|e| SessionError::TlsConfig(format!("invalid CA cert: {}", e)))?;
            }
        }
        None => store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }
    Ok(store)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, SessionError> {
    let file = File::open(path)
        .map_err(|e| SessionError::TlsConfig(format!("cannot open cert file {:?}: {}", path, e)))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SessionError::TlsConfig(format!("invalid cert file {:?}: {}", path, e)))
}
