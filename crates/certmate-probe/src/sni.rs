//! TLS SNI binding check.
//!
//! Confirms an HTTPS listener actually presents a certificate matching
//! the requested SNI name as its sole SAN entry and subject CN. The
//! check temporarily appends entries to the local hosts file so the SNI
//! name resolves to the server under test, and removes exactly those
//! entries on every exit path. Because the hosts file is machine-wide,
//! only one SNI check may be in flight at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;
use x509_parser::certificate::X509Certificate;

use crate::probe::{NetworkProbe, ProbeError};

// The hosts file is a machine-wide resource; concurrent SNI checks
// would corrupt each other's entries.
static SNI_CHECK_LOCK: Mutex<()> = Mutex::const_new(());

/// Check that a DER certificate covers exactly the expected host:
/// exactly one SAN entry, a DNS name equal to `expected`, and a subject
/// CN equal to `expected`. Any other shape fails.
pub fn verify_certificate_san(cert_der: &[u8], expected: &str) -> bool {
    let Ok((_, cert)) = X509Certificate::from_der(cert_der) else {
        return false;
    };

    let Ok(Some(san)) = cert.subject_alternative_name() else {
        return false;
    };

    let names = &san.value.general_names;
    if names.len() != 1 {
        return false;
    }

    let GeneralName::DNSName(dns_name) = &names[0] else {
        return false;
    };

    if !dns_name.eq_ignore_ascii_case(expected) {
        return false;
    }

    let cn_matches = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|cn| cn.eq_ignore_ascii_case(expected))
        .unwrap_or(false);
    cn_matches
}

/// Scoped hosts-file patch: append entries on apply, strip exactly the
/// appended bytes on revert. Dropping without revert attempts a
/// best-effort synchronous cleanup.
struct HostsPatch {
    path: PathBuf,
    appended: String,
    reverted: bool,
}

impl HostsPatch {
    async fn apply(path: &Path, entries: &[String]) -> std::io::Result<Self> {
        let appended: String = entries.concat();

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await?;
        file.write_all(appended.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), entries = entries.len(), "appended temporary hosts entries");

        Ok(Self {
            path: path.to_path_buf(),
            appended,
            reverted: false,
        })
    }

    async fn revert(mut self) -> std::io::Result<()> {
        self.reverted = true;

        let contents = tokio::fs::read_to_string(&self.path).await?;
        match contents.strip_suffix(&self.appended) {
            Some(stripped) => {
                tokio::fs::write(&self.path, stripped).await?;
                debug!(path = %self.path.display(), "removed temporary hosts entries");
                Ok(())
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "hosts file {} changed during SNI check, temporary entries not removed",
                    self.path.display()
                ),
            )),
        }
    }
}

impl Drop for HostsPatch {
    fn drop(&mut self) {
        if self.reverted {
            return;
        }

        // last-resort cleanup if the check was cancelled mid-flight
        if let Ok(contents) = std::fs::read_to_string(&self.path) {
            if let Some(stripped) = contents.strip_suffix(&self.appended) {
                if std::fs::write(&self.path, stripped).is_err() {
                    warn!(path = %self.path.display(), "could not clean up temporary hosts entries");
                }
            }
        }
    }
}

impl NetworkProbe {
    /// Check that the HTTPS listener reached via `host` presents the
    /// certificate for `sni` when asked for it.
    ///
    /// Returns `Ok(true)` when the TLS handshake completes with the
    /// pinned SAN/CN validation accepting the presented certificate,
    /// `Ok(false)` when the listener is unreachable or presents any
    /// other certificate. A hosts-file cleanup failure is an error:
    /// that state is operator-visible and must not pass silently.
    pub async fn check_sni_binding(&self, host: &str, sni: &str) -> Result<bool, ProbeError> {
        let _guard = SNI_CHECK_LOCK.lock().await;

        // resolve the target host's IP, best-effort; loopback alone is
        // enough when the name only resolves externally
        let ip = self
            .dns
            .lookup_ip(host)
            .await
            .ok()
            .and_then(|ips| ips.into_iter().next());

        let mut entries = vec![format!("\n127.0.0.1\t{}", sni)];
        if let Some(ip) = ip {
            entries.push(format!("\n{}\t{}", ip, sni));
        }

        let patch = HostsPatch::apply(&self.config.hosts_file, &entries)
            .await
            .map_err(ProbeError::HostsPatch)?;

        // give the resolver a moment to observe the change
        tokio::time::sleep(self.config.sni_settle_delay).await;

        let outcome = handshake_with_pinned_san(sni).await;

        patch.revert().await.map_err(ProbeError::HostsCleanup)?;

        match outcome {
            Ok(()) => {
                info!(host = %host, sni = %sni, "TLS SNI binding check OK");
                Ok(true)
            }
            Err(e) => {
                info!(host = %host, sni = %sni, error = %e, "TLS SNI binding check failed");
                Ok(false)
            }
        }
    }
}

/// Complete a TLS handshake to `https://{sni}` with certificate
/// validation replaced by the pinned SAN/CN check. Handshake success
/// implies the verifier accepted the presented certificate.
async fn handshake_with_pinned_san(sni: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let verifier = Arc::new(SanPinnedVerifier::new(sni.to_string()));

    let tls_config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));

    let tcp = tokio::net::TcpStream::connect((sni, 443)).await?;
    let server_name = ServerName::try_from(sni.to_string())?;
    let _tls = connector.connect(server_name, tcp).await?;

    Ok(())
}

/// Certificate verifier accepting only the exact single-SAN shape the
/// SNI check requires. Signatures are still verified normally.
#[derive(Debug)]
struct SanPinnedVerifier {
    expected: String,
    provider: CryptoProvider,
}

impl SanPinnedVerifier {
    fn new(expected: String) -> Self {
        Self {
            expected,
            provider: ring::default_provider(),
        }
    }
}

impl ServerCertVerifier for SanPinnedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if verify_certificate_san(end_entity.as_ref(), &self.expected) {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::NotValidForName,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
