//! Transport selection and TLS material loading.
//!
//! # Responsibilities
//! - Resolve the configured credential shapes into a single transport mode
//! - Load key/cert pairs, PKCS#12 bundles, or inline PEM material
//! - Fail server construction when configured material cannot be read
//!
//! # Design Decisions
//! - Precedence is fixed: key/cert pair, then PKCS#12, then inline
//!   material, then plain HTTP; the first matching shape wins and shapes
//!   are never merged
//! - Selection is a pure function over the settings, so precedence is
//!   testable without touching the filesystem
//! - Material loads once, at construction; the listener never re-reads it

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::{TlsOptions, TlsSettings};

/// Failure to assemble TLS material. Always fatal to server construction.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A configured key, certificate, or bundle file is missing or
    /// unreadable.
    #[error("failed to read TLS material at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A PKCS#12 bundle did not decode (bad DER, wrong password, or
    /// missing contents).
    #[error("failed to decode PKCS#12 bundle {}: {reason}", .path.display())]
    Pfx { path: PathBuf, reason: String },

    /// Material was readable but rustls rejected it.
    #[error("invalid TLS material ({context}): {source}")]
    Invalid {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The transport the listener will speak, resolved from configuration.
#[derive(Debug, Clone)]
pub enum TransportMode {
    /// TLS from a PEM key and certificate pair on disk.
    KeyCert { key: PathBuf, cert: PathBuf },

    /// TLS from a PKCS#12 bundle on disk.
    Pfx {
        bundle: PathBuf,
        password: Option<String>,
    },

    /// TLS from inline PEM material.
    Raw(TlsOptions),

    /// Plain HTTP.
    Plain,
}

impl TransportMode {
    /// Resolve credential shapes into one mode using the fixed precedence.
    ///
    /// Only the first matching rule is honored, even when later rules'
    /// inputs are also present. A key path without its certificate (or the
    /// other way around) falls through to the next rule rather than
    /// erroring.
    pub fn select(tls: Option<&TlsSettings>) -> Self {
        let Some(tls) = tls else {
            return TransportMode::Plain;
        };

        if let (Some(key), Some(cert)) = (&tls.key_path, &tls.cert_path) {
            return TransportMode::KeyCert {
                key: key.clone(),
                cert: cert.clone(),
            };
        }

        if let Some(bundle) = &tls.pfx_path {
            return TransportMode::Pfx {
                bundle: bundle.clone(),
                password: tls.pfx_password.clone(),
            };
        }

        if let Some(options) = &tls.options {
            return TransportMode::Raw(options.clone());
        }

        TransportMode::Plain
    }

    /// True when the resolved mode terminates TLS.
    pub fn is_tls(&self) -> bool {
        !matches!(self, TransportMode::Plain)
    }

    /// Load the selected material and produce the listener's TLS config.
    ///
    /// `None` means plain HTTP. Unreadable or undecodable material is
    /// fatal: the server must not come up on a different transport than it
    /// was configured for.
    pub async fn materialize(&self) -> Result<Option<RustlsConfig>, TransportError> {
        match self {
            TransportMode::KeyCert { key, cert } => {
                tracing::debug!(
                    key = %key.display(),
                    cert = %cert.display(),
                    "HTTPS transport selected (key/cert pair)"
                );
                ensure_readable(cert)?;
                ensure_readable(key)?;
                let config = RustlsConfig::from_pem_file(cert, key)
                    .await
                    .map_err(|source| TransportError::Invalid {
                        context: "key/cert pair",
                        source,
                    })?;
                Ok(Some(config))
            }
            TransportMode::Pfx { bundle, password } => {
                tracing::debug!(bundle = %bundle.display(), "HTTPS transport selected (PKCS#12)");
                let der = std::fs::read(bundle).map_err(|source| TransportError::Read {
                    path: bundle.clone(),
                    source,
                })?;
                let (key, chain) = decode_pfx(&der, password.as_deref().unwrap_or(""))
                    .map_err(|reason| TransportError::Pfx {
                        path: bundle.clone(),
                        reason,
                    })?;
                let config = RustlsConfig::from_der(chain, key).await.map_err(|source| {
                    TransportError::Invalid {
                        context: "PKCS#12 contents",
                        source,
                    }
                })?;
                Ok(Some(config))
            }
            TransportMode::Raw(options) => {
                tracing::debug!("HTTPS transport selected (inline material)");
                let config = RustlsConfig::from_pem(
                    options.cert_pem.clone().into_bytes(),
                    options.key_pem.clone().into_bytes(),
                )
                .await
                .map_err(|source| TransportError::Invalid {
                    context: "inline material",
                    source,
                })?;
                Ok(Some(config))
            }
            TransportMode::Plain => {
                tracing::debug!("HTTP transport selected");
                Ok(None)
            }
        }
    }
}

/// Fail fast with the offending path before handing material to rustls.
fn ensure_readable(path: &Path) -> Result<(), TransportError> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|source| TransportError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Pull the private key and certificate chain out of a PKCS#12 bundle.
///
/// Returns the PKCS#8 key DER and the X.509 chain DER, leaf first as
/// stored in the bundle.
fn decode_pfx(der: &[u8], password: &str) -> Result<(Vec<u8>, Vec<Vec<u8>>), String> {
    let pfx = p12::PFX::parse(der).map_err(|e| format!("not a PKCS#12 archive: {e}"))?;

    if !pfx.verify_mac(password) {
        return Err("MAC mismatch, wrong password?".to_string());
    }

    let mut keys = pfx
        .key_bags(password)
        .map_err(|e| format!("unreadable key bags: {e}"))?;
    let key = match keys.len() {
        0 => return Err("no private key in bundle".to_string()),
        _ => keys.remove(0),
    };

    let chain = pfx
        .cert_x509_bags(password)
        .map_err(|e| format!("unreadable certificate bags: {e}"))?;
    if chain.is_empty() {
        return Err("no certificates in bundle".to_string());
    }

    Ok((key, chain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TlsSettings {
        TlsSettings::default()
    }

    fn inline_options() -> TlsOptions {
        TlsOptions {
            cert_pem: "cert".to_string(),
            key_pem: "key".to_string(),
        }
    }

    #[test]
    fn test_absent_settings_select_plain() {
        assert!(matches!(TransportMode::select(None), TransportMode::Plain));
    }

    #[test]
    fn test_empty_settings_select_plain() {
        let tls = settings();
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::Plain
        ));
    }

    #[test]
    fn test_key_cert_pair_selects_key_cert() {
        let mut tls = settings();
        tls.key_path = Some("key.pem".into());
        tls.cert_path = Some("cert.pem".into());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::KeyCert { .. }
        ));
    }

    #[test]
    fn test_key_cert_pair_beats_every_other_shape() {
        let mut tls = settings();
        tls.key_path = Some("key.pem".into());
        tls.cert_path = Some("cert.pem".into());
        tls.pfx_path = Some("bundle.p12".into());
        tls.options = Some(inline_options());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::KeyCert { .. }
        ));
    }

    #[test]
    fn test_lone_key_path_does_not_count_as_a_pair() {
        let mut tls = settings();
        tls.key_path = Some("key.pem".into());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::Plain
        ));
    }

    #[test]
    fn test_lone_cert_falls_through_to_pfx() {
        let mut tls = settings();
        tls.cert_path = Some("cert.pem".into());
        tls.pfx_path = Some("bundle.p12".into());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::Pfx { .. }
        ));
    }

    #[test]
    fn test_pfx_beats_inline_options() {
        let mut tls = settings();
        tls.pfx_path = Some("bundle.p12".into());
        tls.pfx_password = Some("changeit".to_string());
        tls.options = Some(inline_options());
        let mode = TransportMode::select(Some(&tls));
        match mode {
            TransportMode::Pfx { bundle, password } => {
                assert_eq!(bundle, PathBuf::from("bundle.p12"));
                assert_eq!(password.as_deref(), Some("changeit"));
            }
            other => panic!("expected Pfx, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_options_alone_select_raw() {
        let mut tls = settings();
        tls.options = Some(inline_options());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::Raw(_)
        ));
    }

    #[test]
    fn test_password_without_bundle_selects_plain() {
        let mut tls = settings();
        tls.pfx_password = Some("changeit".to_string());
        assert!(matches!(
            TransportMode::select(Some(&tls)),
            TransportMode::Plain
        ));
    }

    #[test]
    fn test_only_plain_is_not_tls() {
        assert!(!TransportMode::Plain.is_tls());
        assert!(TransportMode::Raw(inline_options()).is_tls());
        assert!(TransportMode::KeyCert {
            key: "k".into(),
            cert: "c".into()
        }
        .is_tls());
    }

    #[test]
    fn test_garbage_bytes_are_not_a_bundle() {
        assert!(decode_pfx(b"not a pkcs12 archive", "").is_err());
    }

    fn fixture_bundle() -> Vec<u8> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/bundle.p12");
        std::fs::read(path).expect("fixture bundle")
    }

    #[test]
    fn test_fixture_bundle_decodes_with_its_password() {
        let (key, chain) =
            decode_pfx(&fixture_bundle(), "changeit").expect("bundle should decode");
        assert!(!key.is_empty());
        assert!(!chain.is_empty());
    }

    #[test]
    fn test_wrong_password_fails_mac_verification() {
        let err = decode_pfx(&fixture_bundle(), "not-the-password").unwrap_err();
        assert!(err.contains("MAC"), "unexpected reason: {err}");
    }
}
