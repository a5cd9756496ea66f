//! Builds the HTTP client for the AWX API.
//!
//! The client is configured in exactly one [TransportMode], chosen in priority order:
//!
//! 1. [TransportMode::Insecure] when `insecure` is set. Server certificates are not verified and
//!    any mutual TLS material is ignored.
//! 2. [TransportMode::MutualTls] when the client certificate, client key and CA certificate are
//!    all present. The CA certificates are trusted on top of the platform's roots.
//! 3. [TransportMode::Default] otherwise. A partial set of mutual TLS material is ignored with a
//!    warning.
//!
//! Certificate material stays in memory; nothing is written to disk. Material that does not parse
//! is a [ReconcileError::ConfigurationError]. There is no fallback to a client without it.

use crate::api::AwxClient;
use crate::config::ProviderConfig;
use crate::diagnostic::{Context, Operation, ReconcileError};
use reqwest::{Certificate, Client, Identity};
use serde::Serialize;
use std::error::Error as StdError;
use tracing::{debug, info, warn};

/// Summary of the diagnostic reported when the client cannot authenticate.
pub const AUTH_FAILURE_SUMMARY: &str = "Unable to create AWX client";

/// Detail of the diagnostic reported when the client cannot authenticate.
pub const AUTH_FAILURE_DETAIL: &str =
    "Unable to auth user against AWX API: check the hostname, username and password";

const MTLS_FAILURE_SUMMARY: &str = "Invalid mTLS config";

/// In-memory PEM material for mutual TLS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlsBundle<'a> {
    pub client_cert: Option<&'a str>,
    pub client_key: Option<&'a str>,
    pub ca_cert: Option<&'a str>,
}

impl<'a> TlsBundle<'a> {
    /// Borrows the bundle from a configuration. Empty strings count as absent.
    pub fn from_config(config: &'a ProviderConfig) -> Self {
        let present = |value: &'a Option<String>| value.as_deref().filter(|s| !s.is_empty());
        TlsBundle {
            client_cert: present(&config.client_cert),
            client_key: present(&config.client_key),
            ca_cert: present(&config.ca_cert),
        }
    }

    /// Returns `(client_cert, client_key, ca_cert)` if all three are present.
    pub fn complete(&self) -> Option<(&'a str, &'a str, &'a str)> {
        Some((self.client_cert?, self.client_key?, self.ca_cert?))
    }

    /// How many of the three materials are present.
    pub fn provided(&self) -> usize {
        [self.client_cert, self.client_key, self.ca_cert]
            .iter()
            .filter(|material| material.is_some())
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Insecure,
    MutualTls,
    Default,
}

/// Chooses the transport mode for a configuration.
pub fn select_mode(insecure: bool, bundle: &TlsBundle) -> TransportMode {
    if insecure {
        if bundle.provided() > 0 {
            debug!("insecure mode requested; ignoring mTLS material");
        }
        return TransportMode::Insecure;
    }
    match (bundle.complete(), bundle.provided()) {
        (Some(_), _) => TransportMode::MutualTls,
        (None, 0) => TransportMode::Default,
        (None, provided) => {
            warn!(
                provided,
                "mTLS needs client_cert, client_key and ca_cert together; ignoring the partial set"
            );
            TransportMode::Default
        }
    }
}

/// Builds an HTTP client for `config` without contacting the server.
///
/// # Errors
///
/// Returns [ReconcileError::ConfigurationError] if the mutual TLS material does not parse, or
/// the CA bundle contains no certificate.
pub fn build_http_client(
    config: &ProviderConfig,
) -> Result<(Client, TransportMode), ReconcileError> {
    let hostname = config.hostname.as_str();
    let bundle = TlsBundle::from_config(config);
    let mode = select_mode(config.insecure, &bundle);
    let builder = Client::builder();

    let builder = match (mode, bundle.complete()) {
        (TransportMode::Insecure, _) => builder.danger_accept_invalid_certs(true),
        (TransportMode::MutualTls, Some((cert, key, ca))) => {
            let mut pem = Vec::with_capacity(cert.len() + key.len() + 1);
            pem.extend_from_slice(cert.as_bytes());
            pem.push(b'\n');
            pem.extend_from_slice(key.as_bytes());
            let identity = Identity::from_pem(&pem).map_err(|e| mtls_error(hostname, e))?;

            let roots = Certificate::from_pem_bundle(ca.as_bytes()).map_err(|e| mtls_error(hostname, e))?;
            if roots.is_empty() {
                return Err(mtls_error(
                    hostname,
                    "the CA certificate contains no certificates",
                ));
            }
            roots
                .into_iter()
                .fold(builder.identity(identity), |builder, root| {
                    builder.add_root_certificate(root)
                })
        }
        _ => builder,
    };

    let client = builder.build().map_err(|e| match mode {
        TransportMode::MutualTls => mtls_error(hostname, e),
        _ => configuration_error(hostname, "Unable to build HTTP client", e.to_string(), e),
    })?;
    Ok((client, mode))
}

/// Builds the client and checks that it can authenticate.
///
/// # Errors
///
/// Returns [ReconcileError::ConfigurationError] if the client cannot be built or the
/// authentication probe fails for any reason. The diagnostic never contains the password.
pub async fn connect(config: &ProviderConfig) -> Result<AwxClient, ReconcileError> {
    let (http, mode) = build_http_client(config)?;
    let client = AwxClient::new(
        http,
        config.hostname.as_str(),
        config.username.as_str(),
        config.password.as_str(),
    );

    if let Err(e) = client.me().await {
        debug!(error = %e, "authentication probe failed");
        return Err(configuration_error(
            &config.hostname,
            AUTH_FAILURE_SUMMARY,
            AUTH_FAILURE_DETAIL.to_owned(),
            e,
        ));
    }

    info!(hostname = client.base_url(), ?mode, "connected to AWX");
    Ok(client)
}

// Diagnostics identify the provider by its hostname.
fn mtls_error(
    hostname: &str,
    e: impl Into<Box<dyn StdError + Send + Sync>>,
) -> ReconcileError {
    let source = e.into();
    let detail = format!("The provided mTLS config is invalid: {source}");
    ReconcileError::ConfigurationError {
        context: Context::new(Operation::Configure, "provider", hostname),
        summary: MTLS_FAILURE_SUMMARY.to_owned(),
        detail,
        source: Some(source),
    }
}

fn configuration_error(
    hostname: &str,
    summary: &str,
    detail: String,
    source: impl Into<Box<dyn StdError + Send + Sync>>,
) -> ReconcileError {
    ReconcileError::ConfigurationError {
        context: Context::new(Operation::Configure, "provider", hostname),
        summary: summary.to_owned(),
        detail,
        source: Some(source.into()),
    }
}
