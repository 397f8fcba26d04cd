//! Certificate and key loading for `server_tls`.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::Config;

/// Build the rustls server config from the configured PEM files.
///
/// Both paths must be set and point at existing files; the PEM content is
/// checked by rustls.
pub async fn load_tls_config(config: &Config) -> Result<RustlsConfig, io::Error> {
    let cert = require_file("tls_cert_file", config.tls_cert_file.as_deref())?;
    let key = require_file("tls_key_file", config.tls_key_file.as_deref())?;

    let tls = RustlsConfig::from_pem_file(cert, key).await?;
    tracing::debug!(cert = %cert.display(), key = %key.display(), "TLS material loaded");
    Ok(tls)
}

fn require_file<'a>(setting: &str, path: Option<&'a Path>) -> Result<&'a Path, io::Error> {
    let path = path.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("server_tls requires {setting}"),
        )
    })?;
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{setting} {} does not exist", path.display()),
        ));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_paths_are_reported() {
        let err = load_tls_config(&Config::default()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("tls_cert_file"));
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let mut config = Config {
            tls_cert_file: Some(cert.clone()),
            tls_key_file: Some(dir.path().join("key.pem")),
            ..Config::default()
        };

        let err = load_tls_config(&config).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("tls_cert_file"));

        std::fs::write(&cert, "").unwrap();
        let err = load_tls_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("tls_key_file"));

        config.tls_key_file = None;
        let err = load_tls_config(&config).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn garbage_pem_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();
        let config = Config {
            tls_cert_file: Some(cert),
            tls_key_file: Some(key),
            ..Config::default()
        };

        assert!(load_tls_config(&config).await.is_err());
    }
}
