use std::net::SocketAddr;

use cardio_common::config::ApiClientConfig;

use crate::error::AppError;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Request body cap for the PDF upload form.
    pub max_upload_bytes: usize,
    pub api: ApiClientConfig,
}

impl Config {
    /// Optional:
    /// - `DASHBOARD_LISTEN_ADDR` (default: 127.0.0.1:8080)
    /// - `DASHBOARD_MAX_UPLOAD_BYTES` (default: 50 MiB)
    /// - the `CARDIO_*` client settings read by [`ApiClientConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr = std::env::var("DASHBOARD_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = parse_listen_addr(&listen_addr)?;

        let max_upload_bytes = match std::env::var("DASHBOARD_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|_| {
                AppError::Config(format!("DASHBOARD_MAX_UPLOAD_BYTES is not a byte count: {raw}"))
            })?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            listen_addr,
            max_upload_bytes,
            api: ApiClientConfig::from_env(),
        })
    }
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, AppError> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("DASHBOARD_LISTEN_ADDR {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_parses_or_reports() {
        assert_eq!(
            parse_listen_addr(" 0.0.0.0:9000 ").unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
        let err = parse_listen_addr("localhost").unwrap_err();
        assert!(err.to_string().starts_with("config error: DASHBOARD_LISTEN_ADDR"));
    }

    #[test]
    fn default_listen_addr_is_valid() {
        assert!(parse_listen_addr(DEFAULT_LISTEN_ADDR).is_ok());
    }
}
