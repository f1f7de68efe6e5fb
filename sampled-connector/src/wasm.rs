//! Loader for the proxy-caller forwarding wasm.
//!
//! Direct sessions cannot attach value to the marketplace's payable entry
//! points, so value-carrying calls route through a small fixed program that
//! funds a cargo purse and forwards the call. The compiled blob is read
//! once from its configured path and cached for the process lifetime.

use std::path::PathBuf;

use tokio::sync::OnceCell;

use crate::error::ConnectorError;

pub struct ProxyWasm {
    path: Option<PathBuf>,
    cell: OnceCell<Vec<u8>>,
}

impl ProxyWasm {
    pub fn new(path: Option<String>) -> Self {
        Self {
            path: path.map(PathBuf::from),
            cell: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.path.is_some()
    }

    /// Returns the cached module bytes, reading them on first use.
    ///
    /// Fails fast with `MissingConfig` when no path is configured, before
    /// any I/O happens.
    pub async fn load(&self) -> Result<&[u8], ConnectorError> {
        let path = self
            .path
            .as_ref()
            .ok_or(ConnectorError::MissingConfig("contracts.proxy-wasm-path"))?;

        let bytes = self
            .cell
            .get_or_try_init(|| async {
                tokio::fs::read(path).await.map_err(|err| {
                    ConnectorError::Format(format!(
                        "cannot load proxy wasm from {}: {err}",
                        path.display()
                    ))
                })
            })
            .await?;
        Ok(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_path_fails_fast() {
        let wasm = ProxyWasm::new(None);
        assert!(!wasm.is_configured());
        assert!(matches!(
            wasm.load().await,
            Err(ConnectorError::MissingConfig("contracts.proxy-wasm-path"))
        ));
    }

    #[tokio::test]
    async fn missing_file_reports_its_path() {
        let wasm = ProxyWasm::new(Some("/nonexistent/proxy_caller.wasm".into()));
        match wasm.load().await {
            Err(ConnectorError::Format(msg)) => assert!(msg.contains("proxy_caller.wasm")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
