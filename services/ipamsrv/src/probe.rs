//! TCP reachability checks for MikroTik devices
//!
//! A probe opens and immediately drops a TCP connection to the RouterOS API
//! port and the SSH port. Nothing is sent over the sockets.

use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub api_port: u16,
    pub ssh_port: u16,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCheck {
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortReport {
    pub port: u16,
    #[serde(flatten)]
    pub check: PortCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProbe {
    pub host: String,
    pub api: PortReport,
    pub ssh: PortReport,
}

/// Try one TCP connection within `timeout`
pub async fn test_port(host: &str, port: u16, timeout: Duration) -> PortCheck {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => PortCheck {
            ok: true,
            error: None,
        },
        Ok(Err(e)) => {
            debug!("Probe {}:{} failed: {}", host, port, e);
            PortCheck {
                ok: false,
                error: Some(e.to_string()),
            }
        },
        Err(_) => PortCheck {
            ok: false,
            error: Some(format!("timed out after {} ms", timeout.as_millis())),
        },
    }
}

/// Check the API and SSH ports concurrently
pub async fn probe_device(host: &str, settings: &ProbeSettings) -> DeviceProbe {
    let (api, ssh) = tokio::join!(
        test_port(host, settings.api_port, settings.timeout),
        test_port(host, settings.ssh_port, settings.timeout),
    );

    DeviceProbe {
        host: host.to_string(),
        api: PortReport {
            port: settings.api_port,
            check: api,
        },
        ssh: PortReport {
            port: settings.ssh_port,
            check: ssh,
        },
    }
}
