//! Network bootstrap: join the configured network once, or fail the cycle.
//!
//! The radio itself is an external collaborator behind [`Radio`]. On a Linux
//! board the operating system owns the Wi-Fi association, so [`HostRadio`]
//! only confirms that a routable interface is up and records its address.

use std::net::{IpAddr, UdpSocket};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Credentials;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("no SSID configured")]
    MissingSsid,

    #[error("could not connect to {ssid}: {reason}")]
    Failed { ssid: String, reason: String },
}

/// The contract the clock needs from a Wi-Fi radio.
pub trait Radio {
    /// Associate with `ssid`. One attempt; the caller does not retry.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError>;

    /// Address assigned after a successful [`connect`](Radio::connect).
    fn ip_address(&self) -> Option<IpAddr>;
}

/// Connect using `credentials`; failure is logged with the SSID and returned.
pub fn connect<R: Radio + ?Sized>(
    radio: &mut R,
    credentials: &Credentials,
) -> Result<Option<IpAddr>, ConnectError> {
    info!(ssid = %credentials.ssid, "connecting");
    if let Err(e) = radio.connect(&credentials.ssid, &credentials.password) {
        error!(ssid = %credentials.ssid, "failed to connect: {}", e);
        return Err(e);
    }

    let ip = radio.ip_address();
    match ip {
        Some(addr) => info!(ssid = %credentials.ssid, ip = %addr, "connected"),
        None => info!(ssid = %credentials.ssid, "connected, address not yet known"),
    }
    Ok(ip)
}

/// Radio for hosts whose OS manages the network connection.
///
/// `connect` opens a UDP socket "towards" `probe_addr` so the kernel picks an
/// outbound interface; no datagram is sent.
pub struct HostRadio {
    probe_addr: String,
    address: Option<IpAddr>,
}

impl HostRadio {
    pub fn new(probe_addr: impl Into<String>) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            address: None,
        }
    }
}

impl Radio for HostRadio {
    fn connect(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectError> {
        if ssid.trim().is_empty() {
            return Err(ConnectError::MissingSsid);
        }
        let failed = |e: std::io::Error| ConnectError::Failed {
            ssid: ssid.to_string(),
            reason: e.to_string(),
        };

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(failed)?;
        socket.connect(self.probe_addr.as_str()).map_err(failed)?;
        let local = socket.local_addr().map_err(failed)?;

        self.address = Some(local.ip());
        Ok(())
    }

    fn ip_address(&self) -> Option<IpAddr> {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct FixedRadio {
        result: Option<IpAddr>,
        attempts: usize,
    }

    impl Radio for FixedRadio {
        fn connect(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectError> {
            self.attempts += 1;
            match self.result {
                Some(_) => Ok(()),
                None => Err(ConnectError::Failed {
                    ssid: ssid.to_string(),
                    reason: "auth rejected".to_string(),
                }),
            }
        }

        fn ip_address(&self) -> Option<IpAddr> {
            self.result
        }
    }

    fn credentials(ssid: &str) -> Credentials {
        Credentials {
            ssid: ssid.to_string(),
            password: "pw".to_string(),
            tide_api_key: "t".to_string(),
            timezone_api_key: "z".to_string(),
        }
    }

    #[test]
    fn reports_address_on_success() {
        let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40));
        let mut radio = FixedRadio {
            result: Some(addr),
            attempts: 0,
        };
        assert_eq!(connect(&mut radio, &credentials("harbour")).unwrap(), Some(addr));
    }

    #[test]
    fn failure_names_ssid_and_is_not_retried() {
        let mut radio = FixedRadio {
            result: None,
            attempts: 0,
        };
        let err = connect(&mut radio, &credentials("harbour")).unwrap_err();
        assert!(err.to_string().contains("harbour"));
        assert_eq!(radio.attempts, 1);
    }

    #[test]
    fn host_radio_requires_ssid() {
        let mut radio = HostRadio::new("127.0.0.1:9");
        assert!(matches!(
            radio.connect("  ", "pw"),
            Err(ConnectError::MissingSsid)
        ));
        assert!(radio.ip_address().is_none());
    }

    #[test]
    fn host_radio_loopback_probe() {
        let mut radio = HostRadio::new("127.0.0.1:9");
        radio.connect("harbour", "pw").unwrap();
        assert_eq!(radio.ip_address(), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn host_radio_bad_probe_fails() {
        let mut radio = HostRadio::new("not-an-address");
        assert!(matches!(
            radio.connect("harbour", "pw"),
            Err(ConnectError::Failed { .. })
        ));
    }
}
