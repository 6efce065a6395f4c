//! Host liveness probing.
//!
//! Host-contact collection is expensive against dead hosts, so every
//! host-centric method checks reachability first. The default probe makes
//! one TCP connection attempt against the SMB service port with a bounded
//! timeout; anything listening counts as alive.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::constants::{PROBE_PORT, PROBE_TIMEOUT_MS};

/// Reachability check performed before host-specific collection.
pub trait LivenessProbe: Send + Sync {
    fn is_alive(&self, host: &str) -> bool;
}

/// TCP connect probe with a bounded timeout.
pub struct TcpProbe {
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new() -> Self {
        TcpProbe {
            port: PROBE_PORT,
            timeout: Duration::from_millis(PROBE_TIMEOUT_MS),
        }
    }

    pub fn with_target(port: u16, timeout: Duration) -> Self {
        TcpProbe { port, timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        TcpProbe::new()
    }
}

impl LivenessProbe for TcpProbe {
    fn is_alive(&self, host: &str) -> bool {
        let address = match (host, self.port).to_socket_addrs() {
            Ok(mut addresses) => match addresses.next() {
                Some(address) => address,
                None => {
                    debug!("Host {} resolved to no addresses", host);
                    return false;
                }
            },
            Err(e) => {
                debug!("Host {} failed to resolve: {}", host, e);
                return false;
            }
        };

        match TcpStream::connect_timeout(&address, self.timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!("Host {} unreachable on port {}: {}", host, self.port, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_probe_succeeds_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().expect("local addr").port();

        let probe = TcpProbe::with_target(port, Duration::from_millis(500));
        assert!(probe.is_alive("127.0.0.1"));
    }

    #[test]
    fn test_probe_fails_on_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let probe = TcpProbe::with_target(port, Duration::from_millis(200));
        assert!(!probe.is_alive("127.0.0.1"));
    }

    #[test]
    fn test_probe_fails_on_unresolvable_host() {
        let probe = TcpProbe::with_target(445, Duration::from_millis(200));
        assert!(!probe.is_alive("host.invalid"));
    }
}
