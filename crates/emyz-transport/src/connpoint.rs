//! Connpoints
//!
//! A connpoint is the address of a server channel, written
//! `tcp://<host>:<port>`. IPv6 hosts are bracketed. A bind connpoint may
//! use `*` as host, meaning every address of the local host.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use emyz_core::{EmyzError, EmyzResult, CONNPOINT_SCHEME};

/// Parsed `tcp://host:port`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connpoint {
    /// `None` for the `*` wildcard
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl Connpoint {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Connpoint {
            host: Some(host),
            port,
        }
    }

    /// Bind connpoint on every local address
    pub fn any(port: u16) -> Self {
        Connpoint { host: None, port }
    }

    pub fn parse(text: &str) -> EmyzResult<Self> {
        let invalid = || EmyzError::InvalidConnpoint(text.to_owned());

        let rest = text.strip_prefix(CONNPOINT_SCHEME).ok_or_else(invalid)?;
        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;

        let host = if host == "*" {
            None
        } else {
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .map_or(Ok(host), |inner| match inner.parse::<IpAddr>() {
                    Ok(IpAddr::V6(_)) => Ok(inner),
                    _ => Err(invalid()),
                })?;
            let ip: IpAddr = host.parse().map_err(|_| invalid())?;
            // A bare IPv6 host would be ambiguous with the port separator
            if ip.is_ipv6() && !rest.starts_with('[') {
                return Err(invalid());
            }
            Some(ip)
        };

        Ok(Connpoint { host, port })
    }

    pub fn is_wildcard(&self) -> bool {
        self.host.is_none()
    }
}

impl FromStr for Connpoint {
    type Err = EmyzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Connpoint::parse(s)
    }
}

impl fmt::Display for Connpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host {
            None => write!(f, "{}*:{}", CONNPOINT_SCHEME, self.port),
            Some(IpAddr::V4(ip)) => write!(f, "{}{}:{}", CONNPOINT_SCHEME, ip, self.port),
            Some(IpAddr::V6(ip)) => write!(f, "{}[{}]:{}", CONNPOINT_SCHEME, ip, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_ipv4() {
        let cp = Connpoint::parse("tcp://192.168.1.7:60847").unwrap();
        assert_eq!(cp.host, Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7))));
        assert_eq!(cp.port, 60847);
    }

    #[test]
    fn test_parse_wildcard() {
        let cp = Connpoint::parse("tcp://*:51947").unwrap();
        assert!(cp.is_wildcard());
        assert_eq!(cp.to_string(), "tcp://*:51947");
    }

    #[test]
    fn test_parse_ipv6() {
        let cp = Connpoint::parse("tcp://[::1]:53791").unwrap();
        assert_eq!(cp.host, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(cp.to_string(), "tcp://[::1]:53791");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "",
            "udp://1.2.3.4:5",
            "tcp://1.2.3.4",
            "tcp://1.2.3.4:70000",
            "tcp://host.example:80",
            "tcp://::1:80",
            "tcp://[1.2.3.4]:80",
        ] {
            assert!(Connpoint::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(a in any::<[u8; 4]>(), b in any::<[u16; 8]>(), port in any::<u16>()) {
            let v4 = Connpoint::new(IpAddr::from(a), port);
            prop_assert_eq!(Connpoint::parse(&v4.to_string()).unwrap(), v4);

            let v6 = Connpoint::new(IpAddr::from(b), port);
            prop_assert_eq!(Connpoint::parse(&v6.to_string()).unwrap(), v6);
        }
    }
}
