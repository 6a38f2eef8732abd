use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Destination requested by a SOCKS5 client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Ipv4(Ipv4Addr, u16),
    Ipv6(Ipv6Addr, u16),
    Domain(String, u16),
}

/// Formats as a `host:port` dial target. IPv6 hosts are bracketed.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipv4(ip, port) => write!(f, "{}:{}", ip, port),
            Address::Ipv6(ip, port) => write!(f, "[{}]:{}", ip, port),
            Address::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_formats_dotted_quad() {
        let addr = Address::Ipv4(Ipv4Addr::new(10, 0, 255, 1), 8080);
        assert_eq!(addr.to_string(), "10.0.255.1:8080");
    }

    #[test]
    fn ipv6_formats_bracketed() {
        let addr = Address::Ipv6(Ipv6Addr::LOCALHOST, 443);
        assert_eq!(addr.to_string(), "[::1]:443");
        assert!(addr.to_string().parse::<std::net::SocketAddr>().is_ok());
    }

    #[test]
    fn empty_domain_keeps_port() {
        let addr = Address::Domain(String::new(), 0);
        assert_eq!(addr.to_string(), ":0");
    }
}
