use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

/// Server address with the port filled in
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ServerAddrs {
    /// Address which needs no name resolution
    Resolved(SocketAddr),
    /// Host name and port, resolved when connecting
    Host(String, u16),
}

impl ServerAddrs {
    fn parse(address: &str, default_port: u16) -> ServerAddrs {
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return ServerAddrs::Resolved(addr);
        }

        if let Ok(ip) = address.parse::<IpAddr>() {
            return ServerAddrs::Resolved(SocketAddr::new(ip, default_port));
        }

        if let Some((host, port)) = address.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                return ServerAddrs::Host(host.to_string(), port);
            }
        }

        ServerAddrs::Host(address.to_string(), default_port)
    }

    /// Resolves the address with tokio's resolver
    #[cfg(feature = "async")]
    pub(crate) async fn lookup(&self) -> io::Result<Vec<SocketAddr>> {
        match self {
            ServerAddrs::Resolved(addr) => Ok(vec![*addr]),
            ServerAddrs::Host(host, port) => {
                Ok(tokio::net::lookup_host((host.as_str(), *port)).await?.collect())
            }
        }
    }
}

impl ToSocketAddrs for ServerAddrs {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<Self::Iter> {
        match self {
            ServerAddrs::Resolved(addr) => Ok(vec![*addr].into_iter()),
            ServerAddrs::Host(host, port) => {
                Ok((host.as_str(), *port).to_socket_addrs()?.collect::<Vec<_>>().into_iter())
            }
        }
    }
}

/// A trait for objects which can be used as a time server address.
///
/// Similar to [`std::net::ToSocketAddrs`], but the port is optional and defaults to the NTP port.
/// Implemented for host names (`"pool.ntp.org"`), host and port strings
/// (`"pool.ntp.org:1123"`), IP addresses and socket addresses.
pub trait ToServerAddrs {
    fn to_server_addrs(&self, default_port: u16) -> ServerAddrs;
}

impl ToServerAddrs for str {
    fn to_server_addrs(&self, default_port: u16) -> ServerAddrs {
        ServerAddrs::parse(self, default_port)
    }
}

impl ToServerAddrs for String {
    fn to_server_addrs(&self, default_port: u16) -> ServerAddrs {
        ServerAddrs::parse(self, default_port)
    }
}

impl ToServerAddrs for SocketAddr {
    fn to_server_addrs(&self, _default_port: u16) -> ServerAddrs {
        ServerAddrs::Resolved(*self)
    }
}

impl ToServerAddrs for IpAddr {
    fn to_server_addrs(&self, default_port: u16) -> ServerAddrs {
        ServerAddrs::Resolved(SocketAddr::new(*self, default_port))
    }
}

impl ToServerAddrs for (&str, u16) {
    fn to_server_addrs(&self, _default_port: u16) -> ServerAddrs {
        match self.0.parse::<IpAddr>() {
            Ok(ip) => ServerAddrs::Resolved(SocketAddr::new(ip, self.1)),
            Err(_) => ServerAddrs::Host(self.0.to_string(), self.1),
        }
    }
}

impl ToServerAddrs for (IpAddr, u16) {
    fn to_server_addrs(&self, _default_port: u16) -> ServerAddrs {
        ServerAddrs::Resolved(SocketAddr::new(self.0, self.1))
    }
}

impl<T: ToServerAddrs + ?Sized> ToServerAddrs for &T {
    fn to_server_addrs(&self, default_port: u16) -> ServerAddrs {
        (**self).to_server_addrs(default_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn host_name_gets_default_port() {
        assert_eq!(
            "pool.ntp.org".to_server_addrs(123),
            ServerAddrs::Host("pool.ntp.org".to_string(), 123)
        );
    }

    #[test]
    fn explicit_port_is_kept() {
        assert_eq!(
            "pool.ntp.org:1123".to_server_addrs(123),
            ServerAddrs::Host("pool.ntp.org".to_string(), 1123)
        );
        assert_eq!(
            ("time.example.com", 4123).to_server_addrs(123),
            ServerAddrs::Host("time.example.com".to_string(), 4123)
        );
    }

    #[test]
    fn ip_addresses_need_no_resolution() {
        let v4 = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 123);
        let v6 = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 123);

        assert_eq!("127.0.0.1".to_server_addrs(123), ServerAddrs::Resolved(v4));
        assert_eq!("::1".to_server_addrs(123), ServerAddrs::Resolved(v6));
        assert_eq!("[::1]:123".to_server_addrs(1), ServerAddrs::Resolved(v6));
        assert_eq!(v4.to_server_addrs(1), ServerAddrs::Resolved(v4));
        assert_eq!(
            (IpAddr::V4(Ipv4Addr::LOCALHOST), 123).to_server_addrs(1),
            ServerAddrs::Resolved(v4)
        );
    }

    #[test]
    fn resolved_address_converts_to_socket_addrs() {
        let addr: SocketAddr = "127.0.0.1:123".parse().unwrap();
        let addrs: Vec<_> = addr.to_server_addrs(1).to_socket_addrs().unwrap().collect();

        assert_eq!(addrs, vec![addr]);
    }
}
