use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

/// Which way a segment travels relative to the connection that opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToServer => f.write_str("client->server"),
            Direction::ToClient => f.write_str("server->client"),
        }
    }
}

/// One TCP conversation.
///
/// Equality and hashing treat the endpoints as an unordered pair, so a key
/// built from a reply equals the key built from the request. `client` is the
/// side that sent the packet the key was built from; it only matters for
/// [`FlowKey::direction`] and naming.
#[derive(Debug, Clone, Copy)]
pub struct FlowKey {
    pub client: SocketAddr,
    pub server: SocketAddr,
}

impl FlowKey {
    pub fn new(client: SocketAddr, server: SocketAddr) -> Self {
        Self { client, server }
    }

    /// Direction of a `src -> dst` segment, or `None` if it belongs to another flow.
    pub fn direction(&self, src: SocketAddr, dst: SocketAddr) -> Option<Direction> {
        if src == self.client && dst == self.server {
            Some(Direction::ToServer)
        } else if src == self.server && dst == self.client {
            Some(Direction::ToClient)
        } else {
            None
        }
    }

    pub fn matches(&self, src: SocketAddr, dst: SocketAddr) -> bool {
        self.direction(src, dst).is_some()
    }

    fn ordered(&self) -> (SocketAddr, SocketAddr) {
        if self.client <= self.server {
            (self.client, self.server)
        } else {
            (self.server, self.client)
        }
    }
}

impl PartialEq for FlowKey {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for FlowKey {}

impl Hash for FlowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            format_endpoint(self.client.ip(), self.client.port()),
            format_endpoint(self.server.ip(), self.server.port())
        )
    }
}

pub fn format_endpoint(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(addr) => format!("{}:{}", addr, port),
        IpAddr::V6(addr) => format!("[{}]:{}", addr, port),
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, FlowKey, format_endpoint};
    use std::collections::HashSet;
    use std::net::SocketAddr;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn reply_matches_and_other_port_does_not() {
        let key = FlowKey::new(addr("1.2.3.4:1000"), addr("5.6.7.8:80"));
        assert_eq!(
            key.direction(addr("1.2.3.4:1000"), addr("5.6.7.8:80")),
            Some(Direction::ToServer)
        );
        assert_eq!(
            key.direction(addr("5.6.7.8:80"), addr("1.2.3.4:1000")),
            Some(Direction::ToClient)
        );
        assert!(!key.matches(addr("1.2.3.4:1000"), addr("5.6.7.8:81")));
        assert!(!key.matches(addr("5.6.7.8:81"), addr("1.2.3.4:1000")));
    }

    #[test]
    fn same_host_different_roles_do_not_match() {
        let key = FlowKey::new(addr("1.2.3.4:1000"), addr("5.6.7.8:80"));
        assert!(!key.matches(addr("1.2.3.4:80"), addr("5.6.7.8:1000")));
        assert!(!key.matches(addr("5.6.7.8:1000"), addr("1.2.3.4:80")));
    }

    #[test]
    fn keys_are_unordered() {
        let forward = FlowKey::new(addr("1.2.3.4:1000"), addr("5.6.7.8:80"));
        let reverse = FlowKey::new(addr("5.6.7.8:80"), addr("1.2.3.4:1000"));
        assert_eq!(forward, reverse);

        let mut set = HashSet::new();
        set.insert(forward);
        assert!(set.contains(&reverse));
        assert!(!set.contains(&FlowKey::new(addr("1.2.3.4:1001"), addr("5.6.7.8:80"))));
    }

    #[test]
    fn endpoints_format_with_brackets_for_ipv6() {
        assert_eq!(format_endpoint("10.0.0.1".parse().unwrap(), 80), "10.0.0.1:80");
        assert_eq!(format_endpoint("::1".parse().unwrap(), 443), "[::1]:443");
        let key = FlowKey::new(addr("1.2.3.4:1000"), addr("5.6.7.8:80"));
        assert_eq!(key.to_string(), "1.2.3.4:1000 -> 5.6.7.8:80");
    }
}
