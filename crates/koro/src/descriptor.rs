//! Route and address descriptors.
//!
//! A descriptor is the fully resolved form of a [`Command`]: interface
//! names have become indexes, text has become addresses, and the route's
//! outgoing interface has been chosen. Building one may query the kernel
//! through [`NetworkOps`] but never changes anything.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::command::{Command, Network};
use crate::error::{Error, Result};
use crate::ops::NetworkOps;

/// An address with a prefix length, e.g. `10.1.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix {
    addr: IpAddr,
    len: u8,
}

impl Prefix {
    /// Create a prefix, rejecting lengths beyond the address family's width.
    pub fn new(addr: IpAddr, len: u8) -> Option<Self> {
        (len <= max_prefix_len(&addr)).then_some(Self { addr, len })
    }

    /// Parse the two halves of a CIDR as they come out of the grammar.
    pub fn parse(address: &str, length: &str) -> Option<Self> {
        let addr: IpAddr = address.parse().ok()?;
        let len: u8 = length.parse().ok()?;
        Self::new(addr, len)
    }

    /// The address as written.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Prefix length.
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Whether this is a zero-length (match-all) prefix.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The address with host bits cleared.
    pub fn network(&self) -> IpAddr {
        match self.addr {
            IpAddr::V4(v4) => {
                let mask = if self.len == 0 {
                    0
                } else {
                    !0u32 << (32 - self.len)
                };
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                let mask = if self.len == 0 {
                    0
                } else {
                    !0u128 << (128 - self.len)
                };
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

fn max_prefix_len(addr: &IpAddr) -> u8 {
    if addr.is_ipv4() { 32 } else { 128 }
}

/// One routing-table entry, ready to add or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Outgoing interface index.
    pub ifindex: u32,
    /// Destination network; `None` is the default route.
    pub destination: Option<Prefix>,
    /// Next hop.
    pub gateway: Option<IpAddr>,
}

impl RouteDescriptor {
    /// Whether this route carries IPv6 addresses.
    pub fn is_ipv6(&self) -> bool {
        match (&self.destination, &self.gateway) {
            (Some(dst), _) => dst.addr().is_ipv6(),
            (None, Some(gw)) => gw.is_ipv6(),
            (None, None) => false,
        }
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(dst) => write!(f, "{}/{}", dst.network(), dst.len())?,
            None => f.write_str("default")?,
        }
        if let Some(gw) = &self.gateway {
            write!(f, " via {gw}")?;
        }
        write!(f, " oif {}", self.ifindex)
    }
}

/// One interface address assignment, ready to add or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDescriptor {
    /// Interface index.
    pub ifindex: u32,
    /// The address itself (host bits kept).
    pub address: IpAddr,
    /// Prefix length of the subnet.
    pub prefix_len: u8,
}

impl AddressDescriptor {
    /// Subnet mask derived from the prefix length.
    pub fn netmask(&self) -> IpAddr {
        let zero = match self.address {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::BROADCAST),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(u128::MAX)),
        };
        Prefix {
            addr: zero,
            len: self.prefix_len,
        }
        .network()
    }
}

impl fmt::Display for AddressDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ifindex {}", self.address, self.prefix_len, self.ifindex)
    }
}

/// Resolve a route command against the current namespace.
///
/// Text is validated before the kernel is asked anything, so malformed
/// input fails the same way whether or not the namespace is reachable.
pub async fn build_route<N: NetworkOps>(command: &Command, ops: &N) -> Result<RouteDescriptor> {
    let gateway = command
        .via()
        .map(|via| {
            via.parse::<IpAddr>()
                .map_err(|_| Error::InvalidAddress(format!("{via} is not an IP address")))
        })
        .transpose()?;

    let destination = match command.network() {
        Network::Default => None,
        Network::Cidr { address, length } => Some(
            Prefix::parse(address, length)
                .ok_or_else(|| Error::InvalidNetwork(format!("{address}/{length}")))?,
        ),
    };

    if let (Some(gw), Some(dst)) = (&gateway, &destination)
        && gw.is_ipv4() != dst.addr().is_ipv4()
    {
        return Err(Error::InvalidAddress(format!(
            "gateway {gw} does not match the address family of {dst}"
        )));
    }

    let ifindex = match (command.dev(), gateway) {
        (Some(dev), _) => ops
            .link_index(dev)
            .await?
            .ok_or_else(|| Error::InterfaceNotFound {
                name: dev.to_string(),
            })?,
        (None, Some(gw)) => ops
            .routes_to(gw)
            .await?
            .iter()
            .find_map(|route| route.oif())
            .ok_or(Error::NoRouteToGateway { gateway: gw })?,
        (None, None) => return Err(Error::AmbiguousInterface),
    };

    Ok(RouteDescriptor {
        ifindex,
        destination,
        gateway,
    })
}

/// Resolve an address command against the current namespace.
pub async fn build_address<N: NetworkOps>(
    command: &Command,
    ops: &N,
) -> Result<AddressDescriptor> {
    if let Some(via) = command.via() {
        return Err(Error::UnsupportedCombination(format!(
            "address command does not support via keyword (via {via})"
        )));
    }

    let Some(dev) = command.dev() else {
        return Err(Error::AmbiguousInterface);
    };

    let prefix = match command.network() {
        Network::Default => {
            return Err(Error::InvalidNetwork(
                "default is not a valid interface address".into(),
            ));
        }
        Network::Cidr { address, length } => Prefix::parse(address, length)
            .ok_or_else(|| Error::InvalidAddress(format!("{address}/{length}")))?,
    };

    let ifindex = ops
        .link_index(dev)
        .await?
        .ok_or_else(|| Error::InterfaceNotFound {
            name: dev.to_string(),
        })?;

    Ok(AddressDescriptor {
        ifindex,
        address: prefix.addr(),
        prefix_len: prefix.len(),
    })
}
