//! The network-configuration seam.
//!
//! Descriptor building and the dispatcher talk to the kernel only through
//! [`NetworkOps`]. [`Connection`] is the real implementation; tests plug in
//! an in-memory one.

use std::net::IpAddr;

use crate::descriptor::{AddressDescriptor, RouteDescriptor};
use crate::error::{Error, Result};
use crate::netlink::{Connection, RouteMessage};

/// Link, route and address primitives inside one network namespace.
#[allow(async_fn_in_trait)]
pub trait NetworkOps {
    /// Interface index for `name`, or `None` if no such interface exists.
    async fn link_index(&self, name: &str) -> Result<Option<u32>>;

    /// Routes the kernel would use to reach `destination`.
    async fn routes_to(&self, destination: IpAddr) -> Result<Vec<RouteMessage>>;

    async fn route_add(&self, route: &RouteDescriptor) -> Result<()>;

    async fn route_del(&self, route: &RouteDescriptor) -> Result<()>;

    async fn addr_add(&self, addr: &AddressDescriptor) -> Result<()>;

    async fn addr_del(&self, addr: &AddressDescriptor) -> Result<()>;
}

impl NetworkOps for Connection {
    async fn link_index(&self, name: &str) -> Result<Option<u32>> {
        let link = self.get_link_by_name(name).await?;
        Ok(link.map(|l| l.ifindex()))
    }

    async fn routes_to(&self, destination: IpAddr) -> Result<Vec<RouteMessage>> {
        Ok(self.get_routes_to(destination).await?)
    }

    async fn route_add(&self, route: &RouteDescriptor) -> Result<()> {
        self.add_route(route).await.map_err(|source| Error::ApplyFailed {
            operation: format!("route add {route}"),
            source,
        })
    }

    async fn route_del(&self, route: &RouteDescriptor) -> Result<()> {
        self.del_route(route).await.map_err(|source| Error::ApplyFailed {
            operation: format!("route del {route}"),
            source,
        })
    }

    async fn addr_add(&self, addr: &AddressDescriptor) -> Result<()> {
        self.add_address(addr).await.map_err(|source| Error::ApplyFailed {
            operation: format!("address add {addr}"),
            source,
        })
    }

    async fn addr_del(&self, addr: &AddressDescriptor) -> Result<()> {
        self.del_address(addr).await.map_err(|source| Error::ApplyFailed {
            operation: format!("address del {addr}"),
            source,
        })
    }
}
