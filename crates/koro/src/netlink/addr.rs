//! Interface address mutation.

use super::builder::MessageBuilder;
use super::connection::{Connection, ack_request};
use super::error::Result;
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::types::{AF_INET, AF_INET6, IfAddrMsg, ifa, scope};
use crate::descriptor::AddressDescriptor;

impl AddressDescriptor {
    fn header(&self) -> IfAddrMsg {
        let family = if self.address.is_ipv4() {
            AF_INET
        } else {
            AF_INET6
        };
        IfAddrMsg::new()
            .with_family(family)
            .with_prefixlen(self.prefix_len)
            .with_index(self.ifindex)
    }

    fn scope(&self) -> u8 {
        if self.address.is_loopback() {
            scope::HOST
        } else {
            scope::UNIVERSE
        }
    }
}

impl AddressDescriptor {
    /// The `RTM_NEWADDR` request for this address.
    pub(crate) fn add_request(&self) -> MessageBuilder {
        let mut builder = ack_request(NlMsgType::RTM_NEWADDR, NLM_F_CREATE | NLM_F_EXCL);
        builder.append(&self.header().with_scope(self.scope()));
        builder.append_attr_ip(ifa::LOCAL, self.address);
        builder.append_attr_ip(ifa::ADDRESS, self.address);
        builder
    }

    /// The `RTM_DELADDR` request for this address.
    pub(crate) fn delete_request(&self) -> MessageBuilder {
        let mut builder = ack_request(NlMsgType::RTM_DELADDR, 0);
        builder.append(&self.header());
        builder.append_attr_ip(ifa::LOCAL, self.address);
        builder
    }
}

impl Connection {
    /// Add an address to an interface.
    pub async fn add_address(&self, addr: &AddressDescriptor) -> Result<()> {
        self.request_ack(addr.add_request()).await
    }

    /// Remove an address from an interface.
    pub async fn del_address(&self, addr: &AddressDescriptor) -> Result<()> {
        self.request_ack(addr.delete_request()).await
    }
}
