//! Route lookup and route mutation.

use std::net::IpAddr;

use super::builder::MessageBuilder;
use super::connection::{Connection, ack_request, get_request};
use super::error::Result;
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::messages::RouteMessage;
use super::types::{AF_INET, AF_INET6, RT_TABLE_MAIN, RtMsg, rta, rtn, rtprot, scope};
use crate::descriptor::RouteDescriptor;

fn family_of(addr: &IpAddr) -> u8 {
    if addr.is_ipv4() { AF_INET } else { AF_INET6 }
}

impl RouteDescriptor {
    fn family(&self) -> u8 {
        if self.is_ipv6() { AF_INET6 } else { AF_INET }
    }

    fn write_attrs(&self, builder: &mut MessageBuilder) {
        if let Some(dst) = &self.destination
            && !dst.is_empty()
        {
            builder.append_attr_ip(rta::DST, dst.network());
        }
        if let Some(gw) = self.gateway {
            builder.append_attr_ip(rta::GATEWAY, gw);
        }
        builder.append_attr_u32(rta::OIF, self.ifindex);
    }

    /// The `RTM_NEWROUTE` request for this route.
    pub(crate) fn add_request(&self) -> MessageBuilder {
        let mut builder = ack_request(NlMsgType::RTM_NEWROUTE, NLM_F_CREATE | NLM_F_EXCL);

        // A next hop means the destination is reached through it; without
        // one the destination sits directly on the link.
        let route_scope = if self.gateway.is_some() {
            scope::UNIVERSE
        } else {
            scope::LINK
        };

        let rtmsg = RtMsg::new()
            .with_family(self.family())
            .with_dst_len(self.destination.map_or(0, |d| d.len()))
            .with_table(RT_TABLE_MAIN)
            .with_protocol(rtprot::BOOT)
            .with_scope(route_scope)
            .with_type(rtn::UNICAST);

        builder.append(&rtmsg);
        self.write_attrs(&mut builder);
        builder
    }

    /// The `RTM_DELROUTE` request for this route.
    pub(crate) fn delete_request(&self) -> MessageBuilder {
        let mut builder = ack_request(NlMsgType::RTM_DELROUTE, 0);

        let rtmsg = RtMsg::new()
            .with_family(self.family())
            .with_dst_len(self.destination.map_or(0, |d| d.len()))
            .with_table(RT_TABLE_MAIN)
            .with_protocol(rtprot::UNSPEC)
            .with_scope(scope::NOWHERE)
            .with_type(rtn::UNSPEC);

        builder.append(&rtmsg);
        self.write_attrs(&mut builder);
        builder
    }
}

/// Build an `RTM_GETROUTE` request for a single destination.
pub(crate) fn get_route_request(destination: IpAddr) -> MessageBuilder {
    let mut builder = get_request(NlMsgType::RTM_GETROUTE);
    let rtmsg = RtMsg::new()
        .with_family(family_of(&destination))
        .with_dst_len(if destination.is_ipv4() { 32 } else { 128 });
    builder.append(&rtmsg);
    builder.append_attr_ip(rta::DST, destination);
    builder
}

impl Connection {
    /// Ask the kernel which route it would use to reach `destination`.
    ///
    /// Returns an empty list when the destination is unreachable.
    pub async fn get_routes_to(&self, destination: IpAddr) -> Result<Vec<RouteMessage>> {
        tracing::debug!(%destination, "looking up route");
        match self.request(get_route_request(destination)).await {
            Ok(payload) => Ok(vec![self.parse_response(&payload)?]),
            Err(e) if e.is_unreachable() => Ok(Vec::new()),
            Err(e) => Err(e.with_context(format!("route get {destination}"))),
        }
    }

    /// Add a route.
    pub async fn add_route(&self, route: &RouteDescriptor) -> Result<()> {
        self.request_ack(route.add_request()).await
    }

    /// Delete a route.
    pub async fn del_route(&self, route: &RouteDescriptor) -> Result<()> {
        self.request_ack(route.delete_request()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Prefix;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::message::{NLM_F_ACK, NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgHdr};

    fn split(msg: &[u8]) -> (&NlMsgHdr, &RtMsg, Vec<(u16, Vec<u8>)>) {
        let header = NlMsgHdr::from_bytes(msg).unwrap();
        let rtmsg = RtMsg::from_bytes(&msg[NLMSG_HDRLEN..]).unwrap();
        let attrs = AttrIter::new(&msg[NLMSG_HDRLEN + RtMsg::SIZE..])
            .map(|(k, v)| (k, v.to_vec()))
            .collect();
        (header, rtmsg, attrs)
    }

    fn route(dst: Option<(&str, &str)>, gw: Option<&str>, ifindex: u32) -> RouteDescriptor {
        RouteDescriptor {
            ifindex,
            destination: dst.and_then(|(a, l)| Prefix::parse(a, l)),
            gateway: gw.map(|g| g.parse().unwrap()),
        }
    }

    #[test]
    fn test_add_route_via_gateway() {
        let msg = route(Some(("10.1.1.0", "24")), Some("10.1.1.1"), 2)
            .add_request()
            .finish();
        let (header, rtmsg, attrs) = split(&msg);

        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWROUTE);
        assert_eq!(
            header.nlmsg_flags,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL
        );
        assert_eq!(rtmsg.rtm_family, AF_INET);
        assert_eq!(rtmsg.rtm_dst_len, 24);
        assert_eq!(rtmsg.rtm_table, RT_TABLE_MAIN);
        assert_eq!(rtmsg.rtm_protocol, rtprot::BOOT);
        assert_eq!(rtmsg.rtm_scope, scope::UNIVERSE);
        assert_eq!(rtmsg.rtm_type, rtn::UNICAST);
        assert_eq!(
            attrs,
            vec![
                (rta::DST, vec![10, 1, 1, 0]),
                (rta::GATEWAY, vec![10, 1, 1, 1]),
                (rta::OIF, 2u32.to_ne_bytes().to_vec()),
            ]
        );
    }

    #[test]
    fn test_add_route_masks_destination() {
        let msg = route(Some(("10.1.1.77", "24")), None, 5)
            .add_request()
            .finish();
        let (_, rtmsg, attrs) = split(&msg);
        assert_eq!(rtmsg.rtm_scope, scope::LINK);
        assert_eq!(attrs[0], (rta::DST, vec![10, 1, 1, 0]));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_add_default_route() {
        let msg = route(None, Some("192.168.1.1"), 3).add_request().finish();
        let (_, rtmsg, attrs) = split(&msg);
        assert_eq!(rtmsg.rtm_dst_len, 0);
        assert!(attrs.iter().all(|(k, _)| *k != rta::DST));
    }

    #[test]
    fn test_delete_route_matches_any_scope() {
        let msg = route(Some(("10.1.1.0", "24")), None, 2)
            .delete_request()
            .finish();
        let (header, rtmsg, attrs) = split(&msg);
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_DELROUTE);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST | NLM_F_ACK);
        assert_eq!(rtmsg.rtm_scope, scope::NOWHERE);
        assert_eq!(rtmsg.rtm_table, RT_TABLE_MAIN);
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_ipv6_route() {
        let msg = route(Some(("2001:db8::", "32")), Some("fe80::1"), 4)
            .add_request()
            .finish();
        let (_, rtmsg, attrs) = split(&msg);
        assert_eq!(rtmsg.rtm_family, AF_INET6);
        assert_eq!(attrs[0].1.len(), 16);
        assert_eq!(attrs[1].1.len(), 16);
    }

    #[test]
    fn test_get_route_request() {
        let msg = get_route_request("8.8.8.8".parse().unwrap()).finish();
        let (header, rtmsg, attrs) = split(&msg);
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETROUTE);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
        assert_eq!(rtmsg.rtm_dst_len, 32);
        assert_eq!(attrs, vec![(rta::DST, vec![8, 8, 8, 8])]);
    }
}
