//! Request assembly.

use std::net::IpAddr;

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NlAttr, nla_align};
use super::message::{NlMsgHdr, nlmsg_align};

/// Accumulates one request: header, fixed family struct, then attributes.
///
/// The length field is written by [`finish`](Self::finish); sequence number
/// and port are stamped by the connection right before sending.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(NlMsgHdr::new(msg_type, flags).as_bytes());
        buf.resize(nlmsg_align(buf.len()), 0);
        Self { buf }
    }

    fn pad_to(&mut self, aligned: usize) {
        self.buf.resize(aligned, 0);
    }

    /// Append raw bytes, padded to the message boundary.
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.pad_to(nlmsg_align(self.buf.len()));
    }

    /// Append a family header such as `RtMsg` or `IfAddrMsg`.
    pub fn append<T: IntoBytes + Immutable>(&mut self, header: &T) {
        self.append_bytes(header.as_bytes());
    }

    pub fn append_attr(&mut self, kind: u16, payload: &[u8]) {
        self.buf
            .extend_from_slice(NlAttr::new(kind, payload.len()).as_bytes());
        self.buf.extend_from_slice(payload);
        self.pad_to(nla_align(self.buf.len()));
    }

    /// Native-endian `u32`, as used for interface indexes and tables.
    pub fn append_attr_u32(&mut self, kind: u16, value: u32) {
        self.append_attr(kind, &value.to_ne_bytes());
    }

    /// NUL-terminated string.
    pub fn append_attr_str(&mut self, kind: u16, value: &str) {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
        self.append_attr(kind, &payload);
    }

    /// 4 or 16 address bytes in network order.
    pub fn append_attr_ip(&mut self, kind: u16, addr: IpAddr) {
        match addr {
            IpAddr::V4(v4) => self.append_attr(kind, &v4.octets()),
            IpAddr::V6(v6) => self.append_attr(kind, &v6.octets()),
        }
    }

    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    pub fn set_pid(&mut self, pid: u32) {
        self.buf[12..16].copy_from_slice(&pid.to_ne_bytes());
    }

    /// Write the total length and hand over the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let total = self.buf.len() as u32;
        self.buf[..4].copy_from_slice(&total.to_ne_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrIter, NLA_HDRLEN};
    use crate::netlink::message::{NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgType};
    use std::net::Ipv6Addr;

    #[test]
    fn test_header_only() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST);
        builder.set_seq(42);
        builder.set_pid(1000);
        let msg = builder.finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETLINK);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
        assert_eq!(header.nlmsg_seq, 42);
        assert_eq!(header.nlmsg_pid, 1000);
    }

    #[test]
    fn test_interface_name_is_terminated_and_padded() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST);
        builder.append_attr_str(3, "eth0");
        let msg = builder.finish();

        assert_eq!(msg.len(), NLMSG_HDRLEN + NLA_HDRLEN + 8);
        let (kind, data) = AttrIter::new(&msg[NLMSG_HDRLEN..]).next().unwrap();
        assert_eq!(kind, 3);
        assert_eq!(data, b"eth0\0");
    }

    #[test]
    fn test_ipv6_attribute() {
        let gw: Ipv6Addr = "fe80::1".parse().unwrap();
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWROUTE, NLM_F_REQUEST);
        builder.append_attr_ip(5, IpAddr::V6(gw));
        let msg = builder.finish();
        let (_, data) = AttrIter::new(&msg[NLMSG_HDRLEN..]).next().unwrap();
        assert_eq!(data, &gw.octets());
    }
}
