//! Attribute framing (`struct rtattr`), shared by requests and replies.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Set on attributes that contain other attributes.
pub const NLA_F_NESTED: u16 = 1 << 15;

/// Strips `NLA_F_NESTED` and `NLA_F_NET_BYTEORDER` from a type.
pub const NLA_TYPE_MASK: u16 = 0x3fff;

/// Round up to the 4-byte attribute boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    len.next_multiple_of(4)
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Header plus payload, without trailing padding.
    pub nla_len: u16,
    pub nla_type: u16,
}

impl NlAttr {
    pub fn new(kind: u16, payload_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + payload_len) as u16,
            nla_type: kind,
        }
    }

    /// Attribute type with the flag bits removed.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }
}

/// Walks `(type, payload)` pairs, stopping at the first malformed header.
pub struct AttrIter<'a> {
    rest: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (attr, _) = NlAttr::read_from_prefix(self.rest).ok()?;
        let len = usize::from(attr.nla_len);
        let payload = self.rest.get(NLA_HDRLEN..len)?;
        self.rest = self.rest.get(nla_align(len)..).unwrap_or_default();
        Some((attr.kind(), payload))
    }
}
