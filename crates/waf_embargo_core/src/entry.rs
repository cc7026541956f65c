use std::collections::BTreeSet;
use std::fmt;

/// Which firewall list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKind {
    Country,
    IpAddress,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::IpAddress => "ip_address",
        }
    }
}

/// Descriptor type WAF expects next to an IP set value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn of(cidr: &str) -> Self {
        if cidr.contains(':') {
            Self::V6
        } else {
            Self::V4
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V4 => "IPV4",
            Self::V6 => "IPV6",
        }
    }
}

/// One item of a block list: a country code or a CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockEntry {
    pub kind: BlockKind,
    pub value: String,
}

impl BlockEntry {
    pub fn country(code: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Country,
            value: code.into(),
        }
    }

    pub fn ip(cidr: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::IpAddress,
            value: cidr.into(),
        }
    }

    /// `None` for country entries.
    pub fn ip_family(&self) -> Option<IpFamily> {
        match self.kind {
            BlockKind::Country => None,
            BlockKind::IpAddress => Some(IpFamily::of(&self.value)),
        }
    }
}

impl fmt::Display for BlockEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

/// Countries and IPs kept in separate partitions so they are never diffed
/// against each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    pub countries: BTreeSet<BlockEntry>,
    pub ips: BTreeSet<BlockEntry>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BlockEntry>) -> Self {
        let mut list = Self::new();
        list.extend(entries);
        list
    }

    pub fn insert(&mut self, entry: BlockEntry) -> bool {
        self.partition_mut(entry.kind).insert(entry)
    }

    pub fn partition(&self, kind: BlockKind) -> &BTreeSet<BlockEntry> {
        match kind {
            BlockKind::Country => &self.countries,
            BlockKind::IpAddress => &self.ips,
        }
    }

    fn partition_mut(&mut self, kind: BlockKind) -> &mut BTreeSet<BlockEntry> {
        match kind {
            BlockKind::Country => &mut self.countries,
            BlockKind::IpAddress => &mut self.ips,
        }
    }

    pub fn len(&self) -> usize {
        self.countries.len() + self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.ips.is_empty()
    }
}

impl Extend<BlockEntry> for BlockList {
    fn extend<T: IntoIterator<Item = BlockEntry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_entries_routes_by_kind_and_collapses_duplicates() {
        let list = BlockList::from_entries([
            BlockEntry::country("US"),
            BlockEntry::ip("10.0.0.0/8"),
            BlockEntry::country("US"),
            BlockEntry::ip("10.0.0.0/8"),
            BlockEntry::country("CA"),
        ]);

        assert_eq!(list.countries.len(), 2);
        assert_eq!(list.ips.len(), 1);
        assert!(list
            .partition(BlockKind::Country)
            .iter()
            .all(|entry| entry.kind == BlockKind::Country));
    }

    #[test]
    fn country_and_ip_with_same_text_are_distinct() {
        let country = BlockEntry::country("1");
        let ip = BlockEntry::ip("1");
        assert_ne!(country, ip);

        let list = BlockList::from_entries([country, ip]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn ip_family_follows_address_text() {
        assert_eq!(BlockEntry::ip("1.2.3.4/32").ip_family(), Some(IpFamily::V4));
        assert_eq!(
            BlockEntry::ip("2001:db8::/32").ip_family(),
            Some(IpFamily::V6)
        );
        assert_eq!(BlockEntry::country("FR").ip_family(), None);
        assert_eq!(IpFamily::V6.as_str(), "IPV6");
    }
}
