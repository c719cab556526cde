//! Addresses of subscribable host signal sources.
//!
//! A [`ResourceAddress`] is a pure lookup key: a [`ResourceKind`] plus an ordered list of
//! qualifying parts. Two addresses are equal iff both the kind and every part match, in order.

use std::fmt;
use std::path::Path;

/// The kind of host signal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The kernel ring buffer. Takes no parts.
    KernelLog,
    /// A systemd journal unit. Takes one part, the unit name.
    Journal,
    /// A tailed file. Takes one part, the file path.
    File,
}

impl ResourceKind {
    /// Number of parts an address of this kind must carry.
    pub fn expected_parts(&self) -> usize {
        match self {
            ResourceKind::KernelLog => 0,
            ResourceKind::Journal | ResourceKind::File => 1,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::KernelLog => "dmesg",
            ResourceKind::Journal => "journal",
            ResourceKind::File => "file",
        };
        write!(f, "{name}")
    }
}

/// Identifies a subscribable source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    kind: ResourceKind,
    parts: Vec<String>,
}

impl ResourceAddress {
    pub fn new<I, S>(kind: ResourceKind, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// The kernel ring buffer.
    pub fn kernel_log() -> Self {
        Self::new(ResourceKind::KernelLog, Vec::<String>::new())
    }

    /// The journal of the given systemd unit.
    pub fn journal(unit: impl Into<String>) -> Self {
        Self::new(ResourceKind::Journal, [unit.into()])
    }

    /// Lines appended to the file at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(
            ResourceKind::File,
            [path.as_ref().to_string_lossy().into_owned()],
        )
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.parts.is_empty() {
            write!(f, ":{}", self.parts.join("/"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_requires_kind_and_ordered_parts() {
        let a = ResourceAddress::new(ResourceKind::File, ["a", "b"]);
        assert_eq!(a, ResourceAddress::new(ResourceKind::File, ["a", "b"]));
        assert_ne!(a, ResourceAddress::new(ResourceKind::File, ["b", "a"]));
        assert_ne!(a, ResourceAddress::new(ResourceKind::Journal, ["a", "b"]));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceAddress::kernel_log().to_string(), "dmesg");
        assert_eq!(ResourceAddress::journal("kubelet").to_string(), "journal:kubelet");
        assert_eq!(
            ResourceAddress::file("/var/log/cron.log").to_string(),
            "file:/var/log/cron.log"
        );
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ResourceAddress::journal("kubelet"), 1);
        assert_eq!(map.get(&ResourceAddress::journal("kubelet")), Some(&1));
        assert_eq!(map.get(&ResourceAddress::journal("containerd")), None);
    }
}
