//! Hierarchical query keys.
//!
//! A key is an ordered list of segments, e.g. `listings/list/1` for page 1
//! of the unfiltered listings view. Prefix matching is what lets an engine
//! address "every cached listings page" without enumerating them.

/// One segment of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Text(String),
    Num(u64),
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for Segment {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<u32> for Segment {
    fn from(n: u32) -> Self {
        Self::Num(n as u64)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Num(n) => write!(f, "{n}"),
        }
    }
}

/// An ordered segment list identifying one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<Segment>);

impl QueryKey {
    /// Start a key at its root namespace segment.
    pub fn root(name: &str) -> Self {
        Self(vec![Segment::from(name)])
    }

    /// Append a segment, builder style.
    pub fn child(mut self, segment: impl Into<Segment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Whether `prefix` is a segment-wise prefix of this key. Every key is a
    /// prefix of itself.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
