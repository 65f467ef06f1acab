use std::fmt;

const SEPARATOR: u8 = b'/';

/// A key prefix inside a column family. Nested buckets append path segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbBucket {
    cf: &'static str,
    prefix: Vec<u8>,
}

impl DbBucket {
    /// The bucket covering the whole column family
    pub fn root(cf: &'static str) -> Self {
        Self { cf, prefix: Vec::new() }
    }

    pub fn new(cf: &'static str, name: &[u8]) -> Self {
        Self::root(cf).bucket(name)
    }

    pub fn bucket(&self, name: &[u8]) -> Self {
        let mut prefix = Vec::with_capacity(self.prefix.len() + name.len() + 1);
        prefix.extend_from_slice(&self.prefix);
        prefix.extend_from_slice(name);
        prefix.push(SEPARATOR);
        Self { cf: self.cf, prefix }
    }

    /// Location of a single value named `name`.
    /// Unlike [`DbBucket::bucket`] no separator is appended.
    pub fn item(&self, name: &[u8]) -> Self {
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(name);
        Self { cf: self.cf, prefix }
    }

    pub fn key(&self, suffix: impl AsRef<[u8]>) -> DbKey {
        let suffix = suffix.as_ref();
        let mut bytes = Vec::with_capacity(self.prefix.len() + suffix.len());
        bytes.extend_from_slice(&self.prefix);
        bytes.extend_from_slice(suffix);
        DbKey { cf: self.cf, bytes, prefix_len: self.prefix.len() }
    }

    pub fn cf(&self) -> &'static str {
        self.cf
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

/// A fully qualified key: column family plus bucket prefix plus suffix
#[derive(Clone, PartialEq, Eq)]
pub struct DbKey {
    cf: &'static str,
    bytes: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn cf(&self) -> &'static str {
        self.cf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn suffix(&self) -> &[u8] {
        &self.bytes[self.prefix_len..]
    }
}

impl fmt::Display for DbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = String::from_utf8_lossy(&self.bytes[..self.prefix_len]);
        write!(f, "{}:{}{}", self.cf, prefix, hex::encode(self.suffix()))
    }
}

impl fmt::Debug for DbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
