use std::fmt;

use crate::error::HttpError;

pub const CONTENT_LENGTH: &str = "Content-length";
pub const CONNECTION: &str = "Connection";
pub const CONTENT_TYPE: &str = "Content-type";
pub const SERVER: &str = "Server";

/// Case-insensitive header store.
///
/// Names are compared with ASCII case folding and keep the casing they were
/// first inserted with. Iteration and serialization follow insertion order.
///
/// The store can be frozen once; from then on every mutator returns
/// [`HttpError::HeadersFrozen`] while reads keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
    frozen: bool,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    fn ensure_mutable(&self) -> Result<(), HttpError> {
        if self.frozen {
            return Err(HttpError::HeadersFrozen);
        }
        Ok(())
    }

    /// Returns the value stored under `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets `name` to `value`, replacing any previous value.
    ///
    /// An existing entry keeps its position and original name casing.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HttpError> {
        self.ensure_mutable()?;

        let name = name.into();
        if name.contains(':') {
            return Err(HttpError::InvalidHeaderName(name));
        }

        match self.position(&name) {
            Some(i) => self.entries[i].1 = value.into(),
            None => self.entries.push((name, value.into())),
        }
        Ok(())
    }

    /// Removes `name` and returns its previous value.
    pub fn remove(&mut self, name: &str) -> Result<Option<String>, HttpError> {
        self.ensure_mutable()?;
        Ok(self.position(name).map(|i| self.entries.remove(i).1))
    }

    pub fn clear(&mut self) -> Result<(), HttpError> {
        self.ensure_mutable()?;
        self.entries.clear();
        Ok(())
    }

    /// Parsed Content-Length, `None` when absent or not a plain decimal number.
    pub fn content_length(&self) -> Option<u64> {
        let value = self.get(CONTENT_LENGTH)?;
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value.parse().ok()
    }

    /// Sets Content-Length, or removes the header when `len` is `None`.
    pub fn set_content_length(&mut self, len: Option<u64>) -> Result<(), HttpError> {
        match len {
            Some(len) => self.set(CONTENT_LENGTH, len.to_string()),
            None => self.remove(CONTENT_LENGTH).map(|_| ()),
        }
    }

    /// One-way switch to read-only.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Wire header block: `Name: Value` lines joined by CRLF, without the
/// terminating blank line.
impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\r\n")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}
