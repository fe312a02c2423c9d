//! Key Mapping Module
//!
//! Composes the backend key from a logical key plus optional prefix and suffix.

// == Key Mapper ==
/// Namespaces logical keys as `prefix.key.suffix`.
///
/// Unset segments are omitted together with their dot. Mapping is pure and
/// deterministic. It is injective for one configuration, but two mappers whose
/// prefixes nest (`"a"` and `"a.b"`) can collide on one backend; choosing
/// non-overlapping namespaces is the caller's job.
///
/// Flushing a backend is never scoped by the namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMapper {
    prefix: Option<String>,
    suffix: Option<String>,
}

impl KeyMapper {
    pub fn new(prefix: Option<String>, suffix: Option<String>) -> Self {
        Self { prefix, suffix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Maps a logical key to the backend key.
    pub fn map(&self, key: &str) -> String {
        let mut mapped = String::with_capacity(
            key.len()
                + self.prefix.as_ref().map_or(0, |p| p.len() + 1)
                + self.suffix.as_ref().map_or(0, |s| s.len() + 1),
        );
        if let Some(prefix) = &self.prefix {
            mapped.push_str(prefix);
            mapped.push('.');
        }
        mapped.push_str(key);
        if let Some(suffix) = &self.suffix {
            mapped.push('.');
            mapped.push_str(suffix);
        }
        mapped
    }

    /// Pattern describing the whole namespace, used to tag namespace-wide operations.
    pub fn namespace(&self) -> String {
        self.map("*")
    }
}
