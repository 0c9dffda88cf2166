use std::fmt;

/// An `a=` line: a key and an optional value (`a=key:value` or `a=flag`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    key: String,
    value: Option<String>,
}

impl Attribute {
    pub fn new<K: Into<String>, V: Into<Option<String>>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn flag<K: Into<String>>(key: K) -> Self {
        Self::new(key, None)
    }

    /// Splits the text after `a=` on the first `:`.
    #[must_use]
    pub fn parse(rest: &str) -> Self {
        match rest.split_once(':') {
            Some((k, v)) => Self::new(k.trim(), Some(v.trim().to_owned())),
            None => Self::flag(rest.trim()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "a={}:{}", self.key, v),
            None => write!(f, "a={}", self.key),
        }
    }
}
