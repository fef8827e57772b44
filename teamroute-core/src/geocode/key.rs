use std::fmt;

/// Normalised cache key for an address.
///
/// Normalisation upper-cases the text and removes every whitespace
/// character, so `"sw1a 1aa"` and `"SW1A1AA "` share one key.
///
/// # Examples
///
/// ```
/// use teamroute_core::AddressKey;
///
/// let a = AddressKey::normalise("sw1a 1aa").expect("non-empty");
/// let b = AddressKey::normalise(" SW1A\t1AA ").expect("non-empty");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "SW1A1AA");
/// assert!(AddressKey::normalise("  ").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressKey(String);

impl AddressKey {
    /// Normalise `raw`, returning `None` when nothing is left.
    #[must_use]
    pub fn normalise(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    /// The normalised text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AddressKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
