//! Path parameters extracted by a template match.

use smallvec::SmallVec;

/// Parameters stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Variables extracted from a request path, in template order.
///
/// This is the mapping the structured-request binder reads from the call
/// context. Names are unique within one match because [`PathTemplate`]
/// rejects duplicate variables.
///
/// [`PathTemplate`]: crate::PathTemplate
///
/// ```rust
/// use archytas_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "5");
/// params.push("slug", "hello");
///
/// assert_eq!(params.get("id"), Some("5"));
/// assert_eq!(params.names().collect::<Vec<_>>(), vec!["id", "slug"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, replacing the value if the name is already present.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a parameter with this name was extracted.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// True when the match bound no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over parameter names in template order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates over `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}
