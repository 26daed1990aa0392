use smallvec::SmallVec;
use std::ops::Index;
use std::sync::Arc;

/// Maximum number of path parameters stored inline before spilling to the heap.
/// Card routes rarely exceed two (`/posts/:postId/comments/:commentId`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage. Names are shared with the compiled
/// pattern; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Path parameters extracted by a match, in pattern order.
///
/// Positional access is the primary interface; name lookup is provided for
/// convenience and uses "last write wins" when a pattern repeats a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: ParamVec,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: Arc<str>, value: String) {
        self.inner.push((name, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Value at `index` in pattern order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.inner.get(index).map(|(_, v)| v.as_str())
    }

    /// Value of the last parameter called `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values in pattern order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

impl Index<usize> for Params {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.inner[index].1
    }
}
