//! Key Module
//!
//! Slash-delimited, normalized, path-like identifiers.
//!
//! ## Normal Form
//! - Always begins with `/`
//! - No trailing slash (except the root key `/`)
//! - No empty, `.` or `..` segments (`..` pops the previous segment and is
//!   dropped at the root)
//!
//! Normalization is idempotent: `clean(clean(s)) == clean(s)`.
//!
//! ## Namespaces
//! Each segment is a namespace. A namespace may carry a type using the
//! `Type:value` convention, e.g. `/Comedy/MontyPython/Actor:JohnCleese`.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;

/// Path separator between namespaces
pub const SEPARATOR: char = '/';

/// Separator between a namespace's type and value
const TYPE_SEPARATOR: char = ':';

/// A normalized datastore key
///
/// Keys compare, hash and order by their normalized string form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Create a key, normalizing the input
    pub fn new(s: impl AsRef<str>) -> Self {
        Key(clean(s.as_ref()))
    }

    /// The root key `/`
    pub fn root() -> Self {
        Key(SEPARATOR.to_string())
    }

    /// Build a key from a list of namespaces
    pub fn with_namespaces<S: AsRef<str>>(namespaces: &[S]) -> Self {
        let joined = namespaces
            .iter()
            .map(|ns| ns.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        Key::new(joined)
    }

    /// A key made of a single random 128-bit hex segment
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Key(format!("/{}", hex))
    }

    /// The normalized string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized string form as bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// All namespaces of this key, in order
    ///
    /// `/a/b/c` → `["a", "b", "c"]`; the root key has none.
    pub fn list(&self) -> Vec<&str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
    }

    /// Alias of [`Key::list`]
    pub fn namespaces(&self) -> Vec<&str> {
        self.list()
    }

    /// Proper ancestors from the top level down to the parent (root excluded)
    ///
    /// `/a/b/c` → `[/a, /a/b]`
    pub fn ancestors(&self) -> Vec<Key> {
        let list = self.list();
        (1..list.len())
            .map(|n| Key(format!("/{}", list[..n].join("/"))))
            .collect()
    }

    /// The key with its last namespace removed; the root is its own parent
    pub fn parent(&self) -> Key {
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Key::root(),
            Some(idx) => Key(self.0[..idx].to_string()),
        }
    }

    /// Append `child` below this key
    pub fn child(&self, child: &Key) -> Key {
        if self.is_root() {
            return child.clone();
        }
        if child.is_root() {
            return self.clone();
        }
        Key(format!("{}{}", self.0, child.0))
    }

    /// The last namespace (`""` for the root)
    pub fn base_namespace(&self) -> &str {
        self.list().last().copied().unwrap_or("")
    }

    /// Type of the last namespace: `/a/Actor:JohnCleese` → `Actor`
    pub fn type_(&self) -> &str {
        namespace_type(self.base_namespace())
    }

    /// Value of the last namespace: `/a/Actor:JohnCleese` → `JohnCleese`
    pub fn name(&self) -> &str {
        namespace_value(self.base_namespace())
    }

    /// A sibling key whose last namespace is typed by this key's base
    ///
    /// `/Comedy/Actor` + `JohnCleese` → `/Comedy/Actor:JohnCleese`
    pub fn instance(&self, value: &str) -> Key {
        Key::new(format!("{}{}{}", self.0, TYPE_SEPARATOR, value))
    }

    /// The parent joined with this key's type: `/a/Actor:John` → `/a/Actor`
    pub fn path(&self) -> Key {
        let parent = self.parent();
        Key::new(format!("{}/{}", parent.0, self.type_()))
    }

    /// The namespaces in reverse order: `/a/b/c` → `/c/b/a`
    pub fn reverse(&self) -> Key {
        let mut list = self.list();
        list.reverse();
        Key::with_namespaces(&list)
    }

    /// The key with every separator removed: `/a/bc` → `abc`
    pub fn flattened(&self) -> String {
        self.0.chars().filter(|c| *c != SEPARATOR).collect()
    }

    /// True when `other` lies strictly below this key
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        if other.0.len() <= self.0.len() {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other.0.starts_with(&self.0) && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// True when this key lies strictly below `other`
    pub fn is_descendant_of(&self, other: &Key) -> bool {
        other.is_ancestor_of(self)
    }

    /// True for keys with exactly one namespace
    pub fn is_top_level(&self) -> bool {
        self.list().len() == 1
    }
}

/// Normalize a raw key string
///
/// `""` → `/`, `a/b` → `/a/b`, `/a//b/./c/..` → `/a/b`
pub fn clean(s: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in s.split(SEPARATOR) {
        match seg {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(seg),
        }
    }

    if segments.is_empty() {
        return SEPARATOR.to_string();
    }

    let mut out = String::with_capacity(s.len() + 1);
    for seg in segments {
        out.push(SEPARATOR);
        out.push_str(seg);
    }
    out
}

fn namespace_type(ns: &str) -> &str {
    match ns.rfind(TYPE_SEPARATOR) {
        Some(idx) => &ns[..idx],
        None => "",
    }
}

fn namespace_value(ns: &str) -> &str {
    match ns.rfind(TYPE_SEPARATOR) {
        Some(idx) => &ns[idx + 1..],
        None => ns,
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Key::new(s))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::new(s)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::root()
    }
}
