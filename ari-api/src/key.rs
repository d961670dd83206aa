//! Resource keys
//!
//! A [`Key`] addresses one ARI resource (`kind` + `id`) together with its
//! location: the Asterisk node that owns it, the dialog it belongs to and the
//! Stasis application it was delivered to. Every empty field is a wildcard, so
//! the same value works both as an address for commands and as a filter for
//! event subscriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag for Stasis applications
pub const APPLICATION: &str = "application";
/// Kind tag for the Asterisk instance itself
pub const ASTERISK: &str = "asterisk";
/// Kind tag for mixing bridges
pub const BRIDGE: &str = "bridge";
/// Kind tag for channels (call legs)
pub const CHANNEL: &str = "channel";
/// Kind tag for device states
pub const DEVICE_STATE: &str = "devicestate";
/// Kind tag for endpoints
pub const ENDPOINT: &str = "endpoint";
/// Kind tag for recordings in progress
pub const LIVE_RECORDING: &str = "liverecording";
/// Kind tag for log channels
pub const LOGGING: &str = "logging";
/// Kind tag for mailboxes
pub const MAILBOX: &str = "mailbox";
/// Kind tag for loadable modules
pub const MODULE: &str = "module";
/// Kind tag for media playbacks
pub const PLAYBACK: &str = "playback";
/// Kind tag for sound files
pub const SOUND: &str = "sound";
/// Kind tag for completed recordings
pub const STORED_RECORDING: &str = "storedrecording";
/// Kind tag for global variables
pub const VARIABLE: &str = "variable";

/// Identifier and location of an ARI resource
///
/// Keys are plain values: construct one, refine it with the `with_*`
/// methods, then clone it freely.
///
/// ```
/// use ari_api::key::{self, Key};
///
/// let channel = Key::new(key::CHANNEL, "1461600101.12")
///     .with_node("ast-01")
///     .with_app("ivr");
///
/// // A kind-only key matches every channel, wherever it lives
/// assert!(Key::of_kind(key::CHANNEL).matches(&channel));
/// assert!(!Key::of_kind(key::BRIDGE).matches(&channel));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    node: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    dialog: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    app: String,
}

impl Key {
    /// Creates a key for the given kind and id with an unspecified location
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// Key matching every resource of one kind
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self::new(kind, "")
    }

    /// Key matching everything delivered to one application
    pub fn for_app(app: impl Into<String>) -> Self {
        Self::default().with_app(app)
    }

    /// Key matching everything owned by one node within an application
    pub fn for_node(app: impl Into<String>, node: impl Into<String>) -> Self {
        Self::default().with_app(app).with_node(node)
    }

    /// Key matching everything tagged with one dialog
    pub fn for_dialog(dialog: impl Into<String>) -> Self {
        Self::default().with_dialog(dialog)
    }

    /// Builds a key of `kind`/`id` that inherits node, dialog and app from
    /// `reference`.
    pub fn derive_location(reference: &Key, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(kind, id).with_location(reference)
    }

    /// Shorthand for [`Key::derive_location`] with `self` as the reference
    pub fn derive(&self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::derive_location(self, kind, id)
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_dialog(mut self, dialog: impl Into<String>) -> Self {
        self.dialog = dialog.into();
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    /// Copies node, dialog and app from `reference`
    pub fn with_location(mut self, reference: &Key) -> Self {
        self.node = reference.node.clone();
        self.dialog = reference.dialog.clone();
        self.app = reference.app.clone();
        self
    }

    /// The location part of this key (node, dialog and app only)
    pub fn location(&self) -> Key {
        Key::default().with_location(self)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn dialog(&self) -> &str {
        &self.dialog
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// True when every field is a wildcard
    pub fn is_wildcard(&self) -> bool {
        self.kind.is_empty()
            && self.id.is_empty()
            && self.node.is_empty()
            && self.dialog.is_empty()
            && self.app.is_empty()
    }

    /// Two keys match when every field set on both sides is equal.
    ///
    /// Empty fields are wildcards. The relation is symmetric and reflexive,
    /// but not transitive.
    pub fn matches(&self, other: &Key) -> bool {
        field_matches(&self.app, &other.app)
            && field_matches(&self.dialog, &other.dialog)
            && field_matches(&self.node, &other.node)
            && field_matches(&self.kind, &other.kind)
            && field_matches(&self.id, &other.id)
    }
}

fn field_matches(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

/// Free-function form of [`Key::matches`]
pub fn matches(a: &Key, b: &Key) -> bool {
    a.matches(b)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() && self.id.is_empty() {
            write!(f, "*")?;
        } else {
            write!(f, "{}:{}", self.kind, self.id)?;
        }
        if !self.node.is_empty() {
            write!(f, "@{}", self.node)?;
        }
        if !self.app.is_empty() {
            write!(f, "[{}]", self.app)?;
        }
        if !self.dialog.is_empty() {
            write!(f, "{{{}}}", self.dialog)?;
        }
        Ok(())
    }
}

/// Ordered list of keys, as carried by an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(Vec<Key>);

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any key in the list matches `matcher`
    pub fn any_match(&self, matcher: &Key) -> bool {
        self.0.iter().any(|key| key.matches(matcher))
    }

    /// Returns every key matching any of `matchers`, in input order.
    ///
    /// A key matched by several matchers appears once per match; callers
    /// that need a set must dedupe.
    pub fn filter(&self, matchers: &[Key]) -> Keys {
        self.0
            .iter()
            .flat_map(|key| {
                matchers
                    .iter()
                    .filter(move |m| key.matches(m))
                    .map(move |_| key.clone())
            })
            .collect()
    }

    /// Returns the keys matching none of `matchers`
    pub fn without(&self, matchers: &[Key]) -> Keys {
        self.0
            .iter()
            .filter(|key| !matchers.iter().any(|m| key.matches(m)))
            .cloned()
            .collect()
    }

    pub fn first(&self) -> Option<&Key> {
        self.0.first()
    }

    /// The only key of the list, or `None` when there are zero or several
    pub fn single(&self) -> Option<&Key> {
        match self.0.as_slice() {
            [key] => Some(key),
            _ => None,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(Key::id).collect()
    }

    pub fn into_vec(self) -> Vec<Key> {
        self.0
    }
}

impl From<Vec<Key>> for Keys {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl FromIterator<Key> for Keys {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Keys {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Keys {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
