//! Per-call context: request id, keyed values, cancellation and deadlines.
//!
//! A [`Context`] is an immutable chain of nodes. Deriving a child with
//! [`Context::with_value`], [`Context::with_cancel`] or
//! [`Context::with_deadline`] never changes the parent, so a context can be
//! cloned into handlers freely.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each call, using UUID v7.
///
/// ```
/// use archytas_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Key of a context value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(&'static str);

impl ContextKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

/// Key under which the router stores path parameters as
/// [`archytas_router::Params`].
pub const PATH_PARAMETERS_KEY: ContextKey = ContextKey::new("archytas.path_parameters");

type ContextValue = Arc<dyn Any + Send + Sync>;

struct Node {
    parent: Option<Context>,
    entry: Option<(ContextKey, ContextValue)>,
    cancelled: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

/// Cancellation and value carrier handed to handlers.
///
/// ```
/// use archytas_core::{Context, ContextKey};
///
/// const TENANT: ContextKey = ContextKey::new("tenant");
///
/// let (ctx, cancel) = Context::background()
///     .with_value(TENANT, "acme".to_string())
///     .with_cancel();
/// assert_eq!(ctx.value_as::<String>(TENANT).map(String::as_str), Some("acme"));
///
/// cancel.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    node: Arc<Node>,
}

impl Context {
    /// An empty context that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                entry: None,
                cancelled: None,
                deadline: None,
            }),
        }
    }

    fn child(&self, node: impl FnOnce(Context) -> Node) -> Self {
        Self {
            node: Arc::new(node(self.clone())),
        }
    }

    /// Derives a context carrying `value` under `key`.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(&self, key: ContextKey, value: T) -> Self {
        self.with_shared_value(key, Arc::new(value))
    }

    /// Derives a context carrying an already shared value.
    #[must_use]
    pub fn with_shared_value(&self, key: ContextKey, value: Arc<dyn Any + Send + Sync>) -> Self {
        let deadline = self.node.deadline;
        self.child(|parent| Node {
            parent: Some(parent),
            entry: Some((key, value)),
            cancelled: None,
            deadline,
        })
    }

    /// Looks up a value, searching from the newest node outwards.
    #[must_use]
    pub fn value(&self, key: ContextKey) -> Option<&(dyn Any + Send + Sync)> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((k, v)) = &ctx.node.entry {
                if *k == key {
                    return Some(&**v);
                }
            }
            current = ctx.node.parent.as_ref();
        }
        None
    }

    /// Looks up a value and downcasts it.
    ///
    /// Returns `None` both when the key is absent and when it holds another type;
    /// use [`Context::value`] to tell the two apart.
    #[must_use]
    pub fn value_as<T: Any>(&self, key: ContextKey) -> Option<&T> {
        self.value(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Derives a cancellable context.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let deadline = self.node.deadline;
        let ctx = self.child(|parent| Node {
            parent: Some(parent),
            entry: None,
            cancelled: Some(Arc::clone(&flag)),
            deadline,
        });
        (ctx, CancelHandle { flag })
    }

    /// Derives a context that expires at `deadline`, or earlier if the parent does.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.node.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        self.child(|parent| Node {
            parent: Some(parent),
            entry: None,
            cancelled: None,
            deadline: Some(deadline),
        })
    }

    /// Derives a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the effective deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.node.deadline
    }

    /// Returns true once this context or any ancestor was cancelled or expired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.node.deadline.is_some_and(|d| Instant::now() >= d) {
            return true;
        }
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(flag) = &ctx.node.cancelled {
                if flag.load(Ordering::Acquire) {
                    return true;
                }
            }
            current = ctx.node.parent.as_ref();
        }
        false
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((k, _)) = &ctx.node.entry {
                keys.push(k.name());
            }
            current = ctx.node.parent.as_ref();
        }
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("deadline", &self.node.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels the context returned alongside it by [`Context::with_cancel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancels the context and every context derived from it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
