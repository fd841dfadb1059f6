//! The environment that shows the authorization page to the resource owner.
//!
//! A host opens the page, tells the client when the owner came back through
//! the callback, and closes the page again. [`Listeners`] is a ready-made
//! registry for the one-shot notifications a host has to deliver.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::oneshot;
use url::Url;
use uuid::Uuid;

use crate::{Result, OAUTH_VERIFIER_KEY};

const DENIED_KEY: &str = "denied";

/// Identifies one interactive authorization surface (a tab, a window...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(String);

impl SurfaceId {
    /// A new random identifier.
    pub fn fresh() -> Self {
        SurfaceId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SurfaceId {
    fn from(id: String) -> Self {
        SurfaceId(id)
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        SurfaceId(id.to_string())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the host reports once the resource owner is done with the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The owner came back through the callback.
    Completed { verifier: Option<String> },
    /// The owner closed the page or denied access.
    Dismissed,
}

impl Notice {
    /// Interpret the URL the provider redirected the owner to.
    ///
    /// A `denied` parameter means the owner refused; otherwise the
    /// `oauth_verifier`, if any, is carried along.
    pub fn from_callback(url: &Url) -> Self {
        let mut verifier = None;
        for (key, value) in url.query_pairs() {
            if key == DENIED_KEY {
                return Notice::Dismissed;
            }
            if key == OAUTH_VERIFIER_KEY {
                verifier = Some(value.into_owned());
            }
        }
        Notice::Completed { verifier }
    }
}

#[async_trait(?Send)]
pub trait AuthorizationHost {
    /// Show `url` to the resource owner and return the surface it lives in.
    async fn open(&self, url: &Url) -> Result<SurfaceId>;

    /// Register a one-shot listener for the notice of `surface`.
    fn listen(&self, surface: &SurfaceId) -> oneshot::Receiver<Notice>;

    /// Drop the listener of `surface`, if still registered.
    fn unlisten(&self, surface: &SurfaceId);

    async fn close(&self, surface: &SurfaceId) -> Result<()>;

    /// Called when the flow is dropped while `surface` is still open.
    ///
    /// Runs outside of any async context, so it cannot await `close`.
    /// Hosts that can tear the surface down synchronously should do it here.
    fn abandon(&self, surface: &SurfaceId) {
        self.unlisten(surface);
    }
}

/// Pending one-shot listeners, keyed by surface.
#[derive(Debug, Default)]
pub struct Listeners {
    pending: Mutex<HashMap<SurfaceId, oneshot::Sender<Notice>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a listener for `surface`, replacing any previous one.
    pub fn register(&self, surface: &SurfaceId) -> oneshot::Receiver<Notice> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(surface.clone(), tx);
        rx
    }

    /// Returns true when a listener was registered for `surface`.
    pub fn deregister(&self, surface: &SurfaceId) -> bool {
        self.lock().remove(surface).is_some()
    }

    /// Deliver `notice` to the listener of `surface` and deregister it.
    ///
    /// Notices for surfaces nobody listens to are dropped and reported as
    /// `false`.
    pub fn notify(&self, surface: &SurfaceId, notice: Notice) -> bool {
        match self.lock().remove(surface) {
            Some(tx) => tx.send(notice).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SurfaceId, oneshot::Sender<Notice>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
