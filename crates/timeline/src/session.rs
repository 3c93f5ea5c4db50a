use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{trace, warn};

/// Host-level event subscriptions an interaction may hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    MouseMove,
    MouseUp,
    TouchMove,
    TouchEnd,
    /// Abnormal termination, e.g. the window losing focus mid-drag.
    WindowBlur,
    KeyDown,
}

/// Listeners held by every pointer session, mouse and touch alike.
pub const POINTER_SESSION_LISTENERS: [ListenerKind; 5] = [
    ListenerKind::MouseMove,
    ListenerKind::MouseUp,
    ListenerKind::TouchMove,
    ListenerKind::TouchEnd,
    ListenerKind::WindowBlur,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// The event source listeners are registered with (a window, in a browser).
pub trait ListenerHost {
    fn attach(&mut self, kind: ListenerKind) -> ListenerToken;
    fn detach(&mut self, token: ListenerToken);
}

pub type SharedListenerHost = Rc<RefCell<dyn ListenerHost>>;

/// Scoped ownership of a set of listeners. Detaches on [`dispose`] or drop,
/// whichever comes first.
///
/// [`dispose`]: ListenerGuard::dispose
pub struct ListenerGuard {
    host: SharedListenerHost,
    tokens: Vec<ListenerToken>,
}

impl ListenerGuard {
    pub fn acquire(host: &SharedListenerHost, kinds: &[ListenerKind]) -> Self {
        let mut tokens = Vec::with_capacity(kinds.len());
        {
            let mut h = host.borrow_mut();
            for kind in kinds {
                tokens.push(h.attach(*kind));
            }
        }
        trace!("attached {} listeners", kinds.len());
        Self {
            host: Rc::clone(host),
            tokens,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn dispose(&mut self) {
        if self.tokens.is_empty() {
            return;
        }
        match self.host.try_borrow_mut() {
            Ok(mut host) => {
                for token in self.tokens.drain(..) {
                    host.detach(token);
                }
            }
            Err(_) => warn!("listener host busy; {} listeners left attached", self.tokens.len()),
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("tokens", &self.tokens)
            .finish()
    }
}

/// Listener host that just keeps a registry; used headless and in tests.
#[derive(Debug, Default)]
pub struct InMemoryListenerHost {
    next_token: u64,
    attached: Vec<(ListenerToken, ListenerKind)>,
}

impl InMemoryListenerHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn active_count(&self) -> usize {
        self.attached.len()
    }

    pub fn is_attached(&self, kind: ListenerKind) -> bool {
        self.attached.iter().any(|(_, k)| *k == kind)
    }
}

impl ListenerHost for InMemoryListenerHost {
    fn attach(&mut self, kind: ListenerKind) -> ListenerToken {
        self.next_token += 1;
        let token = ListenerToken(self.next_token);
        self.attached.push((token, kind));
        token
    }

    fn detach(&mut self, token: ListenerToken) {
        self.attached.retain(|(t, _)| *t != token);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// Horizontal pointer position; for touch, that of the first touch point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PointerInput {
    pub client_x: f64,
    pub source: PointerSource,
}

impl PointerInput {
    pub fn mouse(client_x: f64) -> Self {
        Self {
            client_x,
            source: PointerSource::Mouse,
        }
    }

    pub fn touch(client_x: f64) -> Self {
        Self {
            client_x,
            source: PointerSource::Touch,
        }
    }
}
