use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::session::Session;

/// Live sessions of one endpoint, keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|r| r.value().clone())
    }

    /// Look up `id`, creating the session with `create` if absent.
    ///
    /// Atomic per id: concurrent callers for the same id observe one session.
    /// The flag is true for the caller that created it.
    pub fn get_or_create<F>(&self, id: &str, create: F) -> (Session, bool)
    where
        F: FnOnce() -> Session,
    {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(e) => (e.get().clone(), false),
            Entry::Vacant(v) => {
                let session = create();
                v.insert(session.clone());
                (session, true)
            }
        }
    }

    /// Remove the entry for `session`'s id only if it still maps to that
    /// exact instance.
    pub fn remove_if_same(&self, session: &Session) -> bool {
        self.sessions
            .remove_if(session.id(), |_, current| current.ptr_eq(session))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
