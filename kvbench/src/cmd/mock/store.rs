use moka::sync::Cache;

use crate::protocol::KvOperation;

use super::protocol::{Route, Status};

/// Bounded in-memory key/value store backing the mock server.
#[derive(Debug, Clone)]
pub struct MockKvStore {
    cache: Cache<String, String>,
}

impl MockKvStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity.max(1)),
        }
    }

    /// Apply a routed request, returning the status and body to respond with.
    pub fn apply(&self, route: &Route) -> (Status, String) {
        let key = route.key.as_str();
        match route.op {
            KvOperation::Get => match self.cache.get(key) {
                Some(value) => (Status::Ok, value),
                None => (Status::NotFound, format!("Error: Key : {key} Not Found.")),
            },
            KvOperation::Set => {
                let value = route.value.clone().unwrap_or_default();
                self.cache.insert(key.to_owned(), value);
                (Status::Ok, format!("OK: Key {key} was set"))
            }
            KvOperation::Delete => {
                self.cache.invalidate(key);
                (Status::Ok, format!("OK: Key {key} was deleted"))
            }
        }
    }
}
