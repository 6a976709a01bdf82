//! Observer registration with explicit disposers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Table<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

fn lock<T>(table: &Mutex<Table<T>>) -> MutexGuard<'_, Table<T>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A list of listeners for values of type `T`.
pub struct Listeners<T> {
    table: Arc<Mutex<Table<T>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> Listeners<T> {
    /// Creates an empty listener list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 1,
                entries: Vec::new(),
            })),
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every registered listener with `value`.
    ///
    /// Listeners run outside the registry lock, so a listener may register
    /// or dispose other listeners.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.table)
            .entries
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T: 'static> Listeners<T> {
    /// Registers a listener and returns the handle that removes it.
    ///
    /// Dropping the handle leaves the listener registered.
    pub fn register<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Table<T>>> = Arc::downgrade(&self.table);
        ListenerHandle {
            id,
            remove: Box::new(move || {
                if let Some(table) = weak.upgrade() {
                    lock(&table).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }
}

/// Disposer returned by [`Listeners::register`].
pub struct ListenerHandle {
    id: u64,
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl ListenerHandle {
    /// Returns the listener id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Removes the listener.
    pub fn dispose(self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}
