//! Handle registry.
//!
//! Maps 32-bit handles to actor instances through an open-addressed,
//! power-of-two slot table, and names to handles through a sorted vector.
//! Both share one reader/writer spin lock.

use std::sync::Arc;

use hive_core::error::RegistryError;
use hive_core::handle::HANDLE_MASK;
use hive_core::{Handle, HarborId};
use log::{debug, trace};

use crate::sync::SpinRwLock;

/// Initial number of slots in the handle table
pub const DEFAULT_SLOT_SIZE: usize = 4;

/// An instance that can live in a [`HandleRegistry`].
///
/// The registry assigns the handle while it holds its exclusive lock, so
/// the instance is never observable under a handle it does not report.
pub trait Registrant: Send + Sync {
    /// Handle currently assigned to this instance
    fn handle(&self) -> Handle;

    /// Record the handle assigned by the registry
    fn assign_handle(&self, handle: Handle);
}

struct Table<T> {
    slots: Vec<Option<Arc<T>>>,
    /// Next local index to try
    cursor: u32,
    /// Sorted by name
    names: Vec<(String, Handle)>,
}

impl<T: Registrant> Table<T> {
    fn slot_of(&self, handle: Handle) -> usize {
        handle.local() as usize & (self.slots.len() - 1)
    }

    fn occupant(&self, handle: Handle) -> Option<&Arc<T>> {
        self.slots[self.slot_of(handle)]
            .as_ref()
            .filter(|entry| entry.handle() == handle)
    }

    fn expand(&mut self) {
        let size = self.slots.len() * 2;
        assert!(
            size - 1 <= HANDLE_MASK as usize,
            "handle table cannot grow beyond {} slots",
            size / 2
        );

        let mut slots: Vec<Option<Arc<T>>> = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        for entry in self.slots.drain(..).flatten() {
            let hash = entry.handle().local() as usize & (size - 1);
            debug_assert!(slots[hash].is_none());
            slots[hash] = Some(entry);
        }
        self.slots = slots;
        debug!("Handle table grew to {} slots", size);
    }
}

/// Registry of live instances by handle and by name
pub struct HandleRegistry<T> {
    harbor: HarborId,
    table: SpinRwLock<Table<T>>,
}

impl<T: Registrant> HandleRegistry<T> {
    /// Create a registry that stamps `harbor` into every handle it issues
    pub fn new(harbor: HarborId) -> Self {
        let mut slots = Vec::with_capacity(DEFAULT_SLOT_SIZE);
        slots.resize_with(DEFAULT_SLOT_SIZE, || None);

        Self {
            harbor,
            table: SpinRwLock::new(Table {
                slots,
                cursor: 1,
                names: Vec::new(),
            }),
        }
    }

    /// The harbor id of this registry
    pub fn harbor(&self) -> HarborId {
        self.harbor
    }

    /// Register an instance and assign it a fresh handle.
    ///
    /// The registry keeps its own reference until the handle is retired.
    ///
    /// # Panics
    ///
    /// Panics if the table would have to grow past the 24-bit handle space.
    pub fn register(&self, entry: Arc<T>) -> Handle {
        let mut table = self.table.write();

        loop {
            let size = table.slots.len();
            for i in 0..size as u32 {
                let local = table.cursor.wrapping_add(i) & HANDLE_MASK;
                if local == 0 {
                    continue;
                }
                let hash = local as usize & (size - 1);
                if table.slots[hash].is_none() {
                    let handle = Handle::from_parts(self.harbor, local);
                    entry.assign_handle(handle);
                    table.slots[hash] = Some(entry);
                    table.cursor = local + 1;
                    trace!("Registered {}", handle);
                    return handle;
                }
            }
            table.expand();
        }
    }

    /// Retire a handle.
    ///
    /// Clears the slot and every name bound to the handle. Returns false if
    /// the handle is not live. The registry's reference is dropped after
    /// the lock is released, so teardown code may call back into the
    /// registry.
    pub fn retire(&self, handle: Handle) -> bool {
        let removed = {
            let mut table = self.table.write();
            if table.occupant(handle).is_none() {
                return false;
            }
            let hash = table.slot_of(handle);
            let removed = table.slots[hash].take();
            table.names.retain(|(_, bound)| *bound != handle);
            removed
        };

        trace!("Retired {}", handle);
        drop(removed);
        true
    }

    /// Retire every live handle, repeating until a pass retires nothing.
    pub fn retire_all(&self) {
        loop {
            let retired = self
                .handles()
                .into_iter()
                .filter(|handle| self.retire(*handle))
                .count();
            if retired == 0 {
                break;
            }
        }
    }

    /// Take a new reference to the instance behind `handle`
    pub fn grab(&self, handle: Handle) -> Option<Arc<T>> {
        self.table.read().occupant(handle).cloned()
    }

    /// Look up the handle bound to `name`
    pub fn find_by_name(&self, name: &str) -> Option<Handle> {
        let table = self.table.read();
        table
            .names
            .binary_search_by(|(bound, _)| bound.as_str().cmp(name))
            .ok()
            .map(|index| table.names[index].1)
    }

    /// Bind a name to a handle.
    ///
    /// Names are unique and cannot be rebound.
    pub fn bind_name(&self, handle: Handle, name: &str) -> Result<(), RegistryError> {
        let mut table = self.table.write();
        match table
            .names
            .binary_search_by(|(bound, _)| bound.as_str().cmp(name))
        {
            Ok(_) => Err(RegistryError::NameExists(name.to_string())),
            Err(index) => {
                table.names.insert(index, (name.to_string(), handle));
                Ok(())
            }
        }
    }

    /// Snapshot of every live handle
    pub fn handles(&self) -> Vec<Handle> {
        self.table
            .read()
            .slots
            .iter()
            .flatten()
            .map(|entry| entry.handle())
            .collect()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.table.read().slots.iter().flatten().count()
    }

    /// Whether no handle is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current slot table size
    pub fn slot_size(&self) -> usize {
        self.table.read().slots.len()
    }
}

impl<T> std::fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("harbor", &self.harbor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Weak;
    use std::thread;

    #[derive(Default)]
    struct Probe {
        handle: AtomicU32,
    }

    impl Registrant for Probe {
        fn handle(&self) -> Handle {
            Handle::new(self.handle.load(Ordering::Acquire))
        }

        fn assign_handle(&self, handle: Handle) {
            self.handle.store(handle.raw(), Ordering::Release);
        }
    }

    /// Retires another handle when dropped
    struct Chained {
        handle: AtomicU32,
        registry: Weak<HandleRegistry<Chained>>,
        next: Handle,
        drops: Arc<AtomicUsize>,
    }

    impl Registrant for Chained {
        fn handle(&self) -> Handle {
            Handle::new(self.handle.load(Ordering::Acquire))
        }

        fn assign_handle(&self, handle: Handle) {
            self.handle.store(handle.raw(), Ordering::Release);
        }
    }

    impl Drop for Chained {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
            if let Some(registry) = self.registry.upgrade() {
                registry.retire(self.next);
            }
        }
    }

    #[test]
    fn test_register_assigns_handles() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let a = Arc::new(Probe::default());
        let b = Arc::new(Probe::default());

        let ha = registry.register(Arc::clone(&a));
        let hb = registry.register(Arc::clone(&b));

        assert_eq!(ha, Handle::new(1));
        assert_eq!(hb, Handle::new(2));
        assert_eq!(a.handle(), ha);
        assert!(Arc::ptr_eq(&registry.grab(hb).unwrap(), &b));
    }

    #[test]
    fn test_harbor_bits() {
        let registry = HandleRegistry::new(HarborId::new(3));
        let handle = registry.register(Arc::new(Probe::default()));

        assert_eq!(handle.harbor(), HarborId::new(3));
        assert_eq!(handle.local(), 1);
        assert!(registry.grab(handle).is_some());
        assert!(registry.grab(Handle::new(1)).is_none());
    }

    #[test]
    fn test_growth_keeps_handles_resolvable() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let count = 4 * DEFAULT_SLOT_SIZE + 1;

        let handles: Vec<Handle> = (0..count)
            .map(|_| registry.register(Arc::new(Probe::default())))
            .collect();

        // 4 -> 8 -> 16 -> 32
        assert!(registry.slot_size() >= DEFAULT_SLOT_SIZE * 4);
        assert_eq!(registry.len(), count);
        for handle in handles {
            assert_eq!(registry.grab(handle).unwrap().handle(), handle);
        }
    }

    #[test]
    fn test_handles_not_reused_immediately() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let first = registry.register(Arc::new(Probe::default()));
        assert!(registry.retire(first));

        let second = registry.register(Arc::new(Probe::default()));
        assert_ne!(first, second);
        assert!(registry.grab(first).is_none());
    }

    #[test]
    fn test_name_uniqueness() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let a = registry.register(Arc::new(Probe::default()));
        let b = registry.register(Arc::new(Probe::default()));

        assert!(registry.bind_name(a, "alpha").is_ok());
        assert!(matches!(
            registry.bind_name(b, "alpha"),
            Err(RegistryError::NameExists(name)) if name == "alpha"
        ));
        assert_eq!(registry.find_by_name("alpha"), Some(a));
        assert_eq!(registry.find_by_name("beta"), None);
    }

    #[test]
    fn test_names_sorted_lookup() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let names = ["delta", "alpha", "echo", "charlie", "bravo"];
        let handles: Vec<Handle> = names
            .iter()
            .map(|name| {
                let handle = registry.register(Arc::new(Probe::default()));
                registry.bind_name(handle, name).unwrap();
                handle
            })
            .collect();

        for (name, handle) in names.iter().zip(handles) {
            assert_eq!(registry.find_by_name(name), Some(handle));
        }
    }

    #[test]
    fn test_retire_safety() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let handle = registry.register(Arc::new(Probe::default()));
        registry.bind_name(handle, "one").unwrap();
        registry.bind_name(handle, "uno").unwrap();

        assert!(registry.retire(handle));
        assert!(!registry.retire(handle));
        assert!(registry.grab(handle).is_none());
        assert_eq!(registry.find_by_name("one"), None);
        assert_eq!(registry.find_by_name("uno"), None);
        assert!(!registry.retire(Handle::new(0xffff_ffff)));
    }

    #[test]
    fn test_retire_drops_reference_outside_lock() {
        let registry = Arc::new(HandleRegistry::new(HarborId::new(0)));
        let drops = Arc::new(AtomicUsize::new(0));

        let tail = registry.register(Arc::new(Chained {
            handle: AtomicU32::new(0),
            registry: Arc::downgrade(&registry),
            next: Handle::NONE,
            drops: Arc::clone(&drops),
        }));
        let head = registry.register(Arc::new(Chained {
            handle: AtomicU32::new(0),
            registry: Arc::downgrade(&registry),
            next: tail,
            drops: Arc::clone(&drops),
        }));

        // Dropping `head` retires `tail` from inside the teardown
        assert!(registry.retire(head));
        assert_eq!(drops.load(Ordering::SeqCst), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_retire_all() {
        let registry = Arc::new(HandleRegistry::new(HarborId::new(0)));
        let drops = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            registry.register(Arc::new(Chained {
                handle: AtomicU32::new(0),
                registry: Arc::downgrade(&registry),
                next: Handle::NONE,
                drops: Arc::clone(&drops),
            }));
        }

        registry.retire_all();
        assert!(registry.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_grab_keeps_instance_alive() {
        let registry = HandleRegistry::new(HarborId::new(0));
        let handle = registry.register(Arc::new(Probe::default()));

        let held = registry.grab(handle).unwrap();
        assert!(registry.retire(handle));
        assert_eq!(held.handle(), handle);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn test_concurrent_register_and_grab() {
        let registry = Arc::new(HandleRegistry::new(HarborId::new(0)));
        let mut workers = vec![];

        for _ in 0..4 {
            let registry = Arc::clone(&registry);
            workers.push(thread::spawn(move || {
                let mut mine = vec![];
                for _ in 0..100 {
                    mine.push(registry.register(Arc::new(Probe::default())));
                }
                for handle in &mine {
                    assert_eq!(registry.grab(*handle).unwrap().handle(), *handle);
                }
                mine
            }));
        }

        let mut all: Vec<Handle> = workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(registry.len(), 400);
    }
}
