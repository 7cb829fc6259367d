use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;

use rand::RngCore;

use crate::resource::Waiter;
use crate::store::Consumer;
use crate::{ComponentId, Resource, ResourceId, Scheduler, Slot, Store};

/// A type-safe key used to fetch values from the value store.
///
/// # Construction
///
/// A key can be constructed only by calling [`State::insert`]. The state assigns a new numerical
/// ID to the inserted value.
/// Additionally, the key holds a unique hash for the state object.
/// This prevents from using the key with a different instance of [`State`] object.
/// Such operation will panic:
///
/// ```should_panic
/// # use desim::{Key, State};
/// let mut state_1 = State::default();
/// let mut state_2 = State::default();
/// let id = state_1.insert(1);
/// let _ = state_2.remove(id);
/// ```
///
/// # Type Safety
///
/// These keys are type-safe in a sense that a key used to insert a value of type `T` cannot be
/// used to access a value of another type `U`. An attempt to do so will result in a compile error.
///
/// ```compile_fail
/// # use desim::{Key, State};
/// let mut state = State::default();
/// let id = state.insert(String::from("1"));
/// let _: Option<i32> = state.remove(id);  // Error!
/// ```
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Key<V> {
    id: usize,
    state_hash: u64,
    _marker: PhantomData<V>,
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }
}
impl<T> Copy for Key<T> {}

/// A type-safe identifier of a store.
///
/// This is an analogue of [`Key<T>`](struct.Key.html) used specifically for stores.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct StoreId<V> {
    id: usize,
    state_hash: u64,
    _marker: PhantomData<V>,
}
impl<T> Clone for StoreId<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }
}
impl<T> Copy for StoreId<T> {}

/// State of a simulation holding all resources, stores, and arbitrary values in a value store.
///
/// Components only access the state while they run, and only one runs at a time,
/// which is what keeps resources and stores consistent.
pub struct State {
    values: HashMap<usize, Box<dyn Any>>,
    stores: HashMap<usize, Box<dyn Any>>,
    resources: Vec<Resource>,
    next_id: usize,
    pub(crate) state_hash: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            stores: HashMap::new(),
            resources: Vec::new(),
            next_id: 0,
            state_hash: rand::thread_rng().next_u64(),
        }
    }
}

impl State {
    fn check_hash(&self, state_hash: u64) {
        assert_eq!(
            state_hash, self.state_hash,
            "State hash of the key does not match the hash of the state"
        );
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Inserts an arbitrary value to the value store. Learn more in the documentation for [`Key`].
    #[must_use = "Discarding key results in leaking inserted value"]
    pub fn insert<V: 'static>(&mut self, value: V) -> Key<V> {
        let id = self.next_id();
        self.values.insert(id, Box::new(value));
        Key {
            id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }

    /// Removes a value of type `V` from the value store. Learn more in the documentation for [`Key`].
    pub fn remove<V: 'static>(&mut self, key: Key<V>) -> Option<V> {
        self.check_hash(key.state_hash);
        let value = self.values.remove(&key.id)?;
        value.downcast::<V>().ok().map(|v| *v)
    }

    /// Gets a immutable reference to a value of a type `V` from the value store.
    #[must_use]
    pub fn get<V: 'static>(&self, key: Key<V>) -> Option<&V> {
        self.check_hash(key.state_hash);
        self.values.get(&key.id).and_then(|v| v.downcast_ref::<V>())
    }

    /// Gets a mutable reference to a value of a type `V` from the value store.
    #[must_use]
    pub fn get_mut<V: 'static>(&mut self, key: Key<V>) -> Option<&mut V> {
        self.check_hash(key.state_hash);
        self.values
            .get_mut(&key.id)
            .and_then(|v| v.downcast_mut::<V>())
    }

    /// Creates a new unbounded store, returning its ID.
    pub fn new_store<V: 'static>(&mut self) -> StoreId<V> {
        let id = self.next_id();
        self.stores.insert(id, Box::new(Store::<V>::default()));
        StoreId {
            id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }

    /// Gives immutable access to a store.
    ///
    /// # Panics
    ///
    /// Panics if the ID belongs to a different state.
    #[must_use]
    pub fn store<V: 'static>(&self, store: StoreId<V>) -> &Store<V> {
        self.check_hash(store.state_hash);
        self.stores
            .get(&store.id)
            .and_then(|s| s.downcast_ref::<Store<V>>())
            .expect("If this store ID was issued, a corresponding store must exist")
    }

    fn store_mut<V: 'static>(&mut self, store: StoreId<V>) -> &mut Store<V> {
        self.check_hash(store.state_hash);
        self.stores
            .get_mut(&store.id)
            .and_then(|s| s.downcast_mut::<Store<V>>())
            .expect("If this store ID was issued, a corresponding store must exist")
    }

    /// Puts `item` into the `store`.
    ///
    /// If a consumer is waiting, the item goes directly to the earliest one, which is resumed at
    /// the current time. Otherwise, the item is appended to the store.
    pub fn put_item<V: 'static>(&mut self, store: StoreId<V>, item: V, scheduler: &mut Scheduler) {
        self.store_mut(store).put(item, scheduler);
    }

    /// Requests the earliest item from the `store` on behalf of `component`.
    ///
    /// Once an item is available, `component` is resumed at that time with the event
    /// returned by `on_item`. If the store is not empty, that happens at the current time.
    pub fn get_item<V, E, F>(
        &mut self,
        store: StoreId<V>,
        scheduler: &mut Scheduler,
        component: ComponentId<E>,
        on_item: F,
    ) where
        V: 'static,
        E: 'static,
        F: FnOnce(V) -> E + 'static,
    {
        let consumer: Consumer<V> = Box::new(move |item, scheduler: &mut Scheduler| {
            scheduler.schedule_immediately(component, on_item(item));
        });
        self.store_mut(store).get(consumer, scheduler);
    }

    /// Checks the number of items in the store.
    #[must_use]
    pub fn store_len<V: 'static>(&self, store: StoreId<V>) -> usize {
        self.store(store).len()
    }

    /// Checks the number of consumers waiting for an item of the store.
    #[must_use]
    pub fn pending_gets<V: 'static>(&self, store: StoreId<V>) -> usize {
        self.store(store).pending_gets()
    }

    /// Creates a new resource with the given capacity, returning its ID.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new_resource(&mut self, capacity: usize) -> ResourceId {
        let id = ResourceId {
            id: self.resources.len(),
            state_hash: self.state_hash,
        };
        self.resources.push(Resource::new(id, capacity));
        id
    }

    /// Gives immutable access to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the ID belongs to a different state.
    #[must_use]
    pub fn resource(&self, resource: ResourceId) -> &Resource {
        self.check_hash(resource.state_hash);
        &self.resources[resource.id]
    }

    fn resource_mut(&mut self, resource: ResourceId) -> &mut Resource {
        self.check_hash(resource.state_hash);
        &mut self.resources[resource.id]
    }

    /// Requests a slot of the `resource` on behalf of `component`.
    ///
    /// Once granted, `component` is resumed with the event returned by `on_grant`, holding the
    /// slot. If a slot is free, that happens at the current time; otherwise, the request waits
    /// until a slot is released, behind all earlier requests.
    pub fn acquire<E, F>(
        &mut self,
        resource: ResourceId,
        scheduler: &mut Scheduler,
        component: ComponentId<E>,
        on_grant: F,
    ) where
        E: 'static,
        F: FnOnce(Slot) -> E + 'static,
    {
        let waiter: Waiter = Box::new(move |slot, scheduler: &mut Scheduler| {
            scheduler.schedule_immediately(component, on_grant(slot));
        });
        self.resource_mut(resource).request(waiter, scheduler);
    }

    /// Releases a slot. If any request is waiting, the slot is granted to the earliest one,
    /// which is resumed at the current time.
    pub fn release(&mut self, slot: Slot, scheduler: &mut Scheduler) {
        self.resource_mut(slot.resource()).release(slot, scheduler);
    }

    /// Runs `f` while holding `slot`, and releases it afterwards, whatever `f` returns.
    ///
    /// # Errors
    ///
    /// Returns the error returned by `f`. The slot is released regardless.
    pub fn with_released<T, E, F>(
        &mut self,
        slot: Slot,
        scheduler: &mut Scheduler,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self, &mut Scheduler) -> Result<T, E>,
    {
        let result = f(self, scheduler);
        self.release(slot, scheduler);
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Resumed {
        Item(&'static str),
        Granted(Slot),
    }

    fn drain(scheduler: &mut Scheduler) -> Vec<Resumed> {
        std::iter::from_fn(|| {
            scheduler
                .advance(Duration::MAX)
                .ok()
                .flatten()
                .map(|e| e.into_event::<Resumed>().unwrap())
        })
        .collect()
    }

    #[test]
    fn test_add_remove_key_values() {
        let mut state = State::default();

        let id = state.insert(1);
        assert_eq!(state.remove(id), Some(1));
        assert_eq!(state.remove(id), None);

        let id = state.insert("string_slice");
        assert_eq!(state.get(id), Some(&"string_slice"));
        assert_eq!(state.remove(id), Some("string_slice"));
        assert_eq!(state.remove(id), None);

        let id = state.insert(vec![String::from("S")]);
        state.get_mut(id).unwrap().push(String::from("T"));
        assert_eq!(
            state.remove(id),
            Some(vec![String::from("S"), String::from("T")])
        );
    }

    #[test]
    #[should_panic]
    fn test_foreign_store_id() {
        let mut state_1 = State::default();
        let mut state_2 = State::default();
        state_2.state_hash = state_1.state_hash.wrapping_add(1);
        let store = state_1.new_store::<i32>();
        let _ = state_2.store_len(store);
    }

    #[test]
    fn test_store_items_before_consumers() {
        let mut state = State::default();
        let mut scheduler = Scheduler::default();
        let component = ComponentId::<Resumed>::new(0);
        let store = state.new_store::<&'static str>();

        state.put_item(store, "A", &mut scheduler);
        state.put_item(store, "B", &mut scheduler);
        assert_eq!(state.store_len(store), 2);
        assert_eq!(state.pending_gets(store), 0);

        state.get_item(store, &mut scheduler, component, Resumed::Item);
        assert_eq!(state.store_len(store), 1);
        assert_eq!(drain(&mut scheduler), vec![Resumed::Item("A")]);
        assert_eq!(state.store(store).iter().copied().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_store_consumers_before_items() {
        let mut state = State::default();
        let mut scheduler = Scheduler::default();
        let first = ComponentId::<Resumed>::new(0);
        let second = ComponentId::<Resumed>::new(1);
        let store = state.new_store::<&'static str>();

        state.get_item(store, &mut scheduler, first, Resumed::Item);
        state.get_item(store, &mut scheduler, second, Resumed::Item);
        assert_eq!(state.pending_gets(store), 2);
        assert!(state.store(store).is_empty());
        assert_eq!(scheduler.pending_events(), 0);

        state.put_item(store, "A", &mut scheduler);
        state.put_item(store, "B", &mut scheduler);
        state.put_item(store, "C", &mut scheduler);
        assert_eq!(state.pending_gets(store), 0);
        assert_eq!(state.store_len(store), 1);

        let first_entry = scheduler.advance(Duration::MAX).unwrap().unwrap();
        assert_eq!(first_entry.component_idx(), 0);
        assert_eq!(first_entry.into_event::<Resumed>().unwrap(), Resumed::Item("A"));
        let second_entry = scheduler.advance(Duration::MAX).unwrap().unwrap();
        assert_eq!(second_entry.component_idx(), 1);
        assert_eq!(second_entry.into_event::<Resumed>().unwrap(), Resumed::Item("B"));
    }

    #[test]
    fn test_resource_fifo_admission() {
        let mut state = State::default();
        let mut scheduler = Scheduler::default();
        let resource = state.new_resource(1);
        for id in 0..3 {
            state.acquire(
                resource,
                &mut scheduler,
                ComponentId::<Resumed>::new(id),
                Resumed::Granted,
            );
        }
        assert_eq!(state.resource(resource).in_use(), 1);
        assert_eq!(state.resource(resource).queue_len(), 2);

        let entry = scheduler.advance(Duration::MAX).unwrap().unwrap();
        assert_eq!(entry.component_idx(), 0);
        let slot = match entry.into_event::<Resumed>().unwrap() {
            Resumed::Granted(slot) => slot,
            Resumed::Item(_) => unreachable!(),
        };
        assert_eq!(slot.grant(), 0);
        assert!(scheduler.advance(Duration::MAX).is_err());

        state.release(slot, &mut scheduler);
        assert_eq!(state.resource(resource).in_use(), 1);
        assert_eq!(state.resource(resource).queue_len(), 1);
        let entry = scheduler.advance(Duration::MAX).unwrap().unwrap();
        assert_eq!(entry.component_idx(), 1);
        assert_eq!(state.resource(resource).total_grants(), 2);
    }

    #[test]
    fn test_with_released_on_error() {
        let mut state = State::default();
        let mut scheduler = Scheduler::default();
        let resource = state.new_resource(2);
        state.acquire(
            resource,
            &mut scheduler,
            ComponentId::<Resumed>::new(0),
            Resumed::Granted,
        );
        let slot = match drain(&mut scheduler).pop() {
            Some(Resumed::Granted(slot)) => slot,
            _ => unreachable!(),
        };
        assert_eq!(state.resource(resource).in_use(), 1);
        let result: Result<(), &str> =
            state.with_released(slot, &mut scheduler, |_, _| Err("failed"));
        assert_eq!(result, Err("failed"));
        assert_eq!(state.resource(resource).in_use(), 0);
        assert_eq!(state.resource(resource).available(), 2);
    }
}
