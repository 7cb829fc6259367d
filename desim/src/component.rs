use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::{Error, EventEntry, Scheduler, State};

/// Identifies a simulation component.
///
/// The ID is typed with the event the component processes, so it is impossible to schedule
/// an event for a component that does not handle it.
pub struct ComponentId<E> {
    id: usize,
    _marker: PhantomData<E>,
}

impl<E> ComponentId<E> {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Numerical index of the component.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

impl<E> Clone for ComponentId<E> {
    fn clone(&self) -> Self {
        Self::new(self.id)
    }
}
impl<E> Copy for ComponentId<E> {}

impl<E> PartialEq for ComponentId<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<E> Eq for ComponentId<E> {}

impl<E> Hash for ComponentId<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<E> fmt::Debug for ComponentId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentId").field("id", &self.id).finish()
    }
}

/// A simulation process.
///
/// A component is a state machine: each event it receives resumes it at one of its suspension
/// points. Before returning, it schedules whatever resumes it next: a timeout through the
/// [`Scheduler`], or a resource grant or store item through the [`State`].
pub trait Component {
    /// Type of events resuming this component.
    type Event: fmt::Debug + 'static;

    /// Processes a single event.
    ///
    /// # Errors
    ///
    /// Any error aborts the simulation run.
    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error>;
}

trait ErasedComponent {
    fn process(
        &mut self,
        id: usize,
        event: Box<dyn Any>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error>;
}

impl<C: Component> ErasedComponent for C {
    fn process(
        &mut self,
        id: usize,
        event: Box<dyn Any>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        let event = event
            .downcast::<C::Event>()
            .expect("Component IDs are typed, so an event always matches its component");
        self.process_event(ComponentId::new(id), *event, scheduler, state)
    }
}

/// Container holding all components of a simulation.
#[derive(Default)]
pub struct Components {
    components: Vec<Box<dyn ErasedComponent>>,
}

impl Components {
    /// Registers a new component and returns its ID.
    #[must_use]
    pub fn add_component<C: Component + 'static>(&mut self, component: C) -> ComponentId<C::Event> {
        let id = self.components.len();
        self.components.push(Box::new(component));
        ComponentId::new(id)
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Passes the event in `entry` to the component it is addressed to.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the component.
    ///
    /// # Panics
    ///
    /// Panics if the entry refers to a component that was never registered here.
    pub fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        let (id, event) = entry.into_parts();
        self.components
            .get_mut(id)
            .expect("Event addressed to an unknown component")
            .process(id, event, scheduler, state)
    }
}
