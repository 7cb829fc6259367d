use std::time::Duration;

use crate::{Component, ComponentId, Components, Error, Key, ResourceId, Scheduler, State, StoreId};

/// The main simulation object, tying together the state, the scheduler, and the components.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use desim::{Component, ComponentId, Error, Scheduler, Simulation, State};
/// #[derive(Debug)]
/// struct Tick;
///
/// struct Ticker;
///
/// impl Component for Ticker {
///     type Event = Tick;
///
///     fn process_event(
///         &mut self,
///         self_id: ComponentId<Tick>,
///         _event: Tick,
///         scheduler: &mut Scheduler,
///         _state: &mut State,
///     ) -> Result<(), Error> {
///         scheduler.schedule(Duration::from_secs(5), self_id, Tick);
///         Ok(())
///     }
/// }
///
/// let mut sim = Simulation::default();
/// let ticker = sim.add_component(Ticker);
/// sim.schedule(Duration::ZERO, ticker, Tick);
/// assert_eq!(sim.run_until(Duration::from_secs(12)), Ok(Duration::from_secs(12)));
/// ```
#[derive(Default)]
pub struct Simulation {
    /// Current state of the simulation meant to be mutated by the components.
    pub state: State,
    /// Schedules events and maintains the clock.
    pub scheduler: Scheduler,
    components: Components,
}

impl Simulation {
    /// Adds a new component.
    #[must_use]
    pub fn add_component<C: Component + 'static>(&mut self, component: C) -> ComponentId<C::Event> {
        self.components.add_component(component)
    }

    /// Adds a new unbounded store.
    #[must_use]
    pub fn add_store<V: 'static>(&mut self) -> StoreId<V> {
        self.state.new_store()
    }

    /// Adds a new resource with the given capacity.
    #[must_use]
    pub fn add_resource(&mut self, capacity: usize) -> ResourceId {
        self.state.new_resource(capacity)
    }

    /// Inserts a value to the state. See [`State::insert`].
    #[must_use]
    pub fn insert<V: 'static>(&mut self, value: V) -> Key<V> {
        self.state.insert(value)
    }

    /// Schedules `event` for `component` at `delay` after the current time.
    pub fn schedule<E: 'static>(&mut self, delay: Duration, component: ComponentId<E>, event: E) {
        self.scheduler.schedule(delay, component, event);
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.scheduler.time()
    }

    /// Processes the next event occurring before `horizon`.
    /// Returns `false` if the horizon was reached and nothing was processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueEmpty`] if no events are left, or any error returned by the component
    /// processing the event.
    pub fn step(&mut self, horizon: Duration) -> Result<bool, Error> {
        match self.scheduler.advance(horizon)? {
            Some(entry) => {
                self.components
                    .process_event_entry(entry, &mut self.scheduler, &mut self.state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs until `horizon` and returns the final time, which is the horizon itself.
    /// Events scheduled exactly at the horizon are not processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueEmpty`] if events run out before the horizon, which is
    /// distinct from a normal termination, or any error returned by a component.
    pub fn run_until(&mut self, horizon: Duration) -> Result<Duration, Error> {
        while self.step(horizon)? {}
        Ok(self.scheduler.time())
    }
}
