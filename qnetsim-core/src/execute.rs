use crate::{SimTime, Simulation};
use tracing::{debug, trace};

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until some stopping condition is reached.
    /// The condition is implementation-specific.
    fn execute(self, sim: &mut Simulation);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Time(SimTime),
    NoEvents,
    Steps(usize),
}

/// Executor is used for simple execution of an entire simulation.
///
/// [`Executor::unbound`] is the normal mode for queueing models: sources
/// emit a bounded number of clients, so the queue drains on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    end_condition: EndCondition,
}

impl Executor {
    /// Run until no events are left in the queue.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            end_condition: EndCondition::NoEvents,
        }
    }

    /// Run no longer than the given time. May terminate early if no events
    /// are available.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self {
            end_condition: EndCondition::Time(time),
        }
    }

    /// Execute exactly this many steps, unless we run out of events.
    #[must_use]
    pub fn steps(steps: usize) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
        }
    }

    /// Registers a side effect that is called _after_ each simulation step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F>
    where
        F: Fn(&Simulation),
    {
        ExecutorWithSideEffect {
            end_condition: self.end_condition,
            side_effect: func,
        }
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, |_| {});
    }
}

pub struct ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    end_condition: EndCondition,
    side_effect: F,
}

impl<F> Execute for ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, self.side_effect);
    }
}

fn run_with<F>(sim: &mut Simulation, end_condition: EndCondition, side_effect: F)
where
    F: Fn(&Simulation),
{
    debug!(?end_condition, "Starting simulation run");

    let step_fn = |sim: &mut Simulation| {
        let result = sim.step();
        if result {
            side_effect(sim);
        }
        result
    };

    match end_condition {
        EndCondition::Time(time) => execute_until(sim, time, step_fn),
        EndCondition::NoEvents => execute_until_empty(sim, step_fn),
        EndCondition::Steps(steps) => execute_steps(sim, steps, step_fn),
    }

    debug!(final_time = %sim.time(), "Simulation run completed");
}

fn execute_until_empty<F>(sim: &mut Simulation, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    let mut steps = 0_u64;
    while step(sim) {
        steps += 1;
        if steps % 1_000_000 == 0 {
            trace!(steps, current_time = %sim.time(), "Execution progress");
        }
    }
}

fn execute_until<F>(sim: &mut Simulation, time: SimTime, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    while sim.peek_next_event_time().is_some_and(|t| t <= time) {
        step(sim);
    }
}

fn execute_steps<F>(sim: &mut Simulation, steps: usize, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    for _ in 0..steps {
        if !step(sim) {
            break;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Component, Key, Scheduler};

    struct TestComponent {
        counter: usize,
    }

    #[derive(Debug)]
    struct TestEvent;

    impl Component for TestComponent {
        type Event = TestEvent;

        fn process_event(
            &mut self,
            self_id: Key<Self::Event>,
            _event: Self::Event,
            scheduler: &mut Scheduler,
        ) {
            self.counter += 1;
            if self.counter < 10 {
                scheduler.schedule(SimTime::from_secs(2), self_id, TestEvent);
            }
        }
    }

    fn seeded_sim() -> (Simulation, Key<TestEvent>) {
        let mut sim = Simulation::default();
        let component = sim.add_component(TestComponent { counter: 0 });
        sim.schedule(SimTime::zero(), component, TestEvent);
        (sim, component)
    }

    #[test]
    fn test_create_executor() {
        assert_eq!(
            Executor::unbound(),
            Executor {
                end_condition: EndCondition::NoEvents
            }
        );
        assert_eq!(
            Executor::timed(SimTime::zero()),
            Executor {
                end_condition: EndCondition::Time(SimTime::zero())
            }
        );
        assert_eq!(
            Executor::steps(7),
            Executor {
                end_condition: EndCondition::Steps(7)
            }
        );
    }

    #[test]
    fn test_unbound_runs_to_exhaustion() {
        let (mut sim, key) = seeded_sim();
        sim.execute(Executor::unbound());
        let c: TestComponent = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 10);
    }

    #[test]
    fn test_steps() {
        let (mut sim, key) = seeded_sim();
        Executor::steps(4).execute(&mut sim);
        let c: TestComponent = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 4);
    }

    #[test]
    fn test_steps_stops_when_queue_empties() {
        let (mut sim, key) = seeded_sim();
        Executor::steps(100).execute(&mut sim);
        let c: TestComponent = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 10);
    }

    #[test]
    fn test_timed_stops_at_limit() {
        let (mut sim, key) = seeded_sim();
        Executor::timed(SimTime::from_secs(6)).execute(&mut sim);
        let c: TestComponent = sim.remove_component(key).unwrap();
        // Events at 0, 2, 4, 6 fire; the one at 8 does not.
        assert_eq!(c.counter, 4);
        assert_eq!(sim.time(), SimTime::from_secs(6));
    }

    #[test]
    fn test_side_effect_sees_every_step() {
        use std::cell::Cell;
        let observed = Cell::new(0usize);
        let (mut sim, _key) = seeded_sim();
        sim.execute(Executor::unbound().side_effect(|_| {
            observed.set(observed.get() + 1);
        }));
        assert_eq!(observed.get(), 10);
    }
}
