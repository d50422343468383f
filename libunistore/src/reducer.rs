//! Pure reducers and their composition
//!
//! A reducer is a pure function `(State, Action, &Env) -> (State, Effect<Action>)`.
//!
//! # Purity Guarantees
//!
//! - No I/O, no awaiting: anything asynchronous goes into the returned effect
//! - Deterministic (same inputs -> same output)
//! - Total: a reducer never fails; errors arrive as actions
//!
//! Any `Fn(S, A, &E) -> (S, Effect<A>)` closure is a reducer. [`combine`]
//! runs several reducers over one state and [`pullback`] lifts a reducer
//! written for a slice of the state into the parent domain.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::effect::Effect;

pub trait Reducer<S, A, E>: Send + Sync {
    fn reduce(&self, state: S, action: A, env: &E) -> (S, Effect<A>);
}

impl<F, S, A, E> Reducer<S, A, E> for F
where
    F: Fn(S, A, &E) -> (S, Effect<A>) + Send + Sync,
{
    fn reduce(&self, state: S, action: A, env: &E) -> (S, Effect<A>) {
        self(state, action, env)
    }
}

/// Reducers applied in order to the same action; effects are merged
pub struct Combined<S, A, E> {
    reducers: Vec<Box<dyn Reducer<S, A, E>>>,
}

/// Run every reducer in `reducers`, threading the state through them
///
/// Each reducer receives its own clone of the action.
pub fn combine<S, A, E>(reducers: Vec<Box<dyn Reducer<S, A, E>>>) -> Combined<S, A, E> {
    Combined { reducers }
}

impl<S, A, E> Reducer<S, A, E> for Combined<S, A, E>
where
    A: Clone + Send + 'static,
{
    fn reduce(&self, state: S, action: A, env: &E) -> (S, Effect<A>) {
        let mut effects = Vec::with_capacity(self.reducers.len());
        let mut state = state;
        for reducer in &self.reducers {
            let (next, effect) = reducer.reduce(state, action.clone(), env);
            state = next;
            effects.push(effect);
        }
        (state, Effect::merge(effects))
    }
}

/// A child reducer lifted into a parent domain
///
/// Built by [`pullback`].
pub struct Pullback<R, S, A, E, PS, PA, PE> {
    inner: R,
    get: Box<dyn Fn(&PS) -> S + Send + Sync>,
    set: Box<dyn Fn(PS, S) -> PS + Send + Sync>,
    extract: Box<dyn Fn(&PA) -> Option<A> + Send + Sync>,
    embed: Arc<dyn Fn(A) -> PA + Send + Sync>,
    env: Box<dyn Fn(&PE) -> E + Send + Sync>,
    _phantom: PhantomData<fn() -> (S, A, E, PS, PA, PE)>,
}

/// Lift `inner`, written against `(S, A, E)`, to `(PS, PA, PE)`
///
/// - `get`/`set` read and write the child slice of the parent state
/// - `extract` picks the child action out of a parent action; parent
///   actions it does not recognise pass through untouched
/// - `embed` wraps child actions produced by the child's effects
/// - `env` derives the child environment
pub fn pullback<R, S, A, E, PS, PA, PE>(
    inner: R,
    get: impl Fn(&PS) -> S + Send + Sync + 'static,
    set: impl Fn(PS, S) -> PS + Send + Sync + 'static,
    extract: impl Fn(&PA) -> Option<A> + Send + Sync + 'static,
    embed: impl Fn(A) -> PA + Send + Sync + 'static,
    env: impl Fn(&PE) -> E + Send + Sync + 'static,
) -> Pullback<R, S, A, E, PS, PA, PE>
where
    R: Reducer<S, A, E>,
{
    Pullback {
        inner,
        get: Box::new(get),
        set: Box::new(set),
        extract: Box::new(extract),
        embed: Arc::new(embed),
        env: Box::new(env),
        _phantom: PhantomData,
    }
}

impl<R, S, A, E, PS, PA, PE> Reducer<PS, PA, PE> for Pullback<R, S, A, E, PS, PA, PE>
where
    R: Reducer<S, A, E>,
    A: Send + 'static,
    PA: Send + 'static,
{
    fn reduce(&self, state: PS, action: PA, env: &PE) -> (PS, Effect<PA>) {
        let Some(child_action) = (self.extract)(&action) else {
            return (state, Effect::none());
        };
        let child_state = (self.get)(&state);
        let child_env = (self.env)(env);
        let (child_state, effect) = self.inner.reduce(child_state, child_action, &child_env);
        ((self.set)(state, child_state), effect.map_shared(self.embed.clone()))
    }
}
