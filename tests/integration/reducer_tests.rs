use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scoped_store::{Context, Snapshot, TestRenderer};

use super::{counter_store, Counter, CounterAction};

#[test]
fn given_increment_then_decrement_should_return_to_the_initial_counter() {
    let store = counter_store(100);
    let scope = store.provide(&Context::root());
    let dispatch = store.use_dispatch(scope.context()).unwrap();

    dispatch.dispatch(CounterAction::Increment);
    assert_eq!(scope.provider().get_state().counter, 101);

    dispatch.dispatch(CounterAction::Decrement);
    assert_eq!(scope.provider().get_state().counter, 100);
}

#[test]
fn given_an_unknown_action_should_leave_state_unchanged() {
    let store = counter_store(100);
    let scope = store.provide(&Context::root());
    let dispatch = store.use_dispatch(scope.context()).unwrap();

    dispatch.dispatch(CounterAction::Other("reset".to_string()));

    assert_eq!(*scope.provider().get_state(), Counter { counter: 100 });
}

#[test]
fn given_dispatches_should_notify_bridges_through_the_update_path() {
    let store = counter_store(0);
    let scope = store.provide(&Context::root());
    let cx = scope.context();

    let whole: TestRenderer<Snapshot<Counter>> = TestRenderer::new();
    let _whole = store.use_state(cx, whole.clone()).unwrap();
    let parity: TestRenderer<bool> = TestRenderer::new();
    let _parity = store
        .use_selector(cx, |state: &Counter| state.counter % 2 == 0, parity.clone())
        .unwrap();

    let dispatch = store.use_dispatch(cx).unwrap();
    dispatch.dispatch(CounterAction::Increment);
    dispatch.dispatch(CounterAction::Other("noop".to_string()));
    dispatch.dispatch(CounterAction::Increment);

    assert_eq!(whole.count(), 3);
    parity.with_renders(|renders| assert_eq!(renders, &vec![false, true]));
}

#[test]
fn given_a_dispatch_callback_should_run_after_the_commit() {
    let store = counter_store(1);
    let scope = store.provide(&Context::root());
    let dispatch = store.use_dispatch(scope.context()).unwrap();
    let provider = scope.provider().clone();
    let observed = Arc::new(AtomicBool::new(false));

    let flag = observed.clone();
    dispatch.dispatch_with(CounterAction::Increment, move || {
        flag.store(provider.get_state().counter == 2, Ordering::SeqCst);
    });

    assert!(observed.load(Ordering::SeqCst));
}

#[test]
fn given_the_same_provider_should_hand_out_equal_handles() {
    let store = counter_store(0);
    let scope = store.provide(&Context::root());
    let other = store.provide(&Context::root());

    assert!(store.use_dispatch(scope.context()).unwrap() == store.use_dispatch(scope.context()).unwrap());
    assert!(store.use_dispatch(scope.context()).unwrap() != store.use_dispatch(other.context()).unwrap());
    assert_eq!(
        store.use_update(scope.context()).unwrap(),
        store.use_update(scope.context()).unwrap()
    );
    assert_ne!(
        store.use_update(scope.context()).unwrap(),
        store.use_update(other.context()).unwrap()
    );
}

#[test]
fn given_no_enclosing_scope_should_refuse_a_dispatcher() {
    let store = counter_store(0);

    assert!(store.use_dispatch(&Context::root()).is_err());
}
