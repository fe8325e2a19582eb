use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scoped_store::{Change, Identical, Snapshot, Store, StoreConfig, TestRenderer, Update};

use super::{
    counter_patch, initial_form, mount_form, value_patch, Form, FormPatch, MockStateObserver,
    StateObserver,
};

#[test]
fn given_a_partial_update_should_merge_it_into_current_state() {
    let (_store, scope) = mount_form();

    scope.provider().set_state(Update::merge(value_patch("b")));

    assert_eq!(
        *scope.provider().get_state(),
        Form {
            v: 1,
            counter: 10,
            value: "b".to_string(),
        }
    );
}

#[test]
fn given_an_updater_should_compute_from_previous_state() {
    let (_store, scope) = mount_form();

    for _ in 0..2 {
        scope.provider().set_state(Update::with(|prev: &Form| {
            Some(Change::Merge(counter_patch(prev.counter + 10)))
        }));
    }

    assert_eq!(scope.provider().get_state().counter, 30);
    assert_eq!(scope.provider().get_state().value, "a");
}

#[test]
fn given_a_replacement_should_swap_the_whole_state() {
    let (_store, scope) = mount_form();
    let replacement = Form {
        v: 2,
        counter: 0,
        value: "z".to_string(),
    };

    scope.provider().set_state(Update::replace(replacement.clone()));

    assert_eq!(*scope.provider().get_state(), replacement);
}

#[test]
fn given_a_commit_should_notify_listeners_with_prev_and_next() {
    let (_store, scope) = mount_form();

    let mut observer = MockStateObserver::new();
    observer
        .expect_on_change()
        .withf(|prev, next| prev.value == "a" && next.value == "b" && next.counter == 10)
        .times(1)
        .return_const(());
    let observer = Arc::new(observer);

    let _subscription = scope
        .provider()
        .subscribe(move |prev, next| observer.on_change(prev, next));

    scope.provider().set_state(Update::merge(value_patch("b")));
}

#[test]
fn given_an_unsubscribed_listener_when_state_set_should_not_invoke_it() {
    let (_store, scope) = mount_form();

    let mut observer = MockStateObserver::new();
    observer.expect_on_change().never();
    let observer = Arc::new(observer);

    let mut subscription = scope
        .provider()
        .subscribe(move |prev, next| observer.on_change(prev, next));
    subscription.unsubscribe();
    subscription.unsubscribe();

    scope.provider().set_state(Update::merge(value_patch("b")));

    assert!(!subscription.is_active());
    assert_eq!(scope.provider().subscribe_count(), 0);
}

#[test]
fn given_listeners_should_run_in_registration_order_before_the_callback() {
    let (_store, scope) = mount_form();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let log = log.clone();
        scope
            .provider()
            .subscribe(move |_, _| log.lock().unwrap().push("first"))
    };
    let second = {
        let log = log.clone();
        scope
            .provider()
            .subscribe(move |_, _| log.lock().unwrap().push("second"))
    };

    let callback_log = log.clone();
    scope
        .provider()
        .set_state_with(Update::merge(value_patch("b")), move || {
            callback_log.lock().unwrap().push("callback")
        });

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "callback"]);
    drop((first, second));
}

#[test]
fn given_a_write_from_inside_a_listener_should_commit_it_after_the_current_callback() {
    let (_store, scope) = mount_form();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let provider = scope.provider().clone();
    let listener_log = log.clone();
    let _subscription = scope.provider().subscribe(move |prev, next| {
        listener_log
            .lock()
            .unwrap()
            .push(format!("{}->{}", prev.counter, next.counter));

        if next.counter == 20 {
            let callback_log = listener_log.clone();
            provider.set_state_with(Update::merge(counter_patch(30)), move || {
                callback_log.lock().unwrap().push("second done".to_string())
            });
        }
    });

    let callback_log = log.clone();
    scope
        .provider()
        .set_state_with(Update::merge(counter_patch(20)), move || {
            callback_log.lock().unwrap().push("first done".to_string())
        });

    assert_eq!(
        *log.lock().unwrap(),
        vec!["10->20", "first done", "20->30", "second done"]
    );
    assert_eq!(scope.provider().get_state().counter, 30);
}

#[test]
fn given_a_listener_detached_mid_notification_should_skip_it() {
    let (_store, scope) = mount_form();
    let calls = Arc::new(AtomicUsize::new(0));
    let victim = Arc::new(Mutex::new(None));

    let remover = {
        let victim = victim.clone();
        scope.provider().subscribe(move |_, _| {
            victim.lock().unwrap().take();
        })
    };

    let counted = calls.clone();
    *victim.lock().unwrap() = Some(scope.provider().subscribe(move |_, _| {
        counted.fetch_add(1, Ordering::SeqCst);
    }));

    scope.provider().set_state(Update::merge(value_patch("b")));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(scope.provider().subscribe_count(), 1);
    drop(remover);
}

#[test]
fn given_a_declining_updater_should_still_notify_by_default() {
    let (store, scope) = mount_form();
    let renderer: TestRenderer<Snapshot<Form>> = TestRenderer::new();
    let bridge = store.use_state(scope.context(), renderer.clone()).unwrap();
    let before = scope.provider().get_state();

    scope.provider().set_state(Update::with(|_: &Form| None));

    assert_eq!(renderer.count(), 1);
    renderer.with_renders(|renders| {
        assert!(renders[0].identical(&before));
    });
    assert!(bridge.get().identical(&before));
}

#[test]
fn given_notify_on_noop_disabled_when_updater_declines_should_skip_listeners_but_run_callback() {
    let store = Store::lazy(initial_form).with_config(StoreConfig {
        notify_on_noop: false,
        ..StoreConfig::default()
    });
    let scope = store.provide(&scoped_store::Context::root());
    let renderer: TestRenderer<Snapshot<Form>> = TestRenderer::new();
    let _bridge = store.use_state(scope.context(), renderer.clone()).unwrap();
    let called = Arc::new(AtomicBool::new(false));

    let flag = called.clone();
    scope
        .provider()
        .set_state_with(Update::with(|_: &Form| None), move || {
            flag.store(true, Ordering::SeqCst)
        });

    assert_eq!(renderer.count(), 0);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn given_an_unchanged_literal_should_still_commit_and_notify() {
    let (store, scope) = mount_form();
    let renderer: TestRenderer<Snapshot<Form>> = TestRenderer::new();
    let _bridge = store.use_state(scope.context(), renderer.clone()).unwrap();

    scope.provider().set_state(Update::merge(FormPatch::default()));

    assert_eq!(renderer.count(), 1);
    assert_eq!(*scope.provider().get_state(), initial_form());
}

#[test]
fn given_a_panicking_listener_should_leave_the_provider_usable() {
    let (store, scope) = mount_form();
    let _faulty = scope.provider().subscribe(|_, next| {
        if next.counter == 11 {
            panic!("listener failure");
        }
    });

    let result = catch_unwind(AssertUnwindSafe(|| {
        scope.provider().set_state(Update::merge(counter_patch(11)));
    }));
    assert!(result.is_err());
    assert_eq!(scope.provider().get_state().counter, 11);

    let renderer: TestRenderer<Snapshot<Form>> = TestRenderer::new();
    let _bridge = store.use_state(scope.context(), renderer.clone()).unwrap();
    scope.provider().set_state(Update::merge(counter_patch(12)));

    assert_eq!(renderer.count(), 1);
    assert_eq!(scope.provider().get_state().counter, 12);
}

#[test]
fn given_a_torn_down_provider_should_ignore_writes_and_subscriptions() {
    let (_store, scope) = mount_form();
    let provider = scope.provider().clone();
    let _first = provider.subscribe(|_, _| {});
    let _second = provider.subscribe(|_, _| {});
    assert_eq!(provider.subscribe_count(), 2);

    drop(scope);

    assert!(!provider.is_active());
    assert_eq!(provider.subscribe_count(), 0);

    provider.set_state(Update::merge(value_patch("b")));
    assert_eq!(provider.get_state().value, "a");

    let late = provider.subscribe(|_, _| panic!("must never run"));
    assert!(!late.is_active());
    assert_eq!(provider.subscribe_count(), 0);
}

#[test]
fn given_a_panicking_listener_should_discard_the_writes_it_queued() {
    let (_store, scope) = mount_form();
    let provider = scope.provider().clone();
    let _faulty = scope.provider().subscribe(move |_, next| {
        if next.counter == 11 {
            provider.set_state(Update::merge(value_patch("queued")));
            panic!("listener failure");
        }
    });

    let result = catch_unwind(AssertUnwindSafe(|| {
        scope.provider().set_state(Update::merge(counter_patch(11)));
    }));
    assert!(result.is_err());
    assert_eq!(scope.provider().get_state().value, "a");

    scope.provider().set_state(Update::merge(counter_patch(12)));

    assert_eq!(scope.provider().get_state().counter, 12);
    assert_eq!(scope.provider().get_state().value, "a");
}

#[test]
fn given_many_listeners_with_removals_should_notify_survivors_in_registration_order() {
    let (_store, scope) = mount_form();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut subscriptions: Vec<_> = (0..1_000usize)
        .map(|idx| {
            let log = log.clone();
            scope
                .provider()
                .subscribe(move |_, _| log.lock().unwrap().push(idx))
        })
        .collect();
    for subscription in subscriptions.iter_mut().step_by(2) {
        subscription.unsubscribe();
    }
    let late_log = log.clone();
    let _late = scope
        .provider()
        .subscribe(move |_, _| late_log.lock().unwrap().push(usize::MAX));

    assert_eq!(scope.provider().subscribe_count(), 501);

    scope.provider().set_state(Update::merge(counter_patch(11)));

    let mut expected: Vec<usize> = (1..1_000).step_by(2).collect();
    expected.push(usize::MAX);
    assert_eq!(*log.lock().unwrap(), expected);
}
