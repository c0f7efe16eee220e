use std::time::Duration;

use super::*;

#[test]
fn fulfill_wakes_waiter_across_threads() {
    let (promise, deferred) = Promise::<u32>::new();
    assert!(!deferred.is_ready());

    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(5));
        promise.fulfill(7);
    });
    assert_eq!(deferred.wait(), Some(7));
    handle.join().unwrap();
}

#[test]
fn dropped_promise_resolves_as_abandoned() {
    let (promise, deferred) = Promise::<u32>::new();
    drop(promise);
    assert!(deferred.is_ready());
    assert_eq!(deferred.wait(), None);
}

#[test]
fn wait_for_times_out_while_pending() {
    let (_promise, deferred) = Promise::<u32>::new();
    assert!(!deferred.wait_for(Duration::from_millis(2)));
}

#[test]
fn try_take_returns_pending_deferred_back() {
    let (promise, deferred) = Promise::<&str>::new();
    let deferred = deferred.try_take().unwrap_err();
    promise.fulfill("done");
    assert_eq!(deferred.try_take().unwrap(), Some("done"));
    assert_eq!(Deferred::ready(3).wait(), Some(3));
}
