use super::*;
use shared::protocol::AppEvent;

#[test]
fn store_initialized_and_reload_both_mark_views_stale() {
    let bus = EventBus::new();
    let refresh = ViewRefresh::watch(&bus);
    assert_eq!(refresh.generation(), 0);

    bus.publish(AppEvent::StoreInitialized);
    assert_eq!(refresh.generation(), 1);
    let rendered_at = refresh.generation();
    assert!(!refresh.is_stale(rendered_at));

    bus.publish(AppEvent::ReloadView);
    assert!(refresh.is_stale(rendered_at));
    assert_eq!(refresh.generation(), 2);
}

#[test]
fn progress_updates_do_not_invalidate_views() {
    let bus = EventBus::new();
    let refresh = ViewRefresh::watch(&bus);
    bus.publish(AppEvent::progress(50));
    bus.publish(AppEvent::RequestSync);
    assert_eq!(refresh.generation(), 0);
}

#[test]
fn dropping_the_watcher_unsubscribes() {
    let bus = EventBus::new();
    let refresh = ViewRefresh::watch(&bus);
    assert_eq!(bus.subscriber_count(Topic::StoreInitialized), 1);
    assert_eq!(bus.subscriber_count(Topic::ReloadView), 1);

    drop(refresh);
    assert_eq!(bus.subscriber_count(Topic::StoreInitialized), 0);
    assert_eq!(bus.subscriber_count(Topic::ReloadView), 0);
}
