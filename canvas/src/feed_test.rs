use std::cell::RefCell;
use std::rc::Rc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::*;

fn note(created_secs: i64, x: i32, y: i32) -> Note {
    Note {
        id: Uuid::new_v4(),
        created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + created_secs).unwrap(),
        sent_to: "Alice".into(),
        message: "Hi".into(),
        x,
        y,
        color: "#fff3a0".into(),
        report_count: 0,
    }
}

// =============================================================
// NoteFeed
// =============================================================

#[test]
fn finish_load_sorts_newest_first() {
    let mut feed = NoteFeed::new();
    feed.begin_load();
    assert!(feed.is_loading());
    let (a, b, c) = (note(1, 0, 0), note(3, 0, 0), note(2, 0, 0));
    feed.finish_load(vec![a.clone(), b.clone(), c.clone()]);
    assert!(!feed.is_loading());
    let ids: Vec<_> = feed.notes().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);
}

#[test]
fn insert_is_idempotent() {
    let mut feed = NoteFeed::new();
    let n = note(0, 1, 1);
    assert!(feed.insert(n.clone()));
    assert!(!feed.insert(n.clone()));
    assert_eq!(feed.len(), 1);
}

#[test]
fn insert_prepends() {
    let mut feed = NoteFeed::new();
    let first = note(0, 0, 0);
    let second = note(1, 0, 0);
    feed.insert(first.clone());
    feed.insert(second.clone());
    assert_eq!(feed.notes()[0].id, second.id);
}

#[test]
fn remove_reports_presence() {
    let mut feed = NoteFeed::new();
    let n = note(0, 0, 0);
    feed.insert(n.clone());
    assert!(feed.remove(n.id));
    assert!(!feed.remove(n.id));
    assert!(feed.is_empty());
}

#[test]
fn insert_during_load_survives_the_load() {
    let mut feed = NoteFeed::new();
    feed.begin_load();
    let live = note(10, 0, 0);
    feed.insert(live.clone());
    let old = note(1, 0, 0);
    feed.finish_load(vec![old.clone(), live.clone()]);
    assert_eq!(feed.len(), 2);
    assert_eq!(feed.notes()[0].id, live.id);
}

#[test]
fn delete_during_load_wins_over_stale_load() {
    let mut feed = NoteFeed::new();
    feed.begin_load();
    let gone = note(1, 0, 0);
    feed.remove(gone.id);
    feed.finish_load(vec![gone, note(2, 0, 0)]);
    assert_eq!(feed.len(), 1);
}

#[test]
fn set_report_count_updates_known_note() {
    let mut feed = NoteFeed::new();
    let n = note(0, 0, 0);
    feed.insert(n.clone());
    assert!(feed.set_report_count(n.id, 3));
    assert_eq!(feed.get(n.id).map(|n| n.report_count), Some(3));
    assert!(!feed.set_report_count(Uuid::new_v4(), 1));
}

#[test]
fn notes_in_area_is_inclusive() {
    let mut feed = NoteFeed::new();
    feed.insert(note(0, 0, 0));
    feed.insert(note(1, 10, 10));
    feed.insert(note(2, 11, 0));
    let area = GridArea { min_x: 0, max_x: 10, min_y: 0, max_y: 10 };
    assert_eq!(feed.notes_in_area(area).count(), 2);
}

#[test]
fn hit_test_covers_note_square() {
    let mut feed = NoteFeed::new();
    let n = note(0, 10, 10);
    feed.insert(n.clone());
    assert_eq!(feed.hit_test(Point::new(10.0, 10.0)).map(|n| n.id), Some(n.id));
    assert_eq!(feed.hit_test(Point::new(14.7, 14.7)).map(|n| n.id), Some(n.id));
    assert!(feed.hit_test(Point::new(14.9, 12.0)).is_none());
    assert!(feed.hit_test(Point::new(9.9, 12.0)).is_none());
}

#[test]
fn hit_test_prefers_newest() {
    let mut feed = NoteFeed::new();
    let older = note(0, 0, 0);
    let newer = note(1, 2, 2);
    feed.insert(older);
    feed.insert(newer.clone());
    assert_eq!(feed.hit_test(Point::new(3.0, 3.0)).map(|n| n.id), Some(newer.id));
}

// =============================================================
// FeedEvent wire format
// =============================================================

#[test]
fn feed_event_is_tagged() {
    let n = note(0, 1, 2);
    let json = serde_json::to_value(FeedEvent::Insert(n.clone())).unwrap();
    assert_eq!(json["event"], "insert");
    assert_eq!(json["note"]["sent_to"], "Alice");

    let back: FeedEvent = serde_json::from_value(serde_json::json!({
        "event": "delete",
        "note": json["note"].clone(),
    }))
    .unwrap();
    assert_eq!(back, FeedEvent::Delete(n));
}

// =============================================================
// LocalFeed
// =============================================================

fn recording(feed: &LocalFeed) -> (Subscription, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (ins, del) = (Rc::clone(&log), Rc::clone(&log));
    let sub = feed.subscribe(
        Box::new(move |n| ins.borrow_mut().push(format!("+{}", n.x))),
        Box::new(move |n| del.borrow_mut().push(format!("-{}", n.x))),
    );
    (sub, log)
}

#[test]
fn subscribers_receive_events() {
    let feed = LocalFeed::new();
    let (_sub, log) = recording(&feed);
    feed.publish(&FeedEvent::Insert(note(0, 1, 0)));
    feed.publish(&FeedEvent::Delete(note(0, 2, 0)));
    assert_eq!(*log.borrow(), vec!["+1", "-2"]);
}

#[test]
fn dropping_subscription_stops_delivery() {
    let feed = LocalFeed::new();
    let (sub, log) = recording(&feed);
    assert_eq!(feed.subscriber_count(), 1);
    drop(sub);
    assert_eq!(feed.subscriber_count(), 0);
    feed.publish(&FeedEvent::Insert(note(0, 1, 0)));
    assert!(log.borrow().is_empty());
}

#[test]
fn unsubscribe_is_explicit_cancel() {
    let feed = LocalFeed::new();
    let (sub, _log) = recording(&feed);
    sub.unsubscribe();
    assert_eq!(feed.subscriber_count(), 0);
}

#[test]
fn subscription_outliving_feed_is_harmless() {
    let feed = LocalFeed::new();
    let (sub, _log) = recording(&feed);
    drop(feed);
    drop(sub);
}

#[test]
fn publish_json_decodes_frames() {
    let feed = LocalFeed::new();
    let (_sub, log) = recording(&feed);
    let frame = serde_json::to_string(&FeedEvent::Insert(note(0, 7, 0))).unwrap();
    feed.publish_json(&frame).unwrap();
    assert!(feed.publish_json("{\"event\":\"upsert\"}").is_err());
    assert_eq!(*log.borrow(), vec!["+7"]);
}
