mod common;

use chrono::Duration;
use common::*;

fn unlock_times(f: &Fixture, client: &TestClient, count: usize) {
    for _ in 0..count {
        f.lock
            .unlock(&client.unlock(UnlockAction::Default).unwrap())
            .unwrap();
        f.tick();
    }
}

#[test]
fn test_list_keys_over_chunks() {
    let f = Fixture::new();
    let owner = f.owner();
    let guest = f.invite(&owner, "Guest", Permission::Anytime);
    let (create, pending) = owner
        .create_new_key("Pending", Permission::Admin, f.clock.now() + Duration::days(3))
        .unwrap();
    f.lock.create_new_key(&create).unwrap();

    let frames = write(
        &f.lock,
        LockCharacteristic::ListKeys,
        &owner.list_keys().unwrap(),
    )
    .unwrap();
    let max = f.lock.config().max_chunk_size;
    assert!(frames.len() > 1);
    assert!(frames.iter().all(|frame| frame.len() <= max));

    let list = owner.keys_reader().read_all(&frames).unwrap();
    let ids: Vec<Uuid> = list.keys.iter().map(|key| key.id).collect();
    assert_eq!(ids, vec![owner.credentials().id, guest.credentials().id]);
    assert_eq!(list.keys[0].permission, Permission::Owner);
    assert_eq!(list.new_keys.len(), 1);
    assert_eq!(list.new_keys[0].id, pending.key.id);
    assert_eq!(list.new_keys[0].name, "Pending");
}

#[test]
fn test_notification_is_encrypted_for_requester() {
    let f = Fixture::new();
    let owner = f.owner();
    let admin = f.invite(&owner, "Manager", Permission::Admin);

    let frames = write(
        &f.lock,
        LockCharacteristic::ListKeys,
        &admin.list_keys().unwrap(),
    )
    .unwrap();
    assert!(matches!(
        owner.keys_reader().read_all(&frames),
        Err(LockError::InvalidAuthentication)
    ));
    assert_eq!(admin.keys_reader().read_all(&frames).unwrap().keys.len(), 2);
}

#[test]
fn test_larger_chunk_size() {
    let config = LockConfig {
        max_chunk_size: 512,
        ..LockConfig::default()
    };
    let f = Fixture::with_config(config);
    let owner = f.owner();
    let frames = f
        .lock
        .list_keys(&owner.list_keys().unwrap())
        .unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].is_first);
}

#[test]
fn test_list_events_newest_first() {
    let f = Fixture::new();
    let owner = f.owner();
    unlock_times(&f, &owner, 3);

    let frames = write(
        &f.lock,
        LockCharacteristic::ListEvents,
        &owner.list_events(None).unwrap(),
    )
    .unwrap();
    let EventsList(events) = owner.events_reader().read_all(&frames).unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.windows(2).all(|pair| pair[0].date() > pair[1].date()));
    assert_eq!(events[3].event_type(), LockEventType::Setup);
}

#[test]
fn test_list_events_pagination() {
    let f = Fixture::new();
    let owner = f.owner();
    unlock_times(&f, &owner, 5);

    let page = |offset: u8, limit: u8| {
        let request = owner
            .list_events(Some(FetchRequest {
                offset,
                limit: Some(limit),
                predicate: None,
            }))
            .unwrap();
        let frames = write(&f.lock, LockCharacteristic::ListEvents, &request).unwrap();
        owner.events_reader().read_all(&frames).unwrap().0
    };

    let first = page(0, 2);
    let second = page(2, 2);
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert!(first[1].date() > second[0].date());
    assert!(page(6, 2).is_empty());
}

#[test]
fn test_non_administrator_sees_own_events() {
    let f = Fixture::new();
    let owner = f.owner();
    let guest = f.invite(&owner, "Guest", Permission::Anytime);
    unlock_times(&f, &owner, 2);
    unlock_times(&f, &guest, 2);

    // asking for someone else's events still yields only the guest's own
    let request = guest
        .list_events(Some(FetchRequest {
            offset: 0,
            limit: None,
            predicate: Some(Predicate {
                keys: Some(vec![owner.credentials().id]),
                ..Predicate::default()
            }),
        }))
        .unwrap();
    let frames = write(&f.lock, LockCharacteristic::ListEvents, &request).unwrap();
    let EventsList(events) = guest.events_reader().read_all(&frames).unwrap();
    // two unlocks plus the confirmation recorded under the guest's key
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|event| event.key() == guest.credentials().id));

    let frames = write(
        &f.lock,
        LockCharacteristic::ListEvents,
        &owner.list_events(None).unwrap(),
    )
    .unwrap();
    let EventsList(all) = owner.events_reader().read_all(&frames).unwrap();
    assert_eq!(all.len(), 7);
}

#[test]
fn test_list_events_by_date() {
    let f = Fixture::new();
    let owner = f.owner();
    let start = f.clock.now();
    unlock_times(&f, &owner, 4);
    let end = f.clock.now() - Duration::seconds(1);

    let request = owner
        .list_events(Some(FetchRequest {
            offset: 0,
            limit: None,
            predicate: Some(Predicate {
                keys: None,
                start: Some(start),
                end: Some(end),
            }),
        }))
        .unwrap();
    let frames = write(&f.lock, LockCharacteristic::ListEvents, &request).unwrap();
    let EventsList(events) = owner.events_reader().read_all(&frames).unwrap();
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|event| event.event_type() == LockEventType::Unlock));
}
