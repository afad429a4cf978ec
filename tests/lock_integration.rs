mod common;

use chrono::Duration;
use common::*;

#[test]
fn test_key_lifecycle() {
    let f = Fixture::new();
    assert_eq!(f.lock.status().unwrap(), LockStatus::Setup);

    let owner = f.owner();
    assert_eq!(f.lock.status().unwrap(), LockStatus::Unlock);

    let guest = f.invite(&owner, "Guest", Permission::Anytime);
    f.lock
        .unlock(&guest.unlock(UnlockAction::Default).unwrap())
        .unwrap();
    f.tick();

    let keys = f.lock.authorization_store().keys().unwrap();
    assert_eq!(keys.len(), 2);
    assert!(f.lock.authorization_store().new_keys().unwrap().is_empty());

    let remove = owner
        .remove_key(guest.credentials().id, KeyType::Key)
        .unwrap();
    f.lock.remove_key(&remove).unwrap();
    f.tick();

    assert!(matches!(
        f.lock.unlock(&guest.unlock(UnlockAction::Default).unwrap()),
        Err(LockError::UnknownKey(id)) if id == guest.credentials().id
    ));

    let types: Vec<LockEventType> = f
        .lock
        .event_store()
        .fetch(&FetchRequest::default())
        .unwrap()
        .iter()
        .map(|event| event.event_type())
        .collect();
    assert_eq!(
        types,
        vec![
            LockEventType::RemoveKey,
            LockEventType::Unlock,
            LockEventType::ConfirmNewKey,
            LockEventType::CreateNewKey,
            LockEventType::Setup,
        ]
    );
}

#[test]
fn test_characteristic_writes() {
    let f = Fixture::new();
    let (setup, owner) =
        LockClient::setup(f.lock.id(), &f.setup_secret, f.clock.clone()).unwrap();
    assert!(write(&f.lock, LockCharacteristic::Setup, &setup)
        .unwrap()
        .is_empty());

    let information =
        LockInformation::from_bytes(&f.lock.read(LockCharacteristic::Information).unwrap())
            .unwrap();
    assert_eq!(information.id, f.lock.id());
    assert_eq!(information.status, LockStatus::Unlock);
    assert!(information.unlock_actions.contains(UnlockAction::Default));

    let unlock = owner.unlock(UnlockAction::Default).unwrap();
    assert!(write(&f.lock, LockCharacteristic::Unlock, &unlock)
        .unwrap()
        .is_empty());

    // a write to the wrong characteristic is undecodable
    assert!(matches!(
        write(&f.lock, LockCharacteristic::Setup, &unlock),
        Err(LockError::InvalidData(_))
    ));
}

#[test]
fn test_setup_only_once() {
    let f = Fixture::new();
    let _owner = f.owner();
    let (again, _) = LockClient::setup(f.lock.id(), &f.setup_secret, f.clock.clone()).unwrap();
    assert!(matches!(
        f.lock.setup(&again),
        Err(LockError::CouldNotComplete(_))
    ));
    assert_eq!(f.lock.authorization_store().keys().unwrap().len(), 1);
}

#[test]
fn test_non_administrator_cannot_manage_keys() {
    let f = Fixture::new();
    let owner = f.owner();
    let guest = f.invite(&owner, "Guest", Permission::Anytime);

    let (create, _) = guest
        .create_new_key("Friend", Permission::Anytime, f.clock.now() + Duration::days(1))
        .unwrap();
    let err = f.lock.create_new_key(&create).unwrap_err();
    assert!(err.is_authorization_error());

    let remove = guest
        .remove_key(owner.credentials().id, KeyType::Key)
        .unwrap();
    assert!(matches!(
        f.lock.remove_key(&remove),
        Err(LockError::NotAuthorized { .. })
    ));

    assert!(matches!(
        f.lock.list_keys(&guest.list_keys().unwrap()),
        Err(LockError::NotAuthorized { .. })
    ));
    assert!(f.lock.authorization_store().new_keys().unwrap().is_empty());
}

#[test]
fn test_admin_may_invite_but_not_grant_owner() {
    let f = Fixture::new();
    let owner = f.owner();
    let admin = f.invite(&owner, "Manager", Permission::Admin);
    let _cleaner = f.invite(&admin, "Cleaner", Permission::Anytime);

    let (create, _) = admin
        .create_new_key("Co-owner", Permission::Owner, f.clock.now() + Duration::days(1))
        .unwrap();
    assert!(matches!(
        f.lock.create_new_key(&create),
        Err(LockError::NotAuthorized { .. })
    ));
    assert_eq!(f.lock.authorization_store().keys().unwrap().len(), 3);
}

#[test]
fn test_owner_key_cannot_be_removed() {
    let f = Fixture::new();
    let owner = f.owner();
    let admin = f.invite(&owner, "Manager", Permission::Admin);

    let remove = admin
        .remove_key(owner.credentials().id, KeyType::Key)
        .unwrap();
    assert!(matches!(
        f.lock.remove_key(&remove),
        Err(LockError::NotAuthorized { .. })
    ));
    f.lock
        .unlock(&owner.unlock(UnlockAction::Default).unwrap())
        .unwrap();
}

#[test]
fn test_expired_invitation() {
    let f = Fixture::new();
    let owner = f.owner();
    let (create, invitation) = owner
        .create_new_key("Late", Permission::Anytime, f.clock.now() + Duration::hours(1))
        .unwrap();
    f.lock.create_new_key(&create).unwrap();

    f.clock.advance(Duration::hours(2));
    let (confirm, _) = invitation.confirm(&f.clock).unwrap();
    assert!(matches!(
        f.lock.confirm_new_key(&confirm),
        Err(LockError::Expired(id)) if id == invitation.key.id
    ));
    assert!(f
        .lock
        .authorization_store()
        .new_key(&invitation.key.id)
        .unwrap()
        .is_some());
}

#[test]
fn test_invitation_expiration_must_be_in_future() {
    let f = Fixture::new();
    let owner = f.owner();
    let (create, _) = owner
        .create_new_key("Past", Permission::Anytime, f.clock.now())
        .unwrap();
    assert!(matches!(
        f.lock.create_new_key(&create),
        Err(LockError::CouldNotComplete(_))
    ));
}

#[test]
fn test_invitation_confirms_once() {
    let f = Fixture::new();
    let owner = f.owner();
    let (create, invitation) = owner
        .create_new_key("Guest", Permission::Anytime, f.clock.now() + Duration::days(1))
        .unwrap();
    f.lock.create_new_key(&create).unwrap();

    let (confirm, credentials) = invitation.confirm(&f.clock).unwrap();
    let key = f.lock.confirm_new_key(&confirm).unwrap();
    assert_eq!(key.id, credentials.id);
    assert_eq!(key.name, "Guest");

    f.tick();
    let (again, _) = invitation.confirm(&f.clock).unwrap();
    assert!(matches!(
        f.lock.confirm_new_key(&again),
        Err(LockError::UnknownKey(_))
    ));

    // the temporary secret is not a key secret
    let impostor = f.client(KeyCredentials::new(credentials.id, invitation.secret.clone()));
    assert!(matches!(
        f.lock.unlock(&impostor.unlock(UnlockAction::Default).unwrap()),
        Err(LockError::InvalidAuthentication)
    ));
    let invitee = f.client(credentials);
    f.lock
        .unlock(&invitee.unlock(UnlockAction::Default).unwrap())
        .unwrap();
}

#[test]
fn test_remove_pending_invitation() {
    let f = Fixture::new();
    let owner = f.owner();
    let (create, invitation) = owner
        .create_new_key("Guest", Permission::Anytime, f.clock.now() + Duration::days(1))
        .unwrap();
    f.lock.create_new_key(&create).unwrap();
    f.tick();

    // removing it as a confirmed key does nothing
    let wrong_type = owner
        .remove_key(invitation.key.id, KeyType::Key)
        .unwrap();
    assert!(matches!(
        f.lock.remove_key(&wrong_type),
        Err(LockError::UnknownKey(_))
    ));

    let remove = owner
        .remove_key(invitation.key.id, KeyType::NewKey)
        .unwrap();
    f.lock.remove_key(&remove).unwrap();

    let (confirm, _) = invitation.confirm(&f.clock).unwrap();
    assert!(matches!(
        f.lock.confirm_new_key(&confirm),
        Err(LockError::UnknownKey(_))
    ));
}

#[test]
fn test_unlock_actions_follow_config() {
    let config = LockConfig {
        unlock_actions: vec![UnlockAction::Default, UnlockAction::Button],
        ..LockConfig::default()
    };
    let f = Fixture::with_config(config);
    let owner = f.owner();
    f.lock
        .unlock(&owner.unlock(UnlockAction::Button).unwrap())
        .unwrap();

    let f = Fixture::new();
    let owner = f.owner();
    let err = f
        .lock
        .unlock(&owner.unlock(UnlockAction::Button).unwrap())
        .unwrap_err();
    assert!(matches!(err, LockError::CouldNotComplete(_)));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let f = Fixture::new();
    let owner = f.owner();
    let forged = f.client(KeyCredentials::new(
        owner.credentials().id,
        KeyData::generate(),
    ));
    assert!(matches!(
        f.lock.unlock(&forged.unlock(UnlockAction::Default).unwrap()),
        Err(LockError::InvalidAuthentication)
    ));
    let (create, _) = forged
        .create_new_key("Guest", Permission::Anytime, f.clock.now() + Duration::days(1))
        .unwrap();
    assert!(matches!(
        f.lock.create_new_key(&create),
        Err(LockError::InvalidAuthentication)
    ));
    assert_eq!(f.lock.event_store().len().unwrap(), 1);
}
