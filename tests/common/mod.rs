//! Common test utilities for smartlock integration tests
//!
//! Each test builds its own lock on a manual clock so authentication dates
//! and event ordering are deterministic.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Once};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use smartlock::prelude::*;
pub use smartlock::protocol::LockEventType;
pub use uuid::Uuid;

pub type TestClock = Arc<ManualClock>;
pub type TestLock = LockPeripheral<InMemoryAuthorizationStore, InMemoryEventStore, TestClock>;
pub type TestClient = LockClient<TestClock>;

static TRACING: Once = Once::new();

/// Install a stderr subscriber honoring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    });
}

/// Monday 2024-03-04 09:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub struct Fixture {
    pub lock: TestLock,
    pub clock: TestClock,
    pub setup_secret: KeyData,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    pub fn with_config(config: LockConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(start_time()));
        let setup_secret = KeyData::generate();
        let lock = LockPeripheral::new(
            Uuid::new_v4(),
            setup_secret.clone(),
            InMemoryAuthorizationStore::new(),
            InMemoryEventStore::new(),
            Arc::clone(&clock),
        )
        .with_config(config)
        .unwrap();
        Fixture {
            lock,
            clock,
            setup_secret,
        }
    }

    /// Set the lock up and return the owner's client
    pub fn owner(&self) -> TestClient {
        let (request, owner) =
            LockClient::setup(self.lock.id(), &self.setup_secret, Arc::clone(&self.clock))
                .unwrap();
        self.lock.setup(&request).unwrap();
        self.tick();
        owner
    }

    /// Invite and confirm a key, returning the invitee's client
    pub fn invite(&self, grantor: &TestClient, name: &str, permission: Permission) -> TestClient {
        let (request, invitation) = grantor
            .create_new_key(name, permission, self.clock.now() + Duration::days(1))
            .unwrap();
        self.lock.create_new_key(&request).unwrap();
        self.tick();

        // the invitation travels out of band as JSON
        let invitation = Invitation::from_json(&invitation.to_json().unwrap()).unwrap();
        let (confirm, credentials) = invitation.confirm(&self.clock).unwrap();
        self.lock.confirm_new_key(&confirm).unwrap();
        self.tick();
        LockClient::with_clock(self.lock.id(), credentials, Arc::clone(&self.clock))
    }

    /// Advance one second so consecutive events have distinct dates
    pub fn tick(&self) {
        self.clock.advance(Duration::seconds(1));
    }

    pub fn client(&self, credentials: KeyCredentials) -> TestClient {
        LockClient::with_clock(self.lock.id(), credentials, Arc::clone(&self.clock))
    }
}

/// Run a write through the byte-level characteristic interface
pub fn write<T: BinaryWrite>(
    lock: &TestLock,
    characteristic: LockCharacteristic,
    request: &T,
) -> Result<Vec<Vec<u8>>, LockError> {
    lock.write(characteristic, &request.to_bytes().unwrap())
}
