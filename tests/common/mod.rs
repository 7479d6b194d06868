//! Shared test infrastructure.
//!
//! - `setup_store()` - empty SQLite store in a temporary directory
//! - `service_in()` - a service request stored in a given status
//! - `test_app!` - the full HTTP app over a seeded store

#![allow(dead_code, unused_macros)]

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use backadmin::db::{self, SERVICES_KEY, SqliteStore, Store};
use backadmin::models::service::{Client, Person, ServiceRepository, ServiceRequest, ServiceStatus};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const SEED_PASS: &str = "admin123";
pub const ADMIN_EMAIL: &str = "admin@backadmin.local";
pub const BACKOFFICE_EMAIL: &str = "backoffice@backadmin.local";
pub const ADVOGADA_EMAIL: &str = "advogada@backadmin.local";
pub const VISUALIZADOR_EMAIL: &str = "visualizador@backadmin.local";

pub const ENTITY: &str = "12345";
pub const REFERENCE: &str = "123 456 789";
pub const PROCESS_NUMBER: &str = "12345/24";
pub const PROCESS_PASSWORD: &str = "ABCD-EFGH-IJKL-MNOP";

// ============================================================================
// STORE SETUP
// ============================================================================

/// Returns (TempDir, Store); the TempDir must be kept alive for the store to remain valid.
pub fn setup_store() -> (TempDir, Store) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store: Store = Arc::new(SqliteStore::open(dir.path().join("test.db")).expect("Failed to open store"));
    (dir, store)
}

pub fn setup_repo() -> (TempDir, ServiceRepository) {
    let (dir, store) = setup_store();
    (dir, ServiceRepository::new(store))
}

pub fn client(name: &str) -> Client {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    Client { id: db::new_id(), full_name: name.to_string(), email, phone: None }
}

/// Build a request for `name` in `status` without storing it.
pub fn service(name: &str, status: Option<ServiceStatus>) -> ServiceRequest {
    let mut first_last = name.splitn(2, ' ');
    let first = first_last.next().unwrap_or(name);
    let last = first_last.next().unwrap_or("Silva");
    let mut svc = ServiceRequest::new(client(name), Some(Person::named(first, last)), Utc::now());
    svc.status = status;
    svc
}

/// Store a request for `name` in `status` and return it.
pub fn service_in(repo: &ServiceRepository, name: &str, status: ServiceStatus) -> ServiceRequest {
    repo.insert(service(name, Some(status))).expect("Failed to insert service")
}

/// Overwrite the stored service list.
pub fn replace_services(store: &Store, services: &[ServiceRequest]) {
    db::save_list(store.as_ref(), SERVICES_KEY, services).expect("Failed to save services");
}

// ============================================================================
// HTTP APP
// ============================================================================

/// Seeded store plus the shared state the handlers read.
pub struct TestState {
    pub dir: TempDir,
    pub store: Store,
    pub services: actix_web::web::Data<ServiceRepository>,
    pub permissions: actix_web::web::Data<backadmin::auth::permissions::PermissionStore>,
    pub notifier: Arc<backadmin::notify::RecordingNotifier>,
}

pub fn test_state() -> TestState {
    let (dir, store) = setup_store();
    let hash = backadmin::auth::password::hash_password(SEED_PASS).expect("Failed to hash");
    db::seed_users(store.as_ref(), &hash).expect("Failed to seed users");
    let permissions = backadmin::auth::permissions::PermissionStore::load(store.clone())
        .expect("Failed to load permissions");
    TestState {
        dir,
        services: actix_web::web::Data::new(ServiceRepository::new(store.clone())),
        permissions: actix_web::web::Data::new(permissions),
        notifier: Arc::new(backadmin::notify::RecordingNotifier::new()),
        store,
    }
}

/// Build the service under test from a `TestState`. Needs `#[macro_use] mod common;`.
macro_rules! test_app {
    ($state:expr) => {{
        use actix_session::{SessionMiddleware, storage::CookieSessionStore};
        use actix_web::{App, cookie::Key, test, web};

        let store: web::Data<dyn backadmin::db::KeyValueStore> = web::Data::from($state.store.clone());
        let notifier: web::Data<dyn backadmin::notify::Notifier> =
            web::Data::from($state.notifier.clone() as std::sync::Arc<dyn backadmin::notify::Notifier>);
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64]))
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(store)
                .app_data($state.services.clone())
                .app_data($state.permissions.clone())
                .app_data(notifier)
                .configure(backadmin::handlers::configure),
        )
        .await
    }};
}
