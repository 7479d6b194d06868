use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

pub const SERVICES_KEY: &str = "backadmin_services";
pub const USERS_KEY: &str = "backadmin_users";
pub const ACTIVE_USER_KEY: &str = "backadmin_user";
pub const ROLE_PERMISSIONS_KEY: &str = "role_permissions_config";
pub const STATUS_HISTORY_KEY: &str = "backadmin_status_history";

pub const MIGRATIONS: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";

/// Durable string key-value store. Values are JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Atomic read-modify-write of one key. `f` sees the current value and
    /// returns the value to store, or `None` to leave it as is. An error from
    /// `f` aborts without writing.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Option<String>, AppError>,
    ) -> Result<(), AppError>;
}

pub type Store = Arc<dyn KeyValueStore>;

pub fn init_pool(database_url: &Path) -> Result<DbPool, AppError> {
    let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(())
    });
    Ok(Pool::builder().max_size(8).build(manager)?)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute_batch(MIGRATIONS)?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Key-value documents in one SQLite table behind an r2d2 pool.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let pool = init_pool(path)?;
        run_migrations(&pool)?;
        Ok(SqliteStore { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Option<String>, AppError>,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.get()?;
        // IMMEDIATE takes the write lock up front so concurrent updaters queue
        // on busy_timeout instead of reading the same old value
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        if let Some(next) = f(current.as_deref())? {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, next],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Load a JSON list stored under `key`; a missing key is an empty list.
pub fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>, AppError> {
    match store.get(key)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

pub fn save_list<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(items)?;
    store.set(key, &json)
}

/// Run `f` on the list under `key` inside one store transaction. The list is
/// written back only if `f` succeeds.
pub fn update_list<T, R>(
    store: &dyn KeyValueStore,
    key: &str,
    f: impl FnOnce(&mut Vec<T>) -> Result<R, AppError>,
) -> Result<R, AppError>
where
    T: Serialize + DeserializeOwned,
{
    let mut f = Some(f);
    let mut result = None;
    store.update(key, &mut |current: Option<&str>| {
        let mut items: Vec<T> = match current {
            Some(json) => serde_json::from_str(json)?,
            None => Vec::new(),
        };
        let f = f
            .take()
            .ok_or_else(|| AppError::Store(format!("update of {key} ran twice")))?;
        result = Some(f(&mut items)?);
        Ok(Some(serde_json::to_string_pretty(&items)?))
    })?;
    result.ok_or_else(|| AppError::Store(format!("update of {key} did not run")))
}

/// Generate a random 16-byte hex id.
pub fn new_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Seed one system user per role if the user list is empty.
pub fn seed_users(store: &dyn KeyValueStore, password_hash: &str) -> Result<(), AppError> {
    use crate::models::role::Role;
    use crate::models::user::{self, NewUser};

    if store.get(USERS_KEY)?.is_some() {
        log::info!("Users already seeded, skipping");
        return Ok(());
    }

    let seeds = [
        ("Administrador", "admin@backadmin.local", Role::Admin),
        ("Backoffice", "backoffice@backadmin.local", Role::Backoffice),
        ("Advogada", "advogada@backadmin.local", Role::Advogada),
        ("Visualizador", "visualizador@backadmin.local", Role::Visualizador),
    ];
    for (full_name, email, role) in seeds {
        user::create(
            store,
            NewUser {
                full_name: full_name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                role,
            },
        )?;
    }
    log::info!("Seeded {} system users", seeds.len());
    Ok(())
}

/// Seed a handful of demo service requests spread over the workflow, standing in for the intake flow.
pub fn seed_demo_services(store: &dyn KeyValueStore) -> Result<(), AppError> {
    use crate::models::service::{Client, Person, ServiceRequest, ServiceStatus};

    if store.get(SERVICES_KEY)?.is_some() {
        log::info!("Services already seeded, skipping");
        return Ok(());
    }

    let demo = [
        ("Ana", "Souza", ServiceStatus::Step7Waiting),
        ("Bruno", "Lima", ServiceStatus::Step7),
        ("Carla", "Pereira", ServiceStatus::Step7Recused),
        ("Daniel", "Costa", ServiceStatus::Step3),
        ("Eduarda", "Rocha", ServiceStatus::UnderAnalysis),
    ];
    let now = chrono::Utc::now();
    let services: Vec<ServiceRequest> = demo
        .iter()
        .map(|(first, last, status)| {
            let full_name = format!("{first} {last}");
            let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
            let mut service = ServiceRequest::new(
                Client { id: new_id(), full_name, email, phone: None },
                Some(Person::named(first, last)),
                now,
            );
            service.status = Some(*status);
            service
        })
        .collect();
    save_list(store, SERVICES_KEY, &services)?;
    log::info!("Seeded {} demo services", services.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn sqlite_store_roundtrip_and_remove() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        store.set("k", "[3]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[3]"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // removing twice is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn load_list_missing_key_is_empty() {
        let (_dir, store) = temp_store();
        let items: Vec<String> = load_list(&store, "nothing").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn failed_update_writes_nothing() {
        let (_dir, store) = temp_store();
        save_list(&store, "nums", &[1, 2]).unwrap();
        let err = update_list(&store, "nums", |items: &mut Vec<i32>| {
            items.push(3);
            Err::<(), _>(AppError::NotFound)
        })
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(load_list::<i32>(&store, "nums").unwrap(), vec![1, 2]);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    update_list(store.as_ref(), "log", |items: &mut Vec<i32>| {
                        items.push(i);
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut items: Vec<i32> = load_list(store.as_ref(), "log").unwrap();
        items.sort();
        assert_eq!(items, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn new_id_is_32_hex_chars() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
