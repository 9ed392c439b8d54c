use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::warn;
use rehber_core::FsMediaStore;
use rusqlite::Connection;

use crate::{
    config::Settings,
    error::{ApiError, ApiResult},
};

/// Shared handler state. One connection, one writer at a time.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub media: Arc<FsMediaStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(conn: Connection, settings: Settings) -> Self {
        let media = FsMediaStore::new(
            settings.storage.media_dir.clone(),
            settings.storage.public_base.clone(),
        );
        Self {
            db: Arc::new(Mutex::new(conn)),
            media: Arc::new(media),
            settings: Arc::new(settings),
        }
    }

    pub fn session_ttl_ms(&self) -> i64 {
        self.settings.auth.session_ttl_ms()
    }

    /// Runs `work` on the blocking pool with the connection locked.
    ///
    /// Keep password hashing and file writes out of `work`; use
    /// [`AppState::blocking`] for those.
    pub async fn with_db<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        Self::blocking(move || {
            let conn = lock_connection(&db);
            work(&conn)
        })
        .await
    }

    /// Runs `work` on the blocking pool without touching the connection.
    pub async fn blocking<T, F>(work: F) -> ApiResult<T>
    where
        F: FnOnce() -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
    }
}

/// A panic while the lock was held leaves no open transaction behind:
/// rusqlite rolls back on drop. The connection stays usable.
fn lock_connection(db: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    db.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("event=db_lock module=server status=recovered reason=poisoned");
        db.clear_poison();
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Auth, Database, Logging, Server, Storage};
    use rehber_core::service::account_service::HashedPassword;

    fn state() -> AppState {
        let settings = Settings {
            server: Server {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: Database {
                path: ":memory:".to_string(),
            },
            storage: Storage {
                media_dir: "media".to_string(),
                public_base: "/media".to_string(),
            },
            auth: Auth {
                session_ttl_minutes: 60,
            },
            logging: Logging {
                level: "info".to_string(),
                dir: None,
            },
        };
        AppState::new(rehber_core::open_db_in_memory().unwrap(), settings)
    }

    #[tokio::test]
    async fn with_db_recovers_after_a_panicking_holder() {
        let state = state();
        let db = Arc::clone(&state.db);
        let panicked = std::thread::spawn(move || {
            let _guard = db.lock().unwrap();
            panic!("handler bug");
        })
        .join();
        assert!(panicked.is_err());
        assert!(state.db.is_poisoned());

        let one: i64 = state
            .with_db(|conn| {
                conn.query_row("SELECT 1;", [], |row| row.get(0))
                    .map_err(|err| ApiError::Internal(err.to_string()))
            })
            .await
            .unwrap();
        assert_eq!(one, 1);
        assert!(!state.db.is_poisoned());
    }

    #[tokio::test]
    async fn password_hashing_runs_while_connection_is_locked() {
        let state = state();
        let _held = state.db.lock().unwrap();

        let hashed = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            AppState::blocking(|| Ok(HashedPassword::new("gizli123")?)),
        )
        .await
        .expect("hashing waited for the connection lock");
        assert!(hashed.is_ok());
    }

    #[tokio::test]
    async fn blocking_returns_work_result() {
        let value = AppState::blocking(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }
}
