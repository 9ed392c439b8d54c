#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rehber_core::model::expert::Expert;
use rehber_core::model::family::Family;
use rehber_core::repo::expert_repo::{ExpertRepository, SqliteExpertRepository};
use rehber_core::repo::family_repo::{FamilyRepository, SqliteFamilyRepository};
use rehber_core::repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
use rehber_core::{Role, UserId};
use rehber_server::config::{Auth, Database, Logging, Server, Settings, Storage};
use rehber_server::state::AppState;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            server: Server {
                host: "127.0.0.1".into(),
                port: 0,
            },
            database: Database {
                path: ":memory:".into(),
            },
            storage: Storage {
                media_dir: media_dir.path().to_string_lossy().into_owned(),
                public_base: "/media".into(),
            },
            auth: Auth {
                session_ttl_minutes: 60,
            },
            logging: Logging {
                level: "info".into(),
                dir: None,
            },
        };
        let conn = rehber_core::open_db_in_memory().unwrap();
        Self {
            state: AppState::new(conn, settings),
            media_dir,
        }
    }

    pub fn router(&self) -> Router {
        rehber_server::router(self.state.clone())
    }

    /// Creates an identity with a live session, skipping password hashing.
    pub fn session(&self, email: &str, role: Option<Role>) -> (UserId, String) {
        let conn = self.state.db.lock().unwrap();
        let identities = SqliteIdentityRepository::new(&conn);
        let uid = identities.create_user(email, "unused-hash", role).unwrap();
        let session = identities.create_session(uid, 60 * 60 * 1000).unwrap();
        (uid, session.token)
    }

    pub fn admin(&self) -> String {
        self.session("admin@rehber.test", Some(Role::Admin)).1
    }

    pub fn expert(&self, email: &str, first: &str, last: &str) -> (Expert, String) {
        let (uid, token) = self.session(email, Some(Role::Expert));
        let conn = self.state.db.lock().unwrap();
        let repo = SqliteExpertRepository::new(&conn);
        repo.create_expert(&Expert::new(uid, email, first, last)).unwrap();
        (repo.get_expert(uid).unwrap().unwrap(), token)
    }

    pub fn family(&self, email: &str, family_name: &str) -> (Family, String) {
        let (uid, token) = self.session(email, Some(Role::Family));
        let conn = self.state.db.lock().unwrap();
        let repo = SqliteFamilyRepository::new(&conn);
        repo.create_family(&Family::new(uid, email, family_name)).unwrap();
        (repo.get_family(uid).unwrap().unwrap(), token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }
}
