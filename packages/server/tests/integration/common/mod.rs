use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use directorate_common::storage::filesystem::FilesystemUploadStore;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tempfile::TempDir;

use directorate_server::config::{
    AppConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageConfig,
};
use directorate_server::database::init_db;
use directorate_server::kinds;
use directorate_server::state::AppState;

pub mod routes {
    pub fn create(kind: &str) -> String {
        format!("/api/{kind}/create")
    }

    pub fn list_raw(kind: &str) -> String {
        format!("/api/{kind}/getAll")
    }

    pub fn list_localized(kind: &str, locale: &str) -> String {
        format!("/api/{kind}/getAll/{locale}")
    }

    pub fn get(kind: &str, id: &str) -> String {
        format!("/api/{kind}/get/{id}")
    }

    pub fn get_localized(kind: &str, id: &str, locale: &str) -> String {
        format!("/api/{kind}/get/{id}/{locale}")
    }

    pub fn update(kind: &str, id: &str) -> String {
        format!("/api/{kind}/update/{id}")
    }

    pub fn delete(kind: &str, id: &str) -> String {
        format!("/api/{kind}/delete/{id}")
    }
}

/// A running test server over a scratch SQLite database and uploads tree.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub uploads_dir: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create scratch directory");
        let uploads_dir = dir.path().join("uploads");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 5,
            },
            storage: StorageConfig {
                uploads_dir: uploads_dir.clone(),
                max_upload_size: 1024 * 1024,
            },
        };

        let db = init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        let uploads = Arc::new(
            FilesystemUploadStore::new(uploads_dir.clone(), config.storage.max_upload_size)
                .await
                .expect("Failed to create uploads store"),
        );
        let registry = kinds::build_registry(&db, uploads.clone());

        let state = AppState {
            config: Arc::new(config),
            registry,
            uploads,
        };
        let app = directorate_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            uploads_dir,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_form(&self, path: &str, form: Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart POST request");

        TestResponse::from_response(res).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn put_form(&self, path: &str, form: Form) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Map a stored `/uploads/...` path onto the scratch uploads tree.
    pub fn disk_path(&self, stored: &str) -> PathBuf {
        let relative = stored
            .strip_prefix("/uploads/")
            .expect("stored path should start with /uploads/");
        self.uploads_dir.join(relative)
    }

    pub fn on_disk(&self, stored: &str) -> bool {
        self.disk_path(stored).exists()
    }

    /// Wait for a stored file to be unlinked; cleanup runs after the response.
    pub async fn removed(&self, stored: &str) -> bool {
        for _ in 0..100 {
            if !self.on_disk(stored) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Number of files under an uploads subdirectory.
    pub fn files_in(&self, dir: &str) -> usize {
        std::fs::read_dir(self.uploads_dir.join(dir))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Create a record via JSON and return its `id`.
    pub async fn create_json(&self, kind: &str, body: &Value) -> String {
        let res = self.post_json(&routes::create(kind), body).await;
        assert_eq!(res.status, 201, "create {kind} failed: {}", res.text);
        res.id()
    }

    /// Create a record via multipart and return the response.
    pub async fn create_form(&self, kind: &str, form: Form) -> TestResponse {
        let res = self.post_form(&routes::create(kind), form).await;
        assert_eq!(res.status, 201, "create {kind} failed: {}", res.text);
        res
    }
}

/// Multipart form holding every locale of the given localized fields.
pub fn localized_form(fields: &[(&str, &str)]) -> Form {
    let mut form = Form::new();
    for (name, value) in fields {
        for locale in ["uz", "ru", "en"] {
            form = form.text(format!("{name}_{locale}"), format!("{value} {locale}"));
        }
    }
    form
}

pub fn file_part(name: &str, bytes: &[u8]) -> Part {
    Part::bytes(bytes.to_vec()).file_name(name.to_string())
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> String {
        self.body["data"]["id"]
            .as_str()
            .expect("response body should contain 'data.id'")
            .to_string()
    }

    pub fn data_str(&self, key: &str) -> String {
        self.body["data"][key]
            .as_str()
            .unwrap_or_else(|| panic!("response data should contain '{key}': {}", self.text))
            .to_string()
    }

    pub fn data_paths(&self, key: &str) -> Vec<String> {
        serde_json::from_value(self.body["data"][key].clone())
            .unwrap_or_else(|_| panic!("response data '{key}' should be a path list"))
    }
}
