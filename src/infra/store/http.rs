//! Record store reached over HTTP.
//!
//! `GET {base}/table` answers with the slug-keyed pages table and
//! `POST {base}/users` with `{"ids": [...]}` answers with
//! `{"users": {"<id>": {"full_name": "..."}}}`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::repos::{RecordStore, StoreError};
use crate::domain::entities::{AuthorIdentity, RecordTable};

/// Longest prefix of an error response body kept in [`StoreError::Status`].
const MAX_ERROR_BODY_BYTES: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    table_url: Url,
    users_url: Url,
}

#[derive(Serialize)]
struct UsersRequest<'a> {
    ids: &'a [String],
}

#[derive(Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: HashMap<String, UserRecord>,
}

#[derive(Deserialize)]
struct UserRecord {
    #[serde(default)]
    full_name: Option<String>,
}

impl HttpRecordStore {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, StoreError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let table_url = base.join("table").map_err(StoreError::transport)?;
        let users_url = base.join("users").map_err(StoreError::transport)?;
        let client = Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(StoreError::transport)?;

        Ok(Self {
            client,
            table_url,
            users_url,
        })
    }

    async fn read_body(response: Response) -> Result<Vec<u8>, StoreError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: error_excerpt(&bytes),
            });
        }
        Ok(bytes.to_vec())
    }
}

fn error_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_ERROR_BODY_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::decode(err)
    } else {
        StoreError::transport(err)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch_table(&self) -> Result<RecordTable, StoreError> {
        let response = self
            .client
            .get(self.table_url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;
        let table: RecordTable = serde_json::from_slice(&body).map_err(StoreError::decode)?;

        debug!(
            target = "folio::store::http",
            records = table.len(),
            "fetched pages table"
        );
        Ok(table)
    }

    async fn fetch_users(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AuthorIdentity>, StoreError> {
        let response = self
            .client
            .post(self.users_url.clone())
            .json(&UsersRequest { ids })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;
        let decoded: UsersResponse = serde_json::from_slice(&body).map_err(StoreError::decode)?;

        Ok(decoded
            .users
            .into_iter()
            .filter_map(|(id, user)| {
                user.full_name
                    .map(|name| (id.clone(), AuthorIdentity::new(id, name)))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    fn store(server: &MockServer, base_path: &str) -> HttpRecordStore {
        let base = Url::parse(&server.url(base_path)).expect("base url");
        HttpRecordStore::new(&base, Duration::from_secs(5)).expect("store")
    }

    #[tokio::test]
    async fn fetches_table_in_response_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/notion/table");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"second": {"Slug": "second", "Published": true}, "first": {"Slug": "first"}}"#);
        });

        let table = store(&server, "/notion")
            .fetch_table()
            .await
            .expect("fetch table");

        mock.assert();
        let slugs: Vec<&str> = table.iter().map(|(slug, _)| slug).collect();
        assert_eq!(slugs, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn posts_ids_and_reads_full_names() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/users")
                .json_body(json!({"ids": ["u1", "u2"]}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"users": {"u1": {"full_name": "Jane Doe"}, "u2": {}}}));
        });

        let users = store(&server, "/")
            .fetch_users(&["u1".to_string(), "u2".to_string()])
            .await
            .expect("fetch users");

        mock.assert();
        assert_eq!(users.len(), 1);
        assert_eq!(users["u1"], AuthorIdentity::new("u1", "Jane Doe"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/table");
            then.status(502).body("bad gateway");
        });

        let err = store(&server, "/")
            .fetch_table()
            .await
            .expect_err("502 should fail");
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_error_body_is_cut_to_a_prefix() {
        let server = MockServer::start();
        let page = "é".repeat(4096);
        server.mock(|when, then| {
            when.method("GET").path("/table");
            then.status(500).body(page.as_str());
        });

        let err = store(&server, "/")
            .fetch_table()
            .await
            .expect_err("500 should fail");
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.len() <= MAX_ERROR_BODY_BYTES + '…'.len_utf8());
                assert!(body.ends_with('…'));
                assert!(body.trim_end_matches('…').chars().all(|c| c == 'é'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_excerpt_keeps_short_bodies_whole() {
        assert_eq!(error_excerpt(b"bad gateway"), "bad gateway");
        let exact = "x".repeat(MAX_ERROR_BODY_BYTES);
        assert_eq!(error_excerpt(exact.as_bytes()), exact);
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/table");
            then.status(200).body("not json");
        });

        let err = store(&server, "/")
            .fetch_table()
            .await
            .expect_err("garbage should fail");
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
