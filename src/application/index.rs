//! Builds a [`PostIndex`] from the pages table in one materialization pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::application::authors::{AuthorResolver, MissingAuthorError};
use crate::application::repos::{RecordStore, StoreError};
use crate::domain::entities::{PostIndex, PostView, RawRecord};
use crate::domain::publication;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Upstream(#[from] StoreError),
    #[error("post `{slug}` references an author the store could not resolve")]
    IncompleteAuthorData {
        slug: String,
        #[source]
        source: MissingAuthorError,
    },
}

/// A record that survived filtering, waiting for its authors to be resolved.
struct Candidate {
    slug: String,
    record: RawRecord,
    author_ids: Vec<String>,
    draft: bool,
}

#[derive(Clone)]
pub struct IndexMaterializer {
    store: Arc<dyn RecordStore>,
    authors: AuthorResolver,
}

impl IndexMaterializer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let authors = AuthorResolver::new(store.clone());
        Self { store, authors }
    }

    /// Runs one pass: fetch the table, filter, resolve authors, assemble.
    ///
    /// Issues exactly one table fetch and at most one users lookup. Either a
    /// complete index is returned or nothing is.
    #[instrument(skip(self))]
    pub async fn materialize(&self, preview: bool) -> Result<PostIndex, MaterializeError> {
        self.materialize_at(preview, OffsetDateTime::now_utc()).await
    }

    /// [`Self::materialize`] with publication dates judged against `now`.
    pub async fn materialize_at(
        &self,
        preview: bool,
        now: OffsetDateTime,
    ) -> Result<PostIndex, MaterializeError> {
        let table = self.store.fetch_table().await?;
        let table_len = table.len();

        let mut candidates = Vec::with_capacity(table_len);
        let mut author_ids = BTreeSet::new();
        for (slug, mut record) in table {
            if !publication::is_visible_at(&record, preview, now) {
                continue;
            }

            let ids = record.authors.take().unwrap_or_default();
            author_ids.extend(ids.iter().cloned());
            let draft = !publication::is_published_at(&record, now);
            candidates.push(Candidate {
                slug,
                record,
                author_ids: ids,
                draft,
            });
        }

        let resolved = self.authors.resolve(&author_ids).await?;

        let mut posts = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let names = resolved
                .names_for(&candidate.author_ids)
                .map_err(|source| MaterializeError::IncompleteAuthorData {
                    slug: candidate.slug.clone(),
                    source,
                })?;
            posts.push(PostView::new(
                candidate.slug,
                candidate.record,
                names,
                candidate.draft,
            ));
        }

        info!(
            target = "folio::index",
            preview,
            table = table_len,
            posts = posts.len(),
            authors = author_ids.len(),
            "materialized post index"
        );

        Ok(PostIndex::new(preview, posts))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::{AuthorIdentity, RecordTable};
    use crate::infra::store::memory::MemoryRecordStore;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00:00 UTC);

    fn table(value: serde_json::Value) -> RecordTable {
        serde_json::from_value(value).expect("decode table")
    }

    fn materializer(
        records: serde_json::Value,
        users: &[(&str, &str)],
    ) -> (IndexMaterializer, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new(
            table(records),
            users
                .iter()
                .map(|(id, name)| AuthorIdentity::new(*id, *name)),
        ));
        (IndexMaterializer::new(store.clone()), store)
    }

    #[tokio::test]
    async fn numeric_page_title_keeps_the_post_untitled() {
        let (materializer, _) = materializer(
            json!({
                "bad": {"Page": 5, "Published": true},
                "good": {"Page": "Ok", "Published": true}
            }),
            &[],
        );

        let index = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        let posts: Vec<(&str, Option<&str>)> = index
            .posts()
            .iter()
            .map(|post| (post.slug.as_str(), post.page.as_deref()))
            .collect();
        assert_eq!(posts, vec![("bad", None), ("good", Some("Ok"))]);
    }

    #[tokio::test]
    async fn resolves_authors_for_published_post() {
        let (materializer, _) = materializer(
            json!({
                "slugA": {"Slug": "slugA", "Page": "Hello", "Authors": ["u1"], "Published": true}
            }),
            &[("u1", "Jane Doe")],
        );

        let index = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        assert!(!index.preview());
        assert_eq!(index.len(), 1);
        let post = &index.posts()[0];
        assert_eq!(post.slug, "slugA");
        assert_eq!(post.page.as_deref(), Some("Hello"));
        assert_eq!(post.authors, vec!["Jane Doe"]);
        assert!(!post.draft);
    }

    #[tokio::test]
    async fn drafts_only_appear_in_preview() {
        let records = json!({
            "slugA": {"Slug": "slugA", "Page": "Hello", "Authors": ["u1"], "Published": false}
        });
        let (materializer, _) = materializer(records, &[("u1", "Jane Doe")]);

        let published = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");
        assert!(published.is_empty());

        let preview = materializer
            .materialize_at(true, NOW)
            .await
            .expect("materialize");
        assert!(preview.preview());
        assert_eq!(preview.len(), 1);
        assert!(preview.posts()[0].draft);
        assert_eq!(preview.posts()[0].authors, vec!["Jane Doe"]);
    }

    #[tokio::test]
    async fn author_order_and_count_are_preserved() {
        let (materializer, _) = materializer(
            json!({
                "duo": {"Authors": ["a2", "a1", "a2"], "Published": "Yes"}
            }),
            &[("a1", "Ana"), ("a2", "Bruno")],
        );

        let index = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        assert_eq!(index.posts()[0].authors, vec!["Bruno", "Ana", "Bruno"]);
    }

    #[tokio::test]
    async fn one_lookup_for_the_deduplicated_author_set() {
        let (materializer, store) = materializer(
            json!({
                "one": {"Authors": ["a1", "a2"], "Published": true},
                "two": {"Authors": ["a2"], "Published": true},
                "three": {"Authors": ["a3", "a1"], "Published": true},
                "hidden": {"Authors": ["a9"], "Published": false}
            }),
            &[("a1", "Ana"), ("a2", "Bruno"), ("a3", "Caio"), ("a9", "Ivo")],
        );

        materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        assert_eq!(store.table_calls(), 1);
        assert_eq!(
            store.user_batches(),
            vec![vec!["a1".to_string(), "a2".to_string(), "a3".to_string()]]
        );
    }

    #[tokio::test]
    async fn no_authors_means_no_lookup() {
        let (materializer, store) = materializer(
            json!({
                "solo": {"Published": true},
                "nulled": {"Authors": null, "Published": true}
            }),
            &[],
        );

        let index = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        assert_eq!(index.len(), 2);
        assert!(index.posts().iter().all(|post| post.authors.is_empty()));
        assert!(store.user_batches().is_empty());
    }

    #[tokio::test]
    async fn output_follows_table_order() {
        // Decoded from text: `json!` objects are key-sorted.
        let records: RecordTable = serde_json::from_str(
            r#"{
                "c": {"Published": true, "Date": "2020-01-01"},
                "a": {"Published": true, "Date": "2023-01-01"},
                "b": {"Published": true, "Date": "2021-01-01"}
            }"#,
        )
        .expect("decode table");
        let store = Arc::new(MemoryRecordStore::new(records, Vec::new()));
        let materializer = IndexMaterializer::new(store);

        let index = materializer
            .materialize_at(false, NOW)
            .await
            .expect("materialize");

        let slugs: Vec<&str> = index.posts().iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn missing_author_fails_the_pass() {
        let (materializer, _) = materializer(
            json!({
                "slugA": {"Authors": ["u1", "ghost"], "Published": true}
            }),
            &[("u1", "Jane Doe")],
        );

        let err = materializer
            .materialize_at(false, NOW)
            .await
            .expect_err("missing author must fail");

        match err {
            MaterializeError::IncompleteAuthorData { slug, source } => {
                assert_eq!(slug, "slugA");
                assert_eq!(source.id, "ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_an_upstream_error() {
        let (materializer, store) = materializer(json!({}), &[]);
        store.set_unavailable(true);

        let err = materializer
            .materialize_at(false, NOW)
            .await
            .expect_err("fetch must fail");
        assert!(matches!(err, MaterializeError::Upstream(_)));
    }

    #[tokio::test]
    async fn repeated_passes_are_equal() {
        let (materializer, _) = materializer(
            json!({
                "x": {"Slug": "x", "Authors": ["a1"], "Published": true, "Tags": ["t"]},
                "y": {"Slug": "y", "Authors": ["a2"], "Published": true}
            }),
            &[("a1", "Ana"), ("a2", "Bruno")],
        );

        let first = materializer
            .materialize_at(false, NOW)
            .await
            .expect("first");
        let second = materializer
            .materialize_at(false, NOW)
            .await
            .expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn scheduled_posts_wait_for_their_date() {
        let (materializer, _) = materializer(
            json!({
                "later": {"Published": true, "Date": "2024-07-01T00:00:00Z"}
            }),
            &[],
        );

        assert!(
            materializer
                .materialize_at(false, NOW)
                .await
                .expect("before")
                .is_empty()
        );
        let preview = materializer
            .materialize_at(true, NOW)
            .await
            .expect("preview");
        assert!(preview.posts()[0].draft);
        assert_eq!(
            materializer
                .materialize_at(false, datetime!(2024-07-02 00:00:00 UTC))
                .await
                .expect("after")
                .len(),
            1
        );
    }
}
