//! Records read from the pages table and the render-ready views built from them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::types::{PostDate, PublishState, deserialize_authors, deserialize_text};

/// One row of the pages table, keyed by the store's column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(
        rename = "Slug",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub slug: Option<String>,
    #[serde(
        rename = "Page",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<String>,
    #[serde(
        rename = "Authors",
        default,
        deserialize_with = "deserialize_authors",
        skip_serializing_if = "Option::is_none"
    )]
    pub authors: Option<Vec<String>>,
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<PostDate>,
    #[serde(rename = "Published", default, skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishState>,
    /// Remaining columns, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The pages table in store iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    entries: Vec<(String, RawRecord)>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slug: impl Into<String>, record: RawRecord) {
        self.entries.push((slug.into(), record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawRecord)> {
        self.entries
            .iter()
            .map(|(slug, record)| (slug.as_str(), record))
    }
}

impl IntoIterator for RecordTable {
    type Item = (String, RawRecord);
    type IntoIter = std::vec::IntoIter<(String, RawRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, RawRecord)> for RecordTable {
    fn from_iter<I: IntoIterator<Item = (String, RawRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for RecordTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = RecordTable;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping slugs to records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut table = RecordTable {
                    entries: Vec::with_capacity(map.size_hint().unwrap_or(0)),
                };
                while let Some((slug, record)) = map.next_entry::<String, RawRecord>()? {
                    table.push(slug, record);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// A resolved author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorIdentity {
    pub id: String,
    pub full_name: String,
}

impl AuthorIdentity {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }
}

/// A render-ready post. `authors` holds display names, never identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    #[serde(rename = "Slug")]
    pub slug: String,
    #[serde(rename = "Page", skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(rename = "Authors")]
    pub authors: Vec<String>,
    #[serde(rename = "Date", skip_serializing_if = "Option::is_none")]
    pub date: Option<PostDate>,
    #[serde(rename = "Published", skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishState>,
    /// Set when the post is not live; only ever true inside a preview index.
    #[serde(rename = "Draft")]
    pub draft: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostView {
    pub(crate) fn new(
        table_key: String,
        record: RawRecord,
        authors: Vec<String>,
        draft: bool,
    ) -> Self {
        let RawRecord {
            slug,
            page,
            authors: _,
            date,
            published,
            extra,
        } = record;

        Self {
            slug: slug.unwrap_or(table_key),
            page,
            authors,
            date,
            published,
            draft,
            extra,
        }
    }
}

/// The materialized post list for one viewing mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostIndex {
    preview: bool,
    posts: Vec<PostView>,
}

impl PostIndex {
    pub(crate) fn new(preview: bool, posts: Vec<PostView>) -> Self {
        Self { preview, posts }
    }

    pub fn preview(&self) -> bool {
        self.preview
    }

    pub fn posts(&self) -> &[PostView] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
