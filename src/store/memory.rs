//! In-memory resource store.

use std::collections::HashMap;
use std::io::Cursor;

use axum::body::Bytes;
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;

use crate::store::{Resource, ResourceStore, StoreError};

/// A fixed bundle of named byte buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Bytes>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceStore for MemoryStore {
    fn open<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Resource, StoreError>> {
        let result = match self.files.get(name) {
            // Bytes clones share the buffer.
            Some(content) => Ok(Resource::new(
                name,
                content.len() as u64,
                Cursor::new(content.clone()),
            )),
            None => Err(StoreError::NotFound {
                path: name.to_string(),
            }),
        };
        future::ready(result).boxed()
    }
}
