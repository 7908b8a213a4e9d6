use std::collections::{HashMap, HashSet};

use async_graphql::Context;
use tracing::debug;

use crate::datamodel::{Author, Book, Store};

use super::dataloader::{BatchFuture, BatchLoader, DataLoader};

pub(crate) trait Loaders {
    async fn load_author(&self, id: i32) -> async_graphql::Result<Option<Author>>;
    async fn load_books_by_author(&self, author_id: i32) -> async_graphql::Result<Vec<Book>>;

    /// Forgets cached relationships after a mutation changed the store.
    fn invalidate_loaders(&self);
}

impl Loaders for Context<'_> {
    async fn load_author(&self, id: i32) -> async_graphql::Result<Option<Author>> {
        let loader = self.data::<DataLoader<LoadAuthors>>()?;
        Ok(loader.load(id).await)
    }

    async fn load_books_by_author(&self, author_id: i32) -> async_graphql::Result<Vec<Book>> {
        let loader = self.data::<DataLoader<LoadBooks>>()?;
        Ok(loader.load(author_id).await)
    }

    fn invalidate_loaders(&self) {
        if let Some(loader) = self.data_opt::<DataLoader<LoadAuthors>>() {
            loader.clear();
        }
        if let Some(loader) = self.data_opt::<DataLoader<LoadBooks>>() {
            loader.clear();
        }
    }
}

/// Resolves authors by id.
pub struct LoadAuthors {
    store: Store,
}

impl LoadAuthors {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl BatchLoader for LoadAuthors {
    type K = i32;
    type V = Option<Author>;

    fn load_batch(&mut self, keys: Vec<i32>) -> BatchFuture<i32, Option<Author>> {
        debug!(?keys, "resolving authors");

        let library = self.store.read();
        let authors: HashMap<_, _> = keys
            .into_iter()
            .map(|id| (id, library.find_author(id).cloned()))
            .collect();

        Box::pin(async move { authors })
    }
}

/// Resolves the books written by each author id, in insertion order.
pub struct LoadBooks {
    store: Store,
}

impl LoadBooks {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl BatchLoader for LoadBooks {
    type K = i32;
    type V = Vec<Book>;

    fn load_batch(&mut self, keys: Vec<i32>) -> BatchFuture<i32, Vec<Book>> {
        debug!(?keys, "resolving books by author");

        let wanted: HashSet<_> = keys.into_iter().collect();
        let mut books: HashMap<_, Vec<Book>> = HashMap::with_capacity(wanted.len());
        for book in self.store.read().books() {
            if wanted.contains(&book.author_id) {
                books.entry(book.author_id).or_default().push(book.clone());
            }
        }

        Box::pin(async move { books })
    }
}
