use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::error::{BookshelfError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub author_id: i32,
}

pub struct SeedAuthor {
    pub name: &'static str,
}

pub struct SeedBook {
    pub name: &'static str,
    pub author_id: i32,
}

pub static SEED_AUTHORS: &[SeedAuthor] = &[
    SeedAuthor {
        name: "J. K. Rowling",
    },
    SeedAuthor {
        name: "J. R. R. Tolkien",
    },
    SeedAuthor {
        name: "Brent Weeks",
    },
];

pub static SEED_BOOKS: &[SeedBook] = &[
    SeedBook {
        name: "Harry Potter and the Chamber of Secrets",
        author_id: 1,
    },
    SeedBook {
        name: "Harry Potter and the Prisoner of Azkaban",
        author_id: 1,
    },
    SeedBook {
        name: "Harry Potter and the Goblet of Fire",
        author_id: 1,
    },
    SeedBook {
        name: "Lord of The Rings: The Fellowship of the Ring",
        author_id: 2,
    },
    SeedBook {
        name: "Lord of The Rings: The Two Towers",
        author_id: 2,
    },
    SeedBook {
        name: "Lord of The Rings: The Return of the King",
        author_id: 2,
    },
    SeedBook {
        name: "The Way of Shadows",
        author_id: 3,
    },
    SeedBook {
        name: "Beyond the Shadows",
        author_id: 3,
    },
];

/// The two append-only collections.
///
/// Ids come from a per-collection counter rather than the collection length,
/// so they stay unique even if records were ever removed. The last id handed
/// out is `i32::MAX - 1`; appends after that fail.
#[derive(Debug)]
pub struct Library {
    authors: Vec<Author>,
    books: Vec<Book>,
    next_author_id: i32,
    next_book_id: i32,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            authors: Vec::new(),
            books: Vec::new(),
            next_author_id: 1,
            next_book_id: 1,
        }
    }
}

impl Library {
    pub fn seeded() -> Self {
        let authors: Vec<_> = (1..)
            .zip(SEED_AUTHORS)
            .map(|(id, seed)| Author {
                id,
                name: seed.name.into(),
            })
            .collect();
        let books: Vec<_> = (1..)
            .zip(SEED_BOOKS)
            .map(|(id, seed)| Book {
                id,
                name: seed.name.into(),
                author_id: seed.author_id,
            })
            .collect();

        Self {
            next_author_id: authors.last().map_or(1, |a| a.id + 1),
            next_book_id: books.last().map_or(1, |b| b.id + 1),
            authors,
            books,
        }
    }

    pub fn append_author(&mut self, name: String) -> Result<Author> {
        let id = self.next_author_id;
        self.next_author_id = id
            .checked_add(1)
            .ok_or(BookshelfError::IdsExhausted("author"))?;

        let author = Author { id, name };
        self.authors.push(author.clone());
        Ok(author)
    }

    /// Appends a book without checking that `author_id` refers to an existing
    /// author. Such books simply resolve `author` to nothing.
    pub fn append_book(&mut self, name: String, author_id: i32) -> Result<Book> {
        let id = self.next_book_id;
        self.next_book_id = id
            .checked_add(1)
            .ok_or(BookshelfError::IdsExhausted("book"))?;

        let book = Book {
            id,
            name,
            author_id,
        };
        self.books.push(book.clone());
        Ok(book)
    }

    pub fn find_author(&self, id: i32) -> Option<&Author> {
        self.authors.iter().find(|author| author.id == id)
    }

    pub fn find_book(&self, id: i32) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }
}

/// Shared handle to a [`Library`], handed to the schema and the loaders.
#[derive(Clone, Debug, Default)]
pub struct Store {
    inner: Arc<RwLock<Library>>,
}

impl Store {
    pub fn new(library: Library) -> Self {
        Self {
            inner: Arc::new(RwLock::new(library)),
        }
    }

    pub fn seeded() -> Self {
        Self::new(Library::seeded())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Library> {
        self.inner.read()
    }

    pub fn append_author(&self, name: String) -> Result<Author> {
        let author = self.inner.write().append_author(name)?;
        debug!(id = author.id, name = %author.name, "added author");
        Ok(author)
    }

    pub fn append_book(&self, name: String, author_id: i32) -> Result<Book> {
        let mut library = self.inner.write();
        if library.find_author(author_id).is_none() {
            warn!(author_id, "adding book for an author that does not exist");
        }
        let book = library.append_book(name, author_id)?;
        debug!(id = book.id, author_id, name = %book.name, "added book");
        Ok(book)
    }

    pub fn find_author(&self, id: i32) -> Option<Author> {
        self.read().find_author(id).cloned()
    }

    pub fn find_book(&self, id: i32) -> Option<Book> {
        self.read().find_book(id).cloned()
    }

    pub fn list_authors(&self) -> Vec<Author> {
        self.read().authors().to_vec()
    }

    pub fn list_books(&self) -> Vec<Book> {
        self.read().books().to_vec()
    }
}
