use async_graphql::extensions::Tracing;
use async_graphql::{ComplexObject, Context, EmptySubscription, Object, Schema, SimpleObject};

use crate::datamodel::{self, Store};

use super::loaders::Loaders;

pub type LibrarySchema = Schema<RootQuery, RootMutation, EmptySubscription>;

pub fn build_schema(store: Store) -> LibrarySchema {
    Schema::build(RootQuery, RootMutation, EmptySubscription)
        .data(store)
        .extension(Tracing)
        .finish()
}

fn store<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Store> {
    ctx.data::<Store>()
}

/// This represents a book written by an author.
#[derive(SimpleObject)]
#[graphql(complex)]
pub struct Book {
    id: i32,
    name: String,
    author_id: i32,
}

impl From<datamodel::Book> for Book {
    fn from(book: datamodel::Book) -> Self {
        Self {
            id: book.id,
            name: book.name,
            author_id: book.author_id,
        }
    }
}

#[ComplexObject]
impl Book {
    async fn author(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Author>> {
        Ok(ctx.load_author(self.author_id).await?.map(Author::from))
    }
}

/// This represents a author of a book
#[derive(SimpleObject)]
#[graphql(complex)]
pub struct Author {
    id: i32,
    name: String,
}

impl From<datamodel::Author> for Author {
    fn from(author: datamodel::Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
        }
    }
}

#[ComplexObject]
impl Author {
    async fn books(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<Book>>> {
        let books = ctx.load_books_by_author(self.id).await?;
        Ok(Some(books.into_iter().map(Book::from).collect()))
    }
}

pub struct RootQuery;

/// Root Query
#[Object(name = "Query")]
impl RootQuery {
    /// A single book.
    async fn book(
        &self,
        ctx: &Context<'_>,
        id: Option<i32>,
    ) -> async_graphql::Result<Option<Book>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(store(ctx)?.find_book(id).map(Book::from))
    }

    /// List of all books.
    async fn books(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Book>> {
        let books = store(ctx)?.list_books();
        Ok(books.into_iter().map(Book::from).collect())
    }

    /// A single author.
    async fn author(
        &self,
        ctx: &Context<'_>,
        id: Option<i32>,
    ) -> async_graphql::Result<Option<Author>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(store(ctx)?.find_author(id).map(Author::from))
    }

    /// List of all authors.
    async fn authors(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Author>> {
        let authors = store(ctx)?.list_authors();
        Ok(authors.into_iter().map(Author::from).collect())
    }
}

pub struct RootMutation;

/// Root mutation.
#[Object(name = "Mutation")]
impl RootMutation {
    /// Add a new book.
    async fn add_book(
        &self,
        ctx: &Context<'_>,
        name: String,
        author_id: i32,
    ) -> async_graphql::Result<Option<Book>> {
        let book = store(ctx)?.append_book(name, author_id)?;
        ctx.invalidate_loaders();
        Ok(Some(book.into()))
    }

    /// Add a new author.
    async fn add_author(
        &self,
        ctx: &Context<'_>,
        name: String,
    ) -> async_graphql::Result<Option<Author>> {
        let author = store(ctx)?.append_author(name)?;
        ctx.invalidate_loaders();
        Ok(Some(author.into()))
    }
}
