use cynic::{MutationBuilder as _, QueryBuilder as _};
use pretty_assertions::assert_eq;

use crate::client::{
    AddAuthor, AddAuthorVariables, AddBook, AddBookVariables, AllAuthors, AllBooks, AuthorById,
    BookById, ByIdVariables, Client,
};
use crate::datamodel::Store;


fn start() -> (testserver::Server, Client) {
    let server = testserver::Server::start(Store::seeded());
    let client = server.client();
    (server, client)
}

#[tokio::test]
async fn test_seeded_authors() {
    let (_server, client) = start();

    let res = client.run(AllAuthors::build(())).await;
    assert!(res.errors.is_none(), "{:?}", res.errors);

    let authors = res.data.unwrap().authors;
    let ids: Vec<_> = authors.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(authors[0].name, "J. K. Rowling");
}

#[tokio::test]
async fn test_author_books_in_seed_order() {
    let (_server, client) = start();

    let res = client.run(AuthorById::build(ByIdVariables { id: Some(2) })).await;
    let author = res.data.unwrap().author.unwrap();

    let titles: Vec<_> = author
        .books
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(
        titles,
        vec![
            "Lord of The Rings: The Fellowship of the Ring",
            "Lord of The Rings: The Two Towers",
            "Lord of The Rings: The Return of the King",
        ]
    );
}

#[tokio::test]
async fn test_book_lookups() {
    let (_server, client) = start();

    let book = client
        .run(BookById::build(ByIdVariables { id: Some(7) }))
        .await
        .data
        .unwrap()
        .book
        .unwrap();
    assert_eq!(book.name, "The Way of Shadows");
    assert_eq!(book.author.unwrap().name, "Brent Weeks");

    let missing = client
        .run(BookById::build(ByIdVariables { id: Some(100) }))
        .await;
    assert!(missing.errors.is_none());
    assert!(missing.data.unwrap().book.is_none());

    let omitted = client.run(BookById::build(ByIdVariables { id: None })).await;
    assert!(omitted.errors.is_none());
    assert!(omitted.data.unwrap().book.is_none());
}

#[tokio::test]
async fn test_add_book() {
    let (_server, client) = start();

    let added = client
        .run(AddBook::build(AddBookVariables {
            name: "New Book".into(),
            author_id: 3,
        }))
        .await
        .data
        .unwrap()
        .add_book
        .unwrap();
    assert_eq!(added.id, 9);
    assert_eq!(added.name, "New Book");
    assert_eq!(added.author_id, 3);
    assert_eq!(added.author.unwrap().name, "Brent Weeks");

    let books = client.run(AllBooks::build(())).await.data.unwrap().books;
    assert_eq!(books.len(), 9);
    assert_eq!(books.last().map(|b| b.id), Some(9));
}

#[tokio::test]
async fn test_add_author_round_trip() {
    let (_server, client) = start();

    let added = client
        .run(AddAuthor::build(AddAuthorVariables {
            name: "New Author".into(),
        }))
        .await
        .data
        .unwrap()
        .add_author
        .unwrap();
    assert_eq!(added.id, 4);
    assert_eq!(added.name, "New Author");
    assert_eq!(added.books.map(|b| b.len()), Some(0));

    let fetched = client
        .run(AuthorById::build(ByIdVariables { id: Some(added.id) }))
        .await
        .data
        .unwrap()
        .author
        .unwrap();
    assert_eq!(fetched.name, "New Author");
}

#[tokio::test]
async fn test_get_request_executes_query() {
    let (server, _client) = start();

    let mut url = server.graphql_url();
    url.query_pairs_mut().append_pair("query", "{ books { id } }");

    let body: serde_json::Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["books"].as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn test_get_mutation_is_rejected() {
    let (server, client) = start();

    let mut url = server.graphql_url();
    url.query_pairs_mut()
        .append_pair("query", r#"mutation { addAuthor(name: "Via GET") { id } }"#);

    let res = reqwest::get(url).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[reqwest::header::ALLOW], "POST");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        body["errors"][0]["message"],
        "Can only perform a mutation operation from a POST request."
    );

    let authors = client.run(AllAuthors::build(())).await.data.unwrap().authors;
    assert_eq!(authors.len(), 3);
}

#[tokio::test]
async fn test_get_honours_operation_name() {
    let (server, client) = start();
    let document = r#"
        query Listing { books { id } }
        mutation Write { addAuthor(name: "Sneaky") { id } }
    "#;

    let get = |operation: &str| {
        let mut url = server.graphql_url();
        url.query_pairs_mut()
            .append_pair("query", document)
            .append_pair("operationName", operation);
        reqwest::get(url)
    };

    let res = get("Write").await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let res = get("Listing").await.unwrap();
    assert!(res.status().is_success());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["books"].as_array().map(Vec::len), Some(8));

    let authors = client.run(AllAuthors::build(())).await.data.unwrap().authors;
    assert_eq!(authors.len(), 3);
}

#[tokio::test]
async fn test_graphiql_prefills_query_from_url() {
    let (server, _client) = start();

    let mut url = server.graphql_url();
    url.query_pairs_mut()
        .append_pair("query", "{ books { id } }</script>");

    let html = reqwest::Client::new()
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(html.contains(r#"query: "{ books { id } }<\/script>","#), "{html}");
    assert!(!html.contains("{ books { id } }</script>"));
}

#[tokio::test]
async fn test_get_from_browser_serves_graphiql() {
    let (server, _client) = start();

    let res = reqwest::Client::new()
        .get(server.graphql_url())
        .header(reqwest::header::ACCEPT, "text/html")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let html = res.text().await.unwrap();
    assert!(html.to_lowercase().contains("graphiql"));
}
