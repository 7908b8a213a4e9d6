use std::collections::HashMap;
use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use async_graphql::parser::parse_query;
use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::header::{ACCEPT, ALLOW};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Json, Router};
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::datamodel::Store;
use crate::error::{BookshelfError, Result};

mod dataloader;
mod loaders;
mod schema;

use dataloader::DataLoader;
use loaders::{LoadAuthors, LoadBooks};
pub use schema::{LibrarySchema, build_schema};

pub const GRAPHQL_PATH: &str = "/graphql";

/// The schema together with the store its relationship loaders read from.
#[derive(Clone)]
pub struct Api {
    schema: LibrarySchema,
    store: Store,
}

impl Api {
    pub fn new(store: Store) -> Self {
        Self {
            schema: build_schema(store.clone()),
            store,
        }
    }

    /// Executes one request with a fresh set of batching loaders.
    pub async fn execute(&self, req: impl Into<async_graphql::Request>) -> async_graphql::Response {
        let load_authors = DataLoader::new(LoadAuthors::new(self.store.clone()));
        let load_books = DataLoader::new(LoadBooks::new(self.store.clone()));
        let req: async_graphql::Request = req.into();
        let req = req.data(load_authors.clone()).data(load_books.clone());

        let execute = self.schema.execute(req);
        load_books.wrap(load_authors.wrap(execute)).await
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

/// Renders GraphiQL, pre-filled with `query` when the page was opened with one.
fn graphiql_page(query: Option<&str>) -> String {
    const PROPS_MARKER: &str = "defaultEditorToolsVisibility: true,";

    let page = GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish();
    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        return page;
    };
    let Ok(literal) = serde_json::to_string(query) else {
        return page;
    };

    // keep the query from closing the surrounding <script>
    let literal = literal.replace("</", "<\\/").replace("<!--", "<\\!--");
    page.replacen(
        PROPS_MARKER,
        &format!("{PROPS_MARKER}\n          query: {literal},"),
        1,
    )
}

/// Whether the operation `req` selects may run over GET. Only queries may;
/// documents that fail to parse are left for execution to report.
fn is_read_only(req: &async_graphql::Request) -> bool {
    let Ok(document) = parse_query(&req.query) else {
        return true;
    };

    let is_query = |ty: OperationType| ty == OperationType::Query;
    match (&document.operations, req.operation_name.as_deref()) {
        (DocumentOperations::Single(op), _) => is_query(op.node.ty),
        (DocumentOperations::Multiple(ops), Some(name)) => {
            ops.get(name).is_none_or(|op| is_query(op.node.ty))
        }
        (DocumentOperations::Multiple(ops), None) => ops.values().all(|op| is_query(op.node.ty)),
    }
}

/// Browsers get the GraphiQL explorer, everything else is a GraphQL GET request.
async fn graphql_get(State(api): State<Api>, headers: HeaderMap, req: Request) -> Response {
    if accepts_html(&headers) {
        let params = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map(|Query(params)| params)
            .unwrap_or_default();
        return Html(graphiql_page(params.get("query").map(String::as_str))).into_response();
    }

    let req = match <GraphQLRequest as FromRequest<Api>>::from_request(req, &api).await {
        Ok(req) => req.into_inner(),
        Err(rejection) => return rejection.into_response(),
    };

    if !is_read_only(&req) {
        debug!(operation = ?req.operation_name, "refusing mutation over GET");
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(ALLOW, "POST")],
            Json(serde_json::json!({
                "errors": [{ "message": "Can only perform a mutation operation from a POST request." }]
            })),
        )
            .into_response();
    }

    GraphQLResponse::from(api.execute(req).await).into_response()
}

#[axum::debug_handler]
async fn graphql_handler(State(api): State<Api>, req: GraphQLRequest) -> GraphQLResponse {
    api.execute(req.into_inner()).await.into()
}

pub fn make_app(store: Store) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(graphql_get).post(graphql_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Api::new(store))
}

pub async fn serve(addr: SocketAddr, store: Store) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| BookshelfError::Bind { addr, source })?;

    info!("*** Server is running on http://{addr}{GRAPHQL_PATH} ***");
    axum::serve(listener, make_app(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
