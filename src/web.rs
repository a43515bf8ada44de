use std::{convert::Infallible, fs, net::SocketAddr, path::PathBuf};

use anyhow::Context;
use async_graphql::http::GraphiQLSource;
use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use tracing::{error, info, warn};
use warp::{
    filters::BoxedFilter,
    http::{header, HeaderValue, StatusCode},
    reply::{self, Response},
    Filter, Rejection, Reply,
};

use crate::{
    api::Schema,
    dataset::{self, Export, Storage},
    session::{SessionId, SessionStore},
};

const SESSION_COOKIE: &str = "sid";
const GRAPHQL_PATH: &str = "graphql";

/// Runs the server until the process is stopped. Serves HTTPS when `tls`
/// holds a certificate and key path.
pub(crate) async fn serve(
    schema: Schema,
    store: SessionStore,
    storage: Storage,
    addr: SocketAddr,
    tls: Option<(PathBuf, PathBuf)>,
) {
    let routes = routes(schema, store, storage);
    match tls {
        Some((cert, key)) => {
            info!("Listening on https://{addr}");
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .run(addr)
                .await;
        }
        None => {
            info!("Listening on http://{addr}");
            warp::serve(routes).run(addr).await;
        }
    }
}

pub(crate) fn routes(
    schema: Schema,
    store: SessionStore,
    storage: Storage,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let graphql = warp::path(GRAPHQL_PATH)
        .and(warp::path::end())
        .and(session_id())
        .and(async_graphql_warp::graphql(schema))
        .then(
            |(id, fresh): (SessionId, bool), (schema, request): (Schema, async_graphql::Request)| async move {
                let response = schema.execute(request.data(id.clone())).await;
                with_session_cookie(GraphQLResponse::from(response), &id, fresh)
            },
        );

    let graphiql = warp::path::end().and(warp::get()).map(|| {
        reply::html(GraphiQLSource::build().endpoint(&format!("/{GRAPHQL_PATH}")).finish())
    });

    let download = download_route("download", Export::Modified, store.clone(), storage.clone());
    let download_added = download_route("download_added", Export::Added, store, storage);

    graphql
        .or(graphiql)
        .or(download)
        .or(download_added)
        .recover(recover)
}

/// The caller's session id from the `sid` cookie, or a new one when the
/// cookie is missing or malformed. The flag is set when the id was minted
/// for this request.
fn session_id() -> BoxedFilter<((SessionId, bool),)> {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .map(|sid: Option<String>| {
            match sid.as_deref().and_then(SessionId::parse) {
                Some(id) => (id, false),
                None => (SessionId::generate(), true),
            }
        })
        .boxed()
}

fn with_session_cookie(reply: impl Reply, id: &SessionId, fresh: bool) -> Response {
    let mut response = reply.into_response();
    if fresh {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Cannot set session cookie: {e}"),
        }
    }
    response
}

fn download_route(
    path: &'static str,
    export: Export,
    store: SessionStore,
    storage: Storage,
) -> BoxedFilter<(Response,)> {
    warp::path(path)
        .and(warp::path::end())
        .and(warp::get())
        .and(session_id())
        .then(move |(id, fresh): (SessionId, bool)| {
            let store = store.clone();
            let storage = storage.clone();
            async move {
                let reply = download(&store, &storage, &id, export).await;
                with_session_cookie(reply, &id, fresh)
            }
        })
        .boxed()
}

/// Serves one export of the session's dataset as an attachment.
///
/// Exports live under a directory named after the session, so a client only
/// ever gets files its own session wrote. The modified export is written
/// fresh from the working set on every request; the added log is served as
/// it stands.
async fn download(
    store: &SessionStore,
    storage: &Storage,
    id: &SessionId,
    export: Export,
) -> Response {
    let no_dataset = || {
        warn!("No file selected for download");
        notice(StatusCode::CONFLICT, "No dataset loaded. Please load a .tsv file first")
    };
    let Some(session) = store.get(id).await else {
        return no_dataset();
    };
    let session = session.lock().await;
    let Ok(dataset) = session.dataset() else {
        return no_dataset();
    };

    let content = match export {
        Export::Modified => {
            if dataset.records.is_empty() {
                warn!("No data available for download");
                return notice(StatusCode::CONFLICT, "No data to download");
            }
            storage
                .export_path(export, id, &dataset.file_name)
                .and_then(|(name, path)| {
                    dataset::save(&path, &dataset.records).map(|c| (name, c.into_bytes()))
                })
        }
        Export::Added => {
            if !session.has_added_data() {
                warn!("No added data in session {id}");
                return notice(StatusCode::NOT_FOUND, "No added data available to download");
            }
            storage
                .export_path(export, id, &dataset.file_name)
                .and_then(|(name, path)| {
                    let content = fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Ok((name, content))
                })
        }
    };

    match content {
        Ok((name, content)) => {
            info!("Serving download file: {name}");
            attachment(&name, content)
        }
        Err(e) => {
            error!("Failed to export {}: {e:#}", dataset.file_name);
            notice(StatusCode::INTERNAL_SERVER_ERROR, "Failed to prepare the download")
        }
    }
}

fn attachment(name: &str, content: Vec<u8>) -> Response {
    let reply = reply::with_header(
        content,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename={name}"),
    );
    reply::with_header(reply, header::CONTENT_TYPE, "text/tab-separated-values").into_response()
}

fn notice(status: StatusCode, message: &str) -> Response {
    reply::with_status(message.to_string(), status).into_response()
}

async fn recover(err: Rejection) -> Result<Response, Infallible> {
    if let Some(GraphQLBadRequest(err)) = err.find() {
        return Ok(notice(StatusCode::BAD_REQUEST, &err.to_string()));
    }
    if err.is_not_found() {
        return Ok(notice(StatusCode::NOT_FOUND, "Not found"));
    }
    warn!("Unhandled rejection: {err:?}");
    Ok(notice(StatusCode::BAD_REQUEST, "Bad request"))
}
