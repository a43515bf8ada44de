use async_graphql::{Context, Object, Result, SimpleObject};
use tracing::{error, info};

use crate::{
    api::current_session,
    dataset::{self, Storage},
    session::{Session, SessionId, SessionStore},
    view::sort::SortColumn,
};

/// What the client's session currently holds.
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub(super) struct SessionInfo {
    loaded: bool,
    file_name: Option<String>,
    /// Rows in the working set, including added ones.
    total_rows: usize,
    /// Whether a record was added since the last load.
    has_added_data: bool,
    sort_column: Option<SortColumn>,
    sort_descending: bool,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        let sort = session.sort_state();
        let (file_name, total_rows) = match session.dataset() {
            Ok(dataset) => (Some(dataset.file_name.clone()), dataset.records.len()),
            Err(_) => (None, 0),
        };
        Self {
            loaded: file_name.is_some(),
            file_name,
            total_rows,
            has_added_data: session.has_added_data(),
            sort_column: sort.active(),
            sort_descending: sort.active().is_some() && sort.is_reverse(),
        }
    }
}

#[derive(Default)]
pub(super) struct DatasetQuery;

#[Object]
impl DatasetQuery {
    /// The `.tsv` files available for loading, sorted by name.
    async fn files(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        let storage = ctx.data::<Storage>()?;
        Ok(storage.files()?)
    }

    async fn session(&self, ctx: &Context<'_>) -> Result<SessionInfo> {
        let session = current_session(ctx).await?;
        let session = session.lock().await;
        Ok(SessionInfo::from(&*session))
    }
}

#[derive(Default)]
pub(super) struct DatasetMutation;

#[Object]
impl DatasetMutation {
    /// Replaces the session's working set with the contents of `name` and
    /// starts a fresh added log for it.
    ///
    /// On failure the session keeps whatever it held before.
    async fn load_file(&self, ctx: &Context<'_>, name: String) -> Result<SessionInfo> {
        let storage = ctx.data::<Storage>()?;
        let store = ctx.data::<SessionStore>()?;
        let id = ctx.data::<SessionId>()?;
        let records = storage
            .source(&name)
            .and_then(|path| dataset::load(&path))
            .and_then(|records| storage.clear_added(id, &name).map(|()| records))
            .map_err(|e| {
                error!("Failed to load {name}: {e:#}");
                async_graphql::Error::new(format!("Failed to load file: {e:#}"))
            })?;

        let session = store.get_or_create(id).await;
        let mut session = session.lock().await;
        session.load(name, records);
        info!("Session now holds {} rows", session.dataset()?.records.len());
        Ok(SessionInfo::from(&*session))
    }
}
