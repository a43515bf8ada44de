use std::{collections::HashMap, fmt, sync::Arc};

use anyhow::{anyhow, bail, Result};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    form::{FieldSet, Form},
    record::Record,
    view::{self, Row, SortState, TablePage, TableQuery},
};

const MAX_ID_LEN: usize = 64;

/// Identifies one client's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(String);

impl SessionId {
    #[cfg(test)]
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accepts an id sent back by a client. Ids name export directories, so
    /// only ASCII letters, digits, `-` and `_` are allowed.
    pub(crate) fn parse(id: &str) -> Option<Self> {
        let valid = !id.is_empty()
            && id.len() <= MAX_ID_LEN
            && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(id.to_string()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The records loaded from one file.
#[derive(Debug, Clone)]
pub(crate) struct Dataset {
    pub(crate) file_name: String,
    pub(crate) records: Vec<Record>,
}

/// Everything one client can change.
#[derive(Debug, Default)]
pub(crate) struct Session {
    dataset: Option<Dataset>,
    sort: SortState,
    has_added_data: bool,
}

impl Session {
    /// Replaces the working set and forgets the previous sort and additions.
    pub(crate) fn load(&mut self, file_name: String, records: Vec<Record>) {
        self.dataset = Some(Dataset { file_name, records });
        self.sort = SortState::default();
        self.has_added_data = false;
    }

    pub(crate) fn dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or_else(not_loaded)
    }

    fn dataset_mut(&mut self) -> Result<&mut Dataset> {
        self.dataset.as_mut().ok_or_else(not_loaded)
    }

    pub(crate) fn has_added_data(&self) -> bool {
        self.has_added_data
    }

    pub(crate) fn sort_state(&self) -> SortState {
        self.sort
    }

    pub(crate) fn table(&mut self, query: &TableQuery) -> Result<TablePage> {
        let dataset = self.dataset.as_ref().ok_or_else(not_loaded)?;
        Ok(view::table(&dataset.records, &mut self.sort, query))
    }

    pub(crate) fn record(&self, index: usize) -> Result<&Record> {
        self.dataset()?
            .records
            .get(index)
            .ok_or_else(|| anyhow!("Invalid data point: {index}"))
    }

    pub(crate) fn fields(&self) -> Result<FieldSet> {
        Ok(FieldSet::of(&self.dataset()?.records))
    }

    /// Replaces the first query mapping and the metadata of one record with
    /// the submitted form.
    pub(crate) fn edit(&mut self, index: usize, form: &Form) -> Result<Row> {
        let fields = self.fields()?;
        let dataset = self.dataset_mut()?;
        let Some(record) = dataset.records.get_mut(index) else {
            bail!("Invalid data point: {index}");
        };
        let edited = form.record(&fields);
        record.set_query_head(edited.query_head().cloned().unwrap_or_default());
        record.metadata = edited.metadata;
        info!("Data point {index} updated");
        Ok(Row::new(index, None, record))
    }

    /// Builds a new record from the submitted form without adding it.
    pub(crate) fn new_record(&self, form: &Form) -> Result<Record> {
        let dataset = self.dataset()?;
        if dataset.records.is_empty() {
            bail!("Please load a dataset with at least one record first");
        }
        Ok(form.record(&FieldSet::of(&dataset.records)))
    }

    /// Appends a record made by [`Session::new_record`].
    pub(crate) fn push(&mut self, record: Record) -> Result<Row> {
        let dataset = self.dataset_mut()?;
        let index = dataset.records.len();
        let row = Row::new(index, None, &record);
        dataset.records.push(record);
        self.has_added_data = true;
        debug!("New data point at {index}: {}", row.text);
        Ok(row)
    }
}

fn not_loaded() -> anyhow::Error {
    anyhow!("No dataset loaded. Please load a .tsv file first")
}

/// All live sessions, each behind its own lock.
///
/// A session is stored once it loads a dataset and lives until the process
/// exits; requests that only read never add one.
#[derive(Clone, Default)]
pub(crate) struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub(crate) async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Returns the session for `id`, creating an empty one on first use.
    pub(crate) async fn get_or_create(&self, id: &SessionId) -> Arc<Mutex<Session>> {
        if let Some(session) = self.get(id).await {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(id.clone()).or_insert_with(|| {
            info!("New session {id}");
            Arc::default()
        }))
    }
}
