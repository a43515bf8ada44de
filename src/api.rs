mod chart;
mod dataset;
mod record;

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, InputValueResult, MergedObject, Result, Scalar, ScalarType, Value,
};
use tokio::sync::Mutex;

use crate::{
    dataset::Storage,
    session::{Session, SessionId, SessionStore},
};

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(
    chart::ChartQuery,
    dataset::DatasetQuery,
    record::RecordQuery,
);

/// A set of mutations defined in the schema.
#[derive(Default, MergedObject)]
pub(crate) struct Mutation(dataset::DatasetMutation, record::RecordMutation);

pub(crate) type Schema = async_graphql::Schema<Query, Mutation, EmptySubscription>;

pub(crate) fn schema(store: SessionStore, storage: Storage) -> Schema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(store)
        .data(storage)
        .finish()
}

/// A page number or page size.
///
/// Accepts an integer or a numeric string. Anything else reads as absent, so
/// a malformed value falls back to the default instead of failing the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PageParam(Option<i64>);

#[Scalar]
impl ScalarType for PageParam {
    fn parse(value: Value) -> InputValueResult<Self> {
        Ok(PageParam(match &value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }))
    }

    fn to_value(&self) -> Value {
        self.0.map_or(Value::Null, |n| Value::Number(n.into()))
    }
}

impl PageParam {
    fn get(param: Option<Self>) -> Option<i64> {
        param.and_then(|p| p.0)
    }
}

/// The session of the client making the request. A client the store does
/// not know gets an empty session that is not kept.
async fn current_session(ctx: &Context<'_>) -> Result<Arc<Mutex<Session>>> {
    let store = ctx.data::<SessionStore>()?;
    let id = ctx.data::<SessionId>()?;
    Ok(store.get(id).await.unwrap_or_default())
}

#[cfg(test)]
const TEST_SESSION: &str = "test-session";

#[cfg(test)]
struct TestSchema {
    dir: tempfile::TempDir, // keeps the data directories alive while the test runs
    store: SessionStore,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(
            dir.path().join("data"),
            dir.path().join("modified"),
            dir.path().join("added"),
        )
        .unwrap();
        let store = SessionStore::default();
        let schema = schema(store.clone(), storage);
        Self { dir, store, schema }
    }

    /// Writes a dataset file into the data directory.
    fn add_file(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join("data").join(name), content).unwrap();
    }

    fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        self.execute_as(TEST_SESSION, query).await
    }

    async fn execute_as(&self, session: &str, query: &str) -> async_graphql::Response {
        let request = async_graphql::Request::new(query).data(SessionId::new(session));
        self.schema.execute(request).await
    }

    /// Loads `content` as `name` into the test session.
    async fn load(&self, name: &str, content: &str) {
        self.add_file(name, content);
        let query = format!(r#"mutation {{ loadFile(name: "{name}") {{ loaded }} }}"#);
        let res = self.execute(&query).await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
    }
}

#[cfg(test)]
const SAMPLE_TSV: &str = "[{\"text\": \"query1\"}]\t{\"segment\": \"regular\", \"question_intent\": \"intent1\", \"sub_intent\": \"sub1\"}\n\
    [{\"text\": \"query2\"}]\t{\"segment\": \"premium\", \"question_intent\": \"intent2\", \"sub_intent\": \"sub2\"}\n";
