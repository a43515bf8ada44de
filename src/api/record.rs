use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use tracing::{error, info};

use crate::{
    api::{current_session, PageParam},
    dataset::{self, Export, Storage},
    form::{FieldSet, Form, METADATA_PREFIX, QUERY_PREFIX},
    session::SessionId,
    view::{Filter, PageInfo, PageRequest, Row, SortIndicator, TableQuery},
};

#[derive(InputObject, Debug, Default)]
pub(super) struct RecordFilter {
    /// Case-insensitive substring of the question intent.
    question_intent: Option<String>,
    /// Case-insensitive substring of the sub intent.
    sub_intent: Option<String>,
    /// Case-insensitive substring of the segment.
    segment: Option<String>,
}

impl From<&RecordFilter> for Filter {
    fn from(filter: &RecordFilter) -> Self {
        Filter::new(
            filter.question_intent.as_deref(),
            filter.sub_intent.as_deref(),
            filter.segment.as_deref(),
        )
    }
}

#[derive(SimpleObject, Debug)]
pub(super) struct RecordPage {
    rows: Vec<Row>,
    page_info: PageInfo,
    /// Rows in the whole working set, before filtering.
    dataset_rows: usize,
    summary: String,
    sort_indicators: Vec<SortIndicator>,
}

/// One input of an edit or add form.
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub(super) struct FormField {
    /// The key to submit the value under.
    key: String,
    field: String,
    value: String,
}

#[derive(SimpleObject, Debug)]
pub(super) struct RecordForm {
    /// The record the form edits; absent for a new record.
    index: Option<usize>,
    query_fields: Vec<FormField>,
    metadata_fields: Vec<FormField>,
}

impl RecordForm {
    fn new(
        index: Option<usize>,
        query: Vec<(String, String)>,
        metadata: Vec<(String, String)>,
    ) -> Self {
        Self {
            index,
            query_fields: form_fields(QUERY_PREFIX, query),
            metadata_fields: form_fields(METADATA_PREFIX, metadata),
        }
    }
}

fn form_fields(prefix: &str, values: Vec<(String, String)>) -> Vec<FormField> {
    values
        .into_iter()
        .map(|(field, value)| FormField {
            key: format!("{prefix}_{field}"),
            field,
            value,
        })
        .collect()
}

#[derive(InputObject, Debug)]
pub(super) struct FormEntry {
    key: String,
    value: String,
}

fn submitted(entries: Vec<FormEntry>) -> Form {
    Form::new(entries.into_iter().map(|e| (e.key, e.value)))
}

#[derive(Default)]
pub(super) struct RecordQuery;

#[Object]
impl RecordQuery {
    /// One page of the filtered, sorted working set.
    ///
    /// Naming the column the table is already sorted by flips its
    /// direction; leaving `sort` out, or naming anything that is not a
    /// sortable column, serves the current order.
    async fn records(
        &self,
        ctx: &Context<'_>,
        filter: Option<RecordFilter>,
        sort: Option<String>,
        page: Option<PageParam>,
        per_page: Option<PageParam>,
    ) -> Result<RecordPage> {
        let query = TableQuery {
            filter: filter.as_ref().map(Filter::from).unwrap_or_default(),
            sort,
            page: PageRequest::new(PageParam::get(page), PageParam::get(per_page)),
        };
        let session = current_session(ctx).await?;
        let table = session.lock().await.table(&query)?;
        Ok(RecordPage {
            summary: table.info.summary(),
            rows: table.rows,
            page_info: table.info,
            dataset_rows: table.total_rows,
            sort_indicators: table.sort_indicators,
        })
    }

    /// The edit form of the record at `index`, prefilled.
    async fn record_form(&self, ctx: &Context<'_>, index: usize) -> Result<RecordForm> {
        let session = current_session(ctx).await?;
        let session = session.lock().await;
        let record = session.record(index)?;
        let (query, metadata) = session.fields()?.values(record);
        Ok(RecordForm::new(Some(index), query, metadata))
    }

    /// A blank form with every field seen in the working set.
    async fn new_record_form(&self, ctx: &Context<'_>) -> Result<RecordForm> {
        let session = current_session(ctx).await?;
        let session = session.lock().await;
        let FieldSet { query, metadata } = session.fields()?;
        let blank = |fields: Vec<String>| -> Vec<(String, String)> {
            fields.into_iter().map(|f| (f, String::new())).collect()
        };
        Ok(RecordForm::new(None, blank(query), blank(metadata)))
    }
}

#[derive(Default)]
pub(super) struct RecordMutation;

#[Object]
impl RecordMutation {
    async fn edit_record(
        &self,
        ctx: &Context<'_>,
        index: usize,
        form: Vec<FormEntry>,
    ) -> Result<Row> {
        let session = current_session(ctx).await?;
        let row = session.lock().await.edit(index, &submitted(form))?;
        Ok(row)
    }

    /// Appends a record to the working set and to the added log of the
    /// loaded file.
    async fn add_record(&self, ctx: &Context<'_>, form: Vec<FormEntry>) -> Result<Row> {
        let storage = ctx.data::<Storage>()?;
        let id = ctx.data::<SessionId>()?;
        let session = current_session(ctx).await?;
        let mut session = session.lock().await;

        let record = session.new_record(&submitted(form))?;
        let (name, path) =
            storage.export_path(Export::Added, id, &session.dataset()?.file_name)?;
        dataset::append(&path, &record).map_err(|e| {
            error!("Failed to append to {name}: {e:#}");
            async_graphql::Error::new(format!("Failed to save added record: {e:#}"))
        })?;
        info!("Appended new data point to {name}");
        Ok(session.push(record)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::api::{TestSchema, SAMPLE_TSV};

    const ROWS: &str = "rows { index row text segment questionIntent subIntent }";

    fn many_rows(n: usize) -> String {
        (0..n)
            .map(|i| {
                let intent = if i % 3 == 0 { "billing" } else { "shipping" };
                format!(
                    "[{{\"text\": \"q{i}\"}}]\t{{\"segment\": \"regular\", \"question_intent\": \"{intent}\", \"sub_intent\": \"s{i:02}\"}}\n"
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn records_need_a_dataset() {
        let schema = TestSchema::new();
        let res = schema.execute("{ records { datasetRows } }").await;
        assert!(res.errors[0].message.contains("No dataset loaded"));
    }

    #[tokio::test]
    async fn records_first_page() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let query = format!("{{ records {{ {ROWS} datasetRows summary }} }}");
        let res = schema.execute(&query).await;
        assert_eq!(
            res.data.to_string(),
            "{records: {rows: [\
             {index: 0, row: 0, text: \"query1\", segment: \"regular\", questionIntent: \"intent1\", subIntent: \"sub1\"}, \
             {index: 1, row: 1, text: \"query2\", segment: \"premium\", questionIntent: \"intent2\", subIntent: \"sub2\"}], \
             datasetRows: 2, summary: \"1-2 of 2 rows\"}}"
        );
    }

    #[tokio::test]
    async fn records_filtered() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute(
                r#"{ records(filter: { segment: "PREM" }) {
                    rows { index text }
                    pageInfo { totalRows totalPages }
                    datasetRows
                } }"#,
            )
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{index: 1, text: "query2"}], pageInfo: {totalRows: 1, totalPages: 1}, datasetRows: 2}}"#
        );
    }

    #[tokio::test]
    async fn records_sort_toggles() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let query = r#"{ records(sort: "question_intent") {
            rows { text }
            sortIndicators { column indicator }
        } }"#;

        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "query1"}, {text: "query2"}], sortIndicators: [{column: QUESTION_INTENT, indicator: " ▲"}, {column: SUB_INTENT, indicator: ""}]}}"#
        );

        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "query2"}, {text: "query1"}], sortIndicators: [{column: QUESTION_INTENT, indicator: " ▼"}, {column: SUB_INTENT, indicator: ""}]}}"#
        );

        // Without a sort request the current order and indicators hold.
        let res = schema
            .execute("{ records(page: 1) { rows { text } sortIndicators { indicator } } }")
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "query2"}, {text: "query1"}], sortIndicators: [{indicator: " ▼"}, {indicator: ""}]}}"#
        );
    }

    #[tokio::test]
    async fn records_unknown_sort_is_ignored() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute(r#"{ records(sort: "text") { rows { text } sortIndicators { indicator } } }"#)
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "query1"}, {text: "query2"}], sortIndicators: [{indicator: ""}, {indicator: ""}]}}"#
        );
    }

    #[tokio::test]
    async fn records_paging_is_lenient() {
        let schema = TestSchema::new();
        schema.load("many.tsv", &many_rows(30)).await;

        let res = schema
            .execute(r#"{ records(page: "2", perPage: 25) { rows { text } pageInfo { page perPage startRow endRow } } }"#)
            .await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "q25"}, {text: "q26"}, {text: "q27"}, {text: "q28"}, {text: "q29"}], pageInfo: {page: 2, perPage: 25, startRow: 26, endRow: 30}}}"#
        );

        let res = schema
            .execute(r#"{ records(page: "abc", perPage: 7) { pageInfo { page perPage totalPages } } }"#)
            .await;
        assert_eq!(
            res.data.to_string(),
            "{records: {pageInfo: {page: 1, perPage: 10, totalPages: 3}}}"
        );

        let res = schema
            .execute("{ records(page: 99) { pageInfo { page } summary } }")
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {pageInfo: {page: 3}, summary: "21-30 of 30 rows"}}"#
        );
    }

    #[tokio::test]
    async fn rows_carry_dataset_positions() {
        let schema = TestSchema::new();
        schema.load("many.tsv", &many_rows(30)).await;
        let res = schema
            .execute(r#"{ records(filter: { questionIntent: "bill" }, page: 1) { rows { index row } } }"#)
            .await;
        let expected = (0..10)
            .map(|r| format!("{{index: {}, row: {r}}}", r * 3))
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(res.data.to_string(), format!("{{records: {{rows: [{expected}]}}}}"));
    }

    #[tokio::test]
    async fn record_form_is_prefilled() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute("{ recordForm(index: 1) { index queryFields { key value } metadataFields { field value } } }")
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{recordForm: {index: 1, queryFields: [{key: "query_text", value: "query2"}], metadataFields: [{field: "question_intent", value: "intent2"}, {field: "segment", value: "premium"}, {field: "sub_intent", value: "sub2"}]}}"#
        );

        let res = schema.execute("{ recordForm(index: 2) { index } }").await;
        assert!(res.errors[0].message.contains("Invalid data point: 2"));
    }

    #[tokio::test]
    async fn new_record_form_is_blank() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute("{ newRecordForm { index queryFields { key value } } }")
            .await;
        assert_eq!(
            res.data.to_string(),
            r#"{newRecordForm: {index: null, queryFields: [{key: "query_text", value: ""}]}}"#
        );
    }

    #[tokio::test]
    async fn edit_record() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute(
                r#"mutation { editRecord(index: 0, form: [
                    { key: "query_text", value: "updated_query" },
                    { key: "metadata_segment", value: "updated_segment" },
                    { key: "metadata_question_intent", value: "intent1" },
                    { key: "metadata_sub_intent", value: "sub1" }
                ]) { index row text segment } }"#,
            )
            .await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
        assert_eq!(
            res.data.to_string(),
            r#"{editRecord: {index: 0, row: null, text: "updated_query", segment: "updated_segment"}}"#
        );

        let res = schema.execute("{ records { rows { text segment } } }").await;
        assert_eq!(
            res.data.to_string(),
            r#"{records: {rows: [{text: "updated_query", segment: "updated_segment"}, {text: "query2", segment: "premium"}]}}"#
        );
    }

    #[tokio::test]
    async fn edit_record_out_of_range() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute(r#"mutation { editRecord(index: 7, form: []) { index } }"#)
            .await;
        assert!(res.errors[0].message.contains("Invalid data point: 7"));
    }

    #[tokio::test]
    async fn add_record_appends_and_logs() {
        let schema = TestSchema::new();
        schema.load("test.tsv", SAMPLE_TSV).await;
        let res = schema
            .execute(
                r#"mutation { addRecord(form: [
                    { key: "query_text", value: "new_query" },
                    { key: "metadata_segment", value: "new_segment" },
                    { key: "metadata_question_intent", value: "new_intent" },
                    { key: "metadata_sub_intent", value: "new_sub_intent" }
                ]) { index text } }"#,
            )
            .await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
        assert_eq!(
            res.data.to_string(),
            r#"{addRecord: {index: 2, text: "new_query"}}"#
        );

        let res = schema
            .execute("{ session { totalRows hasAddedData } records { datasetRows } }")
            .await;
        assert_eq!(
            res.data.to_string(),
            "{session: {totalRows: 3, hasAddedData: true}, records: {datasetRows: 3}}"
        );

        let log = fs::read_to_string(schema.path("added/test-session/test_added.tsv")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("new_query"));
        assert!(log.contains("new_segment"));
    }

    #[tokio::test]
    async fn add_record_needs_a_dataset() {
        let schema = TestSchema::new();
        let res = schema
            .execute(r#"mutation { addRecord(form: []) { index } }"#)
            .await;
        assert!(res.errors[0].message.contains("No dataset loaded"));
        assert!(!schema.path("added/test-session/test_added.tsv").exists());
    }
}
