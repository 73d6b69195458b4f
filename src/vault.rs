//! Storage adapter for the remote Vault document store.
//!
//! The sole translation layer between the typed domain records and the
//! store's schema-flexible collections, addressed by ledger name plus
//! collection name. The static API key is installed on the HTTP client once
//! at construction and rides along on every outbound call. No retries are
//! performed anywhere; a failed call surfaces immediately.

use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::VaultConfig;
use crate::error::LedgerError;
use crate::models::{AccountRecord, DocumentRecord, TransactionRecord};

/// A search/count filter: a conjunction of field comparisons. Only equality
/// is issued today; further predicates slot into the same shape.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub expressions: Vec<QueryExpression>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExpression {
    pub field_comparisons: Vec<FieldComparison>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldComparison {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum ComparisonOperator {
    #[serde(rename = "EQ")]
    Eq,
}

impl Query {
    /// Conjunction of all given comparisons.
    pub fn all(comparisons: Vec<FieldComparison>) -> Self {
        Query {
            expressions: vec![QueryExpression {
                field_comparisons: comparisons,
            }],
        }
    }
}

impl FieldComparison {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        FieldComparison {
            field: field.to_string(),
            operator: ComparisonOperator::Eq,
            value: value.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    page: u32,
    per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a Query>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Deserialize)]
struct Revision {
    document: serde_json::Map<String, Value>,
}

#[derive(Serialize)]
struct CountRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a Query>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    document_id: String,
}

#[derive(Serialize)]
struct FieldDef<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    field_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexDef<'a> {
    fields: Vec<&'a str>,
    is_unique: bool,
}

#[derive(Serialize)]
struct CollectionCreateRequest<'a> {
    fields: Vec<FieldDef<'a>>,
    indexes: Vec<IndexDef<'a>>,
}

/// Stateless adapter over the remote store. Holds one HTTP client (with the
/// API key header baked in) and immutable configuration.
pub struct VaultStorage {
    client: reqwest::Client,
    config: VaultConfig,
}

impl VaultStorage {
    pub fn new(config: VaultConfig) -> Result<Self, LedgerError> {
        let mut api_key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| LedgerError::storage("build client", &config.ledger_name, e))?;
        api_key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert("X-API-Key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::storage("build client", &config.ledger_name, e))?;

        Ok(Self { client, config })
    }

    fn url(&self, collection: &str, suffix: &str) -> String {
        format!(
            "{}/ledger/{}/collection/{}{}",
            self.config.host.trim_end_matches('/'),
            self.config.ledger_name,
            collection,
            suffix
        )
    }

    /// Unfiltered paginated search over the accounts collection plus a
    /// separate count with the same (empty) filter.
    ///
    /// The two requests are not atomic: under concurrent writes the returned
    /// total may not match the pages seen across repeated calls. The store
    /// offers no transaction spanning them; callers must not assume strict
    /// consistency between records and count.
    pub async fn list_accounts(
        &self,
        page_size: u32,
        page_number: u32,
    ) -> Result<(Vec<AccountRecord>, u64), LedgerError> {
        self.list_documents(&self.config.accounts_collection, page_size, page_number, None)
            .await
    }

    /// Paginated search scoped to one account, with the same weak
    /// list/count consistency as [`list_accounts`](Self::list_accounts).
    pub async fn list_transactions(
        &self,
        account_number: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let query = Query::all(vec![FieldComparison::eq("account_number", account_number)]);
        self.list_documents(
            &self.config.transactions_collection,
            page_size,
            page_number,
            Some(query),
        )
        .await
    }

    pub async fn add_account(&self, account: AccountRecord) -> Result<String, LedgerError> {
        self.add_document(&self.config.accounts_collection, &account)
            .await
    }

    pub async fn add_transaction(
        &self,
        transaction: TransactionRecord,
    ) -> Result<String, LedgerError> {
        self.add_document(&self.config.transactions_collection, &transaction)
            .await
    }

    /// Ensure both collections exist with their declared fields and indexes:
    /// unique on `number` for accounts, non-unique on `account_number` for
    /// transactions. "Already exists" is success; safe to call on every
    /// process start.
    pub async fn init_collections(&self) -> Result<(), LedgerError> {
        self.create_collection(
            &self.config.accounts_collection,
            CollectionCreateRequest {
                fields: vec![FieldDef {
                    name: "number",
                    field_type: "STRING",
                }],
                indexes: vec![IndexDef {
                    fields: vec!["number"],
                    is_unique: true,
                }],
            },
        )
        .await?;

        self.create_collection(
            &self.config.transactions_collection,
            CollectionCreateRequest {
                fields: vec![FieldDef {
                    name: "account_number",
                    field_type: "STRING",
                }],
                indexes: vec![IndexDef {
                    fields: vec!["account_number"],
                    is_unique: false,
                }],
            },
        )
        .await
    }

    /// Search + count + decode, written once for both record types. Fails
    /// the whole operation on any non-success status or decode error;
    /// partial results are never returned. Page size and number are opaque
    /// integers passed through to the store untouched.
    async fn list_documents<T: DocumentRecord>(
        &self,
        collection: &str,
        page_size: u32,
        page_number: u32,
        query: Option<Query>,
    ) -> Result<(Vec<T>, u64), LedgerError> {
        let response = self
            .client
            .post(self.url(collection, "/documents/search"))
            .json(&SearchRequest {
                page: page_number,
                per_page: page_size,
                query: query.as_ref(),
            })
            .send()
            .await
            .map_err(|e| LedgerError::storage("search", collection, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::storage(
                "search",
                collection,
                format!("{status} {body}"),
            ));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::storage("search", collection, e))?;

        let mut records = Vec::with_capacity(search.revisions.len());
        for revision in search.revisions {
            let mut document = revision.document;
            // surface the store-assigned `_id` as the record id
            if let Some(id) = document.get("_id").cloned() {
                document.insert("id".to_string(), id);
            }
            let record = serde_json::from_value(Value::Object(document))
                .map_err(|e| LedgerError::storage("decode document", collection, e))?;
            records.push(record);
        }

        // Separate count request with the same filter. Not atomic with the
        // search above.
        let response = self
            .client
            .post(self.url(collection, "/documents/count"))
            .json(&CountRequest {
                query: query.as_ref(),
            })
            .send()
            .await
            .map_err(|e| LedgerError::storage("count", collection, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::storage(
                "count",
                collection,
                format!("{status} {body}"),
            ));
        }

        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::storage("count", collection, e))?;

        Ok((records, count.count))
    }

    /// Validate, then issue a single create. The store assigns the document
    /// id; the record's own `id` is never sent.
    async fn add_document<T: DocumentRecord>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<String, LedgerError> {
        record.validate()?;

        let response = self
            .client
            .post(self.url(collection, "/document"))
            .json(record)
            .send()
            .await
            .map_err(|e| LedgerError::storage("create document", collection, e))?;

        match response.status() {
            StatusCode::OK => {
                let created: CreateResponse = response
                    .json()
                    .await
                    .map_err(|e| LedgerError::storage("create document", collection, e))?;
                Ok(created.document_id)
            }
            StatusCode::CONFLICT => Err(LedgerError::DuplicateKey),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(LedgerError::storage(
                    "create document",
                    collection,
                    format!("{status} {body}"),
                ))
            }
        }
    }

    async fn create_collection(
        &self,
        collection: &str,
        request: CollectionCreateRequest<'_>,
    ) -> Result<(), LedgerError> {
        let response = self
            .client
            .post(self.url(collection, ""))
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::storage("create collection", collection, e))?;

        match response.status() {
            // 409: the collection is already provisioned
            StatusCode::OK | StatusCode::CONFLICT => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(LedgerError::storage(
                    "create collection",
                    collection,
                    format!("{status} {body}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_query_serializes_to_store_shape() {
        let query = Query::all(vec![FieldComparison::eq("account_number", "ACC-1")]);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "expressions": [{
                    "fieldComparisons": [{
                        "field": "account_number",
                        "operator": "EQ",
                        "value": "ACC-1",
                    }]
                }]
            })
        );
    }

    #[test]
    fn search_request_omits_empty_query() {
        let body = serde_json::to_value(SearchRequest {
            page: 1,
            per_page: 10,
            query: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"page": 1, "perPage": 10}));
    }
}
