//! Operations on CRM object data.
//!
//! Every operation resolves its endpoint from a [`Namespace`] and an
//! [`Action`], wraps its arguments in the `{"data": {...}}` envelope the
//! platform expects, and unwraps the typed result from the response. Records
//! themselves are returned as opaque JSON values.

use crate::{
    endpoint::{endpoint, field, Action, Namespace, DESCRIBE_ENDPOINT},
    Client, Error, Payload, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size used by [`Client::list_all_objects`].
pub const PAGE_SIZE: usize = 100;

/// Comparison applied by a [`QueryFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "EQ")]
    Eq,
    /// Not equal.
    #[serde(rename = "N")]
    NotEq,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NLIKE")]
    NotLike,
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "ISN")]
    IsNot,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NIN")]
    NotIn,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "NBETWEEN")]
    NotBetween,
    #[serde(rename = "STARTWITH")]
    StartWith,
    #[serde(rename = "ENDWITH")]
    EndWith,
    #[serde(rename = "CONTAINS")]
    Contains,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub operator: FilterOperator,
    pub field_name: String,
    pub field_values: Vec<Value>,
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrder {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "isAsc")]
    pub ascending: bool,
}

/// Describes which records a list call returns.
///
/// # Examples
///
/// ```
/// use fxiaoke::object::{FilterOperator, QueryDescriptor};
/// use fxiaoke::endpoint::field;
///
/// let query = QueryDescriptor::new(20, 0)
///     .filter(FilterOperator::Eq, field::LIFE_STATUS, ["normal"])
///     .order(field::LAST_MODIFIED_TIME, false)
///     .project([field::NAME, field::OWNER]);
///
/// assert_eq!(query.filters.len(), 1);
/// assert_eq!(query.field_projection, vec!["name", "owner"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub limit: usize,
    pub offset: usize,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    /// Fields to return. Empty returns every field.
    #[serde(
        rename = "fieldProjection",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub field_projection: Vec<String>,
    #[serde(default)]
    pub orders: Vec<QueryOrder>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self::new(PAGE_SIZE, 0)
    }
}

impl QueryDescriptor {
    /// Creates a descriptor with no filters, projection or ordering.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            filters: Vec::new(),
            field_projection: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Adds a filter condition.
    pub fn filter<V: Into<Value>>(
        mut self,
        operator: FilterOperator,
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(QueryFilter {
            operator,
            field_name: field_name.into(),
            field_values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Appends a sort key.
    pub fn order(mut self, field_name: impl Into<String>, ascending: bool) -> Self {
        self.orders.push(QueryOrder {
            field_name: field_name.into(),
            ascending,
        });
        self
    }

    /// Adds fields to the projection, skipping ones already present.
    pub fn project<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        for name in fields {
            let name = name.into();
            if !self.field_projection.contains(&name) {
                self.field_projection.push(name);
            }
        }
        self
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Number of records matching the query, across all pages.
    pub total: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(rename = "dataList", default)]
    pub data_list: Vec<Value>,
}

/// New owners for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOwnerData {
    #[serde(rename = "ownerId")]
    pub owner_ids: Vec<String>,
    #[serde(rename = "objectDataId")]
    pub object_id: String,
}

impl ChangeOwnerData {
    /// Assigns `owner_id` as the sole owner of `object_id`.
    pub fn new(object_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_ids: vec![owner_id.into()],
            object_id: object_id.into(),
        }
    }
}

fn envelope(inner: Payload) -> Payload {
    let mut outer = Payload::new();
    outer.insert_value("data", inner.into_value());
    outer
}

/// Extracts the `data` field of a successful response.
///
/// The platform sometimes sends the payload as a string of embedded JSON;
/// both forms are accepted. A missing `data` field yields `Value::Null`.
pub(crate) fn data_field(endpoint: &str, raw: &str) -> Result<Value> {
    let mut envelope: Value =
        serde_json::from_str(raw).map_err(|e| Error::decode(endpoint, raw, e))?;

    let data = envelope
        .as_object_mut()
        .and_then(|fields| fields.remove("data"))
        .unwrap_or(Value::Null);

    match data {
        Value::String(embedded) => serde_json::from_str(&embedded)
            .map_err(|e| Error::decode(endpoint, embedded.as_str(), e)),
        other => Ok(other),
    }
}

impl Client {
    /// Fetches a single page of records.
    ///
    /// `params` are merged into the inner `data` object, so flags such as
    /// [`param::TRIGGER_WORK_FLOW`](crate::endpoint::param::TRIGGER_WORK_FLOW)
    /// can be passed without changing the query.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Client::post`], or [`Error::Decode`] if the
    /// page does not have the expected shape.
    pub async fn list_objects(
        &self,
        namespace: Namespace,
        api_name: &str,
        query: &QueryDescriptor,
        params: Option<Payload>,
    ) -> Result<QueryResult> {
        let endpoint = endpoint(namespace, Action::Query);

        let mut inner = Payload::new();
        inner.insert(field::DATA_OBJECT_API_NAME, api_name)?;
        inner.insert("search_query_info", query)?;
        if let Some(params) = params {
            inner.merge(params);
        }

        let raw = self.post(endpoint, Some(envelope(inner)), true).await?;
        let data = data_field(endpoint, &raw)?;
        serde_json::from_value(data).map_err(|e| Error::decode(endpoint, raw.as_str(), e))
    }

    /// Fetches every record matching `query`, one page of [`PAGE_SIZE`] at a
    /// time.
    ///
    /// The offset is reset to 0 and an ascending `create_time` sort key is
    /// appended so pages do not overlap. Stops once the accumulated count
    /// reaches the reported total, or a page comes back empty. Aborts on the
    /// first failing page.
    pub async fn list_all_objects(
        &self,
        namespace: Namespace,
        api_name: &str,
        mut query: QueryDescriptor,
    ) -> Result<Vec<Value>> {
        query.offset = 0;
        query.limit = PAGE_SIZE;
        query.orders.push(QueryOrder {
            field_name: field::CREATE_TIME.to_string(),
            ascending: true,
        });

        let mut records = Vec::new();
        loop {
            let page = self.list_objects(namespace, api_name, &query, None).await?;
            let received = page.data_list.len();
            records.extend(page.data_list);

            tracing::debug!(
                api_name = api_name,
                offset = query.offset,
                received = received,
                accumulated = records.len(),
                total = page.total,
                "Fetched page"
            );

            if records.len() >= page.total || received == 0 {
                break;
            }
            query.offset += query.limit;
        }

        Ok(records)
    }

    /// Fetches one record by id.
    pub async fn get_object(&self, namespace: Namespace, api_name: &str, id: &str) -> Result<Value> {
        let endpoint = endpoint(namespace, Action::Get);
        let inner = Payload::new()
            .with(field::DATA_OBJECT_API_NAME, api_name)?
            .with("objectDataId", id)?;

        let raw = self.post(endpoint, Some(envelope(inner)), true).await?;
        data_field(endpoint, &raw)
    }

    /// Creates a record and returns its new id.
    ///
    /// `params` are merged into the inner `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the response carries no `dataId`.
    pub async fn create_object<T: Serialize + ?Sized>(
        &self,
        namespace: Namespace,
        object: &T,
        params: Option<Payload>,
    ) -> Result<String> {
        let endpoint = endpoint(namespace, Action::Create);

        let mut inner = Payload::new();
        inner.insert("object_data", object)?;
        if let Some(params) = params {
            inner.merge(params);
        }

        let raw = self.post(endpoint, Some(envelope(inner)), true).await?;

        #[derive(Deserialize)]
        struct Created {
            #[serde(rename = "dataId")]
            data_id: String,
        }
        let created: Created =
            serde_json::from_str(&raw).map_err(|e| Error::decode(endpoint, raw.as_str(), e))?;
        Ok(created.data_id)
    }

    /// Updates a record.
    ///
    /// `object` must carry a non-empty `dataObjectApiName` and `_id`; this is
    /// checked before any network call. `params` are merged into the outer
    /// body, next to `data`.
    pub async fn update_object(
        &self,
        namespace: Namespace,
        object: Payload,
        params: Option<Payload>,
    ) -> Result<()> {
        for key in [field::DATA_OBJECT_API_NAME, field::ID] {
            if object.get_str(key).map_or(true, str::is_empty) {
                return Err(Error::validation(key, "must be a non-empty string"));
            }
        }

        let endpoint = endpoint(namespace, Action::Update);

        let mut inner = Payload::new();
        inner.insert_value("object_data", object.into_value());
        let mut body = envelope(inner);
        if let Some(params) = params {
            body.merge(params);
        }

        self.post(endpoint, Some(body), true).await?;
        Ok(())
    }

    /// Reassigns owners. Does nothing when `data` is empty.
    pub async fn change_owner(
        &self,
        namespace: Namespace,
        api_name: &str,
        data: &[ChangeOwnerData],
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if api_name.is_empty() {
            return Err(Error::empty("dataObjectApiName"));
        }

        let endpoint = endpoint(namespace, Action::ChangeOwner);
        let inner = Payload::new()
            .with("Data", data)?
            .with(field::DATA_OBJECT_API_NAME, api_name)?;

        self.post(endpoint, Some(envelope(inner)), true).await?;
        Ok(())
    }

    /// Deletes records.
    ///
    /// The platform only deletes records that have already been invalidated
    /// (see [`Client::invalidate_object`]). Object-specific deletion calls,
    /// such as removing accounts from a public pool, are not covered.
    pub async fn delete_objects(
        &self,
        namespace: Namespace,
        api_name: &str,
        ids: &[String],
    ) -> Result<()> {
        let endpoint = endpoint(namespace, Action::Delete);
        let inner = Payload::new()
            .with("idList", ids)?
            .with(field::DATA_OBJECT_API_NAME, api_name)?;

        self.post(endpoint, Some(envelope(inner)), true).await?;
        Ok(())
    }

    /// Marks a record inactive.
    pub async fn invalidate_object(
        &self,
        namespace: Namespace,
        api_name: &str,
        id: &str,
    ) -> Result<()> {
        let endpoint = endpoint(namespace, Action::Invalid);
        let inner = Payload::new()
            .with("object_data_id", id)?
            .with(field::DATA_OBJECT_API_NAME, api_name)?;

        self.post(endpoint, Some(envelope(inner)), true).await?;
        Ok(())
    }

    /// Fetches schema metadata for an object type.
    pub async fn describe_object(&self, api_name: &str, include_detail: bool) -> Result<Value> {
        let body = Payload::new()
            .with("apiName", api_name)?
            .with("includeDetail", include_detail)?;

        let raw = self.post(DESCRIBE_ENDPOINT, Some(body), true).await?;
        data_field(DESCRIBE_ENDPOINT, &raw)
    }
}
