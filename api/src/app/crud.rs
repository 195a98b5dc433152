//! Generic CRUD requests and handlers
//!
//! Every aggregate exposed over HTTP implements [`Resource`]; the five
//! request types below and [`CrudHandler`] then cover its whole lifecycle.

use std::borrow::Cow;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dispatcher::{DispatcherBuilder, Handler, Request, RequestKind};
use super::session::Session;
use crate::domain::aggregate::{Aggregate, AggregateId, Record};
use crate::error::{AppError, DomainError, RegistryError};

/// An aggregate with a client-facing representation
pub trait Resource: Aggregate {
    /// Response shape. Never includes the owning tenant.
    type Dto: Serialize + Send + Sync + 'static;
    /// Client-writable fields, used for both create and update
    type Input: DeserializeOwned + Send + Sync + 'static;
    type Filter: DeserializeOwned + Default + Send + Sync + 'static;

    /// Build and validate a new aggregate
    fn from_input(input: &Self::Input) -> Result<Self, DomainError>;

    /// Overwrite the mutable fields and validate the result
    fn apply(&mut self, input: &Self::Input) -> Result<(), DomainError>;

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn to_dto(record: &Record<Self>) -> Self::Dto;
}

/// A response together with the identity and version of its record
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<D> {
    pub id: AggregateId,
    pub version: i64,
    pub value: D,
}

fn versioned<R: Resource>(record: &Record<R>) -> Versioned<R::Dto> {
    Versioned {
        id: record.id(),
        version: record.version(),
        value: R::to_dto(record),
    }
}

/// Offset and limit for list requests
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// Update payload as received from a client: the input fields plus an
/// optional copy of the record ID
#[derive(Debug, Deserialize)]
pub struct UpdateBody<I> {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub input: I,
}

fn request_name<R: Resource>(operation: &str) -> Cow<'static, str> {
    Cow::Owned(format!("{}<{}>", operation, R::COLLECTION))
}

pub struct CreateRecord<R: Resource> {
    pub input: R::Input,
}

impl<R: Resource> Request for CreateRecord<R> {
    type Response = Versioned<R::Dto>;
    const KIND: RequestKind = RequestKind::Command;

    fn name() -> Cow<'static, str> {
        request_name::<R>("CreateRecord")
    }
}

pub struct GetRecord<R: Resource> {
    pub id: AggregateId,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> GetRecord<R> {
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Request for GetRecord<R> {
    type Response = Versioned<R::Dto>;
    const KIND: RequestKind = RequestKind::Query;

    fn name() -> Cow<'static, str> {
        request_name::<R>("GetRecord")
    }
}

pub struct ListRecords<R: Resource> {
    pub filter: R::Filter,
    pub paging: Paging,
}

impl<R: Resource> Request for ListRecords<R> {
    type Response = Vec<R::Dto>;
    const KIND: RequestKind = RequestKind::Query;

    fn name() -> Cow<'static, str> {
        request_name::<R>("ListRecords")
    }
}

pub struct UpdateRecord<R: Resource> {
    pub id: AggregateId,
    pub input: R::Input,
    /// Version the client last saw; `None` means last write wins
    pub expected_version: Option<i64>,
}

impl<R: Resource> UpdateRecord<R> {
    /// Build an update from the route ID and the request body.
    ///
    /// A body that names a different record than the route is rejected here,
    /// before anything is dispatched.
    pub fn from_route(
        path_id: AggregateId,
        body: UpdateBody<R::Input>,
        expected_version: Option<i64>,
    ) -> Result<Self, AppError> {
        if let Some(body_id) = body.id {
            if body_id != path_id.0 {
                return Err(AppError::IdMismatch {
                    path: path_id.0,
                    body: body_id,
                });
            }
        }

        Ok(Self {
            id: path_id,
            input: body.input,
            expected_version,
        })
    }
}

impl<R: Resource> Request for UpdateRecord<R> {
    type Response = Versioned<R::Dto>;
    const KIND: RequestKind = RequestKind::Command;

    fn name() -> Cow<'static, str> {
        request_name::<R>("UpdateRecord")
    }
}

pub struct DeleteRecord<R: Resource> {
    pub id: AggregateId,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> DeleteRecord<R> {
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Request for DeleteRecord<R> {
    type Response = ();
    const KIND: RequestKind = RequestKind::Command;

    fn name() -> Cow<'static, str> {
        request_name::<R>("DeleteRecord")
    }
}

/// Handles all five CRUD requests for one resource type
pub struct CrudHandler<R> {
    _resource: PhantomData<fn() -> R>,
}

impl<R> CrudHandler<R> {
    pub fn new() -> Self {
        Self {
            _resource: PhantomData,
        }
    }
}

impl<R> Default for CrudHandler<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Resource> Handler<CreateRecord<R>> for CrudHandler<R> {
    async fn handle(
        &self,
        request: &CreateRecord<R>,
        session: &mut Session,
    ) -> Result<Versioned<R::Dto>, AppError> {
        let data = R::from_input(&request.input)?;
        let mut record = session.add(data)?;
        let committed = session.save_changes().await?;
        record.sync_version(&committed);

        tracing::info!(collection = R::COLLECTION, id = %record.id(), "Record created");
        Ok(versioned(&record))
    }
}

#[async_trait]
impl<R: Resource> Handler<GetRecord<R>> for CrudHandler<R> {
    async fn handle(
        &self,
        request: &GetRecord<R>,
        session: &mut Session,
    ) -> Result<Versioned<R::Dto>, AppError> {
        let record = session.find::<R>(request.id).await?;
        Ok(versioned(&record))
    }
}

#[async_trait]
impl<R: Resource> Handler<ListRecords<R>> for CrudHandler<R> {
    async fn handle(
        &self,
        request: &ListRecords<R>,
        session: &mut Session,
    ) -> Result<Vec<R::Dto>, AppError> {
        let filter = &request.filter;
        let mut query = session.query::<R>().filter(move |item| item.matches(filter));
        if let Some(skip) = request.paging.skip {
            query = query.skip(skip);
        }
        if let Some(take) = request.paging.take {
            query = query.take(take);
        }

        let records = query.fetch().await?;
        Ok(records.iter().map(R::to_dto).collect())
    }
}

#[async_trait]
impl<R: Resource> Handler<UpdateRecord<R>> for CrudHandler<R> {
    async fn handle(
        &self,
        request: &UpdateRecord<R>,
        session: &mut Session,
    ) -> Result<Versioned<R::Dto>, AppError> {
        let mut record = session.find::<R>(request.id).await?;

        if let Some(expected) = request.expected_version {
            if record.version() != expected {
                return Err(DomainError::Conflict(format!(
                    "{} {} is at version {}, not {}",
                    R::COLLECTION,
                    request.id,
                    record.version(),
                    expected
                ))
                .into());
            }
        }

        record.data_mut().apply(&request.input)?;
        session.update(&mut record, request.expected_version)?;
        let committed = session.save_changes().await?;
        record.sync_version(&committed);

        tracing::info!(
            collection = R::COLLECTION,
            id = %record.id(),
            version = record.version(),
            "Record updated"
        );
        Ok(versioned(&record))
    }
}

#[async_trait]
impl<R: Resource> Handler<DeleteRecord<R>> for CrudHandler<R> {
    async fn handle(&self, request: &DeleteRecord<R>, session: &mut Session) -> Result<(), AppError> {
        let record = session.find::<R>(request.id).await?;
        session.remove(record)?;
        session.save_changes().await?;

        tracing::info!(collection = R::COLLECTION, id = %request.id, "Record deleted");
        Ok(())
    }
}

/// Register the CRUD handlers for `R`
pub fn register_crud<R: Resource>(
    builder: DispatcherBuilder,
) -> Result<DispatcherBuilder, RegistryError> {
    builder
        .register::<CreateRecord<R>, _>(CrudHandler::<R>::new())?
        .register::<GetRecord<R>, _>(CrudHandler::<R>::new())?
        .register::<ListRecords<R>, _>(CrudHandler::<R>::new())?
        .register::<UpdateRecord<R>, _>(CrudHandler::<R>::new())?
        .register::<DeleteRecord<R>, _>(CrudHandler::<R>::new())
}

/// Declare that the CRUD requests for `R` will be sent
pub fn require_crud<R: Resource>(builder: DispatcherBuilder) -> DispatcherBuilder {
    builder
        .require::<CreateRecord<R>>()
        .require::<GetRecord<R>>()
        .require::<ListRecords<R>>()
        .require::<UpdateRecord<R>>()
        .require::<DeleteRecord<R>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::InMemoryDocumentStore;
    use crate::app::dispatcher::Dispatcher;
    use crate::app::resources::goal::{GoalFilter, GoalInput};
    use crate::domain::entities::{Goal, Trip};
    use crate::domain::tenant::TenantContext;
    use crate::test_utils::{acme, goal_input, other_tenant};

    fn dispatcher() -> Dispatcher {
        register_crud::<Goal>(Dispatcher::builder(Arc::new(InMemoryDocumentStore::new())))
            .unwrap()
            .build()
            .unwrap()
    }

    fn update_body(id: Option<Uuid>, input: GoalInput) -> UpdateBody<GoalInput> {
        UpdateBody { id, input }
    }

    #[test]
    fn request_names_include_collection() {
        assert_eq!(CreateRecord::<Goal>::name(), "CreateRecord<goals>");
        assert_eq!(DeleteRecord::<Trip>::name(), "DeleteRecord<trips>");
    }

    #[test]
    fn crud_registration_twice_is_rejected() {
        let builder = register_crud::<Goal>(Dispatcher::builder(Arc::new(
            InMemoryDocumentStore::new(),
        )))
        .unwrap();
        let err = register_crud::<Goal>(builder).err().unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateHandler("CreateRecord<goals>".into())
        );
    }

    #[test]
    fn missing_crud_handlers_fail_build() {
        let builder = register_crud::<Goal>(Dispatcher::builder(Arc::new(
            InMemoryDocumentStore::new(),
        )))
        .unwrap();
        let err = require_crud::<Trip>(require_crud::<Goal>(builder))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::MissingHandler("CreateRecord<trips>".into()));
    }

    #[test]
    fn from_route_rejects_mismatched_ids() {
        let path = AggregateId::new();
        let body = update_body(Some(Uuid::new_v4()), goal_input("X"));

        let err = UpdateRecord::<Goal>::from_route(path, body, None).err().unwrap();
        assert!(matches!(err, AppError::IdMismatch { .. }));
        assert!(err.is_conflict());
    }

    #[test]
    fn from_route_accepts_matching_or_absent_body_id() {
        let path = AggregateId::new();
        assert!(
            UpdateRecord::<Goal>::from_route(path, update_body(Some(path.0), goal_input("X")), None)
                .is_ok()
        );
        assert!(
            UpdateRecord::<Goal>::from_route(path, update_body(None, goal_input("X")), None)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn create_then_get_returns_same_fields() {
        let dispatcher = dispatcher();
        let tenant = TenantContext::new(acme());

        let created = dispatcher
            .send(&tenant, CreateRecord::<Goal> { input: goal_input("Bike") })
            .await
            .unwrap();
        assert_eq!(created.version, 1);

        let fetched = dispatcher
            .send(&tenant, GetRecord::<Goal>::new(created.id))
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .send(
                &TenantContext::new(acme()),
                CreateRecord::<Goal> { input: goal_input("  ") },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn list_only_returns_callers_records() {
        let dispatcher = dispatcher();
        let acme_ctx = TenantContext::new(acme());
        let other_ctx = TenantContext::new(other_tenant());

        dispatcher
            .send(&acme_ctx, CreateRecord::<Goal> { input: goal_input("X") })
            .await
            .unwrap();

        let list = |ctx: TenantContext| {
            let dispatcher = dispatcher.clone();
            async move {
                dispatcher
                    .send(
                        &ctx,
                        ListRecords::<Goal> {
                            filter: GoalFilter::default(),
                            paging: Paging::default(),
                        },
                    )
                    .await
                    .unwrap()
            }
        };

        assert!(list(other_ctx).await.is_empty());
        let mine = list(acme_ctx).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "X");
    }

    #[tokio::test]
    async fn update_is_idempotent_on_fields() {
        let dispatcher = dispatcher();
        let tenant = TenantContext::new(acme());
        let created = dispatcher
            .send(&tenant, CreateRecord::<Goal> { input: goal_input("Bike") })
            .await
            .unwrap();
        let id = created.id;

        let mut input = goal_input("Bike");
        input.current_amount = 40.0;
        let update = || UpdateRecord::<Goal> {
            id,
            input: input.clone(),
            expected_version: None,
        };

        let first = dispatcher.send(&tenant, update()).await.unwrap();
        let second = dispatcher.send(&tenant, update()).await.unwrap();

        assert_eq!(first.value.current_amount, 40.0);
        assert_eq!(first.value.name, second.value.name);
        assert_eq!(first.value.current_amount, second.value.current_amount);
        assert_eq!(first.value.percent_complete, second.value.percent_complete);
        assert_eq!(second.version, 3);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let dispatcher = dispatcher();
        let tenant = TenantContext::new(acme());
        let created = dispatcher
            .send(&tenant, CreateRecord::<Goal> { input: goal_input("Bike") })
            .await
            .unwrap();
        let id = created.id;

        dispatcher
            .send(
                &tenant,
                UpdateRecord::<Goal> {
                    id,
                    input: goal_input("Bike v2"),
                    expected_version: Some(1),
                },
            )
            .await
            .unwrap();

        let err = dispatcher
            .send(
                &tenant,
                UpdateRecord::<Goal> {
                    id,
                    input: goal_input("Bike v3"),
                    expected_version: Some(1),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_in_other_tenant_is_not_found() {
        let dispatcher = dispatcher();
        let created = dispatcher
            .send(
                &TenantContext::new(acme()),
                CreateRecord::<Goal> { input: goal_input("Bike") },
            )
            .await
            .unwrap();

        let err = dispatcher
            .send(
                &TenantContext::new(other_tenant()),
                UpdateRecord::<Goal> {
                    id: created.id,
                    input: goal_input("Stolen"),
                    expected_version: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let dispatcher = dispatcher();
        let tenant = TenantContext::new(acme());
        let created = dispatcher
            .send(&tenant, CreateRecord::<Goal> { input: goal_input("Bike") })
            .await
            .unwrap();
        let id = created.id;

        dispatcher
            .send(&tenant, DeleteRecord::<Goal>::new(id))
            .await
            .unwrap();

        let err = dispatcher
            .send(&tenant, GetRecord::<Goal>::new(id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = dispatcher
            .send(&tenant, DeleteRecord::<Goal>::new(id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
