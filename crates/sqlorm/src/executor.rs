//! The end of the middleware chain: compile, run against the session with the
//! configured timeout, decode.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::middleware::{Handler, Next, QueryContext, QueryOutput, QueryResult};
use crate::model::Model;
use crate::row::{ExecResult, Row};
use crate::session::{Core, Session};
use crate::valuer::Creator;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::trace;

async fn with_timeout<T, F>(timeout: Option<Duration>, future: F) -> OrmResult<T>
where
    F: Future<Output = OrmResult<T>> + Send,
{
    match timeout {
        Some(timeout) => {
            tokio::pin!(future);
            tokio::select! {
                result = &mut future => result,
                _ = tokio::time::sleep(timeout) => Err(OrmError::Timeout(timeout)),
            }
        }
        None => future.await,
    }
}

/// Decode one row into a fresh entity.
fn decode_row<T: Entity>(creator: Creator, model: &Model, row: &Row) -> OrmResult<T> {
    let mut entity = T::default();
    creator.valuer(model, &mut entity)?.set_columns(row)?;
    Ok(entity)
}

/// Fetches rows and decodes the first one or all of them.
struct FetchHandler<'s, T, S> {
    session: &'s S,
    first_only: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: Session> Handler for FetchHandler<'_, T, S> {
    fn call<'a>(&'a self, ctx: &'a QueryContext<'a>) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let query = ctx.builder.build()?;
            let core = self.session.core();
            let rows = with_timeout(core.query_timeout(), self.session.query(&query)).await?;
            trace!(rows = rows.len(), table = ctx.table_name(), "rows fetched");

            let creator = core.creator();
            if self.first_only {
                let row = rows.first().ok_or(OrmError::NoRows)?;
                let entity = decode_row::<T>(creator, &ctx.model, row)?;
                Ok(QueryOutput::Decoded(Box::new(entity)))
            } else {
                let entities = rows
                    .iter()
                    .map(|row| decode_row::<T>(creator, &ctx.model, row))
                    .collect::<OrmResult<Vec<T>>>()?;
                Ok(QueryOutput::Decoded(Box::new(entities)))
            }
        })
    }
}

struct ExecHandler<'s, S> {
    session: &'s S,
}

impl<S: Session> Handler for ExecHandler<'_, S> {
    fn call<'a>(&'a self, ctx: &'a QueryContext<'a>) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let query = ctx.builder.build()?;
            let timeout = self.session.core().query_timeout();
            let res = with_timeout(timeout, self.session.execute(&query)).await?;
            Ok(QueryOutput::Exec(res))
        })
    }
}

fn run<'a>(core: &'a Core, ctx: &'a QueryContext<'a>, handler: &'a dyn Handler) -> BoxFuture<'a, QueryResult> {
    Next::new(core.middlewares(), handler).run(ctx)
}

fn unexpected_output(wanted: &str) -> OrmError {
    OrmError::Other(format!("middleware replaced the query output; expected {wanted}"))
}

fn fetch<'s, T: Entity, S: Session>(session: &'s S, first_only: bool) -> FetchHandler<'s, T, S> {
    FetchHandler {
        session,
        first_only,
        _entity: PhantomData,
    }
}

/// Run `ctx` through the middlewares and decode the first row.
pub(crate) async fn get<T: Entity, S: Session>(session: &S, ctx: &QueryContext<'_>) -> OrmResult<T> {
    let handler = fetch::<T, S>(session, true);
    match run(session.core(), ctx, &handler).await? {
        QueryOutput::Decoded(any) => any
            .downcast::<T>()
            .map(|entity| *entity)
            .map_err(|_| unexpected_output("an entity")),
        QueryOutput::Exec(_) => Err(unexpected_output("an entity")),
    }
}

/// Run `ctx` through the middlewares and decode every row.
pub(crate) async fn get_multi<T: Entity, S: Session>(
    session: &S,
    ctx: &QueryContext<'_>,
) -> OrmResult<Vec<T>> {
    let handler = fetch::<T, S>(session, false);
    match run(session.core(), ctx, &handler).await? {
        QueryOutput::Decoded(any) => any
            .downcast::<Vec<T>>()
            .map(|entities| *entities)
            .map_err(|_| unexpected_output("a list of entities")),
        QueryOutput::Exec(_) => Err(unexpected_output("a list of entities")),
    }
}

/// Run `ctx` through the middlewares as a statement without rows.
pub(crate) async fn exec<S: Session>(session: &S, ctx: &QueryContext<'_>) -> OrmResult<ExecResult> {
    let handler = ExecHandler { session };
    match run(session.core(), ctx, &handler).await? {
        QueryOutput::Exec(res) => Ok(res),
        QueryOutput::Decoded(_) => Err(unexpected_output("an exec result")),
    }
}
