//! Operation resolvers.
//!
//! Requests are dispatched on `operationName`. Each resolver receives the
//! request's [`RequestContext`] explicitly and produces the `data` object of
//! the response. Objects carry `__typename` so clients can normalize them.

use graphql_client::Response;
use launchpad_core::{Credential, Email, Launch, LaunchId, PatchSize};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::context::RequestContext;
use crate::datasources::DataSourceError;
use crate::error::AppError;

/// A graph request envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    #[serde(default)]
    pub query: String,
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
}

/// Why a resolver produced no data.
#[derive(Debug)]
enum ResolveError {
    /// The request is wrong; reported to the caller as a GraphQL error.
    Invalid(String),
    /// A store failed; reported as a server error.
    Source(DataSourceError),
}

impl From<DataSourceError> for ResolveError {
    fn from(e: DataSourceError) -> Self {
        Self::Source(e)
    }
}

type Resolved = Result<Value, ResolveError>;

/// Execute one request.
///
/// # Errors
///
/// Returns [`AppError`] only for store failures; request problems become
/// GraphQL errors in the returned response.
pub async fn execute(
    ctx: &RequestContext,
    request: &GraphRequest,
) -> Result<Response<Value>, AppError> {
    let empty = Map::new();
    let vars = request.variables.as_ref().unwrap_or(&empty);

    let resolved = match request.operation_name.as_deref() {
        Some("LaunchList") => launches(ctx, vars).await,
        Some("LaunchDetails") => launch(ctx, vars).await,
        Some("GetMyTrips") => me(ctx).await,
        Some("Login") => login(ctx, vars).await,
        Some("BookTrips") => book_trips(ctx, vars).await,
        Some("CancelTrip") => cancel_trip(ctx, vars).await,
        Some(other) => Err(ResolveError::Invalid(format!("Unknown operation `{other}`"))),
        None => Err(ResolveError::Invalid("operationName is required".to_string())),
    };

    match resolved {
        Ok(data) => Ok(Response {
            data: Some(data),
            errors: None,
            extensions: None,
        }),
        Err(ResolveError::Invalid(message)) => {
            debug!(%message, "rejecting request");
            Ok(Response {
                data: None,
                errors: Some(vec![graphql_client::Error {
                    message,
                    locations: None,
                    path: None,
                    extensions: None,
                }]),
                extensions: None,
            })
        }
        Err(ResolveError::Source(e)) => Err(e.into()),
    }
}

// =============================================================================
// Queries
// =============================================================================

#[instrument(skip(ctx, vars))]
async fn launches(ctx: &RequestContext, vars: &Map<String, Value>) -> Resolved {
    let after = optional_str(vars, "after")?;
    let page_size = match vars.get("pageSize") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    ResolveError::Invalid("pageSize must be a non-negative integer".to_string())
                })?,
        ),
    };

    let page = ctx.launches.page(after, page_size).await?;
    let trips = ctx.users.trips().await?;

    Ok(json!({
        "launches": {
            "__typename": "LaunchConnection",
            "cursor": page.cursor,
            "hasMore": page.has_more,
            "launches": page
                .items
                .iter()
                .map(|l| launch_json(l, PatchSize::Small, &trips))
                .collect::<Vec<_>>(),
        }
    }))
}

#[instrument(skip(ctx, vars))]
async fn launch(ctx: &RequestContext, vars: &Map<String, Value>) -> Resolved {
    let id = LaunchId::from(required_str(vars, "id")?);
    let launch = ctx.launches.get_by_id(&id).await?;
    let trips = ctx.users.trips().await?;

    Ok(json!({
        "launch": launch.map(|l| launch_json(&l, PatchSize::Large, &trips)),
    }))
}

#[instrument(skip(ctx))]
async fn me(ctx: &RequestContext) -> Resolved {
    let Some(identity) = ctx.users.me() else {
        return Ok(json!({ "me": null }));
    };

    let trips = ctx.users.trips().await?;
    let launches = ctx.launches.get_many(&trips).await?;

    Ok(json!({
        "me": {
            "__typename": "User",
            "id": identity.user.id.to_string(),
            "email": identity.email.as_str(),
            "trips": launches
                .iter()
                .map(|l| launch_json(l, PatchSize::Small, &trips))
                .collect::<Vec<_>>(),
        }
    }))
}

// =============================================================================
// Mutations
// =============================================================================

#[instrument(skip(ctx, vars))]
async fn login(ctx: &RequestContext, vars: &Map<String, Value>) -> Resolved {
    let raw = required_str(vars, "email")?;
    let Ok(email) = Email::parse(raw) else {
        debug!("login with invalid email");
        return Ok(json!({ "login": null }));
    };

    let user = ctx.users.find_or_create(&email).await?;
    info!(user_id = %user.id, "login");
    let credential = Credential::issue(&email);
    Ok(json!({ "login": credential.expose() }))
}

#[instrument(skip(ctx, vars))]
async fn book_trips(ctx: &RequestContext, vars: &Map<String, Value>) -> Resolved {
    let ids = required_ids(vars, "launchIds")?;

    // Only launches that exist can be booked.
    let known: Vec<LaunchId> = ctx
        .launches
        .get_many(&ids)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    let Some(booked) = ctx.users.book_trips(&known).await? else {
        return Ok(trip_update("bookTrips", false, "log in to book trips", &[], &[]));
    };

    let failed: Vec<&str> = ids
        .iter()
        .filter(|id| !booked.contains(id))
        .map(LaunchId::as_str)
        .collect();
    let message = if failed.is_empty() {
        "trips booked successfully".to_string()
    } else {
        format!("the following launches couldn't be booked: {}", failed.join(","))
    };

    let launches = ctx.launches.get_many(&booked).await?;
    let trips = ctx.users.trips().await?;
    Ok(trip_update(
        "bookTrips",
        failed.is_empty(),
        &message,
        &launches,
        &trips,
    ))
}

#[instrument(skip(ctx, vars))]
async fn cancel_trip(ctx: &RequestContext, vars: &Map<String, Value>) -> Resolved {
    let id = LaunchId::from(required_str(vars, "launchId")?);

    if !ctx.users.cancel_trip(&id).await? {
        return Ok(trip_update("cancelTrip", false, "failed to cancel trip", &[], &[]));
    }

    let launches: Vec<Launch> = ctx.launches.get_by_id(&id).await?.into_iter().collect();
    let trips = ctx.users.trips().await?;
    Ok(trip_update("cancelTrip", true, "trip cancelled", &launches, &trips))
}

// =============================================================================
// Rendering
// =============================================================================

fn launch_json(launch: &Launch, patch_size: PatchSize, trips: &[LaunchId]) -> Value {
    json!({
        "__typename": "Launch",
        "id": launch.id.as_str(),
        "site": launch.site,
        "isBooked": trips.contains(&launch.id),
        "rocket": {
            "__typename": "Rocket",
            "id": launch.rocket.id.as_str(),
            "name": launch.rocket.name,
            "type": launch.rocket.rocket_type,
        },
        "mission": {
            "__typename": "Mission",
            "name": launch.mission.name,
            "missionPatch": launch.mission.patch(patch_size),
        },
    })
}

fn trip_update(
    field: &str,
    success: bool,
    message: &str,
    launches: &[Launch],
    trips: &[LaunchId],
) -> Value {
    let mut data = Map::new();
    data.insert(
        field.to_string(),
        json!({
            "__typename": "TripUpdateResponse",
            "success": success,
            "message": message,
            "launches": launches
                .iter()
                .map(|l| launch_json(l, PatchSize::Small, trips))
                .collect::<Vec<_>>(),
        }),
    );
    Value::Object(data)
}

// =============================================================================
// Variables
// =============================================================================

fn optional_str<'a>(
    vars: &'a Map<String, Value>,
    name: &str,
) -> Result<Option<&'a str>, ResolveError> {
    match vars.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ResolveError::Invalid(format!("${name} must be a string"))),
    }
}

fn required_str<'a>(vars: &'a Map<String, Value>, name: &str) -> Result<&'a str, ResolveError> {
    optional_str(vars, name)?
        .ok_or_else(|| ResolveError::Invalid(format!("${name} is required")))
}

fn required_ids(vars: &Map<String, Value>, name: &str) -> Result<Vec<LaunchId>, ResolveError> {
    let invalid = || ResolveError::Invalid(format!("${name} must be a list of ids"));
    let Some(Value::Array(items)) = vars.get(name) else {
        return Err(invalid());
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(LaunchId::from(s.as_str())),
            Value::Number(n) => Ok(LaunchId::new(n.to_string())),
            _ => Err(invalid()),
        })
        .collect()
}
