use std::{convert::Infallible, path::PathBuf, sync::Arc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use warp::{http::StatusCode, path, Filter, Rejection, Reply};

use crate::{
    auth::Auth,
    error::{AuthError, ResourceError},
    identity::with_identity,
    resources,
    store::Store,
};

const MAX_JSON_BODY: u64 = 16 * 1024;

/// Every route of the service: accounts, companies, jobs and static files, with
/// domain errors rendered as JSON and each request traced.
pub fn build_app(
    auth: &Arc<Auth>,
    store: &Arc<dyn Store>,
    static_dir: impl Into<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    build_api_route_filter(auth, store)
        .or(static_files(static_dir))
        .recover(handle_rejection)
        .with(warp::trace::request())
}

pub fn build_api_route_filter(
    auth: &Arc<Auth>,
    store: &Arc<dyn Store>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let signup = path!("signup")
        .and(warp::post())
        .and(json_body())
        .and(with_state(auth.clone()))
        .and_then(user_signup);

    let login = path!("login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(auth.clone()))
        .and_then(user_login);

    signup
        .or(login)
        .or(company_routes(auth, store))
        .or(job_routes(auth, store))
}

fn company_routes(
    auth: &Arc<Auth>,
    store: &Arc<dyn Store>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let create = path!("companies")
        .and(warp::post())
        .and(with_identity(auth))
        .and(json_body())
        .and(with_state(store.clone()))
        .and_then(resources::create_company);

    let list = path!("companies")
        .and(warp::get())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::list_companies);

    let get = path!("companies" / u64)
        .and(warp::get())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::get_company);

    let update = path!("companies" / u64)
        .and(warp::put())
        .and(with_identity(auth))
        .and(json_body())
        .and(with_state(store.clone()))
        .and_then(resources::update_company);

    let delete = path!("companies" / u64)
        .and(warp::delete())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::delete_company);

    create.or(list).or(get).or(update).or(delete)
}

fn job_routes(
    auth: &Arc<Auth>,
    store: &Arc<dyn Store>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let create = path!("jobs")
        .and(warp::post())
        .and(with_identity(auth))
        .and(json_body())
        .and(with_state(store.clone()))
        .and_then(resources::create_job);

    let list = path!("jobs")
        .and(warp::get())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::list_jobs);

    let get = path!("jobs" / u64)
        .and(warp::get())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::get_job);

    let update = path!("jobs" / u64)
        .and(warp::put())
        .and(with_identity(auth))
        .and(json_body())
        .and(with_state(store.clone()))
        .and_then(resources::update_job);

    let delete = path!("jobs" / u64)
        .and(warp::delete())
        .and(with_identity(auth))
        .and(with_state(store.clone()))
        .and_then(resources::delete_job);

    create.or(list).or(get).or(update).or(delete)
}

/// Files under `dir`, for any GET that no API route claimed.
pub fn static_files(
    dir: impl Into<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::get().and(warp::fs::dir(dir.into()))
}

/// Render domain errors as `{"message": ...}` with their status. Anything else (unknown
/// route, wrong method, unreadable body) is left to warp's default handling.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    let (status, message) = if let Some(auth_error) = err.find::<AuthError>() {
        match auth_error {
            AuthError::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            AuthError::DuplicateAccount => (StatusCode::CONFLICT, auth_error.to_string()),
            AuthError::AccountNotFound | AuthError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "invalid email or password".to_owned(),
            ),
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_owned(),
            ),
            AuthError::InternalCrypto(_) | AuthError::Persistence { .. } => {
                tracing::error!(error = ?auth_error, "account operation failed");
                internal_error()
            }
        }
    } else if let Some(resource_error) = err.find::<ResourceError>() {
        match resource_error {
            ResourceError::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            ResourceError::NotFound(_) => (StatusCode::NOT_FOUND, resource_error.to_string()),
            ResourceError::Persistence { .. } => {
                tracing::error!(error = ?resource_error, "resource operation failed");
                internal_error()
            }
        }
    } else {
        return Err(err);
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "message": message })),
        status,
    ))
}

fn internal_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "an unknown error has occurred".to_owned(),
    )
}

/// Fields are optional so a missing one is reported by name rather than as a parse error.
#[derive(Debug, Deserialize)]
pub struct CredentialsQuery {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

async fn user_signup(input: CredentialsQuery, auth: Arc<Auth>) -> Result<impl Reply, Rejection> {
    auth.signup(input.email.as_deref(), input.password.as_deref())
        .await?;

    Ok(warp::reply::json(&SignupResponse {
        message: "Signup successful",
    }))
}

async fn user_login(input: CredentialsQuery, auth: Arc<Auth>) -> Result<impl Reply, Rejection> {
    let token = auth
        .login(input.email.as_deref(), input.password.as_deref())
        .await
        .map_err(|e| {
            if matches!(e, AuthError::AccountNotFound | AuthError::InvalidCredentials) {
                tracing::warn!(email = ?input.email, reason = %e, "login failed");
            }
            e
        })?;

    Ok(warp::reply::json(&LoginResponse { token }))
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_JSON_BODY).and(warp::body::json())
}

// functor that adds a clone of shared state into the filter chain
pub(crate) fn with_state<T: Clone + Send + Sync + 'static>(
    state: T,
) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
