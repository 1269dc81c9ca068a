use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        LoginRequest, LoginResponse, RefereeView, RegisterRequest, RegisterResponse, UserView,
        VerifyReferralRequest, VerifyReferralResponse,
    },
    services,
};
use crate::{error::ApiError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn referral_routes() -> Router<AppState> {
    Router::new()
        .route("/referrals/:user_id", get(list_referrals))
        .route("/referral/verify", post(verify_referral))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = services::list_users(state.users.as_ref()).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) = payload?;
    let created = services::register(
        state.users.as_ref(),
        state.codes.as_ref(),
        &state.config.referral,
        payload,
    )
    .await?;

    let user = created.user;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
            email: user.email,
            name: user.name,
            referral_code: user.referral_code,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let user = services::authenticate(state.users.as_ref(), &payload.email, &payload.password)
        .await?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        email: user.email,
    }))
}

/// An id that is not a UUID cannot name a user, so it is a 404 as well.
#[instrument(skip(state))]
pub async fn list_referrals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<RefereeView>>, ApiError> {
    let user_id = Uuid::parse_str(&user_id).map_err(|_| ApiError::NotFound("User not found"))?;
    let referees = services::referrals_of(state.users.as_ref(), user_id).await?;
    Ok(Json(referees.into_iter().map(RefereeView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn verify_referral(
    State(state): State<AppState>,
    payload: Result<Json<VerifyReferralRequest>, JsonRejection>,
) -> Result<Json<VerifyReferralResponse>, ApiError> {
    let Json(payload) = payload?;
    let owner = services::verify_referral_code(state.users.as_ref(), &payload.referral_code).await?;
    Ok(Json(VerifyReferralResponse {
        referral_code: owner.referral_code,
        valid: true,
    }))
}
