use crate::middleware::AuthUser;
use crate::models::{Address, Role, User};
use crate::startup::AppState;
use crate::utils::password::{hash_password, verify_password};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use mongodb::bson::{DateTime as BsonDateTime, doc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::jobs::{EmailJob, PasswordResetPayload};
use validator::Validate;

/// User shape returned to clients; never includes the password hash or reset
/// code.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub addresses: Vec<Address>,
    pub loyalty_points: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            addresses: user.addresses,
            loyalty_points: user.loyalty_points,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let duplicate = state
        .db
        .users()
        .find_one(doc! { "email": &request.email }, None)
        .await?
        .is_some();
    if duplicate {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "email is already registered"
        )));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(request.name, request.email, password_hash, Role::User);
    state.db.users().insert_one(&user, None).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let user = state
        .db
        .users()
        .find_one(doc! { "email": &request.email }, None)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("invalid email or password")))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "invalid email or password"
        )));
    }

    let token = state.jwt.issue(&user.id, &user.role.to_string())?;
    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&state, &user.user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// Hashed only when present; unchanged otherwise.
    #[validate(length(min = 8))]
    pub password: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let mut set = doc! {};
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(password) = request.password {
        set.insert("password_hash", hash_password(&password)?);
    }
    if set.is_empty() {
        return Err(AppError::validation("nothing to update"));
    }

    state
        .db
        .users()
        .update_one(doc! { "_id": &user.user_id }, doc! { "$set": set }, None)
        .await?;

    let user = find_user(&state, &user.user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Issue a short-lived reset code and queue it for email delivery. Responds
/// 200 whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let user = state
        .db
        .users()
        .find_one(doc! { "email": &request.email }, None)
        .await?;

    if let Some(user) = user {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let expires = Utc::now() + Duration::minutes(state.config.auth.reset_code_ttl_minutes);

        state
            .db
            .users()
            .update_one(
                doc! { "_id": &user.id },
                doc! { "$set": {
                    "reset_code": &code,
                    "reset_code_expires": BsonDateTime::from_chrono(expires),
                }},
                None,
            )
            .await?;

        let job = EmailJob::PasswordReset(PasswordResetPayload {
            email: user.email.clone(),
            name: user.name.clone(),
            code,
        });
        if let Err(e) = state.queue.enqueue(&job).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to enqueue reset email");
        }
    }

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 6))]
    pub code: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let user = state
        .db
        .users()
        .find_one(doc! { "email": &request.email }, None)
        .await?
        .ok_or_else(|| AppError::validation("invalid or expired reset code"))?;

    let valid = user.reset_code.as_deref() == Some(request.code.as_str())
        && user
            .reset_code_expires
            .map(|exp| exp > Utc::now())
            .unwrap_or(false);
    if !valid {
        return Err(AppError::validation("invalid or expired reset code"));
    }

    state
        .db
        .users()
        .update_one(
            doc! { "_id": &user.id },
            doc! {
                "$set": { "password_hash": hash_password(&request.password)? },
                "$unset": { "reset_code": "", "reset_code_expires": "" },
            },
            None,
        )
        .await?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub ward: String,
    #[validate(length(min = 1))]
    pub street: String,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&state, &user.user_id).await?;
    Ok(Json(user.addresses))
}

pub async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    // At most one default: marking a new default clears the old one first.
    if request.is_default {
        clear_default(&state, &user.user_id).await?;
    }

    let address = Address {
        address_id: uuid::Uuid::new_v4().to_string(),
        name: request.name,
        phone: request.phone,
        city: request.city,
        ward: request.ward,
        street: request.street,
        is_default: request.is_default,
    };

    state
        .db
        .users()
        .update_one(
            doc! { "_id": &user.user_id },
            doc! { "$push": { "addresses": mongodb::bson::to_bson(&address)? } },
            None,
        )
        .await?;

    let user = find_user(&state, &user.user_id).await?;
    Ok((StatusCode::CREATED, Json(user.addresses)))
}

pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(address_id): Path<String>,
    Json(request): Json<AddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    if request.is_default {
        clear_default(&state, &user.user_id).await?;
    }

    let address = Address {
        address_id: address_id.clone(),
        name: request.name,
        phone: request.phone,
        city: request.city,
        ward: request.ward,
        street: request.street,
        is_default: request.is_default,
    };

    let result = state
        .db
        .users()
        .update_one(
            doc! {
                "_id": &user.user_id,
                "addresses": { "$elemMatch": { "address_id": &address_id } },
            },
            doc! { "$set": { "addresses.$": mongodb::bson::to_bson(&address)? } },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("address not found")));
    }

    let user = find_user(&state, &user.user_id).await?;
    Ok(Json(user.addresses))
}

pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(address_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .users()
        .update_one(
            doc! { "_id": &user.user_id },
            doc! { "$pull": { "addresses": { "address_id": &address_id } } },
            None,
        )
        .await?;
    if result.modified_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("address not found")));
    }

    let user = find_user(&state, &user.user_id).await?;
    Ok(Json(user.addresses))
}

async fn find_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    state
        .db
        .users()
        .find_one(doc! { "_id": user_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("user not found")))
}

async fn clear_default(state: &AppState, user_id: &str) -> Result<(), AppError> {
    state
        .db
        .users()
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "addresses.$[elem].is_default": false } },
            mongodb::options::UpdateOptions::builder()
                .array_filters(vec![doc! { "elem.is_default": true }])
                .build(),
        )
        .await?;
    Ok(())
}
