use auth_session_api::UserResponse;

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /users/me
/// Récupère le profil de l'utilisateur courant
pub async fn me(CurrentUser(user): CurrentUser) -> Result<AppResponse<UserResponse>, AppError> {
    Ok(AppResponse::ok(user.into()))
}
