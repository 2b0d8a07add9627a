use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use super::{AuthError, AuthUser, ADMIN_ROLES};
use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::supabase::TableQuery;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

/// Verifies the bearer token and stores the caller as an `AuthUser` extension.
pub async fn authenticate(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let user = state.verifier.verify(&token).await.map_err(|e| match e {
        AuthError::Invalid(reason) => {
            tracing::debug!(%reason, "token rejected");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        }
        AuthError::Unavailable(reason) => ApiError::Internal(reason),
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Lets admins through. Tokens without an application role fall back to the
/// `users` table.
pub async fn require_admin(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if user.is_admin() {
        return Ok(next.run(req).await);
    }

    if user.role.is_none() {
        let query = TableQuery::new().select("id,role").eq("id", user.id.clone());
        let role = state
            .store
            .find_one("users", query)
            .await?
            .and_then(|row| row.get("role").and_then(Value::as_str).map(str::to_owned));

        if role.as_deref().is_some_and(|role| ADMIN_ROLES.contains(&role)) {
            req.extensions_mut().insert(AuthUser { role, ..user });
            return Ok(next.run(req).await);
        }
    }

    tracing::warn!(user_id = %user.id, "non-admin blocked from admin route");
    Err(ApiError::Forbidden("Admin access required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Metadata;
    use crate::test_support::{claims_for, mint_token, sign, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api/admin/me", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "error": "No token provided"}));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api/admin/me", Some("garbage")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let app = TestApp::new().await;
        let token = mint_token("agent-7", Some("agent"), 3600);
        let (status, body) = app.get("/api/admin/me", Some(&token)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[tokio::test]
    async fn role_falls_back_to_users_table() {
        let app = TestApp::new().await;
        app.seed("users", vec![json!({"id": "staff-1", "role": "admin"})])
            .await;
        let token = mint_token("staff-1", None, 3600);

        let (status, body) = app.get("/api/admin/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "staff-1");
        assert_eq!(body["data"]["role"], "admin");

        let stranger = mint_token("visitor-1", None, 3600);
        let (status, _) = app.get("/api/admin/me", Some(&stranger)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn user_metadata_role_is_not_trusted() {
        let app = TestApp::new().await;
        let mut claims = claims_for("tenant-9", None, 3600);
        claims.user_metadata = Metadata {
            role: Some("admin".to_string()),
        };
        let token = sign(&claims);

        let (status, body) = app.get("/api/admin/me", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
    }
}
