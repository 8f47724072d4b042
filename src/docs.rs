#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    handlers::{
        account::{AccountStatusResponse, SubmitReactivationRequest},
        admin::{ReactivationDecision, ResolveReactivationPayload},
        auth::{LoginRequest, LoginResponse},
    },
    models::{
        session::{DeviceMetadata, SessionResponse},
        subject::{
            ReactivationRequestPayload, ReactivationStatus, SubjectPlan, SubjectResponse,
            SubjectRole, SubjectStatus,
        },
    },
    services::trust::DeviceClass,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        login_doc,
        logout_doc,
        list_sessions_doc,
        heartbeat_doc,
        confirm_session_doc,
        revoke_session_doc,
        revoke_other_sessions_doc,
        account_status_doc,
        submit_reactivation_doc,
        admin_suspend_doc,
        admin_deactivate_doc,
        admin_resolve_reactivation_doc,
        admin_list_sessions_doc,
        admin_force_logout_doc
    ),
    components(
        schemas(
            // auth
            LoginRequest,
            LoginResponse,
            DeviceMetadata,
            DeviceClass,
            // subjects
            SubjectResponse,
            SubjectRole,
            SubjectPlan,
            SubjectStatus,
            // sessions
            SessionResponse,
            // suspension & reactivation
            AccountStatusResponse,
            ReactivationRequestPayload,
            ReactivationStatus,
            SubmitReactivationRequest,
            ResolveReactivationPayload,
            ReactivationDecision
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Login, logout, and token issuance"),
        (name = "Sessions", description = "Device session registry"),
        (name = "Account", description = "Suspension status and reactivation"),
        (name = "Admin", description = "Moderation surface")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded; may carry a new-device alert", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account suspended or deactivated")
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Current session revoked")),
    tag = "Auth"
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/sessions",
    responses((status = 200, description = "Active sessions, most recent first", body = [SessionResponse])),
    tag = "Sessions"
)]
fn list_sessions_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/heartbeat",
    responses(
        (status = 200, description = "last_active bumped"),
        (status = 401, description = "Session revoked; client must log out")
    ),
    tag = "Sessions"
)]
fn heartbeat_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/confirm",
    params(("id" = String, Path, description = "Session ID")),
    responses((status = 200, description = "Device acknowledged")),
    tag = "Sessions"
)]
fn confirm_session_doc() {}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session revoked (idempotent)"),
        (status = 400, description = "Attempted to revoke the current session")
    ),
    tag = "Sessions"
)]
fn revoke_session_doc() {}

#[utoipa::path(
    delete,
    path = "/api/sessions",
    responses((status = 200, description = "All other sessions revoked")),
    tag = "Sessions"
)]
fn revoke_other_sessions_doc() {}

#[utoipa::path(
    get,
    path = "/api/account/status",
    responses((status = 200, description = "Punitive state computed at read time", body = AccountStatusResponse)),
    tag = "Account"
)]
fn account_status_doc() {}

#[utoipa::path(
    post,
    path = "/api/account/reactivation",
    request_body = SubmitReactivationRequest,
    responses(
        (status = 200, description = "Request filed"),
        (status = 409, description = "A request is already pending")
    ),
    tag = "Account",
    security(())
)]
fn submit_reactivation_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/subjects/{id}/suspend",
    params(("id" = String, Path, description = "Subject ID")),
    responses((status = 200, description = "Suspended (idempotent)")),
    tag = "Admin"
)]
fn admin_suspend_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/subjects/{id}/deactivate",
    params(("id" = String, Path, description = "Subject ID")),
    responses((status = 200, description = "Deactivated and sessions revoked")),
    tag = "Admin"
)]
fn admin_deactivate_doc() {}

#[utoipa::path(
    put,
    path = "/api/admin/subjects/{id}/reactivation",
    params(("id" = String, Path, description = "Subject ID")),
    request_body = ResolveReactivationPayload,
    responses(
        (status = 200, description = "Request resolved"),
        (status = 404, description = "No pending request")
    ),
    tag = "Admin"
)]
fn admin_resolve_reactivation_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/subjects/{id}/sessions",
    params(("id" = String, Path, description = "Subject ID")),
    responses((status = 200, body = [SessionResponse])),
    tag = "Admin"
)]
fn admin_list_sessions_doc() {}

#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{id}/sessions",
    params(("id" = String, Path, description = "Subject ID")),
    responses((status = 200, description = "Forced remote logout")),
    tag = "Admin"
)]
fn admin_force_logout_doc() {}
