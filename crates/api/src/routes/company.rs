//! Route definitions for the `/companies` resource tree.
//!
//! Everything below `/{company_id}` is tenant-scoped: handlers take the
//! [`CompanyScope`](crate::middleware::scope::CompanyScope) extractor,
//! which resolves the caller's membership before any repository call.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{
    attachment, billing, comment, company, inbox, incident, project, rdo, survey,
};
use crate::state::AppState;

/// Routes mounted at `/companies`.
///
/// ```text
/// GET    /                                        -> list (caller's companies)
/// POST   /                                        -> create
/// GET    /{company_id}                            -> get_by_id
/// PUT    /{company_id}                            -> update
///
/// GET    /{company_id}/members                    -> list_members
/// POST   /{company_id}/members                    -> invite_member
/// PUT    /{company_id}/members/{user_id}          -> change_member_role
/// DELETE /{company_id}/members/{user_id}          -> remove_member
///
/// GET    /{company_id}/projects                   -> list
/// POST   /{company_id}/projects                   -> create
/// GET    /{company_id}/projects/{id}              -> get_by_id
/// PUT    /{company_id}/projects/{id}              -> update
/// DELETE /{company_id}/projects/{id}              -> delete
///
/// .../projects/{project_id}/rdos                  -> RDO CRUD + workflow
/// .../projects/{project_id}/incidents             -> incident CRUD + resolve
///
/// GET    /{company_id}/comments                   -> list (by entity)
/// POST   /{company_id}/comments                   -> create
/// DELETE /{company_id}/comments/{id}              -> delete
///
/// GET    /{company_id}/attachments                -> list (by entity)
/// POST   /{company_id}/attachments                -> upload (multipart)
/// GET    /{company_id}/attachments/{id}/download  -> download URL
/// DELETE /{company_id}/attachments/{id}           -> delete
///
/// .../surveys                                     -> survey CRUD + lifecycle
/// .../billing/subscription, .../billing/usage     -> billing reads
/// .../inbox/...                                   -> conversations, templates
/// ```
pub fn router() -> Router<AppState> {
    let rdo_routes = Router::new()
        .route("/", get(rdo::list).post(rdo::create))
        .route(
            "/{id}",
            get(rdo::get_by_id).put(rdo::update).delete(rdo::delete),
        )
        .route("/{id}/submit", post(rdo::submit))
        .route("/{id}/approve", post(rdo::approve))
        .route("/{id}/reject", post(rdo::reject));

    let incident_routes = Router::new()
        .route("/", get(incident::list).post(incident::create))
        .route(
            "/{id}",
            get(incident::get_by_id)
                .put(incident::update)
                .delete(incident::delete),
        )
        .route("/{id}/resolve", post(incident::resolve));

    let project_routes = Router::new()
        .route("/", get(project::list).post(project::create))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .nest("/{project_id}/rdos", rdo_routes)
        .nest("/{project_id}/incidents", incident_routes);

    let survey_routes = Router::new()
        .route("/", get(survey::list).post(survey::create))
        .route("/{id}", get(survey::get_by_id))
        .route("/{id}/activate", post(survey::activate))
        .route("/{id}/archive", post(survey::archive))
        .route("/{id}/responses", get(survey::list_responses));

    let inbox_routes = Router::new()
        .route(
            "/conversations",
            get(inbox::list_conversations).post(inbox::create_conversation),
        )
        .route("/conversations/{id}", get(inbox::get_conversation))
        .route("/conversations/{id}/messages", post(inbox::append_message))
        .route("/conversations/{id}/close", post(inbox::close_conversation))
        .route(
            "/conversations/{id}/reopen",
            post(inbox::reopen_conversation),
        )
        .route("/conversations/{id}/suggestions", post(inbox::suggest))
        .route(
            "/templates",
            get(inbox::list_templates).post(inbox::create_template),
        )
        .route(
            "/templates/{id}",
            axum::routing::put(inbox::update_template).delete(inbox::delete_template),
        )
        .route(
            "/knowledge",
            get(inbox::list_knowledge_items).post(inbox::create_knowledge_item),
        )
        .route("/knowledge/{id}", delete(inbox::delete_knowledge_item));

    Router::new()
        .route("/", get(company::list).post(company::create))
        .route("/{company_id}", get(company::get_by_id).put(company::update))
        .route(
            "/{company_id}/members",
            get(company::list_members).post(company::invite_member),
        )
        .route(
            "/{company_id}/members/{user_id}",
            axum::routing::put(company::change_member_role).delete(company::remove_member),
        )
        .nest("/{company_id}/projects", project_routes)
        .route(
            "/{company_id}/comments",
            get(comment::list).post(comment::create),
        )
        .route("/{company_id}/comments/{id}", delete(comment::delete))
        .route(
            "/{company_id}/attachments",
            get(attachment::list).post(attachment::upload),
        )
        .route(
            "/{company_id}/attachments/{id}/download",
            get(attachment::download),
        )
        .route("/{company_id}/attachments/{id}", delete(attachment::delete))
        .nest("/{company_id}/surveys", survey_routes)
        .route(
            "/{company_id}/billing/subscription",
            get(billing::get_subscription),
        )
        .route("/{company_id}/billing/usage", get(billing::get_usage))
        .nest("/{company_id}/inbox", inbox_routes)
}
