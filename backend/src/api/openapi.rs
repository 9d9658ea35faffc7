//! OpenAPI document generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Top-level OpenAPI document for the Journal Desk API.
///
/// Handler modules contribute their paths and schemas through per-module
/// `#[derive(OpenApi)]` structs merged in `build_openapi`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Journal Desk API",
        description = "Editorial workflow backend: submissions, tasks, files, discussions and peer review.",
        version = "0.1.0",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "dashboard", description = "Editor dashboard counters"),
        (name = "submissions", description = "Submission queues and workflow"),
        (name = "tasks", description = "Editorial task board"),
        (name = "files", description = "Submission files per stage"),
        (name = "participants", description = "Stage participants"),
        (name = "discussions", description = "Editorial queries and notes"),
        (name = "publications", description = "Publication versions and metadata"),
        (name = "review", description = "Review rounds and reviewer assignment"),
        (name = "reviewer", description = "Reviewer assignments and reports"),
        (name = "author", description = "Author access to their submissions"),
        (name = "health", description = "Health and readiness checks"),
    ),
    components(schemas(ErrorResponse))
)]
pub struct ApiDoc;

/// Error body returned by every endpoint on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub ok: bool,
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// Human-readable error message
    pub error: String,
}

/// Adds Bearer JWT security scheme to the OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    use super::handlers;

    let mut doc = ApiDoc::openapi();
    doc.merge(handlers::dashboard::DashboardApiDoc::openapi());
    doc.merge(handlers::submissions::SubmissionsApiDoc::openapi());
    doc.merge(handlers::tasks::TasksApiDoc::openapi());
    doc.merge(handlers::files::FilesApiDoc::openapi());
    doc.merge(handlers::participants::ParticipantsApiDoc::openapi());
    doc.merge(handlers::queries::QueriesApiDoc::openapi());
    doc.merge(handlers::publications::PublicationsApiDoc::openapi());
    doc.merge(handlers::review_rounds::ReviewRoundsApiDoc::openapi());
    doc.merge(handlers::reviewer::ReviewerApiDoc::openapi());
    doc.merge(handlers::author::AuthorApiDoc::openapi());
    doc.merge(handlers::health::HealthApiDoc::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_editor_and_reviewer_paths() {
        let doc = build_openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/editor/tasks"));
        assert!(paths.contains_key("/api/editor/submissions/{id}/files/copy"));
        assert!(paths.contains_key("/api/reviewer/assignments/{id}/accept"));
        assert!(paths.contains_key("/api/author/submissions/{id}/files"));
        assert!(paths.contains_key("/api/editor/submissions/{id}/publications/versions"));
        assert!(paths.contains_key(
            "/api/editor/submissions/{id}/publications/{version_id}/metadata"
        ));
        assert!(paths.contains_key("/api/reviewer/assignments/{id}/review-form"));
        assert!(paths.contains_key("/health"));
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = build_openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
