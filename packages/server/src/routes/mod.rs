use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::content;
use crate::state::AppState;

/// Content routes; every kind shares the same shape under `/{kind}`.
pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(content::create_record))
        .routes(routes!(content::list_raw))
        .routes(routes!(content::list_localized))
        .routes(routes!(content::get_record))
        .routes(routes!(content::get_localized_record))
        .routes(routes!(content::update_record))
        .routes(routes!(content::delete_record))
}
