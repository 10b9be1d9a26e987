use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use super::settings::Assets;

/// `/` always resolves to the entry document, everything else is looked up
/// under the static root. Unknown paths fall through to a 404.
pub fn assets_router<S>(assets: &Assets) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let index = assets.root.join(&assets.index);
    Router::new()
        .route_service("/", ServeFile::new(index))
        .fallback_service(ServeDir::new(&assets.root))
}
