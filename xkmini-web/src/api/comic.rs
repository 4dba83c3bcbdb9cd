//! Comic page
//!
//! `GET /` and `POST /` share one flow. The `id` query parameter picks the
//! comic (latest when absent, clamped into the known range otherwise); a POST
//! carrying `favorite` stores the comic before rendering. Requests sent with
//! an `HX-Request` header get the fragment alone instead of the full page.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use xkmini_common::db::NewFavorite;
use xkmini_common::Comic;

use crate::error::{new_trace_id, ApiResult};
use crate::services::{
    clamp_id, parse_requested_id, LookupError, Navigation, RequestedId, UpstreamError,
};
use crate::views::{FragmentView, Notice, MSG_SAVE_FAILED};
use crate::AppState;

/// Header htmx sets on its own requests
pub const HX_REQUEST: &str = "hx-request";

#[derive(Debug, Default, Deserialize)]
pub struct ComicQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoriteForm {
    pub favorite: Option<String>,
}

/// GET /
pub async fn show_comic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ComicQuery>,
) -> ApiResult<Response> {
    let (status, view) = build_view(&state, query.id.as_deref(), false).await;
    render(&state, &headers, status, &view)
}

/// POST /
pub async fn submit_comic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ComicQuery>,
    Form(form): Form<FavoriteForm>,
) -> ApiResult<Response> {
    let favorite = form.favorite.is_some();
    let (status, view) = build_view(&state, query.id.as_deref(), favorite).await;
    render(&state, &headers, status, &view)
}

fn render(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    view: &FragmentView,
) -> ApiResult<Response> {
    let body = if is_fragment_request(headers) {
        state.templates.render_fragment(view)?
    } else {
        state.templates.render_page(view)?
    };
    Ok((status, Html(body)).into_response())
}

/// True when the request asks for a fragment
pub fn is_fragment_request(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .map(|v| !v.as_bytes().is_empty())
        .unwrap_or(false)
}

/// Status code for a failed lookup
pub fn lookup_status(err: &LookupError) -> StatusCode {
    match err {
        LookupError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LookupError::Upstream(UpstreamError::Transport(_)) => StatusCode::BAD_GATEWAY,
        LookupError::Upstream(_) => StatusCode::NOT_FOUND,
    }
}

fn lookup_failure(err: LookupError) -> (StatusCode, FragmentView) {
    warn!("Comic lookup failed: {}", err);
    (lookup_status(&err), FragmentView::error(err.user_message()))
}

async fn build_view(
    state: &AppState,
    raw_id: Option<&str>,
    favorite: bool,
) -> (StatusCode, FragmentView) {
    let requested = parse_requested_id(raw_id);
    if requested == RequestedId::Invalid {
        let err = LookupError::InvalidArgument(0);
        return (lookup_status(&err), FragmentView::error(err.user_message()));
    }

    let latest = match state.lookup.get_latest().await {
        Ok(comic) => comic,
        Err(e) => return lookup_failure(e),
    };
    let ceiling = u32::try_from(latest.num).unwrap_or(1);

    let comic = match requested {
        RequestedId::Number(n) => {
            let id = clamp_id(n, ceiling);
            if i64::from(id) == latest.num {
                latest
            } else {
                match state.lookup.get_by_number(i64::from(id)).await {
                    Ok(comic) => comic,
                    Err(e) => return lookup_failure(e),
                }
            }
        }
        _ => latest,
    };

    if favorite {
        return save_favorite(state, &comic).await;
    }

    let favorited = is_favorited(state, comic.num).await;
    let current = u32::try_from(comic.num).unwrap_or(1);
    (
        StatusCode::OK,
        FragmentView::comic(&comic, Navigation::around(current, ceiling)).favorited(favorited),
    )
}

/// Store lookup for the button state; a failed read shows the button enabled
async fn is_favorited(state: &AppState, num: i64) -> bool {
    match state.store.get_favorite(num).await {
        Ok(entry) => entry.is_some(),
        Err(e) => {
            warn!("Could not check favorite state of comic {}: {}", num, e);
            false
        }
    }
}

async fn save_favorite(state: &AppState, comic: &Comic) -> (StatusCode, FragmentView) {
    if comic.publication_date().is_none() {
        warn!(
            "Comic {} has unusable date fields {:?}-{:?}-{:?}; storing without a date",
            comic.num, comic.year, comic.month, comic.day
        );
    }

    match state.store.add_favorite(&NewFavorite::from(comic)).await {
        Ok(true) => (StatusCode::OK, FragmentView::notice(Notice::added())),
        Ok(false) => {
            info!("Comic {} was already a favorite", comic.num);
            (StatusCode::OK, FragmentView::notice(Notice::already_favorite()))
        }
        Err(e) => {
            let trace_id = new_trace_id();
            error!(trace_id = %trace_id, "Saving favorite {} failed: {}", comic.num, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                FragmentView::error(MSG_SAVE_FAILED),
            )
        }
    }
}
