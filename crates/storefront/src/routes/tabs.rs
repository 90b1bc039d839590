//! Tab lifecycle, navigation and the per-tab event stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use bad_marketplace_core::{ContextId, Page};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::tabs::{OpenTabError, Tab, TabEvent, TabId};

/// Body for opening a tab.
#[derive(Debug, Default, Deserialize)]
pub struct OpenTabRequest {
    #[serde(default)]
    pub page: Page,
}

/// Body for switching pages.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub page: Page,
}

/// A tab as seen by its client.
#[derive(Debug, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub count: u64,
    pub page: Page,
}

impl From<OpenTabError> for AppError {
    fn from(err: OpenTabError) -> Self {
        match err {
            OpenTabError::Storage(e) => Self::Storage(e),
            OpenTabError::LimitReached(_) => Self::TooManyTabs,
        }
    }
}

/// Resolve a tab from its path segment.
pub(crate) async fn lookup(state: &AppState, raw: &str) -> Result<Arc<Tab>> {
    let id: ContextId = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid tab id: {raw}")))?;
    state
        .tabs()
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("tab {id}")))
}

/// Open a tab. It loads whatever cart the shared storage holds.
#[instrument(skip(state, body))]
pub async fn open(
    State(state): State<AppState>,
    body: Option<Json<OpenTabRequest>>,
) -> Result<(StatusCode, Json<TabInfo>)> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let tab = state
        .tabs()
        .open(
            state.storage(),
            state.catalog().clone(),
            state.config().shipping,
            request.page,
        )
        .await?;

    let count = tab.cart().await.count();
    Ok((
        StatusCode::CREATED,
        Json(TabInfo {
            id: tab.id(),
            count,
            page: tab.presenter().page(),
        }),
    ))
}

/// Close a tab.
#[instrument(skip(state))]
pub async fn close(State(state): State<AppState>, Path(tab): Path<String>) -> Result<StatusCode> {
    let tab = lookup(&state, &tab).await?;
    state.tabs().close(tab.id()).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Switch the page a tab is showing.
#[instrument(skip(state))]
pub async fn navigate(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<TabInfo>> {
    let tab = lookup(&state, &tab).await?;
    tab.navigate(request.page).await;

    let count = tab.cart().await.count();
    Ok(Json(TabInfo {
        id: tab.id(),
        count,
        page: request.page,
    }))
}

/// A tab's event subscription that closes the tab when the last one drops.
struct EventSubscription {
    receiver: Option<broadcast::Receiver<TabEvent>>,
    state: AppState,
    tab_id: TabId,
}

impl EventSubscription {
    async fn recv(&mut self) -> std::result::Result<TabEvent, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        // Unsubscribe before the registry counts the remaining subscribers
        drop(self.receiver.take());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = self.state.clone();
        let tab_id = self.tab_id;
        runtime.spawn(async move {
            state.tabs().close_if_unwatched(tab_id).await;
        });
    }
}

/// Server-sent events for one tab.
///
/// The stream starts with the current counter and then relays notifications,
/// counter refreshes and cart renders until the tab is closed. When the last
/// stream of a tab disconnects, the tab is closed too.
#[instrument(skip(state))]
pub async fn events(
    State(state): State<AppState>,
    Path(tab): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let tab = lookup(&state, &tab).await?;
    let tab_id = tab.id();
    let mut subscription = EventSubscription {
        receiver: Some(tab.presenter().subscribe()),
        state: state.clone(),
        tab_id,
    };
    let initial = TabEvent::Counter {
        count: tab.cart().await.count(),
    };
    drop(tab);

    let stream = async_stream::stream! {
        if let Some(event) = to_sse(&initial) {
            yield Ok::<_, Infallible>(event);
        }
        loop {
            match subscription.recv().await {
                Ok(event) => {
                    if let Some(event) = to_sse(&event) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(tab_id = %tab_id, skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &TabEvent) -> Option<Event> {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode tab event");
            None
        }
    }
}
