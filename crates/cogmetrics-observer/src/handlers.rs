//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory [`ObserverSnapshot`] via the
//! shared [`AppState`]. Projections are computed on demand from the
//! mirrored records.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Run identity, status, and step count |
//! | `GET` | `/api/history` | Recorded steps (`?from=N&limit=M`) |
//! | `GET` | `/api/latest` | Most recent record |
//! | `GET` | `/api/series` | One metric over time (`?metric=logic`) |
//! | `GET` | `/api/phase-space` | Logic vs aesthetic trajectory |
//! | `GET` | `/api/heatmap` | Probability heatmap (`?buckets=N`) |
//! | `GET` | `/api/summary` | Mean / last / min / max per metric |
//! | `GET` | `/api/table` | Probability mass per token |
//!
//! [`ObserverSnapshot`]: crate::state::ObserverSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use cogmetrics_core::views;
use cogmetrics_types::{MetricKind, TokenId};

use crate::error::ObserverError;
use crate::state::AppState;

/// Default number of records returned by `GET /api/history`.
const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Upper bound on records returned by one `GET /api/history` call.
const MAX_HISTORY_LIMIT: usize = 10_000;

/// Default number of heatmap columns.
const DEFAULT_HEATMAP_BUCKETS: usize = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/history` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// First step to return (default 0).
    pub from: Option<u64>,
    /// Maximum number of records to return (default 1000, max 10000).
    pub limit: Option<usize>,
}

/// Query parameters for the `GET /api/series` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct SeriesQuery {
    /// Metric name: `logic`, `aesthetic`, `understanding`, or `utility`.
    pub metric: Option<String>,
}

/// Query parameters for the `GET /api/heatmap` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct HeatmapQuery {
    /// Maximum number of step buckets (default 50).
    pub buckets: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the latest metrics and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let status = format!("{:?}", snapshot.status).to_uppercase();
    let run_id = snapshot
        .run
        .as_ref()
        .map_or_else(|| String::from("-"), |run| run.run_id.to_string());
    let seed = snapshot
        .run
        .as_ref()
        .map_or_else(|| String::from("-"), |run| run.seed.to_string());
    let steps = snapshot.records.len();
    let latest = snapshot.records.last().map(cogmetrics_types::MetricRecord::values);
    let fmt = |kind: MetricKind| latest.map_or_else(|| String::from("-"), |v| format!("{:.4}", v.get(kind)));
    let logic = fmt(MetricKind::Logic);
    let aesthetic = fmt(MetricKind::Aesthetic);
    let understanding = fmt(MetricKind::Understanding);
    let utility = fmt(MetricKind::Utility);
    drop(snapshot);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Cognitive Metrics Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Emergent Cognitive Metrics</h1>
    <p class="subtitle">Run {run_id} (seed {seed})</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Steps</div>
            <div class="value">{steps}</div>
        </div>
        <div class="metric">
            <div class="label">Logic</div>
            <div class="value">{logic}</div>
        </div>
        <div class="metric">
            <div class="label">Aesthetic</div>
            <div class="value">{aesthetic}</div>
        </div>
        <div class="metric">
            <div class="label">Understanding</div>
            <div class="value">{understanding}</div>
        </div>
        <div class="metric">
            <div class="label">Utility</div>
            <div class="value">{utility}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/status">/api/status</a> -- Run identity and progress</li>
        <li><a href="/api/history">/api/history</a> -- Recorded steps (?from=N&amp;limit=M)</li>
        <li><a href="/api/latest">/api/latest</a> -- Most recent record</li>
        <li><a href="/api/series?metric=understanding">/api/series</a> -- One metric over time (?metric=NAME)</li>
        <li><a href="/api/phase-space">/api/phase-space</a> -- Logic vs aesthetic trajectory</li>
        <li><a href="/api/heatmap">/api/heatmap</a> -- Token probability heatmap (?buckets=N)</li>
        <li><a href="/api/summary">/api/summary</a> -- Per-metric statistics</li>
        <li><a href="/api/table">/api/table</a> -- Probability mass per token</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li style="list-style:none;"><code>ws://host:port/ws/records</code> -- Live record stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return the run identity, lifecycle status, and progress.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let body = serde_json::json!({
        "run": serde_json::to_value(&snapshot.run)?,
        "status": snapshot.status,
        "steps": snapshot.records.len(),
        "latest_step": snapshot.records.last().map(|r| r.step),
    });
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /api/history
// ---------------------------------------------------------------------------

/// Return a window of recorded steps.
///
/// # Query Parameters
///
/// - `from`: first step to include (default 0)
/// - `limit`: maximum records to return (default 1000, capped at 10000)
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let from = usize::try_from(params.from.unwrap_or(0)).unwrap_or(usize::MAX);

    let snapshot = state.snapshot.read().await;
    let records: Vec<_> = snapshot.records.iter().skip(from).take(limit).collect();
    let body = serde_json::json!({
        "count": records.len(),
        "total": snapshot.records.len(),
        "records": serde_json::to_value(&records)?,
    });
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /api/latest
// ---------------------------------------------------------------------------

/// Return the most recent record, or 404 before the first step.
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let latest = snapshot
        .records
        .last()
        .ok_or_else(|| ObserverError::NotFound(String::from("no steps recorded yet")))?;
    Ok(Json(serde_json::to_value(latest)?))
}

// ---------------------------------------------------------------------------
// GET /api/series
// ---------------------------------------------------------------------------

/// Return one metric as parallel step and value arrays.
///
/// # Query Parameters
///
/// - `metric`: `logic` | `aesthetic` | `understanding` | `utility`
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeriesQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let name = params.metric.ok_or_else(|| {
        ObserverError::InvalidQuery(String::from(
            "missing metric (expected logic, aesthetic, understanding, or utility)",
        ))
    })?;
    let metric: MetricKind = name.parse().map_err(ObserverError::InvalidQuery)?;

    let snapshot = state.snapshot.read().await;
    let series = views::time_series(&snapshot.records, metric);
    drop(snapshot);
    Ok(Json(serde_json::to_value(series)?))
}

// ---------------------------------------------------------------------------
// GET /api/phase-space
// ---------------------------------------------------------------------------

/// Return the logic vs aesthetic trajectory with understanding weights.
pub async fn get_phase_space(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let points = views::phase_space(&snapshot.records);
    drop(snapshot);
    let body = serde_json::json!({
        "count": points.len(),
        "points": serde_json::to_value(points)?,
    });
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /api/heatmap
// ---------------------------------------------------------------------------

/// Return the token probability heatmap.
///
/// # Query Parameters
///
/// - `buckets`: maximum number of step buckets (default 50, must be > 0)
pub async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HeatmapQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let buckets = params.buckets.unwrap_or(DEFAULT_HEATMAP_BUCKETS);
    if buckets == 0 {
        return Err(ObserverError::InvalidQuery(String::from(
            "buckets must be at least 1",
        )));
    }

    let snapshot = state.snapshot.read().await;
    let heatmap = views::heatmap(&snapshot.records, buckets);
    drop(snapshot);
    let heatmap =
        heatmap.ok_or_else(|| ObserverError::NotFound(String::from("no steps recorded yet")))?;
    Ok(Json(serde_json::to_value(heatmap)?))
}

// ---------------------------------------------------------------------------
// GET /api/summary
// ---------------------------------------------------------------------------

/// Return mean / last / min / max per metric.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let summary = views::summarize(&snapshot.records);
    drop(snapshot);
    let summary =
        summary.ok_or_else(|| ObserverError::NotFound(String::from("no steps recorded yet")))?;
    Ok(Json(serde_json::to_value(summary)?))
}

// ---------------------------------------------------------------------------
// GET /api/table
// ---------------------------------------------------------------------------

/// Return the probability mass of every token.
pub async fn get_table(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let run = snapshot
        .run
        .as_ref()
        .ok_or_else(|| ObserverError::NotFound(String::from("run has not started")))?;

    let tokens: Vec<_> = snapshot
        .probabilities
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| {
            let token = TokenId::try_from(idx).ok()?;
            Some(serde_json::json!({
                "token": token,
                "label": token.to_string(),
                "probability": p,
            }))
        })
        .collect();

    let body = serde_json::json!({
        "vocabulary_size": run.vocabulary_size,
        "power_law_exponent": run.power_law_exponent,
        "tokens": tokens,
    });
    Ok(Json(body))
}
