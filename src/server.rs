use crate::config::AppConfig;
use crate::control::OverlayControl;
use crate::data;
use crate::error::TreeError;
use crate::export::leaf_feature_collection;
use crate::map::MapView;
use crate::registry::{LayerTree, Visibility};
use crate::taxonomy::Taxonomy;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

const DEFAULT_QUERY_RADIUS: f64 = 32.0;

// (leaf index, marker index) into the published tree
type IndexedMarker = GeomWithData<[f64; 2], (usize, usize)>;

/// A layer tree together with its spatial index, published as one unit.
pub struct Published {
    pub tree: LayerTree,
    index: RTree<IndexedMarker>,
}

impl Published {
    pub fn new(tree: LayerTree) -> Self {
        let items: Vec<IndexedMarker> = tree
            .leaves()
            .iter()
            .enumerate()
            .flat_map(|(leaf, group)| {
                group
                    .markers
                    .iter()
                    .enumerate()
                    .map(move |(i, m)| GeomWithData::new([m.x, m.y], (leaf, i)))
            })
            .collect();

        info!("Building spatial index for {} markers...", items.len());
        let index = RTree::bulk_load(items);
        Self { tree, index }
    }

    /// Markers within `radius` of `(x, y)`, nearest first.
    pub fn query(&self, x: f64, y: f64, radius: f64) -> Vec<QueryHit> {
        let leaves = self.tree.leaves();
        let mut hits: Vec<QueryHit> = self
            .index
            .locate_within_distance([x, y], radius * radius)
            .filter_map(|item| {
                let (leaf, i) = item.data;
                let group = leaves.get(leaf)?;
                let marker = group.markers.get(i)?;
                let [mx, my] = *item.geom();
                Some(QueryHit {
                    key: group.key.clone(),
                    label: group.label.clone(),
                    x: marker.x,
                    y: marker.y,
                    amount: marker.label.clone(),
                    distance: ((mx - x).powi(2) + (my - y).powi(2)).sqrt(),
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub taxonomy: Arc<Taxonomy>,
    pub overlays: RwLock<Option<Published>>,
}

impl AppState {
    pub fn new(config: AppConfig, taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            config,
            taxonomy,
            overlays: RwLock::new(None),
        }
    }

    pub async fn publish(&self, tree: LayerTree) {
        let published = Published::new(tree);
        *self.overlays.write().await = Some(published);
        info!("Marker layers published");
    }
}

#[derive(Deserialize)]
pub struct MapParams {
    dpr: Option<f64>,
}

#[derive(Deserialize)]
pub struct VisibilityRequest {
    path: Vec<String>,
    visible: bool,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct VisibilityResponse {
    path: Vec<String>,
    state: Visibility,
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
    radius: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub key: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub distance: f64,
}

pub fn router(state: Arc<AppState>) -> Router {
    let tile_service = ServeDir::new(&state.config.server.tile_dir);
    let site_service = ServeDir::new(&state.config.server.site_dir);

    Router::new()
        .route("/api/map", get(map_handler))
        .route("/api/overlays", get(overlays_handler))
        .route("/api/overlays/visibility", post(visibility_handler))
        .route("/api/layers/:key", get(layer_handler))
        .route("/api/query", get(query_handler))
        .nest_service("/tiles", tile_service)
        .fallback_service(site_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, taxonomy: Arc<Taxonomy>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, taxonomy));

    // The base map is served right away; marker layers follow once the
    // document has loaded. A failed load leaves them absent.
    let loader = state.clone();
    tokio::spawn(async move {
        let path = loader.config.input.markers.clone();
        if let Some(tree) = data::load_layer_tree(&path, &loader.taxonomy).await {
            loader.publish(tree).await;
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Json<MapView> {
    Json(MapView::new(&state.config.map, params.dpr.unwrap_or(1.0)))
}

async fn overlays_handler(State(state): State<Arc<AppState>>) -> Json<OverlayControl> {
    let overlays = state.overlays.read().await;
    Json(OverlayControl::new(
        &state.config.map,
        &state.config.icons,
        overlays.as_ref().map(|p| &p.tree),
    ))
}

async fn visibility_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<VisibilityResponse>, StatusCode> {
    let mut overlays = state.overlays.write().await;
    let published = overlays.as_mut().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    match published.tree.set_visible(request.path.as_slice(), request.visible) {
        Ok(visibility) => Ok(Json(VisibilityResponse {
            path: request.path,
            state: visibility,
        })),
        Err(TreeError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(TreeError::NotToggleable(_)) => Err(StatusCode::CONFLICT),
    }
}

async fn layer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<FeatureCollection>, StatusCode> {
    let overlays = state.overlays.read().await;
    let published = overlays.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let group = published.tree.leaf(&key).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(leaf_feature_collection(group)))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<QueryHit>>, StatusCode> {
    let radius = params.radius.unwrap_or(DEFAULT_QUERY_RADIUS);
    if !(radius >= 0.0 && radius.is_finite()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let overlays = state.overlays.read().await;
    let hits = match overlays.as_ref() {
        Some(published) => published.query(params.x, params.y, radius),
        None => Vec::new(),
    };
    Ok(Json(hits))
}
