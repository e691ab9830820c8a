use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use hexcomp_engine::{
    decode_share, encode_share, relevant_augments, resolve, resolve_active, share_url, summarize,
    team_export, Board, BoardError, Catalog, ChampionQuery, CompositionStore, DuplicatePolicy,
    ShareError, StoreError,
};
use hexcomp_protocol::{
    Augment, BoardView, CatalogInfo, ChampionView, EquipRequest, ImportShareRequest, ItemGroups,
    MoveRequest, PlaceRequest, PlacedChampion, SaveTeamRequest, ShareRequest, ShareResponse,
    SynergyView, TeamComposition, TeamExport, Trait,
};
use serde::Deserialize;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod loader;


pub const DEFAULT_PORT: u16 = 39333;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// The single owner of the board. Every mutation goes through one lock, so
/// requests apply one at a time in arrival order.
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub board: Mutex<Board>,
    pub store: CompositionStore,
}

impl AppState {
    pub fn new(catalog: Catalog, store: CompositionStore, policy: DuplicatePolicy) -> Self {
        Self {
            catalog: Arc::new(catalog),
            board: Mutex::new(Board::new(policy)),
            store,
        }
    }

    fn board(&self) -> Result<MutexGuard<'_, Board>, (StatusCode, String)> {
        self.board
            .lock()
            .map_err(|_| internal("board state lock poisoned"))
    }

    fn view(&self, board: &Board) -> BoardView {
        let champions = board.champions();
        BoardView {
            champions: champions.to_vec(),
            synergies: resolve_active(&self.catalog.traits, champions)
                .iter()
                .map(|a| a.to_view())
                .collect(),
            summary: summarize(&self.catalog.traits, champions),
            augments: relevant_augments(&self.catalog.augments, champions)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/catalog", get(api_catalog))
        .route("/api/champions", get(api_champions))
        .route("/api/traits", get(api_traits))
        .route("/api/items", get(api_items))
        .route("/api/augments", get(api_augments))
        .route("/api/board", get(api_board))
        .route("/api/synergies", get(api_synergies))
        .route("/api/board/place", post(api_board_place))
        .route("/api/board/move", post(api_board_move))
        .route("/api/board/clear", post(api_board_clear))
        .route("/api/board/champions/{id}", delete(api_board_remove))
        .route("/api/board/champions/{id}/items", post(api_board_equip))
        .route(
            "/api/board/champions/{id}/items/{index}",
            delete(api_board_unequip),
        )
        .route("/api/teams", get(api_teams_list).post(api_teams_save))
        .route("/api/teams/rev", get(api_teams_rev))
        .route("/api/teams/{id}", delete(api_teams_delete))
        .route("/api/teams/{id}/load", post(api_teams_load))
        .route("/api/teams/{id}/export", get(api_teams_export))
        .route("/api/share", post(api_share))
        .route("/api/share/import", post(api_share_import))
        .with_state(Arc::new(state))
        // Local security: loopback peers only.
        .layer(middleware::from_fn(ip_allowlist))
        // Never use `Access-Control-Allow-Origin: *`; a random page in the browser
        // could otherwise rewrite the board or read saved teams.
        .layer(local_only_cors())
}

fn internal(msg: impl Into<String>) -> (StatusCode, String) {
    let msg = msg.into();
    tracing::error!(error = %msg, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, msg)
}

fn board_error(e: BoardError) -> (StatusCode, String) {
    let status = match e {
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::OutOfBounds(_) => StatusCode::BAD_REQUEST,
        BoardError::Occupied(_)
        | BoardError::Duplicate(_)
        | BoardError::SlotsFull(_)
        | BoardError::BoardFull => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NameRequired | StoreError::EmptyTeam => (StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        other => internal(other.to_string()),
    }
}

fn share_error(e: ShareError) -> (StatusCode, String) {
    match e {
        ShareError::Board(b) => board_error(b),
        ShareError::Decode(_)
        | ShareError::Json(_)
        | ShareError::UnknownChampion(_)
        | ShareError::UnknownItem(_) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn not_found(what: &str, id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("unknown {what} {id}"))
}

async fn health() -> &'static str {
    "ok"
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn api_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogInfo> {
    Json(state.catalog.info())
}

#[derive(Debug, Default, Deserialize)]
struct ChampionParams {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    cost: Option<u8>,
    #[serde(default, rename = "trait")]
    trait_name: Option<String>,
}

async fn api_champions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChampionParams>,
) -> Json<Vec<ChampionView>> {
    let query = ChampionQuery {
        search: params.search,
        cost: params.cost,
        trait_name: params.trait_name,
    };
    Json(
        state
            .catalog
            .search_champions(&query)
            .into_iter()
            .map(ChampionView::from)
            .collect(),
    )
}

async fn api_traits(State(state): State<Arc<AppState>>) -> Json<Vec<Trait>> {
    Json(state.catalog.traits.clone())
}

#[derive(Debug, Default, Deserialize)]
struct ItemParams {
    #[serde(default)]
    search: Option<String>,
}

async fn api_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ItemParams>,
) -> Json<ItemGroups> {
    Json(state.catalog.group_items(params.search.as_deref()))
}

async fn api_augments(State(state): State<Arc<AppState>>) -> Json<Vec<Augment>> {
    Json(state.catalog.augments.clone())
}

async fn api_board(State(state): State<Arc<AppState>>) -> ApiResult<BoardView> {
    let board = state.board()?;
    Ok(Json(state.view(&board)))
}

#[derive(Debug, Default, Deserialize)]
struct SynergyParams {
    #[serde(default)]
    all: bool,
}

async fn api_synergies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SynergyParams>,
) -> ApiResult<Vec<SynergyView>> {
    let board = state.board()?;
    let activations = if params.all {
        resolve(&state.catalog.traits, board.champions())
    } else {
        resolve_active(&state.catalog.traits, board.champions())
    };
    Ok(Json(activations.iter().map(|a| a.to_view()).collect()))
}

async fn api_board_place(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PlaceRequest>,
) -> ApiResult<PlacedChampion> {
    let champion = state
        .catalog
        .champion(&input.champion_id)
        .ok_or_else(|| not_found("champion", &input.champion_id))?;
    let mut board = state.board()?;
    let placed = match input.position {
        Some(position) => board.place(champion, position),
        None => board.place_first_empty(champion),
    }
    .map_err(board_error)?;
    Ok(Json(placed.clone()))
}

async fn api_board_move(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MoveRequest>,
) -> ApiResult<BoardView> {
    let mut board = state.board()?;
    board
        .move_to(&input.placed_id, input.position)
        .map_err(board_error)?;
    Ok(Json(state.view(&board)))
}

async fn api_board_remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<BoardView> {
    let mut board = state.board()?;
    board.remove(&id);
    Ok(Json(state.view(&board)))
}

async fn api_board_equip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<EquipRequest>,
) -> ApiResult<PlacedChampion> {
    let item = state
        .catalog
        .item(&input.item_id)
        .ok_or_else(|| not_found("item", &input.item_id))?;
    let mut board = state.board()?;
    board.equip_item(&id, item).map_err(board_error)?;
    let placed = board
        .get(&id)
        .cloned()
        .ok_or_else(|| not_found("placed champion", &id))?;
    Ok(Json(placed))
}

async fn api_board_unequip(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<PlacedChampion> {
    let mut board = state.board()?;
    board.unequip_item(&id, index);
    let placed = board
        .get(&id)
        .cloned()
        .ok_or_else(|| not_found("placed champion", &id))?;
    Ok(Json(placed))
}

async fn api_board_clear(State(state): State<Arc<AppState>>) -> ApiResult<BoardView> {
    let mut board = state.board()?;
    board.clear();
    Ok(Json(state.view(&board)))
}

async fn api_teams_list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<TeamComposition>> {
    state.store.list().map(Json).map_err(store_error)
}

/// Saved-list revision; changes whenever a team is saved or deleted.
async fn api_teams_rev(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let rev = state.store.get_rev().map_err(store_error)?;
    Ok(Json(serde_json::json!({ "rev": rev })))
}

async fn api_teams_save(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SaveTeamRequest>,
) -> ApiResult<TeamComposition> {
    let snapshot = state.board()?.snapshot();
    state
        .store
        .save(&input.name, input.description.as_deref(), &snapshot)
        .map(Json)
        .map_err(store_error)
}

async fn api_teams_load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<BoardView> {
    let team = state.store.get(&id).map_err(store_error)?;
    let mut board = state.board()?;
    board.load(team.champions);
    tracing::info!(%id, name = %team.name, "team loaded onto board");
    Ok(Json(state.view(&board)))
}

async fn api_teams_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if !state.store.delete(&id).map_err(store_error)? {
        return Err(not_found("team", &id));
    }
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

async fn api_teams_export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TeamExport> {
    let team = state.store.get(&id).map_err(store_error)?;
    Ok(Json(team_export(&team)))
}

async fn api_share(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ShareRequest>,
) -> ApiResult<ShareResponse> {
    let snapshot = state.board()?.snapshot();
    let code = encode_share(&input.name, &input.description, &snapshot).map_err(share_error)?;
    let origin = input
        .origin
        .unwrap_or_else(|| format!("http://127.0.0.1:{DEFAULT_PORT}"));
    Ok(Json(ShareResponse {
        url: share_url(&origin, &code),
        code,
    }))
}

async fn api_share_import(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ImportShareRequest>,
) -> ApiResult<BoardView> {
    let team = decode_share(&input.code).map_err(share_error)?;
    let mut board = state.board()?;
    let imported = team
        .hydrate(&state.catalog, board.policy())
        .map_err(share_error)?;
    board.load(imported.snapshot());
    tracing::info!(name = %team.name, units = board.len(), "shared team imported");
    Ok(Json(state.view(&board)))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_listener(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "hexcomp server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(addr)
}

async fn ip_allowlist(
    axum::extract::ConnectInfo(peer): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let ip = peer.ip();
    if is_allowed_peer_ip(ip) {
        return next.run(req).await;
    }
    tracing::warn!(%ip, "rejected non-local peer");
    (StatusCode::FORBIDDEN, "forbidden").into_response()
}

fn is_allowed_peer_ip(ip: IpAddr) -> bool {
    ip.is_loopback()
}

fn local_only_cors() -> CorsLayer {
    use axum::http::header;
    use axum::http::HeaderValue;
    use axum::http::Method;

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _req| {
            is_allowed_local_origin(origin)
        }))
}

fn is_allowed_local_origin(origin: &axum::http::HeaderValue) -> bool {
    let Ok(s) = origin.to_str() else {
        return false;
    };
    is_http_origin_for_host(s, "localhost") || is_http_origin_for_host(s, "127.0.0.1")
}

fn is_http_origin_for_host(origin: &str, host: &str) -> bool {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = origin.strip_prefix(scheme) {
            if let Some(after) = rest.strip_prefix(host) {
                // Origin is just scheme://host[:port]
                return after.is_empty() || after.starts_with(':');
            }
        }
    }
    false
}

const DASHBOARD_HTML: &str = r###"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>hexcomp planner</title>
  <style>
    :root{--bg:#0b1220;--panel:#131c2e;--edge:#2a3a5a;--ink:#e6eefc;--muted:#8a9bb8;
      --bronze:#b87333;--silver:#c0c0c0;--gold:#e5b73b;--prismatic:#b48cff}
    *{box-sizing:border-box;margin:0;padding:0}
    body{font-family:system-ui,sans-serif;background:var(--bg);color:var(--ink);padding:16px}
    h1{font-size:16px;margin-bottom:12px}
    .layout{display:grid;grid-template-columns:240px 1fr 260px;gap:12px}
    .panel{background:var(--panel);border:1px solid var(--edge);border-radius:10px;padding:10px}
    .panel h2{font-size:13px;margin-bottom:8px;color:var(--muted)}
    .lib{display:flex;flex-direction:column;gap:6px;max-height:70vh;overflow:auto}
    .champ{padding:6px 8px;border:1px solid var(--edge);border-radius:8px;cursor:pointer;font-size:12px}
    .champ:hover{border-color:var(--gold)}
    .champ.uncommon{border-left:3px solid #3fae5a}.champ.rare{border-left:3px solid #3a7bd5}
    .champ.epic{border-left:3px solid #a23fd5}.champ.legendary{border-left:3px solid var(--gold)}
    .grid{position:relative;height:300px}
    .hex{position:absolute;width:72px;height:72px;clip-path:polygon(50% 0,100% 25%,100% 75%,50% 100%,0 75%,0 25%);
      background:#1c2740;display:flex;align-items:center;justify-content:center;font-size:11px;text-align:center;cursor:pointer}
    .hex.occupied{background:#2d4a7a}
    .syn{display:flex;justify-content:space-between;font-size:12px;padding:4px 6px;border-radius:6px;margin-bottom:4px;background:#1c2740}
    .s1{background:var(--bronze);color:#000}.s2{background:var(--silver);color:#000}
    .s3{background:var(--gold);color:#000}.s4{background:var(--prismatic);color:#fff}
    .sum{font-size:12px;color:var(--muted);margin-top:8px}
  </style>
</head>
<body>
  <h1>hexcomp planner</h1>
  <div class="layout">
    <section class="panel"><h2>Champions</h2><div id="lib" class="lib"></div></section>
    <section class="panel"><h2>Board (click a unit to remove)</h2><div id="grid" class="grid"></div></section>
    <section class="panel"><h2>Synergies</h2><div id="syn"></div><div id="sum" class="sum"></div></section>
  </div>
  <script>
  (function(){
    const $ = (id) => document.getElementById(id);
    function esc(s){
      return String(s).replace(/[&<>"]/g, (c) => ({ "&":"&amp;", "<":"&lt;", ">":"&gt;", "\"":"&quot;" }[c]));
    }
    async function call(method, url, body){
      const r = await fetch(url, { method, headers: { "content-type": "application/json" },
        body: body ? JSON.stringify(body) : undefined });
      if (!r.ok) { alert(await r.text()); return null; }
      return r.json();
    }
    function render(view){
      const grid = $("grid");
      grid.innerHTML = "";
      for (let row = 0; row < 4; row++){
        for (let col = 0; col < 7; col++){
          const pc = view.champions.find(c => c.position.x === col && c.position.y === row);
          const el = document.createElement("div");
          el.className = "hex" + (pc ? " occupied" : "");
          el.style.left = (col * 76 + (row % 2 ? 38 : 0)) + "px";
          el.style.top = (row * 64) + "px";
          el.innerHTML = pc ? esc(pc.champion.name) + "<br>" + pc.items.length + "/3" : "";
          if (pc) el.addEventListener("click", async () => {
            const v = await call("DELETE", "/api/board/champions/" + encodeURIComponent(pc.id));
            if (v) render(v);
          });
          grid.appendChild(el);
        }
      }
      $("syn").innerHTML = view.synergies.length === 0
        ? "<div class=\"sum\">No traits active. Place champions to see synergies.</div>"
        : view.synergies.map(s => `<div class="syn ${s.style ? "s" + s.style : ""}"><span>${esc(s.name)}</span>` +
            `<span>${s.count} · ${esc(s.styleLabel)}</span></div>`).join("");
      $("sum").textContent = `${view.summary.units} units · cost ${view.summary.totalCost} · ${view.summary.goldOrBetter} gold+`;
    }
    async function init(){
      const champs = await call("GET", "/api/champions");
      for (const c of champs || []){
        const el = document.createElement("div");
        el.className = "champ " + c.rarity;
        el.innerHTML = `<strong>${esc(c.name)}</strong> (${c.cost}) <span>${esc(c.traits.join(", "))}</span>`;
        el.addEventListener("click", async () => {
          if (await call("POST", "/api/board/place", { championId: c.id })) render(await call("GET", "/api/board"));
        });
        $("lib").appendChild(el);
      }
      render(await call("GET", "/api/board"));
    }
    init();
  })();
  </script>
</body>
</html>
"###;
