//! Actix-web server for the Etymap lookup API (feature-gated)

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, atomic::{AtomicU64, Ordering}};
use std::time::{Duration, Instant};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, http::StatusCode, middleware, web};
use serde::Serialize;
use tokio::runtime::Runtime;

use super::LookupSource;
use crate::lang_data::index::DataIndex;
use crate::persistence::settings::AppSettings;

// Store server state for stop/restart
struct ServerState {
    handle: Option<actix_web::dev::ServerHandle>,
    runtime: Option<Runtime>,
    // bumped on every start and stop; a run only touches the handle while it is current
    generation: u64,
}

static SERVER_STATE: once_cell::sync::Lazy<Arc<Mutex<ServerState>>> = once_cell::sync::Lazy::new(|| {
    Arc::new(Mutex::new(ServerState { handle: None, runtime: None, generation: 0 }))
});

static REQ_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Shared per-app data handed to every handler.
#[derive(Clone)]
pub struct ServerCtx {
    pub index: Arc<DataIndex>,
    pub log_dir: Option<PathBuf>,
}

fn log_line(dir: Option<&Path>, line: &str) {
    use std::io::Write;
    log::info!("{}", line);
    let Some(dir) = dir else { return };
    let now = time::OffsetDateTime::now_utc();
    let date = time::macros::format_description!("[year][month][day]");
    let ts = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let fname = match now.format(&date) { Ok(s) => format!("api_{}.log", s), Err(_) => "api.log".to_string() };
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let ts_s = now.format(&ts).unwrap_or_else(|_| String::new());
    let msg = format!("{} | {}\n", ts_s, line);
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(dir.join(fname)) {
        let _ = f.write_all(msg.as_bytes());
    }
}

fn next_request_id() -> String {
    let n = REQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{}-{}", now, n)
}

#[derive(Serialize)]
struct ErrorDto {
    error: String,
}

fn respond<T: Serialize>(ctx: &ServerCtx, req: &HttpRequest, result: crate::error::Result<T>, t0: Instant) -> HttpResponse {
    let rid = next_request_id();
    let peer = req.peer_addr().map(|a| a.to_string()).unwrap_or_else(|| "unknown".into());
    let dt = t0.elapsed().as_millis();
    match result {
        Ok(body) => {
            log_line(ctx.log_dir.as_deref(), &format!("RID={} {} {} from {} OK dt_ms={}", rid, req.method(), req.path(), peer, dt));
            HttpResponse::Ok().json(body)
        }
        Err(e) => {
            let status = if e.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::INTERNAL_SERVER_ERROR };
            log_line(ctx.log_dir.as_deref(), &format!("RID={} {} {} from {} ERR {} dt_ms={}", rid, req.method(), req.path(), peer, e, dt));
            HttpResponse::build(status).json(ErrorDto { error: e.to_string() })
        }
    }
}

async fn handle_word(ctx: web::Data<ServerCtx>, req: HttpRequest, path: web::Path<(String, String)>) -> impl Responder {
    let t0 = Instant::now();
    let (word, lang) = path.into_inner();
    respond(&ctx, &req, ctx.index.word(&word, &lang), t0)
}

async fn handle_lang(ctx: web::Data<ServerCtx>, req: HttpRequest, path: web::Path<String>) -> impl Responder {
    let t0 = Instant::now();
    let iso = path.into_inner();
    respond(&ctx, &req, ctx.index.language(&iso), t0)
}

async fn handle_relation(ctx: web::Data<ServerCtx>, req: HttpRequest, path: web::Path<(String, String)>) -> impl Responder {
    let t0 = Instant::now();
    let (src, dst) = path.into_inner();
    respond(&ctx, &req, ctx.index.pair(&src, &dst), t0)
}

async fn handle_search(ctx: web::Data<ServerCtx>, req: HttpRequest, path: web::Path<String>) -> impl Responder {
    let t0 = Instant::now();
    let query = path.into_inner();
    respond(&ctx, &req, ctx.index.search(&query), t0)
}

/// Registers the lookup routes; shared by the server and the endpoint tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/word/{word}/{lang}", web::get().to(handle_word))
        .route("/lang/{isocode}", web::get().to(handle_lang))
        .route("/relation/{iso1}/{iso2}", web::get().to(handle_relation))
        .route("/search/{query}", web::get().to(handle_search));
}

async fn serve(bind: String, ctx: ServerCtx, generation: u64) -> std::io::Result<()> {
    log_line(ctx.log_dir.as_deref(), &format!("Server starting on {}", bind));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ctx.clone()))
            // lookups are plain cross-origin GETs
            .wrap(middleware::DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*")))
            .configure(configure)
    })
    .bind(&bind)?
    .run();
    {
        let mut st = SERVER_STATE.lock().unwrap_or_else(|p| p.into_inner());
        if st.generation != generation {
            // stopped before it finished binding
            drop(st);
            let _ = server.handle().stop(false);
            return server.await;
        }
        st.handle = Some(server.handle());
    }
    server.await
}

/// Runs the server on the current thread until it is stopped.
pub fn run_blocking(cfg: &AppSettings, index: Arc<DataIndex>) -> anyhow::Result<()> {
    let bind = cfg.api_endpoint();
    let ctx = ServerCtx { index, log_dir: Some(cfg.api_log_dir()) };
    let generation = SERVER_STATE.lock().unwrap_or_else(|p| p.into_inner()).generation;
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(serve(bind.clone(), ctx, generation))
        .map_err(|e| anyhow::anyhow!("API server on {} failed: {}", bind, e))
}

/// Starts the server on a background thread, replacing any running instance.
pub fn start_server(cfg: &AppSettings, index: Arc<DataIndex>) -> anyhow::Result<()> {
    let bind = cfg.api_endpoint();
    let log_dir = cfg.api_log_dir();
    stop_server();
    let generation = {
        let mut st = SERVER_STATE.lock().unwrap_or_else(|p| p.into_inner());
        st.generation += 1;
        st.generation
    };

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build() {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to create tokio runtime for API: {}", e);
                    return;
                }
            };

        let ctx = ServerCtx { index, log_dir: Some(log_dir) };
        if let Err(e) = rt.block_on(serve(bind.clone(), ctx, generation)) {
            log::error!("API server on {} stopped: {}", bind, e);
        }
        let mut st = SERVER_STATE.lock().unwrap_or_else(|p| p.into_inner());
        if st.generation == generation {
            st.handle = None;
            st.runtime = Some(rt);
        } else {
            // a newer run owns the state; let this runtime go off the lock
            drop(st);
            rt.shutdown_background();
        }
    });
    Ok(())
}

pub fn stop_server() {
    let (handle, rt) = {
        let mut st = SERVER_STATE.lock().unwrap_or_else(|p| p.into_inner());
        st.generation += 1;
        (st.handle.take(), st.runtime.take())
    };
    if let Some(h) = handle {
        let _ = h.stop(false);
    }
    if let Some(r) = rt {
        r.shutdown_timeout(Duration::from_millis(100));
    }
}

pub fn is_running() -> bool {
    SERVER_STATE.lock().map(|st| st.handle.is_some()).unwrap_or(false)
}
