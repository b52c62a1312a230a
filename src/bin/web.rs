//! HTTP surface for the standings engine: score set/edit/delete, access pre-check, recording.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST, PORT, RECORDERS (comma separated recorder addresses).
//!
//! The acting user is passed in each request body by the gateway in front of this service.

use actix_web::{
    delete, get, http::StatusCode, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::Utc;
use league_standings::services::RecorderPool;
use league_standings::{
    Actor, Caller, CompetitionId, Contester, ContesterId, FieldChange, InMemoryStore, MatchId,
    MatchScore, NewMatch, ResultController, ScoringMode, StandingsError, TeamId, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

type AppState = Data<ResultController<InMemoryStore>>;

/// How often expired recorder reservations are released.
const RECORDER_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct ActorBody {
    actor: Actor,
}

#[derive(Deserialize)]
struct CreateCompetitionBody {
    actor: Actor,
    name: String,
    #[serde(default)]
    mode: ScoringMode,
}

#[derive(Deserialize)]
struct RegisterContesterBody {
    actor: Actor,
    name: String,
    team_id: TeamId,
    #[serde(default)]
    rank: i32,
    #[serde(default)]
    cumulative_score: i32,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
struct CreateMatchBody {
    actor: Actor,
    #[serde(rename = "match")]
    draft: NewMatch,
    /// Users to notify once the match is stored.
    #[serde(default)]
    subscribers: Vec<UserId>,
}

#[derive(Deserialize)]
struct ScoreBody {
    actor: Actor,
    score1: i32,
    score2: i32,
}

#[derive(Deserialize)]
struct AccessBody {
    #[serde(default)]
    actor: Option<Actor>,
    changes: Vec<FieldChange>,
}

#[derive(Serialize)]
struct AccessResponse {
    allowed: bool,
}

#[derive(Deserialize)]
struct RecordingBody {
    actor: Actor,
    address: String,
    password: String,
}

#[derive(Deserialize)]
struct PredictionBody {
    user: UserId,
    score1: i32,
    score2: i32,
}

/// Path segment: competition id (e.g. /api/competitions/{id})
#[derive(Deserialize)]
struct CompetitionPath {
    id: CompetitionId,
}

/// Path segments: competition id and match id
#[derive(Deserialize)]
struct MatchPath {
    id: CompetitionId,
    match_id: MatchId,
}

/// Path segments: competition id and contester id
#[derive(Deserialize)]
struct ContesterPath {
    id: CompetitionId,
    contester_id: ContesterId,
}

fn status_of(e: &StandingsError) -> StatusCode {
    match e {
        StandingsError::Validation(_) => StatusCode::BAD_REQUEST,
        StandingsError::Unauthorized => StatusCode::FORBIDDEN,
        StandingsError::RecorderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        StandingsError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StandingsError::CompetitionNotFound(_)
        | StandingsError::ContesterNotFound(_)
        | StandingsError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        StandingsError::InvariantViolation(_) | StandingsError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Serialize a result: the value on success, `{ "error": ... }` with a matching status otherwise.
fn respond<T: Serialize>(result: Result<T, StandingsError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => {
            if matches!(e, StandingsError::InvariantViolation(_)) {
                log::error!("Rejected transition: {}", e);
            }
            HttpResponse::build(status_of(&e)).json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "league-standings",
    })
}

/// Create a competition (admin).
#[post("/api/competitions")]
async fn api_create_competition(state: AppState, body: Json<CreateCompetitionBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.create_competition(caller, &body.name, body.mode))
}

/// Competition with its table and matches.
#[get("/api/competitions/{id}")]
async fn api_get_competition(state: AppState, path: Path<CompetitionPath>) -> HttpResponse {
    respond(state.standings(path.id))
}

/// Delete a competition, reversing and evicting all its matches (admin).
#[delete("/api/competitions/{id}")]
async fn api_delete_competition(state: AppState, path: Path<CompetitionPath>, body: Json<ActorBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.delete_competition(caller, path.id))
}

/// Ledger recount: contesters whose record disagrees with their finished matches.
#[get("/api/competitions/{id}/audit")]
async fn api_audit(state: AppState, path: Path<CompetitionPath>) -> HttpResponse {
    respond(state.audit_standings(path.id))
}

/// Enter a contester (admin).
#[post("/api/competitions/{id}/contesters")]
async fn api_register_contester(
    state: AppState,
    path: Path<CompetitionPath>,
    body: Json<RegisterContesterBody>,
) -> HttpResponse {
    let mut contester = Contester::new(path.id, body.team_id, body.name.trim())
        .with_rank(body.rank)
        .with_score(body.cumulative_score);
    contester.active = body.active;
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.register_contester(caller, contester))
}

/// Delete a contester and every match it played (admin).
#[delete("/api/competitions/{id}/contesters/{contester_id}")]
async fn api_delete_contester(state: AppState, path: Path<ContesterPath>, body: Json<ActorBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.delete_contester(caller, path.id, path.contester_id))
}

/// Schedule a match, optionally already finished (admin).
#[post("/api/competitions/{id}/matches")]
async fn api_create_match(state: AppState, path: Path<CompetitionPath>, body: Json<CreateMatchBody>) -> HttpResponse {
    let body = body.into_inner();
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.create_match(caller, path.id, body.draft, &body.subscribers))
}

/// Delete a match, reversing its result (admin).
#[delete("/api/competitions/{id}/matches/{match_id}")]
async fn api_delete_match(state: AppState, path: Path<MatchPath>, body: Json<ActorBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.delete_match(caller, path.id, path.match_id))
}

/// Record the first score of a match.
#[post("/api/competitions/{id}/matches/{match_id}/score")]
async fn api_record_score(state: AppState, path: Path<MatchPath>, body: Json<ScoreBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    let result = MatchScore::new(body.score1, body.score2)
        .and_then(|score| state.record_score(caller, path.id, path.match_id, score));
    respond(result)
}

/// Correct the score of a finished match.
#[put("/api/competitions/{id}/matches/{match_id}/score")]
async fn api_correct_score(state: AppState, path: Path<MatchPath>, body: Json<ScoreBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    let result = MatchScore::new(body.score1, body.score2)
        .and_then(|score| state.correct_score(caller, path.id, path.match_id, score));
    respond(result)
}

/// Withdraw a match's score.
#[delete("/api/competitions/{id}/matches/{match_id}/score")]
async fn api_clear_score(state: AppState, path: Path<MatchPath>, body: Json<ActorBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.clear_score(caller, path.id, path.match_id))
}

/// Would these field changes be accepted? Changes nothing.
#[post("/api/competitions/{id}/matches/{match_id}/access")]
async fn api_check_access(state: AppState, path: Path<MatchPath>, body: Json<AccessBody>) -> HttpResponse {
    let result = state
        .check_access(body.actor.as_ref(), path.id, path.match_id, &body.changes, Utc::now())
        .map(|allowed| AccessResponse { allowed });
    respond(result)
}

/// Reserve a recorder for the match.
#[post("/api/competitions/{id}/matches/{match_id}/recording")]
async fn api_request_recording(state: AppState, path: Path<MatchPath>, body: Json<RecordingBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.request_recording(
        caller,
        path.id,
        path.match_id,
        &body.address,
        &body.password,
    ))
}

/// Release the match's recorder.
#[delete("/api/competitions/{id}/matches/{match_id}/recording")]
async fn api_release_recording(state: AppState, path: Path<MatchPath>, body: Json<ActorBody>) -> HttpResponse {
    let caller = Caller::new(&body.actor, Utc::now());
    respond(state.release_recording(caller, path.id, path.match_id))
}

/// Predict the score of a match not played yet.
#[post("/api/competitions/{id}/matches/{match_id}/predictions")]
async fn api_predict(state: AppState, path: Path<MatchPath>, body: Json<PredictionBody>) -> HttpResponse {
    let result = MatchScore::new(body.score1, body.score2)
        .and_then(|score| state.predict(path.id, path.match_id, body.user, score));
    respond(result)
}

/// Predictions for a match, with `correct` set once it is finished.
#[get("/api/competitions/{id}/matches/{match_id}/predictions")]
async fn api_predictions(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    respond(state.predictions(path.id, path.match_id))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn recorder_addresses() -> Vec<String> {
    std::env::var("RECORDERS")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);

    let addresses = recorder_addresses();
    log::info!("Recorder pool: {} recorder(s)", addresses.len());
    let recorders = Arc::new(RecorderPool::new(addresses));
    let controller = ResultController::new(InMemoryStore::new()).with_recorders(recorders.clone());
    let state = Data::new(controller);

    // Background task: free reservations of matches that ended long ago
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(RECORDER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let released = recorders.release_expired(Utc::now());
            if released > 0 {
                log::info!("Released {} expired recorder reservation(s)", released);
            }
        }
    });

    log::info!("Starting server at http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_competition)
            .service(api_get_competition)
            .service(api_delete_competition)
            .service(api_audit)
            .service(api_register_contester)
            .service(api_delete_contester)
            .service(api_create_match)
            .service(api_delete_match)
            .service(api_record_score)
            .service(api_correct_score)
            .service(api_clear_score)
            .service(api_check_access)
            .service(api_request_recording)
            .service(api_release_recording)
            .service(api_predict)
            .service(api_predictions)
    })
    .bind(bind)?
    .run()
    .await
}
