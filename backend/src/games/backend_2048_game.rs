use axum::{
    extract::{Query, State, Json},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Serialize, Deserialize};
use sha2::Sha256;
use shared::shared_2048_game::{Cue, Direction, Game2048, Preferences, PublicGame2048};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Error;
use crate::services::preference_service::PreferenceBackend;

type HmacSha256 = Hmac<Sha256>;

const MAX_GAMES_PER_MINUTE: usize = 10;
const SIGNATURE_HEADER: &str = "X-Session-Signature";

pub struct Game2048Session {
    pub game: Game2048,
    pub created_at: f64,
    /// Bumped on every commit and reset so a stale scheduled spawn can tell it lost the race.
    pub turn: u64,
}

pub struct Game2048State {
    pub sessions: Mutex<HashMap<String, Game2048Session>>,
    pub preferences: PreferenceBackend,
    pub config: Config,
}

impl Game2048State {
    pub fn new(config: Config, preferences: PreferenceBackend) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            preferences,
            config,
        }
    }

    /// Drops sessions older than the configured expiry. Returns how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let now = now_secs();
        let expiry = self.config.session_expiry.as_secs_f64();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.created_at < expiry);
        before - sessions.len()
    }

    fn sign(&self, session_id: &str) -> Result<String, Error> {
        compute_signature(&self.config.secret, &session_message(session_id))
    }

    fn verify(&self, headers: &HeaderMap, session_id: &str) -> Result<(), Error> {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::MissingSignature)?;
        let provided = hex::decode(provided).map_err(|_| Error::InvalidSignature)?;
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes()).map_err(|_| Error::Internal)?;
        mac.update(session_message(session_id).as_bytes());
        mac.verify_slice(&provided).map_err(|_| Error::InvalidSignature)
    }

    async fn persist_high_score(&self, high_score: u32) {
        if let Err(e) = self.preferences.record_high_score(high_score).await {
            error!("Failed to persist high score {}: {}", high_score, e);
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn session_message(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn compute_signature(secret: &str, message: &str) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::Internal)?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Looks up a live session, evicting it if it has expired.
fn open_session<'a>(
    sessions: &'a mut HashMap<String, Game2048Session>,
    session_id: &str,
    expiry_secs: f64,
) -> Result<&'a mut Game2048Session, Error> {
    let expired = match sessions.get(session_id) {
        Some(session) => now_secs() - session.created_at >= expiry_secs,
        None => return Err(Error::SessionNotFound),
    };
    if expired {
        sessions.remove(session_id);
        return Err(Error::SessionExpired);
    }
    sessions.get_mut(session_id).ok_or(Error::SessionNotFound)
}

/// Spawns the pending tile for `turn`, unless the session moved on in the meantime.
/// Returns the high score to persist when a turn was resolved.
async fn resolve_turn(state: &Game2048State, session_id: &str, turn: u64) -> Option<u32> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(session_id)?;
    if session.turn != turn {
        debug!("Skipping stale tile spawn for session {}", session_id);
        return None;
    }
    let report = session.game.resolve_turn()?;
    if report.game_over {
        info!(
            "🎮 Game over in session {}! Final score: {} after {} moves in {}s (best tile {})",
            session_id,
            session.game.score(),
            session.game.move_count(),
            session.game.elapsed_secs(),
            session.game.grid().max_tile()
        );
    }
    Some(session.game.high_score())
}

#[derive(Serialize, Deserialize)]
pub struct NewGame2048Response {
    pub session_id: String,
    pub session_signature: String,
    pub show_tutorial: bool,
    pub preferences: Preferences,
    pub game: PublicGame2048,
}

async fn new_game(
    State(state): State<Arc<Game2048State>>,
) -> Result<Json<NewGame2048Response>, Error> {
    let now = now_secs();
    let mut sessions = state.sessions.lock().await;
    if sessions.values().filter(|s| now - s.created_at < 60.0).count() >= MAX_GAMES_PER_MINUTE {
        return Err(Error::TooManyGames);
    }

    let mut preferences = state.preferences.load().await?;
    let show_tutorial = state.preferences.take_tutorial().await?;
    preferences.tutorial_shown = true;

    let game = Game2048::new(preferences.high_score);
    let public = game.to_public();
    let session_id = Uuid::new_v4().to_string();
    let session_signature = state.sign(&session_id)?;

    sessions.insert(session_id.clone(), Game2048Session {
        game,
        created_at: now,
        turn: 0,
    });
    info!("New 2048 session {} ({} active)", session_id, sessions.len());

    Ok(Json(NewGame2048Response {
        session_id,
        session_signature,
        show_tutorial,
        preferences,
        game: public,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct MoveRequest {
    pub session_id: String,
    /// Direction name or arrow key name. Anything unrecognised is ignored.
    pub direction: String,
}

#[derive(Serialize, Deserialize)]
pub struct MoveResponse {
    pub moved: bool,
    pub merge_occurred: bool,
    pub score_delta: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cue: Option<Cue>,
    pub game: PublicGame2048,
}

async fn process_move(
    State(state): State<Arc<Game2048State>>,
    headers: HeaderMap,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, Error> {
    state.verify(&headers, &payload.session_id)?;

    let mut sessions = state.sessions.lock().await;
    let session = open_session(&mut sessions, &payload.session_id, state.config.session_expiry.as_secs_f64())?;

    let report = Direction::from_key(&payload.direction)
        .and_then(|direction| session.game.commit_move(direction));

    let Some(report) = report else {
        return Ok(Json(MoveResponse {
            moved: false,
            merge_occurred: false,
            score_delta: 0,
            cue: None,
            game: session.game.to_public(),
        }));
    };

    session.turn += 1;
    let turn = session.turn;
    let delay = state.config.spawn_delay;

    if delay.is_zero() {
        drop(sessions);
        if let Some(high_score) = resolve_turn(&state, &payload.session_id, turn).await {
            state.persist_high_score(high_score).await;
        }
    } else {
        let high_score = session.game.high_score();
        drop(sessions);
        state.persist_high_score(high_score).await;

        let scheduled = state.clone();
        let session_id = payload.session_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(high_score) = resolve_turn(&scheduled, &session_id, turn).await {
                scheduled.persist_high_score(high_score).await;
            }
        });
    }

    let sessions = state.sessions.lock().await;
    let session = sessions.get(&payload.session_id).ok_or(Error::SessionNotFound)?;
    let cue = if session.game.is_game_over() { Cue::GameOver } else { report.cue };

    Ok(Json(MoveResponse {
        moved: report.moved,
        merge_occurred: report.merge_occurred,
        score_delta: report.score_delta,
        cue: Some(cue),
        game: session.game.to_public(),
    }))
}

#[derive(Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct UndoResponse {
    pub undone: bool,
    pub game: PublicGame2048,
}

async fn undo(
    State(state): State<Arc<Game2048State>>,
    headers: HeaderMap,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<UndoResponse>, Error> {
    state.verify(&headers, &payload.session_id)?;

    let mut sessions = state.sessions.lock().await;
    let session = open_session(&mut sessions, &payload.session_id, state.config.session_expiry.as_secs_f64())?;
    let undone = session.game.undo();
    if undone {
        debug!("Undo in session {} (score {})", payload.session_id, session.game.score());
    }

    Ok(Json(UndoResponse {
        undone,
        game: session.game.to_public(),
    }))
}

#[derive(Serialize, Deserialize)]
pub struct GameResponse {
    pub game: PublicGame2048,
}

async fn reset(
    State(state): State<Arc<Game2048State>>,
    headers: HeaderMap,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<GameResponse>, Error> {
    state.verify(&headers, &payload.session_id)?;

    let mut sessions = state.sessions.lock().await;
    let session = open_session(&mut sessions, &payload.session_id, state.config.session_expiry.as_secs_f64())?;
    session.game.reset();
    session.turn += 1;
    info!("Session {} restarted", payload.session_id);

    Ok(Json(GameResponse {
        game: session.game.to_public(),
    }))
}

async fn refresh(
    State(state): State<Arc<Game2048State>>,
    headers: HeaderMap,
    Query(query): Query<SessionRequest>,
) -> Result<Json<GameResponse>, Error> {
    state.verify(&headers, &query.session_id)?;

    let mut sessions = state.sessions.lock().await;
    let session = open_session(&mut sessions, &query.session_id, state.config.session_expiry.as_secs_f64())?;
    Ok(Json(GameResponse {
        game: session.game.to_public(),
    }))
}

async fn get_preferences(
    State(state): State<Arc<Game2048State>>,
) -> Result<Json<Preferences>, Error> {
    Ok(Json(state.preferences.load().await?))
}

async fn toggle_sound(
    State(state): State<Arc<Game2048State>>,
) -> Result<Json<Preferences>, Error> {
    let preferences = state.preferences.toggle_sound().await?;
    info!("Sound {}", if preferences.sound_enabled { "enabled" } else { "disabled" });
    Ok(Json(preferences))
}

pub fn create_router() -> Router<Arc<Game2048State>> {
    Router::new()
        .route("/new", post(new_game))
        .route("/move", post(process_move))
        .route("/undo", post(undo))
        .route("/reset", post(reset))
        .route("/refresh", get(refresh))
        .route("/preferences", get(get_preferences))
        .route("/preferences/sound", post(toggle_sound))
}
