use redis::AsyncCommands;
use shared::shared_2048_game::{MemoryPreferenceStore, PreferenceStore, Preferences};
use tracing::{info, trace};

use crate::error::Error;

const HIGH_SCORE_KEY: &str = "2048:high_score";
const SOUND_ENABLED_KEY: &str = "2048:sound_enabled";
const TUTORIAL_SHOWN_KEY: &str = "2048:tutorial_shown";

// Each script touches a single key and runs atomically on the server.
const RAISE_HIGH_SCORE_SCRIPT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local candidate = tonumber(ARGV[1])
if candidate > current then
    redis.call('SET', KEYS[1], ARGV[1])
    return candidate
end
return current
";

const TOGGLE_SOUND_SCRIPT: &str = r"
local enabled = redis.call('GET', KEYS[1]) ~= '0'
if enabled then
    redis.call('SET', KEYS[1], '0')
    return 0
end
redis.call('SET', KEYS[1], '1')
return 1
";

const TAKE_TUTORIAL_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == '1' then
    return 0
end
redis.call('SET', KEYS[1], '1')
return 1
";

/// Where player preferences are kept: redis when configured, otherwise process memory.
#[derive(Clone)]
pub enum PreferenceBackend {
    Redis(redis::Client),
    Memory(MemoryPreferenceStore),
}

impl PreferenceBackend {
    pub fn from_url(redis_url: Option<&str>) -> Result<Self, Error> {
        match redis_url {
            Some(url) => {
                info!("Storing preferences in redis");
                Ok(PreferenceBackend::Redis(redis::Client::open(url)?))
            }
            None => {
                info!("REDIS_URL not set, keeping preferences in memory");
                Ok(PreferenceBackend::Memory(MemoryPreferenceStore::default()))
            }
        }
    }

    pub async fn load(&self) -> Result<Preferences, Error> {
        match self {
            PreferenceBackend::Memory(store) => Ok(store.load()),
            PreferenceBackend::Redis(client) => {
                let mut conn = client.get_async_connection().await?;
                let defaults = Preferences::default();
                let high_score: Option<u32> = conn.get(HIGH_SCORE_KEY).await?;
                let sound_enabled: Option<bool> = conn.get(SOUND_ENABLED_KEY).await?;
                let tutorial_shown: Option<bool> = conn.get(TUTORIAL_SHOWN_KEY).await?;
                Ok(Preferences {
                    high_score: high_score.unwrap_or(defaults.high_score),
                    sound_enabled: sound_enabled.unwrap_or(defaults.sound_enabled),
                    tutorial_shown: tutorial_shown.unwrap_or(defaults.tutorial_shown),
                })
            }
        }
    }

    /// Persists `score` as the new high score if it beats the stored one.
    pub async fn record_high_score(&self, score: u32) -> Result<u32, Error> {
        match self {
            PreferenceBackend::Memory(store) => Ok(store.update(|preferences| {
                if preferences.record_score(score) {
                    trace!("New high score {}", score);
                }
                preferences.high_score
            })),
            PreferenceBackend::Redis(client) => {
                let mut conn = client.get_async_connection().await?;
                let high_score: u32 = redis::Script::new(RAISE_HIGH_SCORE_SCRIPT)
                    .key(HIGH_SCORE_KEY)
                    .arg(score)
                    .invoke_async(&mut conn)
                    .await?;
                Ok(high_score)
            }
        }
    }

    pub async fn toggle_sound(&self) -> Result<Preferences, Error> {
        match self {
            PreferenceBackend::Memory(store) => Ok(store.update(|preferences| {
                preferences.toggle_sound();
                *preferences
            })),
            PreferenceBackend::Redis(client) => {
                let mut conn = client.get_async_connection().await?;
                let _: bool = redis::Script::new(TOGGLE_SOUND_SCRIPT)
                    .key(SOUND_ENABLED_KEY)
                    .invoke_async(&mut conn)
                    .await?;
                self.load().await
            }
        }
    }

    /// Returns true if the tutorial has not been shown before, recording that it now has.
    pub async fn take_tutorial(&self) -> Result<bool, Error> {
        match self {
            PreferenceBackend::Memory(store) => Ok(store.update(|preferences| preferences.mark_tutorial_shown())),
            PreferenceBackend::Redis(client) => {
                let mut conn = client.get_async_connection().await?;
                let first_time: bool = redis::Script::new(TAKE_TUTORIAL_SCRIPT)
                    .key(TUTORIAL_SHOWN_KEY)
                    .invoke_async(&mut conn)
                    .await?;
                Ok(first_time)
            }
        }
    }
}
