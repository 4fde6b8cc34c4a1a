//! Common test utilities for E2E tests

use chrono::{DateTime, NaiveDate, Utc};
use takosu::data::{Comment, EntityId, Episode, HelpMessage, User};
use takosu::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    ///
    /// Poll timings are shrunk so timeout-path tests finish in well under
    /// two seconds instead of the production 25.
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            admin: config::AdminConfig {
                username: "admin".to_string(),
                password: None,
            },
            polling: config::PollingConfig {
                timeout_ms: 1_500,
                comment_interval_ms: 50,
                chat_interval_ms: 50,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client; redirects stay visible to the tests
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = takosu::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a user directly in the database plus a session token for them
    pub async fn create_user(&self, username: &str, is_superuser: bool) -> (User, String) {
        use takosu::auth::password::hash_password;
        use takosu::auth::{Session, create_session_token};

        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            password_hash: hash_password("password123").unwrap(),
            icon: None,
            is_superuser,
            created_at: Utc::now(),
        };
        self.state.db.insert_user(&user).await.unwrap();

        let session = Session::for_user(&user, self.state.config.auth.session_max_age);
        let token =
            create_session_token(&session, &self.state.config.auth.session_secret).unwrap();

        (user, token)
    }

    /// Seed an anime with a single episode
    pub async fn seed_episode(&self, anime_title: &str, number: i64) -> Episode {
        use takosu::data::Anime;

        if self.state.db.get_anime(anime_title).await.unwrap().is_none() {
            self.state
                .db
                .insert_anime(&Anime {
                    title: anime_title.to_string(),
                    description: "A show".to_string(),
                    image_detail: None,
                    image_card: None,
                    release_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
                    total_episodes: 12,
                    like_count: 0,
                })
                .await
                .unwrap();
        }

        let episode = Episode {
            id: EntityId::new().0,
            anime_title: anime_title.to_string(),
            episode_number: number,
            title: format!("{} - Episode {}", anime_title, number),
            release_date: NaiveDate::from_ymd_opt(2020, 4, 8).unwrap(),
            video_url: None,
            image_url: None,
        };
        self.state.db.insert_episode(&episode).await.unwrap();

        episode
    }

    /// Insert a comment with an explicit creation timestamp (microseconds)
    pub async fn seed_comment(&self, episode: &Episode, user: &User, content: &str, micros: i64) {
        self.state
            .db
            .insert_comment(&Comment {
                id: EntityId::new().0,
                episode_id: episode.id.clone(),
                anime_title: episode.anime_title.clone(),
                user_id: user.id.clone(),
                content: content.to_string(),
                created_at: at_micros(micros),
            })
            .await
            .unwrap();
    }

    /// Insert a help message with an explicit creation timestamp
    pub async fn seed_message(
        &self,
        conversation_id: &str,
        sender: &User,
        recipient: Option<&User>,
        text: &str,
        micros: i64,
    ) {
        self.state
            .db
            .insert_message(&HelpMessage {
                id: EntityId::new().0,
                conversation_id: conversation_id.to_string(),
                sender_id: sender.id.clone(),
                recipient_id: recipient.map(|user| user.id.clone()),
                message: text.to_string(),
                created_at: at_micros(micros),
            })
            .await
            .unwrap();
    }
}

/// Timestamp from microseconds since the epoch
pub fn at_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap()
}
