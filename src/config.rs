use serde::Deserialize;

/// Config, from a TOML file whose path is the first CLI argument.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// <address>:<port> to serve the blog API on
    pub listen_address: String,

    /// <address>:<port> to serve metrics on
    pub metrics_address: String,

    /// By default, output JSON logs. Only if this flag is set to true, output colourful human-friendly logs
    pub human_logs: bool,

    /// Max HTTP body size the API accepts
    #[serde(default = "max_body_size")]
    pub max_body_size: usize,

    /// DSN to connect to the database.
    pub db_dsn: String,

    /// maximum number of connections maintained by PostgresStore
    pub db_pool_size: u32,

    /// maximum seconds waiting for a database connection
    pub db_connection_timeout: u64,

    /// Secret used to sign session and password-reset tokens.
    pub session_secret: String,

    /// How long a session cookie stays valid, in seconds.
    #[serde(default = "session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// Bearer token required by the /admin endpoints.
    pub admin_token: String,

    /// How many posts each listing page holds.
    #[serde(default = "posts_per_page")]
    pub posts_per_page: usize,

    /// How long the rendered index page may be served from cache, in seconds.
    #[serde(default = "index_cache_ttl_secs")]
    pub index_cache_ttl_secs: u64,
}

impl Config {
    /// Will crash if file isn't found or config is invalid.
    pub fn from_file(filepath: &str) -> Self {
        let contents = std::fs::read_to_string(filepath).expect("Couldn't read from config file");
        toml::from_str(&contents).expect("couldn't parse config file")
    }
}

fn max_body_size() -> usize {
    65536
}

fn session_ttl_secs() -> i64 {
    1_209_600
}

fn posts_per_page() -> usize {
    10
}

fn index_cache_ttl_secs() -> u64 {
    20
}
