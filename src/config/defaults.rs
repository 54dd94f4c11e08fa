pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_MIN_IDLE: u32 = 2;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_VERIFICATION_TTL_HOURS: i64 = 24;
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_TOKEN_RETENTION_HOURS: i64 = 0;

pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
pub const MAX_VERIFICATION_TTL_HOURS: i64 = 24 * 30;
pub const MAX_RESET_TTL_MINUTES: i64 = 60 * 24 * 7;
pub const MAX_TOKEN_RETENTION_HOURS: i64 = 24 * 365 * 10;
