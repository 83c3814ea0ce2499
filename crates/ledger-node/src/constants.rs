pub const DEFAULT_P2P_PORT: u16 = 8080;
pub const DEFAULT_P2P_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_HTTP_LISTEN: &str = "127.0.0.1:8081";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Upper bound on a single WebSocket message; a full chain travels as one message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_MINING_ROUNDS: u32 = 3;
pub const LOCALHOST: &str = "127.0.0.1";
