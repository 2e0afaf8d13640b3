//! Configuration constants for the social backend


/// Default server configuration
pub mod server {
    /// Default HTTP listening host
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default HTTP server port
    pub const DEFAULT_PORT: u16 = 8080;

    /// Name reported by the health endpoint and the JSON logger
    pub const SERVICE_NAME: &str = "social-backend";
}

/// Database configuration
pub mod database {
    /// Default maximum database connections
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

    /// Default database connection timeout in seconds
    pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 15;

    /// Default PostgreSQL database URL
    pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/social";
}

/// Pagination configuration
pub mod pagination {
    /// Page size used when the request does not carry `pageSize`
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Smallest accepted page size
    pub const MIN_PAGE_SIZE: usize = 1;

    /// Largest accepted page size
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Upper bound on the length of an incoming cursor token
    pub const MAX_CURSOR_LEN: usize = 1024;

    /// Bytes of the HMAC-SHA256 tag appended to every cursor
    pub const CURSOR_TAG_LEN: usize = 16;

    /// Cursor signing secret used when none is configured
    pub const DEFAULT_CURSOR_SECRET: &[u8] = b"social-backend-cursor";

    /// Separator between the timestamp and the id of a composite key
    pub const COMPOSITE_KEY_SEPARATOR: char = '|';
}

/// API configuration constants
pub mod api {
    /// Header carrying the user id resolved by the identity gateway
    pub const USER_ID_HEADER: &str = "x-user-id";

    /// Chat type used for one-to-one conversations
    pub const DIRECT_CHAT_TYPE: &str = "direct";

    /// Chat type used for conversations with more than two participants
    pub const GROUP_CHAT_TYPE: &str = "group";
}

/// Fixture data served in mock mode
#[cfg(feature = "mocks")]
pub mod mocks {
    use uuid::Uuid;

    pub const DEMO_ALICE_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0a11);
    pub const DEMO_BOB_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0b0b);
    pub const DEMO_CAROL_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0ca7);

    /// Posts seeded per demo user
    pub const DEMO_POSTS_PER_USER: usize = 12;

    /// Messages seeded in the demo direct chat
    pub const DEMO_MESSAGES: usize = 25;
}
