/// Application name
pub const APP_NAME: &str = "CycleIt";

/// Maximum number of images attached to one listing
pub const MAX_LISTING_IMAGES: usize = 5;

/// Maximum listing title length in characters
pub const MAX_TITLE_LEN: usize = 120;

/// Maximum listing description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Maximum message length in characters
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Maximum image size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default session lifetime in hours (one week)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// Bearer token size in bytes before hex encoding
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Categories seeded on first start
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Books",
    "Clothing",
    "Electronics",
    "Furniture",
    "Garden",
    "Kitchen",
    "Sports",
    "Toys",
    "Other",
];
