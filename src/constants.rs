/// Ambient configuration keys read by the crate.
/// Values are looked up through a `ConfigSource`, normally the process environment.

// Environment flag
pub const PUBLIC_ENV_VAR: &str = "PUBLIC_ENV";
pub const HOSTNAME_VAR: &str = "HOSTNAME";

// Auth service (Supabase)
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

// Database (libSQL)
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const DATABASE_AUTH_TOKEN_VAR: &str = "DATABASE_AUTH_TOKEN";

// Identity provider (Firebase) bundle, relayed to the browser
pub const FIREBASE_API_KEY_VAR: &str = "FIREBASE_API_KEY";
pub const FIREBASE_AUTH_DOMAIN_VAR: &str = "FIREBASE_AUTH_DOMAIN";
pub const FIREBASE_PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const FIREBASE_STORAGE_BUCKET_VAR: &str = "FIREBASE_STORAGE_BUCKET";
pub const FIREBASE_MESSAGING_SENDER_ID_VAR: &str = "FIREBASE_MESSAGING_SENDER_ID";
pub const FIREBASE_APP_ID_VAR: &str = "FIREBASE_APP_ID";

/// Hostnames that identify a QA deployment. Matched exactly, no port.
pub const QA_HOSTNAMES: [&str; 3] = ["localhost", "127.0.0.1", "qa.portal.app"];

// Session cookie layout, matching what the auth SDK writes in the browser
pub const SESSION_COOKIE_PREFIX: &str = "base64-";
pub const SESSION_COOKIE_CHUNK_SIZE: usize = 3180;
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

/// Access tokens this close to expiry are refreshed before use.
pub const SESSION_EXPIRY_MARGIN_SECS: i64 = 90;
