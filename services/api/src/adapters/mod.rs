pub mod credential_cache;
pub mod db;

pub use credential_cache::FileCredentialCache;
pub use db::DbAdapter;
