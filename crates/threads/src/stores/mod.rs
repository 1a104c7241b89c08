mod db;
mod http;

pub use db::DbStore;
pub use http::HttpStore;
