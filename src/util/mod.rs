pub mod datetime;
pub mod http;
pub mod opener;
pub mod text;
