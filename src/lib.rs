//! Download proxy library.
//!
//! Proxies file downloads from a URL carried in the request path, adding
//! CORS and `Content-Disposition` headers and, optionally, rewriting links in
//! HTML pages so they route back through the proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
