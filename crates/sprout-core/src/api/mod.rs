pub mod client;
pub mod transport;

pub use client::{session_headers, ApiClient, SESSION_ID_HEADER, USER_ID_HEADER};
pub use transport::{Headers, HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
