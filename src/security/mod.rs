//! Security utilities: response headers and authentication timing

pub mod headers;
pub mod timing;

pub use headers::{with_api_security_headers, with_upload_security_headers};
pub use timing::{add_auth_delay, AuthTimer};
