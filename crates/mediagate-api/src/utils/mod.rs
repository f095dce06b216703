pub mod public_url;
pub mod ssrf_validation;
pub mod url_fetch;

pub use public_url::{public_file_url, RequestOrigin};
pub use ssrf_validation::{validate_url, UrlPolicy, UrlRejection};
pub use url_fetch::{FetchError, HostResolver, SystemResolver, UrlFetcher};
