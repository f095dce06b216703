pub mod health;
pub mod upload;
pub mod upload_url;
pub mod uploaded_file;

pub use health::health_check;
pub use upload::upload;
pub use upload_url::upload_url;
pub use uploaded_file::get_uploaded_file;
