pub mod progress;
pub mod request_box;
