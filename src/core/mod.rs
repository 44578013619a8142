pub mod attachments;
pub mod domains;
pub mod email;
pub mod errors;
pub mod guests;
pub mod ingest;
pub mod leads;
pub mod locks;
pub mod prospects;
pub mod render;
pub mod sender;
pub mod threads;
pub mod traits;
