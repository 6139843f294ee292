pub mod ask;
pub mod personas;
pub mod version;
