pub mod anchor;
pub mod context;
pub mod export;
pub mod hunk_id;
pub mod locate;
pub mod model;
pub mod store;

pub use anchor::Anchor;
pub use export::{export_file_name, export_json, export_markdown};
pub use model::{Comment, Review};
pub use store::{Workspace, WorkspaceStore};
