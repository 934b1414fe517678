pub mod diff_view;
pub mod file_tree;
mod styles;

pub use diff_view::{render_file, render_orphaned, short_id, RenderOptions};
pub use file_tree::{path_line, render_tree, FileTree};
