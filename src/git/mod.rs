mod diff;
mod status;

pub use diff::{parse_diff, Change, ChangeType, Chunk, FileStatus, ParsedFile};
pub use status::{
    detect_base_branch_in, get_current_branch_in, get_repo_root_in, git_diff_raw, git_info,
    list_branches, list_worktrees, Branches, GitInfo, Worktree,
};
