mod app;
mod config;
mod git;
mod review;
mod ui;

use anyhow::{Context, Result};
use app::filter::{filter_files, parse_filter_expr};
use app::Session;
use clap::{Parser, Subcommand};
use config::ExportFormat;
use review::locate::Side;
use std::io::{IsTerminal, Read};
use ui::{FileTree, RenderOptions};

/// Review a git diff locally: anchor comments to lines and export the review
#[derive(Parser)]
#[command(name = "vck", version, about)]
struct Cli {
    /// Repository or worktree to work in (defaults to current directory)
    #[arg(short = 'C', long = "repo", env = "VIBECHECKER_WORKDIR", global = true)]
    repo: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the diff to review from git, a file, or stdin
    Load {
        /// Branch to diff against (default: config, then origin's default branch)
        #[arg(long)]
        base: Option<String>,
        /// Read a unified diff from this file instead of running git
        #[arg(long, conflicts_with = "stdin")]
        file: Option<String>,
        /// Read a unified diff from stdin
        #[arg(long)]
        stdin: bool,
    },
    /// List changed files
    Files {
        /// Filter expression, e.g. '+*.rs,-*.lock,+unresolved'
        #[arg(long)]
        filter: Option<String>,
        /// Group files by directory
        #[arg(long)]
        tree: bool,
    },
    /// Print the diff with comments
    Show {
        /// Only this file
        path: Option<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        no_color: bool,
    },
    /// Add, list, resolve or delete comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Export the review as Markdown or JSON
    Export {
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List local and remote branches
    Branches,
    /// List git worktrees
    Worktrees,
    /// Manage stored workspaces
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum CommentAction {
    /// Comment on a line or a range of lines
    Add {
        path: String,
        /// Single line number
        #[arg(long, conflicts_with = "lines", required_unless_present = "lines")]
        line: Option<usize>,
        /// Line range, e.g. 10-14
        #[arg(long)]
        lines: Option<String>,
        /// Use old-file line numbers (comment on removed lines)
        #[arg(long)]
        old: bool,
        #[arg(short, long)]
        message: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List comments
    List {
        #[arg(long)]
        unresolved: bool,
    },
    /// Toggle a comment's resolved state
    Resolve { id: String },
    /// Delete a comment
    Delete { id: String },
}

#[derive(Subcommand)]
enum WorkspaceAction {
    /// List stored workspaces
    List,
    /// Remove workspaces not used for N days (default: storage.retention_days)
    Prune {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete a workspace by id
    Delete { id: String },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let dir = cli.repo.unwrap_or_else(|| ".".to_string());
    let mut session = Session::open(&dir)?;

    match cli.command {
        Command::Load { base, file, stdin } => {
            let count = if let Some(path) = file {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path))?;
                session.load_text(raw, None)?
            } else if stdin {
                let mut raw = String::new();
                std::io::stdin()
                    .read_to_string(&mut raw)
                    .context("Failed to read stdin")?;
                session.load_text(raw, None)?
            } else {
                session.load_git(base.as_deref())?
            };
            session.save()?;
            let comments = session.review().map_or(0, |r| r.comments.len());
            println!("Loaded {} file(s), {} comment(s)", count, comments);
        }

        Command::Files { filter, tree } => {
            let files = session.files();
            let comments = session.review().map(|r| r.comments.as_slice()).unwrap_or(&[]);
            let rules = parse_filter_expr(filter.as_deref().unwrap_or(""));
            let visible = filter_files(&rules, &files, comments);
            let color = color_enabled(&session, false);
            let shown = if tree {
                let tree = FileTree::build(&visible);
                print!("{}", ui::render_tree(&tree, comments, color));
                tree.file_count()
            } else {
                for file in &visible {
                    println!("{}", ui::path_line(file, comments, color));
                }
                visible.len()
            };
            if shown != files.len() {
                println!("{}/{} files", shown, files.len());
            }
        }

        Command::Show {
            path,
            filter,
            no_color,
        } => {
            let files = session.files();
            if files.is_empty() {
                anyhow::bail!("No diff loaded; run `vck load` first");
            }
            let comments = session.review().map(|r| r.comments.as_slice()).unwrap_or(&[]);
            let rules = parse_filter_expr(filter.as_deref().unwrap_or(""));
            let opts = RenderOptions {
                color: color_enabled(&session, no_color),
                line_numbers: session.config.display.line_numbers,
                tab_width: session.config.display.tab_width,
            };
            let mut shown = 0;
            for file in filter_files(&rules, &files, comments) {
                if path.as_deref().is_some_and(|p| !file.matches_path(p)) {
                    continue;
                }
                println!("{}", ui::render_file(file, comments, &opts));
                shown += 1;
            }
            let orphans: Vec<_> = comments
                .iter()
                .filter(|c| path.as_deref().map_or(true, |p| c.file_path == p))
                .cloned()
                .collect();
            let orphaned = ui::render_orphaned(&files, &orphans, &opts);
            if !orphaned.is_empty() {
                print!("{}", orphaned);
                shown += 1;
            }
            if shown == 0 {
                anyhow::bail!("No matching files in diff");
            }
        }

        Command::Comment { action } => run_comment(&mut session, action)?,

        Command::Export { format, output } => {
            let review = session.review().context("No review in this workspace")?;
            let format = format.unwrap_or(session.config.export.format);
            let text = match format {
                ExportFormat::Json => review::export_json(review)?,
                ExportFormat::Markdown => review::export_markdown(review, &session.files()),
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path))?;
                    println!("Wrote {}", path);
                }
                None => print!("{}", text),
            }
            if format == ExportFormat::Json {
                log::debug!("Suggested file name: {}", review::export_file_name(review));
            }
        }

        Command::Branches => {
            let branches = git::list_branches(&session.repo_root)?;
            for name in &branches.all {
                let marker = if branches.local.contains(name) { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }

        Command::Worktrees => {
            for wt in git::list_worktrees(&session.repo_root)? {
                let main = if wt.is_main { " (main)" } else { "" };
                let commit = wt.commit.get(..7).unwrap_or(&wt.commit);
                println!("{}  {}  {}{}", commit, wt.branch, wt.path, main);
            }
        }

        Command::Workspace { action } => match action {
            WorkspaceAction::List => {
                for ws in session.store.load_all() {
                    let comments = ws.review.as_ref().map_or(0, |r| r.comments.len());
                    println!(
                        "{}  {}  [{}]  {} comment(s)  {}",
                        ws.id, ws.worktree_path, ws.branch, comments, ws.last_accessed
                    );
                }
            }
            WorkspaceAction::Prune { days } => {
                let days = days.unwrap_or(session.config.storage.retention_days);
                let removed = session.store.cleanup(days)?;
                println!("Removed {} workspace(s) from {}", removed, session.store_path().display());
            }
            WorkspaceAction::Delete { id } => {
                if !session.store.delete(&id)? {
                    anyhow::bail!("No workspace with id {}", id);
                }
                println!("Deleted workspace {}", id);
            }
        },

        Command::Config => print!("{}", config::render_config(&session.config)?),
    }
    Ok(())
}

fn run_comment(session: &mut Session, action: CommentAction) -> Result<()> {
    match action {
        CommentAction::Add {
            path,
            line,
            lines,
            old,
            message,
            tags,
        } => {
            let (start, end) = match (line, lines) {
                (Some(n), _) => (n, n),
                (None, Some(range)) => parse_line_range(&range)?,
                (None, None) => anyhow::bail!("Pass --line N or --lines N-M"),
            };
            let side = if old { Side::Old } else { Side::New };
            let comment = session.add_comment(&path, side, start, end, &message, tags)?;
            session.save()?;
            println!(
                "Added {} on {} {}",
                ui::short_id(&comment.comment_id),
                comment.file_path,
                comment.line_label().unwrap_or_default()
            );
        }
        CommentAction::List { unresolved } => {
            let Some(review) = session.review() else {
                return Ok(());
            };
            for c in review.comments.iter().filter(|c| !unresolved || !c.resolved) {
                let status = if c.resolved { "resolved" } else { "open" };
                println!(
                    "{}  {}:{}  [{}]  {}",
                    ui::short_id(&c.comment_id),
                    c.file_path,
                    c.line_label().unwrap_or_default(),
                    status,
                    c.comment.lines().next().unwrap_or_default()
                );
            }
        }
        CommentAction::Resolve { id } => {
            let id = session.resolve_comment_id(&id)?;
            let resolved = session
                .review_mut()
                .toggle_resolved(&id)
                .context("Comment disappeared")?;
            session.save()?;
            println!("{} {}", ui::short_id(&id), if resolved { "resolved" } else { "reopened" });
        }
        CommentAction::Delete { id } => {
            let id = session.resolve_comment_id(&id)?;
            session.review_mut().delete_comment(&id);
            session.save()?;
            println!("Deleted {}", ui::short_id(&id));
        }
    }
    Ok(())
}

/// Parse "N-M" (or a single "N") into an inclusive line range
fn parse_line_range(s: &str) -> Result<(usize, usize)> {
    let (a, b) = s.split_once('-').unwrap_or((s, s));
    let start = a.trim().parse().with_context(|| format!("Invalid line range: {}", s))?;
    let end = b.trim().parse().with_context(|| format!("Invalid line range: {}", s))?;
    Ok((start, end))
}

/// Color is on when config allows it, the user did not opt out, and stdout is a terminal
fn color_enabled(session: &Session, no_color: bool) -> bool {
    session.config.display.color && !no_color && std::io::stdout().is_terminal()
}
