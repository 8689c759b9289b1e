// task.rs — Task subcommands: init, lint, add, update, comment, scrub, list,
// show, set-status.

use anyhow::Context;
use clap::Subcommand;
use swarm_submit::{CommitProvider, GitAdapter};
use swarm_tasks::graph::normalize_depends_on;
use swarm_tasks::ops::{self, NewTask, TaskFilter, TaskUpdate};
use swarm_tasks::{NoVerification, Task, TaskError, TaskIndex, TaskStatus, TransitionRequest};

use super::lifecycle::transition;
use super::{paired_note, refuse, Workspace};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create an empty, sealed tasks.json.
    Init,
    /// Validate tasks.json (schema, deps, checksum).
    Lint,
    /// Add a new task.
    Add {
        task_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Initial status (default: TODO).
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        /// Repeatable.
        #[arg(long)]
        tag: Vec<String>,
        /// Repeatable.
        #[arg(long)]
        depends_on: Vec<String>,
        /// Repeatable: shell command.
        #[arg(long)]
        verify: Vec<String>,
        #[arg(long)]
        comment_author: Option<String>,
        #[arg(long)]
        comment_body: Option<String>,
        /// Write even if tasks.json fails its checksum.
        #[arg(long)]
        force: bool,
    },
    /// Update fields of an existing task (not its status).
    Update {
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        /// Repeatable (append).
        #[arg(long)]
        tag: Vec<String>,
        #[arg(long)]
        replace_tags: bool,
        /// Repeatable (append).
        #[arg(long)]
        depends_on: Vec<String>,
        #[arg(long)]
        replace_depends_on: bool,
        /// Repeatable (append).
        #[arg(long)]
        verify: Vec<String>,
        #[arg(long)]
        replace_verify: bool,
        /// Write even if tasks.json fails its checksum.
        #[arg(long)]
        force: bool,
    },
    /// Append a comment to a task.
    Comment {
        task_id: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        body: String,
        /// Write even if tasks.json fails its checksum.
        #[arg(long)]
        force: bool,
    },
    /// Replace text across every task's string fields.
    Scrub {
        /// Substring to replace.
        #[arg(long)]
        find: String,
        /// Replacement (default: empty).
        #[arg(long, default_value = "")]
        replace: String,
        /// Print affected task ids without writing.
        #[arg(long)]
        dry_run: bool,
        /// Write even if tasks.json fails its checksum.
        #[arg(long)]
        force: bool,
    },
    /// List tasks.
    List {
        /// Filter by status (repeatable).
        #[arg(long)]
        status: Vec<String>,
        /// Filter by owner (repeatable).
        #[arg(long)]
        owner: Vec<String>,
        /// Filter by tag (repeatable).
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Show a single task.
    Show {
        task_id: String,
        /// How many latest comments to print.
        #[arg(long, default_value_t = 5)]
        last_comments: usize,
    },
    /// Change status with the same checks as start/block/finish.
    SetStatus {
        task_id: String,
        /// TODO|DOING|BLOCKED|DONE
        status: String,
        /// Optional comment author (requires --body).
        #[arg(long)]
        author: Option<String>,
        /// Optional comment body (requires --author).
        #[arg(long)]
        body: Option<String>,
        /// Attach commit metadata from a git rev (DONE only).
        #[arg(long)]
        commit: Option<String>,
        /// Bypass transition, readiness, and comment checks.
        #[arg(long)]
        force: bool,
    },
}

pub fn execute(cmd: &TaskCommands, ws: &Workspace) -> anyhow::Result<()> {
    match cmd {
        TaskCommands::Init => {
            ws.store()
                .init()
                .with_context(|| format!("failed to create {}", ws.paths.tasks_file.display()))?;
            ws.say(format!("✅ created {}", ws.paths.tasks_file.display()));
            Ok(())
        }
        TaskCommands::Lint => lint(ws),
        TaskCommands::Add {
            task_id,
            title,
            description,
            status,
            priority,
            owner,
            tag,
            depends_on,
            verify,
            comment_author,
            comment_body,
            force,
        } => {
            let status = status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
            let new = NewTask {
                id: task_id.clone(),
                title: title.clone(),
                description: description.clone(),
                status,
                priority: priority.clone(),
                owner: owner.clone(),
                tags: tag.clone(),
                depends_on: depends_on.clone(),
                verify: verify.clone(),
                comment: paired_note(comment_author.as_deref(), comment_body.as_deref())?,
            };
            let mut doc = ws.load_for_update(*force)?;
            let id = ops::add_task(&mut doc, new)?.id_str().unwrap_or_default().to_string();
            ws.save(&mut doc)?;
            ws.say(format!("✅ added {}", id));
            Ok(())
        }
        TaskCommands::Update {
            task_id,
            title,
            description,
            priority,
            owner,
            tag,
            replace_tags,
            depends_on,
            replace_depends_on,
            verify,
            replace_verify,
            force,
        } => {
            let update = TaskUpdate {
                title: title.clone(),
                description: description.clone(),
                priority: priority.clone(),
                owner: owner.clone(),
                tags: tag.clone(),
                replace_tags: *replace_tags,
                depends_on: depends_on.clone(),
                replace_depends_on: *replace_depends_on,
                verify: verify.clone(),
                replace_verify: *replace_verify,
            };
            let mut doc = ws.load_for_update(*force)?;
            ops::update_task(&mut doc, task_id, update)?;
            ws.save(&mut doc)?;
            ws.say(format!("✅ updated {}", task_id));
            Ok(())
        }
        TaskCommands::Comment {
            task_id,
            author,
            body,
            force,
        } => {
            let mut doc = ws.load_for_update(*force)?;
            ops::add_comment(&mut doc, task_id, author, body)?;
            ws.save(&mut doc)?;
            Ok(())
        }
        TaskCommands::Scrub {
            find,
            replace,
            dry_run,
            force,
        } => scrub(ws, find, replace, *dry_run, *force),
        TaskCommands::List { status, owner, tag } => {
            let statuses = status
                .iter()
                .map(|s| s.parse::<TaskStatus>())
                .collect::<Result<Vec<_>, _>>()?;
            let filter = TaskFilter {
                statuses,
                owners: owner.clone(),
                tags: tag.clone(),
            };
            list(ws, &filter)
        }
        TaskCommands::Show {
            task_id,
            last_comments,
        } => show(ws, task_id, *last_comments),
        TaskCommands::SetStatus {
            task_id,
            status,
            author,
            body,
            commit,
            force,
        } => set_status(
            ws,
            task_id,
            status,
            paired_note(author.as_deref(), body.as_deref())?,
            commit.as_deref(),
            *force,
        ),
    }
}

fn lint(ws: &Workspace) -> anyhow::Result<()> {
    let doc = ws.load()?;
    let report = ws.linter()?.lint(&doc)?;
    for warning in &report.warnings {
        ws.warn(warning);
    }
    if !report.is_ok() {
        for error in &report.errors {
            eprintln!("❌ {}", error);
        }
        return Err(refuse(format!(
            "{} failed lint ({} error(s))",
            ws.paths.tasks_file.display(),
            report.errors.len()
        )));
    }
    ws.say("✅ tasks.json OK");
    Ok(())
}

fn scrub(ws: &Workspace, find: &str, replace: &str, dry_run: bool, force: bool) -> anyhow::Result<()> {
    if find.is_empty() {
        return Err(refuse("--find must be non-empty"));
    }
    let mut doc = ws.load_for_update(force)?;
    let report = ops::scrub(&mut doc, find, replace, dry_run)?;
    if dry_run {
        ws.say(format!("Would update {} task(s).", report.changed.len()));
        for id in &report.changed {
            ws.say(id);
        }
        return Ok(());
    }
    ws.save(&mut doc)?;
    ws.say(format!("Updated {} task(s).", report.changed.len()));
    Ok(())
}

fn format_task_line(id: &str, task: &Task) -> String {
    let title = task.title.text().unwrap_or("(untitled task)");
    format!("{} [{}] {}", id, task.status_label(), title)
}

fn list(ws: &Workspace, filter: &TaskFilter) -> anyhow::Result<()> {
    let doc = ws.load()?;
    let index = TaskIndex::build(&doc.tasks);
    for warning in index.warnings() {
        ws.warn(warning);
    }
    for (id, task) in ops::list_tasks(&index, filter) {
        println!("{}", format_task_line(id, task));
    }
    Ok(())
}

fn show(ws: &Workspace, task_id: &str, last_comments: usize) -> anyhow::Result<()> {
    let doc = ws.load()?;
    let index = TaskIndex::build(&doc.tasks);
    for warning in index.warnings() {
        ws.warn(warning);
    }
    let task = index
        .get(task_id)
        .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;
    let or_dash = |value: Option<&str>| value.unwrap_or("-").to_string();

    println!("ID: {}", task_id);
    println!("Title: {}", task.title.text().unwrap_or_default());
    println!("Status: {}", task.status_label());
    println!("Priority: {}", or_dash(task.priority.text()));
    println!("Owner: {}", or_dash(task.owner.text()));
    let (depends_on, _) = normalize_depends_on(&task.depends_on);
    println!(
        "Depends on: {}",
        if depends_on.is_empty() { "-".to_string() } else { depends_on.join(", ") }
    );
    let tags = task.tag_list();
    println!(
        "Tags: {}",
        if tags.is_empty() { "-".to_string() } else { tags.join(", ") }
    );

    if let Some(description) = task.description.text() {
        println!();
        println!("Description:");
        println!("{}", description);
    }
    if let Some(commit) = task.commit.present() {
        if let Some(hash) = commit.hash.text() {
            println!();
            println!("Commit:");
            println!("{} {}", hash, commit.message.text().unwrap_or_default());
        }
    }
    let comments = task.comment_list();
    if !comments.is_empty() {
        println!();
        println!("Comments:");
        let skip = comments.len().saturating_sub(last_comments);
        for comment in &comments[skip..] {
            println!(
                "- {}: {}",
                comment.author.text().unwrap_or("unknown"),
                comment.body.text().unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn set_status(
    ws: &Workspace,
    task_id: &str,
    status: &str,
    note: Option<(String, String)>,
    commit: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let target: TaskStatus = status.parse()?;
    if target == TaskStatus::Done && !force {
        return Err(refuse(format!(
            "use `agentctl finish {}` to mark DONE (use --force to override)",
            task_id
        )));
    }
    if commit.is_some() && target != TaskStatus::Done {
        return Err(refuse("--commit only applies when setting DONE"));
    }

    let mut request = TransitionRequest::new(target).forced(force);
    if let Some((author, body)) = note {
        request = request.with_note(author, body);
    }
    if let Some(rev) = commit {
        let info = GitAdapter::new(&ws.paths.root)
            .commit_info(rev)
            .with_context(|| format!("failed to resolve commit {}", rev))?;
        request = request.with_commit(info);
    }

    transition(ws, task_id, request, &NoVerification)?;
    ws.say(format!("✅ {} is {}", task_id, target));
    Ok(())
}
