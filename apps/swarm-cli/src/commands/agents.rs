// agents.rs — List registered agents.

use anyhow::Context;
use swarm_tasks::AgentRegistry;

use super::{refuse, Workspace};

pub fn execute(ws: &Workspace) -> anyhow::Result<()> {
    let dir = &ws.paths.agents_dir;
    if !dir.exists() {
        anyhow::bail!("missing directory: {}", dir.display());
    }
    let registry = AgentRegistry::load(dir).context("failed to read agent registry")?;
    if registry.is_empty() {
        anyhow::bail!("no agents found under {}", dir.display());
    }

    let agents = registry.agents();
    let width_id = agents.iter().map(|a| a.id.len()).max().unwrap_or(0).max(2);
    let width_file = agents.iter().map(|a| a.file.len()).max().unwrap_or(0).max(4);
    println!("{:<width_id$}  {:<width_file$}  ROLE", "ID", "FILE");
    println!("{}  {}  {}", "-".repeat(width_id), "-".repeat(width_file), "-".repeat(4));
    for agent in agents {
        let role = if agent.role.is_empty() { "-" } else { agent.role.as_str() };
        println!("{:<width_id$}  {:<width_file$}  {}", agent.id, agent.file, role);
    }

    let duplicates = registry.duplicates();
    if !duplicates.is_empty() {
        return Err(refuse(format!("duplicate agent ids: {}", duplicates.join(", "))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::exit_code;
    use tempfile::TempDir;

    #[test]
    fn missing_dir_and_duplicates() {
        let project = TempDir::new().unwrap();
        let ws = Workspace::open(project.path(), true).unwrap();
        assert_eq!(exit_code(&execute(&ws).unwrap_err()), 1);

        std::fs::create_dir(&ws.paths.agents_dir).unwrap();
        std::fs::write(ws.paths.agents_dir.join("coder.json"), r#"{"id":"CODER","role":"Code"}"#).unwrap();
        execute(&ws).unwrap();

        std::fs::write(ws.paths.agents_dir.join("coder2.json"), r#"{"id":"CODER"}"#).unwrap();
        assert_eq!(exit_code(&execute(&ws).unwrap_err()), 2);
    }
}
