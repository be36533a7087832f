// Live status watcher
//
// Subscribes to every gateway domain and logs each change. Handy for checking
// a gateway by hand; configured through LIVE_STATUS_* environment variables.

use std::sync::Arc;

use anyhow::Result;
use kodegen_live_status::{
    AgentSessions, ConnectionStatus, HttpTransport, RecentMemories, SidebarCrons, SidebarSkills,
    SidebarTasks, SyncBroker, SyncOptions, SystemStatusView,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = SyncOptions::from_env()?;
    log::info!("watching gateway at {}", options.base_url);

    let broker = SyncBroker::new(options, Arc::new(HttpTransport::new()?));
    let mut agents = AgentSessions::mount(&broker)?;
    let mut tasks = SidebarTasks::mount(&broker)?;
    let mut crons = SidebarCrons::mount(&broker)?;
    let mut skills = SidebarSkills::mount(&broker)?;
    let mut status = SystemStatusView::mount(&broker)?;
    let mut connection = ConnectionStatus::mount(&broker)?;
    let mut memories = RecentMemories::mount(&broker)?;

    loop {
        tokio::select! {
            true = agents.changed() => {
                let state = agents.state();
                log::info!(
                    "agents: {}/{} working, {} session(s), {:?} via {:?}{}",
                    state.active_count,
                    state.nodes.len(),
                    state.total_sessions,
                    state.meta.source,
                    state.meta.connection_type,
                    error_suffix(state.meta.error.as_deref()),
                );
            }
            true = tasks.changed() => {
                let state = tasks.state();
                log::info!(
                    "tasks: {} running, {} completed, {} failed{}",
                    state.running_tasks,
                    state.completed_tasks,
                    state.failed_tasks,
                    error_suffix(state.meta.error.as_deref()),
                );
            }
            true = skills.changed() => {
                let state = skills.state();
                log::info!(
                    "skills: {}/{} available{}",
                    state.available_skills,
                    state.skills.len(),
                    error_suffix(state.meta.error.as_deref()),
                );
            }
            true = crons.changed() => {
                let state = crons.state();
                log::info!(
                    "crons: {}/{} enabled, {:?}{}",
                    state.enabled_crons,
                    state.total_crons,
                    state.meta.source,
                    error_suffix(state.meta.error.as_deref()),
                );
            }
            true = status.changed() => {
                if let Some(current) = status.state().status {
                    log::info!(
                        "status: assistant {:?}, {} active agent(s), {} running task(s)",
                        current.assistant.status,
                        current.agents.active,
                        current.tasks.running,
                    );
                }
            }
            true = connection.changed() => {
                let state = connection.state();
                log::info!(
                    "gateway {} (latency {:?}, last ping {:?})",
                    if state.is_online { "online" } else { "offline" },
                    state.latency,
                    state.last_ping,
                );
            }
            true = memories.changed() => {
                for memory in memories.state().memories {
                    log::info!("memory: {} ({})", memory.title, memory.timestamp);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
        }
    }

    broker.shutdown();
    Ok(())
}

fn error_suffix(error: Option<&str>) -> String {
    error.map(|e| format!(" ({e})")).unwrap_or_default()
}
