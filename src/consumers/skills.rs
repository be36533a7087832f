//! Sidebar skills facade

use crate::broker::SyncBroker;
use crate::error::Result;
use crate::types::gateway::Skill;
use crate::types::identifiers::Domain;

use super::{ConsumerHandle, SyncMeta};

/// What the skills panel renders
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarSkillsState {
    /// Skills as reported
    pub skills: Vec<Skill>,
    /// Skills agents can use right now
    pub available_skills: usize,
    /// Sync bookkeeping
    pub meta: SyncMeta,
}

/// Tools available to agents, for the sidebar
pub struct SidebarSkills {
    handle: ConsumerHandle,
}

impl SidebarSkills {
    /// Subscribe with the domain's default interval
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the broker cannot serve skills
    pub fn mount(broker: &SyncBroker) -> Result<Self> {
        Ok(Self {
            handle: ConsumerHandle::mount(broker, Domain::Skills, None)?,
        })
    }

    /// Current view
    #[must_use]
    pub fn state(&self) -> SidebarSkillsState {
        let snapshot = self.handle.snapshot();
        let skills = snapshot
            .as_ref()
            .and_then(|s| s.data.as_skills())
            .map(<[Skill]>::to_vec)
            .unwrap_or_default();

        SidebarSkillsState {
            available_skills: skills.iter().filter(|s| s.available).count(),
            skills,
            meta: SyncMeta::from_snapshot(snapshot.as_deref()),
        }
    }

    /// Wait for the next update; `false` once the broker is gone
    pub async fn changed(&mut self) -> bool {
        self.handle.changed().await
    }

    /// Fetch once, out of band
    pub fn refresh(&self) {
        self.handle.refresh();
    }
}
