//! Transactional business-rule engine
//!
//! # Components
//!
//! - [`transaction`]: [`TransactionCoordinator`], the only place writes are
//!   committed or rolled back
//! - [`skills`]: [`SkillResolver`], resolve-or-create for skill names
//! - [`assignment`]: [`TaskAssignments`], assign/complete/create tasks
//! - [`archive`]: [`ProjectArchiver`]
//! - [`invitation`]: [`InvitationWorkflow`], issuance and onboarding
//! - [`lifecycle`]: [`UserLifecycleManager`], role changes and deletion
//! - [`hierarchy`]: the role hierarchy table
//!
//! [`Engine`] wires all of them to one store.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use crewline_shared::config::EngineSettings;
//! use crewline_shared::engine::Engine;
//! use crewline_shared::store::InMemoryStore;
//!
//! # async fn example() -> Result<(), crewline_shared::error::EngineError> {
//! let engine = Engine::builder(Arc::new(InMemoryStore::new()))
//!     .settings(EngineSettings::default())
//!     .build();
//!
//! let expired = engine.invitations().expire_stale_invitations().await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod assignment;
pub mod hierarchy;
pub mod invitation;
pub mod lifecycle;
pub mod skills;
pub mod transaction;

use std::sync::Arc;

pub use archive::{ArchivedProject, ProjectArchiver};
pub use assignment::{Assignment, Completion, CreatedTask, TaskAssignments};
pub use invitation::{AcceptInvitation, InvitationRequest, InvitationWorkflow, IssuedInvitation, Onboarded};
pub use lifecycle::{
    DeletionImpact, RoleChange, RoleChangeRejection, RoleChangeValidation, UserLifecycleManager,
};
pub use skills::{SkillInput, SkillResolver};
pub use transaction::TransactionCoordinator;

use crate::collaborators::{NoopExtractor, NoopNotifier, RecommendationNotifier, SkillExtractor};
use crate::config::EngineSettings;
use crate::store::Store;

/// All engine components over one store
#[derive(Clone)]
pub struct Engine {
    coordinator: TransactionCoordinator,
    skills: SkillResolver,
    assignments: TaskAssignments,
    archiver: ProjectArchiver,
    invitations: InvitationWorkflow,
    lifecycle: UserLifecycleManager,
}

impl Engine {
    pub fn builder(store: Arc<dyn Store>) -> EngineBuilder {
        EngineBuilder {
            store,
            settings: EngineSettings::default(),
            extractor: Arc::new(NoopExtractor),
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn skills(&self) -> &SkillResolver {
        &self.skills
    }

    pub fn assignments(&self) -> &TaskAssignments {
        &self.assignments
    }

    pub fn archiver(&self) -> &ProjectArchiver {
        &self.archiver
    }

    pub fn invitations(&self) -> &InvitationWorkflow {
        &self.invitations
    }

    pub fn lifecycle(&self) -> &UserLifecycleManager {
        &self.lifecycle
    }
}

/// Builder for [`Engine`]; collaborators default to no-ops
pub struct EngineBuilder {
    store: Arc<dyn Store>,
    settings: EngineSettings,
    extractor: Arc<dyn SkillExtractor>,
    notifier: Arc<dyn RecommendationNotifier>,
}

impl EngineBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn SkillExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn RecommendationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn build(self) -> Engine {
        let coordinator =
            TransactionCoordinator::new(self.store).with_timeout(self.settings.transaction_timeout);

        Engine {
            skills: SkillResolver::new(coordinator.clone()),
            assignments: TaskAssignments::new(coordinator.clone(), self.extractor),
            archiver: ProjectArchiver::new(coordinator.clone()),
            invitations: InvitationWorkflow::new(coordinator.clone(), self.notifier, &self.settings),
            lifecycle: UserLifecycleManager::new(coordinator.clone()),
            coordinator,
        }
    }
}
