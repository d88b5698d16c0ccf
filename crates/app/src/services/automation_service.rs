//! Automation service — use-cases for managing automations.

use planhub_domain::automation::Automation;
use planhub_domain::error::{NotFoundError, PlanHubError};
use planhub_domain::id::AutomationId;

use crate::ports::AutomationRepository;

/// Application service for automation CRUD operations.
///
/// This is the editing surface's entry point; the rule engine itself only
/// reads automations through the repository.
pub struct AutomationService<R> {
    repo: R,
}

impl<R: AutomationRepository> AutomationService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create a new automation after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, automation), fields(automation_name = %automation.name))]
    pub async fn create_automation(
        &self,
        automation: Automation,
    ) -> Result<Automation, PlanHubError> {
        automation.validate()?;
        self.repo.create(automation).await
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::NotFound`] when no automation with `id`
    /// exists, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_automation(&self, id: AutomationId) -> Result<Automation, PlanHubError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_automations(&self) -> Result<Vec<Automation>, PlanHubError> {
        self.repo.get_all().await
    }

    /// Get all enabled automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_enabled(&self) -> Result<Vec<Automation>, PlanHubError> {
        self.repo.get_enabled().await
    }

    /// Update an existing automation.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::Validation`] if invariants fail, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, automation))]
    pub async fn update_automation(
        &self,
        automation: Automation,
    ) -> Result<Automation, PlanHubError> {
        automation.validate()?;
        self.repo.update(automation).await
    }

    /// Delete an automation by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_automation(&self, id: AutomationId) -> Result<(), PlanHubError> {
        self.repo.delete(id).await
    }

    /// Enable or disable an automation without touching the rest of it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::NotFound`] when no automation with `id`
    /// exists, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        id: AutomationId,
        enabled: bool,
    ) -> Result<Automation, PlanHubError> {
        let mut automation = self.get_automation(id).await?;
        automation.enabled = enabled;
        self.repo.update(automation).await
    }

    /// Copy an automation under a fresh identity.
    ///
    /// The copy gets a new id, `" (copy)"` appended to its name, and a
    /// cleared `last_run`; everything else carries over.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::NotFound`] when no automation with `id`
    /// exists, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn duplicate(&self, id: AutomationId) -> Result<Automation, PlanHubError> {
        let source = self.get_automation(id).await?;
        let copy = Automation {
            id: AutomationId::new(),
            name: format!("{} (copy)", source.name),
            last_run: None,
            ..source
        };
        self.repo.create(copy).await
    }
}
