//! Automation — trigger → condition → action rules.
//!
//! Automations let the workspace react to tree mutations without manual
//! intervention. Each automation has one or more [`Trigger`]s (only the
//! first is consulted when matching events), an optional [`ConditionGroup`]
//! that must hold, one or more [`Action`]s to execute, and a [`Scope`]
//! limiting which part of the tree it watches.

mod action;
mod condition;
mod scope;
mod trigger;

pub use action::Action;
pub use condition::{ConditionGroup, ConditionOperator, ConditionRule, GroupOperator};
pub use scope::{ClientScope, ProductScope, Scope};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::activity::Snapshot;
use crate::error::{PlanHubError, ValidationError};
use crate::id::AutomationId;
use crate::time::Timestamp;

/// A rule that reacts to change events by executing actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub enabled: bool,
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionGroup>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<Timestamp>,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// The trigger consulted when matching events.
    ///
    /// Additional triggers are kept for round-tripping stored rules but do
    /// not take part in matching.
    #[must_use]
    pub fn primary_trigger(&self) -> Option<&Trigger> {
        self.triggers.first()
    }

    /// Evaluate the condition group against an event's field context.
    ///
    /// An automation without conditions passes for any context.
    #[must_use]
    pub fn passes_conditions(&self, context: &Snapshot) -> bool {
        self.conditions
            .as_ref()
            .is_none_or(|group| group.evaluate(context))
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `triggers` is empty ([`ValidationError::NoTriggers`])
    /// - `actions` is empty ([`ValidationError::NoActions`])
    /// - a create-child action names a level the trigger's level cannot
    ///   contain ([`ValidationError::InvalidChildType`])
    pub fn validate(&self) -> Result<(), PlanHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let Some(primary) = self.primary_trigger() else {
            return Err(ValidationError::NoTriggers.into());
        };
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions.into());
        }
        for action in &self.actions {
            if let Action::CreateChild { child_type, .. } = action
                && !primary.activity_type.allows_child(*child_type)
            {
                return Err(ValidationError::InvalidChildType {
                    parent: primary.activity_type,
                    child: *child_type,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    enabled: Option<bool>,
    triggers: Vec<Trigger>,
    conditions: Option<ConditionGroup>,
    actions: Vec<Action>,
    scope: Option<Scope>,
    last_run: Option<Timestamp>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn conditions(mut self, conditions: ConditionGroup) -> Self {
        self.conditions = Some(conditions);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub fn last_run(mut self, ts: Timestamp) -> Self {
        self.last_run = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanHubError::Validation`] if required fields are missing
    /// or empty.
    pub fn build(self) -> Result<Automation, PlanHubError> {
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            triggers: self.triggers,
            conditions: self.conditions,
            actions: self.actions,
            scope: self.scope.unwrap_or_default(),
            last_run: self.last_run,
        };
        automation.validate()?;
        Ok(automation)
    }
}
