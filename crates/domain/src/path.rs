//! Activity paths — typed addresses into the work tree.
//!
//! The canonical textual form is
//! `clients/{client}/projects/{project}[/products/{product}][/tasks/{task}[/subtasks/{subtask}]]`.
//! Product and task segments are independently optional, so a task can live
//! directly under a project or under a product; a subtask always requires a
//! task segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activity::ActivityType;
use crate::error::MalformedPathError;
use crate::id::{ClientKey, ProductKey, ProjectKey, SubtaskKey, TaskKey};

/// Typed address of an activity node.
///
/// Serialises as its canonical string form, which is also the shape stored
/// in automation scopes and event records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityPath {
    client: ClientKey,
    project: ProjectKey,
    product: Option<ProductKey>,
    task: Option<TaskKey>,
    subtask: Option<SubtaskKey>,
}

impl ActivityPath {
    /// Address of a project.
    #[must_use]
    pub fn for_project(client: impl Into<ClientKey>, project: impl Into<ProjectKey>) -> Self {
        Self {
            client: client.into(),
            project: project.into(),
            product: None,
            task: None,
            subtask: None,
        }
    }

    /// Address of a product under a project.
    #[must_use]
    pub fn for_product(
        client: impl Into<ClientKey>,
        project: impl Into<ProjectKey>,
        product: impl Into<ProductKey>,
    ) -> Self {
        Self {
            product: Some(product.into()),
            ..Self::for_project(client, project)
        }
    }

    /// Address of a task, under a product when `product` is given, otherwise
    /// directly under the project.
    #[must_use]
    pub fn for_task(
        client: impl Into<ClientKey>,
        project: impl Into<ProjectKey>,
        product: Option<ProductKey>,
        task: impl Into<TaskKey>,
    ) -> Self {
        Self {
            product,
            task: Some(task.into()),
            ..Self::for_project(client, project)
        }
    }

    /// Address of a subtask.
    #[must_use]
    pub fn for_subtask(
        client: impl Into<ClientKey>,
        project: impl Into<ProjectKey>,
        product: Option<ProductKey>,
        task: impl Into<TaskKey>,
        subtask: impl Into<SubtaskKey>,
    ) -> Self {
        Self {
            subtask: Some(subtask.into()),
            ..Self::for_task(client, project, product, task)
        }
    }

    /// The client segment.
    #[must_use]
    pub fn client(&self) -> &ClientKey {
        &self.client
    }

    /// The project segment.
    #[must_use]
    pub fn project(&self) -> &ProjectKey {
        &self.project
    }

    /// The product segment, when present.
    #[must_use]
    pub fn product(&self) -> Option<&ProductKey> {
        self.product.as_ref()
    }

    /// The task segment, when present.
    #[must_use]
    pub fn task(&self) -> Option<&TaskKey> {
        self.task.as_ref()
    }

    /// The subtask segment, when present.
    #[must_use]
    pub fn subtask(&self) -> Option<&SubtaskKey> {
        self.subtask.as_ref()
    }

    /// The level this path addresses, derived from its deepest segment.
    #[must_use]
    pub fn activity_type(&self) -> ActivityType {
        if self.subtask.is_some() {
            ActivityType::Subtask
        } else if self.task.is_some() {
            ActivityType::Task
        } else if self.product.is_some() {
            ActivityType::Product
        } else {
            ActivityType::Project
        }
    }

    /// Truncate to the enclosing project.
    #[must_use]
    pub fn project_path(&self) -> Self {
        Self::for_project(self.client.clone(), self.project.clone())
    }

    /// Truncate to the enclosing product, when the path has one.
    #[must_use]
    pub fn product_path(&self) -> Option<Self> {
        self.product.as_ref()?;
        Some(Self {
            task: None,
            subtask: None,
            ..self.clone()
        })
    }

    /// Truncate to the enclosing task, when the path has one.
    #[must_use]
    pub fn task_path(&self) -> Option<Self> {
        self.task.as_ref()?;
        Some(Self {
            subtask: None,
            ..self.clone()
        })
    }

    /// The immediate parent activity, or `None` for a project.
    ///
    /// A task's parent is its product when the path carries one, otherwise
    /// the project.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.activity_type() {
            ActivityType::Project => None,
            ActivityType::Product => Some(self.project_path()),
            ActivityType::Task => Some(self.product_path().unwrap_or_else(|| self.project_path())),
            ActivityType::Subtask => self.task_path(),
        }
    }

    /// Extend this path with a child node of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedPathError`] when the key is empty or contains a
    /// separator, or when this level cannot contain `child_type`.
    pub fn child(
        &self,
        child_type: ActivityType,
        key: impl Into<String>,
    ) -> Result<Self, MalformedPathError> {
        let key = key.into();
        if key.is_empty() || key.contains('/') {
            return Err(MalformedPathError {
                path: self.to_string(),
                reason: "child key must be a single non-empty segment",
            });
        }
        if !self.activity_type().allows_child(child_type) {
            return Err(MalformedPathError {
                path: self.to_string(),
                reason: "child level not contained by this level",
            });
        }
        let mut child = self.clone();
        match child_type {
            ActivityType::Product => child.product = Some(ProductKey::from(key)),
            ActivityType::Task => child.task = Some(TaskKey::from(key)),
            ActivityType::Subtask => child.subtask = Some(SubtaskKey::from(key)),
            ActivityType::Project => {
                return Err(MalformedPathError {
                    path: self.to_string(),
                    reason: "projects are tree roots",
                });
            }
        }
        Ok(child)
    }
}

impl fmt::Display for ActivityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clients/{}/projects/{}", self.client, self.project)?;
        if let Some(product) = &self.product {
            write!(f, "/products/{product}")?;
        }
        if let Some(task) = &self.task {
            write!(f, "/tasks/{task}")?;
        }
        if let Some(subtask) = &self.subtask {
            write!(f, "/subtasks/{subtask}")?;
        }
        Ok(())
    }
}

impl FromStr for ActivityPath {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &'static str| MalformedPathError {
            path: s.to_owned(),
            reason,
        };

        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Err(malformed("path is empty"));
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(malformed("empty segment"));
        }
        if segments.len() % 2 != 0 {
            return Err(malformed("collection segment without a key"));
        }
        if segments[0] != "clients" {
            return Err(malformed("must start with a clients segment"));
        }
        if segments.len() < 4 || segments[2] != "projects" {
            return Err(malformed("missing projects segment"));
        }

        let mut path = Self::for_project(segments[1], segments[3]);
        let mut index = 4;
        while index < segments.len() {
            let key = segments[index + 1];
            match segments[index] {
                "products" if path.product.is_none() && path.task.is_none() => {
                    path.product = Some(ProductKey::from(key));
                }
                "tasks" if path.task.is_none() => {
                    path.task = Some(TaskKey::from(key));
                }
                "subtasks" if path.task.is_some() && path.subtask.is_none() => {
                    path.subtask = Some(SubtaskKey::from(key));
                }
                _ => return Err(malformed("unexpected segment")),
            }
            index += 2;
        }
        Ok(path)
    }
}

impl TryFrom<String> for ActivityPath {
    type Error = MalformedPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActivityPath> for String {
    fn from(path: ActivityPath) -> Self {
        path.to_string()
    }
}
