//! Scope — which part of the tree an automation applies to.

use serde::{Deserialize, Serialize};

use crate::id::{ClientKey, ProductKey, ProjectKey};
use crate::path::ActivityPath;

/// Client selector: either every client, or one specific client.
///
/// Serialises as the literal string `"all"` or the client key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientScope {
    All,
    Client(ClientKey),
}

impl From<String> for ClientScope {
    fn from(value: String) -> Self {
        if value == "all" {
            Self::All
        } else {
            Self::Client(ClientKey::from(value))
        }
    }
}

impl From<ClientScope> for String {
    fn from(scope: ClientScope) -> Self {
        match scope {
            ClientScope::All => "all".to_owned(),
            ClientScope::Client(key) => key.to_string(),
        }
    }
}

/// A (project, product) pair for products that repeat across projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductScope {
    pub project: ProjectKey,
    pub product: ProductKey,
}

/// Where an automation applies.
///
/// The client selector gates everything: `All` passes every path without
/// consulting the lists. With a specific client, empty lists mean the whole
/// client; otherwise the path must fall under a listed project or one of the
/// listed (project, product) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub client: ClientScope,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductScope>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::all()
    }
}

impl Scope {
    /// Scope matching every activity.
    #[must_use]
    pub fn all() -> Self {
        Self {
            client: ClientScope::All,
            projects: Vec::new(),
            products: Vec::new(),
        }
    }

    /// Scope matching everything under one client.
    #[must_use]
    pub fn client(key: impl Into<ClientKey>) -> Self {
        Self {
            client: ClientScope::Client(key.into()),
            projects: Vec::new(),
            products: Vec::new(),
        }
    }

    /// Restrict to a project under the scoped client.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<ProjectKey>) -> Self {
        self.projects.push(project.into());
        self
    }

    /// Restrict to a (project, product) pair under the scoped client.
    #[must_use]
    pub fn with_product(
        mut self,
        project: impl Into<ProjectKey>,
        product: impl Into<ProductKey>,
    ) -> Self {
        self.products.push(ProductScope {
            project: project.into(),
            product: product.into(),
        });
        self
    }

    /// Whether an activity at `path` falls inside this scope.
    #[must_use]
    pub fn contains(&self, path: &ActivityPath) -> bool {
        match &self.client {
            ClientScope::All => return true,
            ClientScope::Client(client) if client != path.client() => return false,
            ClientScope::Client(_) => {}
        }
        if self.projects.is_empty() && self.products.is_empty() {
            return true;
        }
        if self.projects.contains(path.project()) {
            return true;
        }
        self.products.iter().any(|pair| {
            &pair.project == path.project() && Some(&pair.product) == path.product()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_in(client: &str, project: &str, product: Option<&str>) -> ActivityPath {
        ActivityPath::for_task(client, project, product.map(ProductKey::from), "t1")
    }

    #[test]
    fn should_pass_everything_for_all_scope() {
        let scope = Scope::all();
        assert!(scope.contains(&task_in("c1", "p1", None)));
        assert!(scope.contains(&task_in("c2", "p9", Some("pr4"))));
    }

    #[test]
    fn should_ignore_lists_when_client_is_all() {
        let scope = Scope {
            client: ClientScope::All,
            projects: vec![ProjectKey::from("p1")],
            products: Vec::new(),
        };
        assert!(scope.contains(&task_in("c1", "p2", None)));
    }

    #[test]
    fn should_gate_on_client_key() {
        let scope = Scope::client("c1");
        assert!(scope.contains(&task_in("c1", "p1", None)));
        assert!(!scope.contains(&task_in("c2", "p1", None)));
    }

    #[test]
    fn should_match_whole_client_when_lists_are_empty() {
        let scope = Scope::client("c1");
        assert!(scope.contains(&task_in("c1", "anything", Some("whatever"))));
    }

    #[test]
    fn should_filter_by_project_list() {
        let scope = Scope::client("c1").with_project("p1");
        assert!(scope.contains(&task_in("c1", "p1", None)));
        assert!(scope.contains(&task_in("c1", "p1", Some("pr1"))));
        assert!(!scope.contains(&task_in("c1", "p2", None)));
    }

    #[test]
    fn should_filter_by_product_pair() {
        let scope = Scope::client("c1").with_product("p1", "pr1");
        assert!(scope.contains(&task_in("c1", "p1", Some("pr1"))));
        assert!(!scope.contains(&task_in("c1", "p1", Some("pr2"))));
        assert!(!scope.contains(&task_in("c1", "p1", None)));
        // Same product key under a different project is a different product.
        assert!(!scope.contains(&task_in("c1", "p2", Some("pr1"))));
    }

    #[test]
    fn should_pass_when_either_list_matches() {
        let scope = Scope::client("c1")
            .with_project("p2")
            .with_product("p1", "pr1");
        assert!(scope.contains(&task_in("c1", "p2", None)));
        assert!(scope.contains(&task_in("c1", "p1", Some("pr1"))));
        assert!(!scope.contains(&task_in("c1", "p1", None)));
    }

    #[test]
    fn should_serialize_client_scope_as_bare_string() {
        let json = serde_json::to_string(&ClientScope::All).unwrap();
        assert_eq!(json, "\"all\"");
        let json = serde_json::to_string(&ClientScope::Client(ClientKey::from("c1"))).unwrap();
        assert_eq!(json, "\"c1\"");

        let parsed: ClientScope = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(parsed, ClientScope::All);
        let parsed: ClientScope = serde_json::from_str("\"c9\"").unwrap();
        assert_eq!(parsed, ClientScope::Client(ClientKey::from("c9")));
    }

    #[test]
    fn should_roundtrip_scope_through_serde_json() {
        let scope = Scope::client("c1")
            .with_project("p1")
            .with_product("p2", "pr7");
        let json = serde_json::to_string(&scope).unwrap();
        let parsed: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scope);
    }

    #[test]
    fn should_deserialize_scope_with_missing_lists() {
        let json = r#"{"client": "all"}"#;
        let scope: Scope = serde_json::from_str(json).unwrap();
        assert_eq!(scope, Scope::all());
    }
}
