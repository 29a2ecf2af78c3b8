use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};

use ai_core::TreeNodePtr;
use tracing::{debug, warn};

use crate::parser::{parse_condition, parse_node, ParseError};
use crate::registry::AiRegistry;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("tree '{0}' already has a root node")]
    RootExists(String),
    #[error("tree '{0}' has no root node")]
    NoRoot(String),
    #[error("tree '{tree}' has no node #{index}")]
    UnknownNode { tree: String, index: usize },
    #[error("tree '{tree}', node '{node}': {source}")]
    Parse {
        tree: String,
        node: String,
        #[source]
        source: ParseError,
    },
    #[error("tree '{0}' is already loaded")]
    Duplicate(String),
}

/// One node declaration inside a [`TreeSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Node expression, e.g. `Idle{1000}`.
    pub node_type: String,
    pub name: String,
    /// Condition expression, e.g. `Not(True)`.
    pub condition: Option<String>,
    pub children: Vec<usize>,
}

/// Arena of node declarations, referenced by index while a tree is being described.
///
/// Declarations can be added in any order; [`TreeSpec::build`] turns them into the immutable,
/// shareable node graph bottom-up.
#[derive(Debug, Clone, Default)]
pub struct TreeSpec {
    name: String,
    nodes: Vec<NodeSpec>,
    root: Option<usize>,
}

impl TreeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, index: usize) -> Option<&NodeSpec> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_root(
        &mut self,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<usize, LoadError> {
        if self.root.is_some() {
            return Err(LoadError::RootExists(self.name.clone()));
        }
        let index = self.push(node_type.into(), name.into());
        self.root = Some(index);
        Ok(index)
    }

    pub fn add_node(
        &mut self,
        parent: usize,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<usize, LoadError> {
        if parent >= self.nodes.len() {
            return Err(self.unknown(parent));
        }
        let index = self.push(node_type.into(), name.into());
        self.nodes[parent].children.push(index);
        Ok(index)
    }

    pub fn set_condition(
        &mut self,
        index: usize,
        condition: impl Into<String>,
    ) -> Result<(), LoadError> {
        let unknown = self.unknown(index);
        let node = self.nodes.get_mut(index).ok_or(unknown)?;
        node.condition = Some(condition.into());
        Ok(())
    }

    /// Builds the node graph. Every expression is resolved against `registry` now; the
    /// resulting nodes keep no reference to it.
    pub fn build(&self, registry: &AiRegistry) -> Result<TreeNodePtr, LoadError> {
        let root = self.root.ok_or_else(|| LoadError::NoRoot(self.name.clone()))?;
        self.build_node(registry, root)
    }

    fn build_node(&self, registry: &AiRegistry, index: usize) -> Result<TreeNodePtr, LoadError> {
        let spec = self.nodes.get(index).ok_or_else(|| self.unknown(index))?;
        let children = spec
            .children
            .iter()
            .map(|&child| self.build_node(registry, child))
            .collect::<Result<Vec<_>, _>>()?;
        let condition = spec
            .condition
            .as_deref()
            .map(|expr| parse_condition(registry, expr))
            .transpose()
            .map_err(|source| self.parse_error(spec, source))?;
        parse_node(registry, &spec.node_type, &spec.name, condition, children)
            .map_err(|source| self.parse_error(spec, source))
    }

    fn push(&mut self, node_type: String, name: String) -> usize {
        self.nodes.push(NodeSpec {
            node_type,
            name,
            condition: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn unknown(&self, index: usize) -> LoadError {
        LoadError::UnknownNode {
            tree: self.name.clone(),
            index,
        }
    }

    fn parse_error(&self, spec: &NodeSpec, source: ParseError) -> LoadError {
        LoadError::Parse {
            tree: self.name.clone(),
            node: spec.name.clone(),
            source,
        }
    }
}

/// Named, built trees ready to be handed to agents.
///
/// All agents loading the same name share one root.
#[derive(Debug, Default)]
pub struct TreeLoader {
    trees: RwLock<BTreeMap<String, TreeNodePtr>>,
    error: Mutex<String>,
}

impl TreeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a tree with this name is already loaded.
    pub fn add_tree(&self, name: impl Into<String>, root: TreeNodePtr) -> bool {
        let name = name.into();
        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        if trees.contains_key(&name) {
            return false;
        }
        debug!(tree = %name, "tree loaded");
        trees.insert(name, root);
        true
    }

    /// Builds `spec` and adds it. Failures are also kept as the last error.
    pub fn build(&self, registry: &AiRegistry, spec: &TreeSpec) -> Result<(), LoadError> {
        let result = spec.build(registry).and_then(|root| {
            if self.add_tree(spec.name(), root) {
                Ok(())
            } else {
                Err(LoadError::Duplicate(spec.name().to_string()))
            }
        });
        if let Err(err) = &result {
            warn!(tree = spec.name(), error = %err, "failed to build tree");
            self.set_error(err.to_string());
        }
        result
    }

    pub fn load(&self, name: &str) -> Option<TreeNodePtr> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.trees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Last error reported while loading, empty if none.
    pub fn error(&self) -> String {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_error(&self, error: impl Into<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error.into();
    }
}
