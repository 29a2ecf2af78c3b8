use std::sync::{Arc, Mutex, PoisonError};

use ai_bt::{AiRegistry, TreeLoader, TreeSpec};
use ai_core::TreeNodePtr;
use mlua::{AnyUserData, Lua, MetaMethod, UserData, UserDataMethods, Value};
use tracing::{debug, warn};

use crate::LuaError;

type SharedSpec = Arc<Mutex<TreeSpec>>;

/// Builds behaviour trees described by Lua scripts.
///
/// ```lua
/// function init()
///     local tree = AI.createTree("guard")
///     local root = tree:createRoot("PrioritySelector", "root")
///     root:addNode("Idle{1000}", "wait"):setCondition("Not(HasFilteredEntities)")
///     root:addNode("Print{alarm}", "alarm")
/// end
/// ```
///
/// Every script runs in a fresh Lua state that is closed once the trees are collected.
/// Node and condition types are resolved against the [`AiRegistry`] when the tree is built,
/// so types declared through a [`crate::LuaAiRegistry`] sharing that registry can be used.
#[derive(Debug)]
pub struct LuaTreeLoader {
    registry: Arc<AiRegistry>,
    trees: TreeLoader,
}

impl LuaTreeLoader {
    pub fn new(registry: Arc<AiRegistry>) -> Self {
        Self {
            registry,
            trees: TreeLoader::new(),
        }
    }

    /// Runs `source`, calls its global `init()` if there is one and builds every tree it
    /// declared. Returns `false` if anything failed; see [`LuaTreeLoader::error`].
    pub fn init(&self, source: &str) -> bool {
        self.init_named("=trees", source)
    }

    pub fn init_named(&self, name: &str, source: &str) -> bool {
        let specs = match collect_trees(name, source) {
            Ok(specs) => specs,
            Err(err) => {
                warn!(script = name, error = %err, "tree script failed");
                self.trees.set_error(err.to_string());
                return false;
            }
        };
        let mut ok = true;
        for spec in &specs {
            ok &= self.trees.build(&self.registry, spec).is_ok();
        }
        debug!(script = name, trees = specs.len(), "tree script loaded");
        ok
    }

    pub fn load(&self, name: &str) -> Option<TreeNodePtr> {
        self.trees.load(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.trees.names()
    }

    /// Last error, empty if every load succeeded.
    pub fn error(&self) -> String {
        self.trees.error()
    }

    pub fn trees(&self) -> &TreeLoader {
        &self.trees
    }
}

fn collect_trees(name: &str, source: &str) -> Result<Vec<TreeSpec>, LuaError> {
    let declared: Arc<Mutex<Vec<SharedSpec>>> = Arc::default();
    let lua = Lua::new();

    let ai = lua.create_table()?;
    let sink = Arc::clone(&declared);
    ai.set(
        "createTree",
        lua.create_function(move |_, tree_name: String| {
            let spec = Arc::new(Mutex::new(TreeSpec::new(tree_name)));
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(&spec));
            Ok(LuaTree(spec))
        })?,
    )?;
    lua.globals().set("AI", ai)?;

    lua.load(source).set_name(name).exec()?;
    if let Value::Function(init) = lua.globals().get::<Value>("init")? {
        init.call::<()>(())?;
    }
    drop(lua);

    let declared = declared.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(declared
        .iter()
        .map(|spec| spec.lock().unwrap_or_else(PoisonError::into_inner).clone())
        .collect())
}

/// `AI.createTree(name)` handle.
struct LuaTree(SharedSpec);

impl UserData for LuaTree {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getName", |_, this, ()| {
            Ok(this.0.lock().unwrap_or_else(PoisonError::into_inner).name().to_string())
        });

        methods.add_method(
            "createRoot",
            |_, this, (node_type, name): (String, String)| {
                let index = this
                    .0
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .create_root(node_type, name)
                    .map_err(mlua::Error::external)?;
                Ok(LuaNode {
                    spec: Arc::clone(&this.0),
                    index,
                })
            },
        );

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "tree: {}",
                this.0.lock().unwrap_or_else(PoisonError::into_inner).name()
            ))
        });
    }
}

/// A node declaration inside a [`LuaTree`].
struct LuaNode {
    spec: SharedSpec,
    index: usize,
}

impl UserData for LuaNode {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getName", |_, this, ()| {
            let spec = this.spec.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(spec.node(this.index).map(|node| node.name.clone()))
        });

        methods.add_method("addNode", |_, this, (node_type, name): (String, String)| {
            let index = this
                .spec
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .add_node(this.index, node_type, name)
                .map_err(mlua::Error::external)?;
            Ok(LuaNode {
                spec: Arc::clone(&this.spec),
                index,
            })
        });

        // Returns the node itself so calls can be chained.
        methods.add_function(
            "setCondition",
            |_, (node, condition): (AnyUserData, String)| {
                {
                    let this = node.borrow::<LuaNode>()?;
                    this.spec
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .set_condition(this.index, condition)
                        .map_err(mlua::Error::external)?;
                }
                Ok(node)
            },
        );
    }
}
