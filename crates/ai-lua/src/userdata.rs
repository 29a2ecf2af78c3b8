//! Native objects as seen from scripts.
//!
//! - `ai:id()`, `ai:time()`, `ai:filteredEntities()`, `ai:character()`, `ai:zone()`,
//!   `ai:hasZone()`, `ai:aggroMgr()`
//! - `character:id()`, `character:position()`, `character:setPosition(vec)`,
//!   `character:orientation()`, `character:setOrientation(n)`, `character:speed()`,
//!   `character:setSpeed(n)`, `character:attributes()`, `character:attribute(key)`,
//!   `character:setAttribute(key, value)`
//! - `zone:name()`, `zone:size()`, `zone:ai(id)`, `zone:execute(fn)`, `zone:groupMgr()`
//! - `groupMgr:add(group, ai)`, `groupMgr:remove(group, ai)`, `groupMgr:isLeader(group, ai)`,
//!   `groupMgr:isInGroup(group, ai)`, `groupMgr:isInAnyGroup(ai)`, `groupMgr:size(group)`,
//!   `groupMgr:leader(group)`, `groupMgr:position(group)`
//! - `aggroMgr:addAggro(id, amount)`, `aggroMgr:highestEntry()`, `aggroMgr:entries()`,
//!   `aggroMgr:reduceByRatio(ratio, min)`, `aggroMgr:reduceByValue(value)`,
//!   `aggroMgr:resetReduceValue()`
//! - `vec(x, y, z)` with fields `x`, `y`, `z`, arithmetic, `vec:dot(other)` and `vec:length()`
//!
//! Agents, characters and vectors compare with `==`; everything renders through `tostring`.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use ai_core::{AgentId, AgentPtr, CharacterPtr, Vec3};
use ai_zone::{GroupId, Zone};
use mlua::{
    AnyUserData, Function, MetaMethod, UserData, UserDataFields, UserDataMethods, UserDataRef,
};

const VEC_EPSILON: f32 = 0.0001;

/// The `ai` argument passed to script methods.
///
/// Holds a strong reference only for as long as the script keeps the value alive; once the
/// collector finalizes it the agent's reference count drops back.
pub struct LuaAgent(AgentPtr);

impl LuaAgent {
    pub fn new(agent: AgentPtr) -> Self {
        Self(agent)
    }

    pub fn agent(&self) -> &AgentPtr {
        &self.0
    }
}

impl UserData for LuaAgent {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("id", |_, this, ()| Ok(this.0.id().0));

        methods.add_method("time", |_, this, ()| Ok(this.0.time()));

        methods.add_method("filteredEntities", |_, this, ()| {
            Ok(this
                .0
                .filtered_entities()
                .into_iter()
                .map(|id| id.0)
                .collect::<Vec<i64>>())
        });

        methods.add_method("character", |_, this, ()| {
            Ok(LuaCharacter(Arc::clone(this.0.character())))
        });

        methods.add_method("zone", |_, this, ()| {
            Ok(Zone::of(&this.0).map(|zone| LuaZone::new(&zone)))
        });

        methods.add_method("hasZone", |_, this, ()| Ok(this.0.has_zone()));

        methods.add_method("aggroMgr", |_, this, ()| {
            Ok(LuaAggroMgr(Arc::clone(&this.0)))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<LuaAgent>()
                .map(|other| Arc::ptr_eq(&this.0, &other.0))
                .unwrap_or(false))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match this.0.behaviour() {
                Some(root) => format!("ai: {}", root.name()),
                None => "ai: no behaviour tree set".to_string(),
            })
        });
    }
}

pub struct LuaCharacter(CharacterPtr);

impl LuaCharacter {
    pub fn new(character: CharacterPtr) -> Self {
        Self(character)
    }
}

impl UserData for LuaCharacter {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("id", |_, this, ()| Ok(this.0.id().0));

        methods.add_method("position", |_, this, ()| Ok(LuaVec(this.0.position())));

        methods.add_method("setPosition", |_, this, position: UserDataRef<LuaVec>| {
            this.0.set_position(position.0);
            Ok(())
        });

        methods.add_method("orientation", |_, this, ()| Ok(this.0.orientation()));

        methods.add_method("setOrientation", |_, this, orientation: f32| {
            this.0.set_orientation(orientation);
            Ok(())
        });

        methods.add_method("speed", |_, this, ()| Ok(this.0.speed()));

        methods.add_method("setSpeed", |_, this, speed: f32| {
            this.0.set_speed(speed);
            Ok(())
        });

        methods.add_method("attributes", |_, this, ()| Ok(this.0.attributes()));

        methods.add_method("attribute", |_, this, key: String| Ok(this.0.attribute(&key)));

        methods.add_method(
            "setAttribute",
            |_, this, (key, value): (String, String)| {
                this.0.set_attribute(&key, &value);
                Ok(())
            },
        );

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<LuaCharacter>()
                .map(|other| this.0.id() == other.0.id())
                .unwrap_or(false))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("character: {}", this.0.id()))
        });
    }
}

/// A zone handle. Scripts that keep one around do not keep the zone alive.
pub struct LuaZone(Weak<Zone>);

impl LuaZone {
    pub fn new(zone: &Arc<Zone>) -> Self {
        Self(Arc::downgrade(zone))
    }

    fn zone(&self) -> mlua::Result<Arc<Zone>> {
        self.0
            .upgrade()
            .ok_or_else(|| mlua::Error::external("zone is already destroyed"))
    }
}

impl UserData for LuaZone {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("name", |_, this, ()| Ok(this.zone()?.name().to_string()));

        methods.add_method("size", |_, this, ()| Ok(this.zone()?.size()));

        methods.add_method("ai", |_, this, id: i64| {
            Ok(this.zone()?.get(AgentId(id)).map(LuaAgent::new))
        });

        methods.add_method("execute", |_, this, f: Function| {
            let zone = this.zone()?;
            let mut result = Ok(());
            zone.execute(|agent| {
                if result.is_ok() {
                    result = f.call::<()>(LuaAgent::new(Arc::clone(agent)));
                }
            });
            result
        });

        methods.add_method("groupMgr", |_, this, ()| {
            this.zone()?;
            Ok(LuaGroupMgr(this.0.clone()))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match this.0.upgrade() {
                Some(zone) => format!("zone: {}", zone.name()),
                None => "zone: destroyed".to_string(),
            })
        });
    }
}

/// The group manager of a zone.
pub struct LuaGroupMgr(Weak<Zone>);

impl LuaGroupMgr {
    fn zone(&self) -> mlua::Result<Arc<Zone>> {
        self.0
            .upgrade()
            .ok_or_else(|| mlua::Error::external("zone is already destroyed"))
    }
}

impl UserData for LuaGroupMgr {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method(
            "add",
            |_, this, (group, ai): (GroupId, UserDataRef<LuaAgent>)| {
                Ok(this.zone()?.group_mgr().add(group, ai.agent()))
            },
        );

        methods.add_method(
            "remove",
            |_, this, (group, ai): (GroupId, UserDataRef<LuaAgent>)| {
                Ok(this.zone()?.group_mgr().remove(group, ai.agent().id()))
            },
        );

        methods.add_method(
            "isLeader",
            |_, this, (group, ai): (GroupId, UserDataRef<LuaAgent>)| {
                Ok(this.zone()?.group_mgr().is_group_leader(group, ai.agent().id()))
            },
        );

        methods.add_method(
            "isInGroup",
            |_, this, (group, ai): (GroupId, UserDataRef<LuaAgent>)| {
                Ok(this.zone()?.group_mgr().is_in_group(group, ai.agent().id()))
            },
        );

        methods.add_method("isInAnyGroup", |_, this, ai: UserDataRef<LuaAgent>| {
            Ok(this.zone()?.group_mgr().is_in_any_group(ai.agent().id()))
        });

        methods.add_method("size", |_, this, group: GroupId| {
            Ok(this.zone()?.group_mgr().group_size(group))
        });

        methods.add_method("leader", |_, this, group: GroupId| {
            Ok(this.zone()?.group_mgr().leader(group).map(LuaAgent::new))
        });

        methods.add_method("position", |_, this, group: GroupId| {
            Ok(this.zone()?.group_mgr().position(group).map(LuaVec))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match this.0.upgrade() {
                Some(zone) => format!("groupMgr: {}", zone.name()),
                None => "groupMgr: destroyed".to_string(),
            })
        });
    }
}

/// The aggro list of one agent.
pub struct LuaAggroMgr(AgentPtr);

impl UserData for LuaAggroMgr {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("addAggro", |_, this, (id, amount): (i64, f32)| {
            Ok(this.0.aggro_mgr().add_aggro(AgentId(id), amount))
        });

        // Two results, `id, aggro`, or nil when the list is empty.
        methods.add_method("highestEntry", |_, this, ()| {
            Ok(match this.0.aggro_mgr().highest_entry() {
                Some(entry) => (Some(entry.id.0), Some(entry.aggro)),
                None => (None, None),
            })
        });

        methods.add_method("entries", |_, this, ()| {
            Ok(this
                .0
                .aggro_mgr()
                .entries()
                .iter()
                .map(|e| (e.id.0, e.aggro))
                .collect::<BTreeMap<i64, f32>>())
        });

        methods.add_method(
            "reduceByRatio",
            |_, this, (ratio, min_aggro): (f32, f32)| {
                this.0.aggro_mgr().set_reduce_by_ratio(ratio, min_aggro);
                Ok(())
            },
        );

        methods.add_method("reduceByValue", |_, this, value: f32| {
            this.0.aggro_mgr().set_reduce_by_value(value);
            Ok(())
        });

        methods.add_method("resetReduceValue", |_, this, ()| {
            this.0.aggro_mgr().reset_reduce_value();
            Ok(())
        });

        methods.add_meta_method(MetaMethod::ToString, |_, _, ()| Ok("aggroMgr"));
    }
}

/// A three component vector, copied in and out of native code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuaVec(pub Vec3);

impl LuaVec {
    fn map2(self, other: Vec3, f: impl Fn(f32, f32) -> f32) -> LuaVec {
        let a = self.0;
        LuaVec(Vec3::new(f(a.x, other.x), f(a.y, other.y), f(a.z, other.z)))
    }

    fn dot(self, other: Vec3) -> f32 {
        let a = self.0;
        a.x * other.x + a.y * other.y + a.z * other.z
    }
}

impl UserData for LuaVec {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.0.x));
        fields.add_field_method_get("y", |_, this| Ok(this.0.y));
        fields.add_field_method_get("z", |_, this| Ok(this.0.z));
        fields.add_field_method_set("x", |_, this, x: f32| {
            this.0.x = x;
            Ok(())
        });
        fields.add_field_method_set("y", |_, this, y: f32| {
            this.0.y = y;
            Ok(())
        });
        fields.add_field_method_set("z", |_, this, z: f32| {
            this.0.z = z;
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("dot", |_, this, other: UserDataRef<LuaVec>| {
            Ok(this.dot(other.0))
        });

        methods.add_method("length", |_, this, ()| Ok(this.dot(this.0).sqrt()));

        methods.add_meta_method(MetaMethod::Add, |_, this, other: UserDataRef<LuaVec>| {
            Ok(this.map2(other.0, |a, b| a + b))
        });

        methods.add_meta_method(MetaMethod::Sub, |_, this, other: UserDataRef<LuaVec>| {
            Ok(this.map2(other.0, |a, b| a - b))
        });

        methods.add_meta_method(MetaMethod::Div, |_, this, other: UserDataRef<LuaVec>| {
            Ok(this.map2(other.0, |a, b| a / b))
        });

        methods.add_meta_method(MetaMethod::Mul, |_, this, other: UserDataRef<LuaVec>| {
            Ok(this.dot(other.0))
        });

        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| {
            Ok(LuaVec(Vec3::new(-this.0.x, -this.0.y, -this.0.z)))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<LuaVec>()
                .map(|other| {
                    let (a, b) = (this.0, other.0);
                    (a.x - b.x).abs() < VEC_EPSILON
                        && (a.y - b.y).abs() < VEC_EPSILON
                        && (a.z - b.z).abs() < VEC_EPSILON
                })
                .unwrap_or(false))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("vec: {}:{}:{}", this.0.x, this.0.y, this.0.z))
        });
    }
}
