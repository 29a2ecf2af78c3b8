use std::sync::Arc;

use ai_bt::{AiRegistry, TreeNodeFactoryContext};
use ai_core::{
    Agent, AgentId, AgentPtr, BasicCharacter, Character, NodeStateStore, TickContext,
    TreeNodeStatus, Vec3,
};
use ai_lua::LuaAiRegistry;
use ai_zone::Zone;

fn scripted(source: &str) -> LuaAiRegistry {
    let lua = LuaAiRegistry::new(Arc::new(AiRegistry::new()));
    assert!(lua.init());
    assert!(lua.evaluate(source));
    lua
}

fn agent_at(id: i64, x: f32) -> AgentPtr {
    let character = BasicCharacter::new(id);
    character.set_position(Vec3::new(x, 0.0, 0.0));
    Arc::new(Agent::new(Arc::new(character)))
}

fn run_node(lua: &LuaAiRegistry, type_name: &str, agent: &AgentPtr) -> TreeNodeStatus {
    let node = lua
        .create_node(type_name, &TreeNodeFactoryContext::new(type_name, type_name))
        .expect("script node");
    let mut states = NodeStateStore::new();
    node.execute(&mut TickContext::new(agent, &mut states, 16))
}

#[test]
fn vectors_support_fields_and_arithmetic() {
    let lua = LuaAiRegistry::new(Arc::new(AiRegistry::new()));
    assert!(lua.init());
    assert!(lua.evaluate(
        r#"
        local a = vec(1, 2, 3)
        local b = vec(3, 2, 1)
        assert(a.x == 1 and a.y == 2 and a.z == 3)
        assert(a + b == vec(4, 4, 4))
        assert(a - b == vec(-2, 0, 2))
        assert(a * b == 10)
        assert(-a == vec(-1, -2, -3))
        assert(vec(4, 4, 4) / vec(2, 4, 8) == vec(2, 1, 0.5))
        assert(vec(3, 4, 0):length() == 5)
        assert(a:dot(b) == 10)
        assert(vec() == vec(0, 0, 0))
        assert(a ~= b)
        a.x = 7
        assert(a.x == 7)
        assert(tostring(vec(1, 2, 3)) == "vec: 1:2:3")
        "#
    ));
}

#[test]
fn scripts_write_through_character_setters() {
    let lua = scripted(
        r#"
        local mover = REGISTRY.createNode("Mover")
        function mover:execute(ai, deltaMillis)
            local character = ai:character()
            character:setPosition(character:position() + vec(1, 1, 1))
            character:setSpeed(4.5)
            character:setOrientation(1.5)
            character:setAttribute("mood", "angry")
            return FINISHED
        end
        "#,
    );

    let agent = agent_at(3, 2.0);
    assert_eq!(run_node(&lua, "Mover", &agent), TreeNodeStatus::Finished);

    let character = agent.character();
    assert_eq!(character.position(), Vec3::new(3.0, 1.0, 1.0));
    assert_eq!(character.speed(), 4.5);
    assert_eq!(character.orientation(), 1.5);
    assert_eq!(character.attribute("mood").as_deref(), Some("angry"));
}

#[test]
fn scripts_reach_the_zone_of_their_agent() {
    let lua = scripted(
        r#"
        local lookup = REGISTRY.createNode("Lookup")
        function lookup:execute(ai, deltaMillis)
            if not ai:hasZone() then return FAILED end
            local zone = ai:zone()
            if zone:name() ~= "bindings" or zone:size() ~= 2 then return FAILED end
            if zone:ai(2):id() ~= 2 or zone:ai(99) ~= nil then return FAILED end
            if tostring(zone) ~= "zone: bindings" then return FAILED end
            local sum = 0
            zone:execute(function(member) sum = sum + member:id() end)
            if sum ~= 3 then return FAILED end
            return FINISHED
        end

        local homeless = REGISTRY.createNode("Homeless")
        function homeless:execute(ai, deltaMillis)
            if ai:hasZone() or ai:zone() ~= nil then return FAILED end
            return FINISHED
        end
        "#,
    );

    let zone = Zone::new("bindings", 1);
    let (a, b) = (agent_at(1, 0.0), agent_at(2, 0.0));
    zone.add_agent(a.clone());
    zone.add_agent(b);
    zone.update(10);

    assert_eq!(run_node(&lua, "Lookup", &a), TreeNodeStatus::Finished);
    assert_eq!(run_node(&lua, "Homeless", &agent_at(9, 0.0)), TreeNodeStatus::Finished);
}

#[test]
fn scripts_manage_groups_of_their_zone() {
    let lua = scripted(
        r#"
        local grouper = REGISTRY.createNode("Grouper")
        function grouper:execute(ai, deltaMillis)
            local zone = ai:zone()
            local groups = zone:groupMgr()
            local other = zone:ai(2)
            if not groups:add(5, ai) or not groups:add(5, other) then return FAILED end
            if groups:add(5, ai) then return FAILED end
            if not groups:isLeader(5, ai) or groups:isLeader(5, other) then return FAILED end
            if groups:size(5) ~= 2 or groups:size(6) ~= 0 then return FAILED end
            if groups:leader(5) ~= ai then return FAILED end
            if groups:position(5) ~= vec(5, 0, 0) then return FAILED end
            if groups:position(6) ~= nil then return FAILED end
            if not groups:remove(5, ai) then return FAILED end
            if not groups:isLeader(5, other) or groups:isInGroup(5, ai) then return FAILED end
            if not groups:isInAnyGroup(other) then return FAILED end
            return FINISHED
        end
        "#,
    );

    let zone = Zone::new("bindings", 1);
    let (a, b) = (agent_at(1, 0.0), agent_at(2, 10.0));
    zone.add_agent(a.clone());
    zone.add_agent(b);
    zone.update(10);

    assert_eq!(run_node(&lua, "Grouper", &a), TreeNodeStatus::Finished);
    assert_eq!(zone.group_mgr().leader(5).map(|l| l.id()), Some(AgentId(2)));
}

#[test]
fn zone_handles_fail_once_the_zone_is_gone() {
    let lua = scripted(
        r#"
        local keeper = REGISTRY.createNode("Keeper")
        function keeper:execute(ai, deltaMillis)
            KEPT = ai:zone()
            return FINISHED
        end
        "#,
    );

    let a = agent_at(1, 0.0);
    let zone = Zone::new("doomed", 1);
    zone.add_agent(a.clone());
    zone.update(10);
    assert_eq!(run_node(&lua, "Keeper", &a), TreeNodeStatus::Finished);

    drop(zone);
    assert!(lua.evaluate(r#"assert(tostring(KEPT) == "zone: destroyed")"#));
    assert!(!lua.evaluate("return KEPT:size()"));
}

#[test]
fn scripts_drive_the_aggro_list() {
    let lua = scripted(
        r#"
        local angry = REGISTRY.createNode("Angry")
        function angry:execute(ai, deltaMillis)
            local aggro = ai:aggroMgr()
            local id, value = aggro:highestEntry()
            if id ~= nil or value ~= nil then return FAILED end
            aggro:addAggro(4, 2)
            if aggro:addAggro(7, 6) ~= 6 then return FAILED end
            id, value = aggro:highestEntry()
            if id ~= 7 or value ~= 6 then return FAILED end
            if aggro:entries()[4] ~= 2 then return FAILED end
            aggro:reduceByValue(2)
            return FINISHED
        end
        "#,
    );

    let agent = agent_at(1, 0.0);
    assert_eq!(run_node(&lua, "Angry", &agent), TreeNodeStatus::Finished);

    agent.update(1000, false);
    let aggro = agent.aggro_mgr();
    assert_eq!(aggro.aggro(AgentId(7)), Some(4.0));
    assert_eq!(aggro.aggro(AgentId(4)), None);
}
