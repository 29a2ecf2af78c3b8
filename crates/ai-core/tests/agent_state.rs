use std::sync::Arc;

use ai_core::{
    Agent, AgentId, BasicCharacter, Character, NodeId, NodeStateStore, TreeNodeStatus, Vec3,
};

#[test]
fn agent_takes_id_from_character_and_tracks_time() {
    let character = Arc::new(BasicCharacter::new(7));
    character.set_position(Vec3::new(1.0, 2.0, 3.0));
    let agent = Agent::new(character);

    assert_eq!(agent.id(), AgentId(7));
    assert_eq!(agent.character().position(), Vec3::new(1.0, 2.0, 3.0));

    agent.update(100, false);
    agent.update(50, false);
    assert_eq!(agent.time(), 150);
}

#[test]
fn pause_flag_round_trips() {
    let agent = Agent::new(Arc::new(BasicCharacter::new(1)));
    assert!(!agent.is_paused());
    agent.set_pause(true);
    assert!(agent.is_paused());
}

#[test]
fn filtered_entities_are_replaced_and_appended() {
    let agent = Agent::new(Arc::new(BasicCharacter::new(1)));
    agent.set_filtered_entities(vec![AgentId(2), AgentId(3)]);
    agent.add_filtered_entity(AgentId(4));
    assert_eq!(
        agent.filtered_entities(),
        vec![AgentId(2), AgentId(3), AgentId(4)]
    );
    agent.clear_filtered_entities();
    assert!(agent.filtered_entities().is_empty());
}

#[test]
fn character_attributes_and_visibility() {
    let character = BasicCharacter::new(1);
    character.set_attribute("Name", "grunt");
    character.set_visible(vec![AgentId(5), AgentId(6)]);

    assert_eq!(character.attribute("Name").as_deref(), Some("grunt"));
    assert_eq!(character.attribute("Missing"), None);

    let mut seen = Vec::new();
    character.visit_visible(&mut |id| seen.push(id));
    assert_eq!(seen, vec![AgentId(5), AgentId(6)]);
}

#[test]
fn state_store_is_lazy_and_resettable() {
    let mut store = NodeStateStore::new();
    let node = NodeId(42);

    store.set_selected(node, None);
    assert!(store.is_empty());

    store.set_selected(node, Some(2));
    assert_eq!(store.selected(node), Some(2));

    store.record(node, TreeNodeStatus::Running, 500);
    assert_eq!(store.last_status(node), Some(TreeNodeStatus::Running));
    assert_eq!(store.last_exec_millis(node), Some(500));

    store.set_selected(node, None);
    assert_eq!(store.selected(node), None);
    assert_eq!(store.len(), 1);

    store.remove(node);
    assert!(store.is_empty());
}

#[test]
fn status_codes_map_unknown_values_to_failed() {
    for status in [
        TreeNodeStatus::CannotExecute,
        TreeNodeStatus::Running,
        TreeNodeStatus::Finished,
        TreeNodeStatus::Failed,
    ] {
        assert_eq!(TreeNodeStatus::from_code(status.code() as i64), status);
    }
    assert_eq!(TreeNodeStatus::from_code(0), TreeNodeStatus::Failed);
    assert_eq!(TreeNodeStatus::from_code(5), TreeNodeStatus::Failed);
}

#[test]
fn aggro_decays_with_agent_updates() {
    let agent = Agent::new(Arc::new(BasicCharacter::new(1)));
    agent.aggro_mgr().add_aggro(AgentId(2), 4.0);
    agent.aggro_mgr().set_reduce_by_value(1.0);

    agent.update(1000, false);
    assert_eq!(agent.aggro_mgr().aggro(AgentId(2)), Some(3.0));
    agent.update(3000, false);
    assert!(agent.aggro_mgr().is_empty());
}

#[test]
fn zone_link_is_weak() {
    let agent = Agent::new(Arc::new(BasicCharacter::new(1)));
    assert!(!agent.has_zone());

    let zone: Arc<dyn std::any::Any + Send + Sync> = Arc::new(String::from("arena"));
    agent.set_zone(Some(Arc::downgrade(&zone)));
    assert!(agent.has_zone());
    let name = agent.zone().and_then(|z| z.downcast::<String>().ok());
    assert_eq!(name.as_deref().map(String::as_str), Some("arena"));

    drop(zone);
    assert!(!agent.has_zone());
}

#[test]
fn character_setters_write_through_the_trait() {
    let character: Arc<dyn Character> = Arc::new(BasicCharacter::new(3));
    character.set_position(Vec3::new(4.0, 5.0, 6.0));
    character.set_orientation(1.5);
    character.set_speed(2.0);
    character.set_attribute("state", "idle");

    assert_eq!(character.position(), Vec3::new(4.0, 5.0, 6.0));
    assert_eq!(character.orientation(), 1.5);
    assert_eq!(character.speed(), 2.0);
    assert_eq!(character.attribute("state").as_deref(), Some("idle"));
}
