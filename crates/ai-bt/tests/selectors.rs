use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_bt::{
    AiRegistry, PrioritySelector, ProbabilitySelector, Sequence, Task, TreeNodeFactoryContext,
};
use ai_core::{
    Agent, AgentPtr, BasicCharacter, NodeBase, NodeStateStore, TickContext, TreeNode, TreeNodePtr,
    TreeNodeStatus,
};

fn agent() -> AgentPtr {
    Arc::new(Agent::new(Arc::new(BasicCharacter::new(1))))
}

fn base(type_name: &str, parameters: &str) -> NodeBase {
    NodeBase::new(type_name, type_name, parameters, None)
}

fn counting(status: TreeNodeStatus, hits: Arc<AtomicUsize>) -> TreeNodePtr {
    Arc::new(Task::new(base("Task", ""), move |_ctx| {
        hits.fetch_add(1, Ordering::Relaxed);
        status
    }))
}

fn constant(status: TreeNodeStatus) -> TreeNodePtr {
    Arc::new(Task::new(base("Task", ""), move |_ctx| status))
}

fn run(node: &TreeNodePtr, agent: &AgentPtr, states: &mut NodeStateStore) -> TreeNodeStatus {
    node.execute(&mut TickContext::new(agent, states, 10))
}

#[test]
fn probability_selector_with_equal_weights_is_uniform() {
    let hits: Vec<_> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let children = hits
        .iter()
        .map(|h| counting(TreeNodeStatus::Finished, Arc::clone(h)))
        .collect();
    let node: TreeNodePtr = Arc::new(
        ProbabilitySelector::new(base("ProbabilitySelector", "1,1,1,1"), children).unwrap(),
    );

    let agent = agent();
    let mut states = NodeStateStore::new();
    const DRAWS: usize = 10_000;
    for _ in 0..DRAWS {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    }

    for h in &hits {
        let share = h.load(Ordering::Relaxed) as f64 / DRAWS as f64;
        assert!((0.20..=0.30).contains(&share), "share {share} out of band");
    }
}

#[test]
fn probability_selector_resumes_running_child_without_new_draw() {
    let hits: Vec<_> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let children = hits
        .iter()
        .map(|h| counting(TreeNodeStatus::Running, Arc::clone(h)))
        .collect();
    let node: TreeNodePtr =
        Arc::new(ProbabilitySelector::new(base("ProbabilitySelector", ""), children).unwrap());

    let agent = agent();
    let mut states = NodeStateStore::new();
    for _ in 0..50 {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    }

    let counts: Vec<usize> = hits.iter().map(|h| h.load(Ordering::Relaxed)).collect();
    assert_eq!(counts.iter().filter(|&&c| c == 50).count(), 1);
    assert_eq!(counts.iter().sum::<usize>(), 50);
    assert!(states.selected(node.id()).is_some());
}

#[test]
fn probability_selector_draws_again_once_child_stops_running() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let child_ticks = Arc::clone(&ticks);
    // Runs for two ticks, then finishes.
    let child: TreeNodePtr = Arc::new(Task::new(base("Task", ""), move |_ctx| {
        if child_ticks.fetch_add(1, Ordering::Relaxed) < 2 {
            TreeNodeStatus::Running
        } else {
            TreeNodeStatus::Finished
        }
    }));
    let node: TreeNodePtr =
        Arc::new(ProbabilitySelector::new(base("ProbabilitySelector", "1"), vec![child]).unwrap());

    let agent = agent();
    let mut states = NodeStateStore::new();
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(states.selected(node.id()), Some(0));
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    assert_eq!(states.selected(node.id()), None);
}

#[test]
fn probability_selector_edge_cases() {
    let agent = agent();
    let mut states = NodeStateStore::new();

    let empty: TreeNodePtr =
        Arc::new(ProbabilitySelector::new(base("ProbabilitySelector", ""), Vec::new()).unwrap());
    assert_eq!(run(&empty, &agent, &mut states), TreeNodeStatus::CannotExecute);
    assert!(states.is_empty());

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let zero: TreeNodePtr = Arc::new(
        ProbabilitySelector::new(
            base("ProbabilitySelector", "0,0"),
            vec![
                counting(TreeNodeStatus::Finished, Arc::clone(&first)),
                counting(TreeNodeStatus::Finished, Arc::clone(&second)),
            ],
        )
        .unwrap(),
    );
    for _ in 0..20 {
        run(&zero, &agent, &mut states);
    }
    assert_eq!(first.load(Ordering::Relaxed), 20);
    assert_eq!(second.load(Ordering::Relaxed), 0);
}

#[test]
fn priority_selector_memorizes_running_child_and_resets_others() {
    let agent = agent();
    let mut states = NodeStateStore::new();

    let fallback_hits = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(PrioritySelector::new(
        base("PrioritySelector", ""),
        vec![
            constant(TreeNodeStatus::Failed),
            constant(TreeNodeStatus::Running),
            counting(TreeNodeStatus::Finished, Arc::clone(&fallback_hits)),
        ],
    ));

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(states.selected(node.id()), Some(1));
    assert_eq!(node.running_children(&states), vec![false, true, false]);
    // The failed child left nothing behind.
    assert!(states.get(node.children()[0].id()).is_none());

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(fallback_hits.load(Ordering::Relaxed), 0);
}

#[test]
fn priority_selector_fails_when_no_child_succeeds() {
    let agent = agent();
    let mut states = NodeStateStore::new();
    let node: TreeNodePtr = Arc::new(PrioritySelector::new(
        base("PrioritySelector", ""),
        vec![constant(TreeNodeStatus::Failed), constant(TreeNodeStatus::Failed)],
    ));
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Failed);
    assert_eq!(states.selected(node.id()), None);
}

#[test]
fn sequence_resumes_at_running_child() {
    let agent = agent();
    let mut states = NodeStateStore::new();
    let first_hits = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(Sequence::new(
        base("Sequence", ""),
        vec![
            counting(TreeNodeStatus::Finished, Arc::clone(&first_hits)),
            constant(TreeNodeStatus::Running),
        ],
    ));

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(first_hits.load(Ordering::Relaxed), 1);
}

#[test]
fn denied_guard_returns_cannot_execute_without_state() {
    let registry = AiRegistry::new();
    let condition = ai_bt::parse_condition(&registry, "False").unwrap();
    let ctx = TreeNodeFactoryContext::new("PrioritySelector", "guarded")
        .with_condition(condition)
        .with_children(vec![constant(TreeNodeStatus::Running)]);
    let node = registry.create_node(&ctx).unwrap();

    let agent = agent();
    let mut states = NodeStateStore::new();
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::CannotExecute);
    assert!(states.is_empty());
}

#[test]
fn one_tree_is_shared_by_many_agents() {
    let node: TreeNodePtr = Arc::new(Sequence::new(
        base("Sequence", ""),
        vec![constant(TreeNodeStatus::Finished), constant(TreeNodeStatus::Running)],
    ));
    let a = agent();
    let b = agent();
    let mut a_states = NodeStateStore::new();
    let mut b_states = NodeStateStore::new();

    run(&node, &a, &mut a_states);
    assert_eq!(a_states.selected(node.id()), Some(1));
    assert_eq!(b_states.selected(node.id()), None);

    run(&node, &b, &mut b_states);
    node.reset_state(&mut a_states);
    assert!(a_states.is_empty());
    assert_eq!(b_states.selected(node.id()), Some(1));
}
