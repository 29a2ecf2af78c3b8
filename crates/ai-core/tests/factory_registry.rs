use std::sync::Arc;

use ai_core::{FactoryError, FactoryRegistry};

#[derive(Debug, PartialEq)]
struct Steer(&'static str);

struct Ctx {
    parameters: String,
}

fn ctx(parameters: &str) -> Ctx {
    Ctx {
        parameters: parameters.to_string(),
    }
}

#[test]
fn registered_factory_creates_and_unknown_name_does_not() {
    let registry = FactoryRegistry::<Steer, Ctx>::new("steering");
    assert!(registry.register_fn("Wander", |_ctx: &Ctx| Ok(Steer("wander"))));

    assert_eq!(registry.create("Wander", &ctx("")), Some(Steer("wander")));
    assert_eq!(registry.create("Sprint", &ctx("")), None);

    assert!(registry.unregister("Wander"));
    assert_eq!(registry.create("Wander", &ctx("")), None);
}

#[test]
fn duplicate_registration_keeps_first_factory() {
    let registry = FactoryRegistry::<Steer, Ctx>::new("steering");
    assert!(registry.register_fn("Wander", |_ctx: &Ctx| Ok(Steer("first"))));
    assert!(!registry.register_fn("Wander", |_ctx: &Ctx| Ok(Steer("second"))));

    assert_eq!(registry.create("Wander", &ctx("")), Some(Steer("first")));
    assert_eq!(registry.names(), vec!["Wander".to_string()]);
}

#[test]
fn unregister_of_absent_name_fails() {
    let registry = FactoryRegistry::<Steer, Ctx>::new("steering");
    assert!(!registry.unregister("Wander"));
}

#[test]
fn factory_errors_and_panics_become_none() {
    let registry = FactoryRegistry::<Steer, Ctx>::new("steering");
    registry.register_fn("Picky", |ctx: &Ctx| {
        if ctx.parameters.is_empty() {
            return Err(FactoryError::Missing("parameters"));
        }
        Ok(Steer("picky"))
    });
    registry.register_fn("Broken", |_ctx: &Ctx| -> Result<Steer, FactoryError> {
        panic!("factory bug")
    });

    assert_eq!(registry.create("Picky", &ctx("")), None);
    assert_eq!(registry.create("Picky", &ctx("1")), Some(Steer("picky")));
    assert_eq!(registry.create("Broken", &ctx("")), None);
}

#[test]
fn factories_can_be_shared_trait_objects() {
    struct Fixed;

    impl ai_core::Factory<Steer, Ctx> for Fixed {
        fn create(&self, _ctx: &Ctx) -> Result<Steer, FactoryError> {
            Ok(Steer("fixed"))
        }
    }

    let factory: Arc<dyn ai_core::Factory<Steer, Ctx>> = Arc::new(Fixed);
    let a = FactoryRegistry::<Steer, Ctx>::new("steering");
    let b = FactoryRegistry::<Steer, Ctx>::new("steering");
    assert!(a.register("Fixed", Arc::clone(&factory)));
    assert!(b.register("Fixed", factory));

    assert!(a.unregister("Fixed"));
    assert_eq!(b.create("Fixed", &ctx("")), Some(Steer("fixed")));
}
