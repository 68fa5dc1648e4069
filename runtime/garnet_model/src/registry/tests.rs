use super::*;
use crate::backend::ResourceNaming;
use crate::property::{PropertyFlags, PropertyOptions, PropertyType};
use garnet_ir::SharedInterner;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rustc_hash::FxHashSet;

fn registry() -> ModelRegistry {
    ModelRegistry::new(BackendCatalog::new(SharedInterner::new(), "default"))
}

fn names(models: &[Arc<ModelDescriptor>]) -> Vec<&str> {
    models.iter().map(|model| model.name()).collect()
}

#[test]
fn derived_properties_are_copies() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    animal
        .declare_property("name", PropertyType::String, PropertyOptions::new())
        .unwrap();
    let dog = registry.derive("Dog", &animal).unwrap();
    let backend = animal.default_backend();

    let animal_name = animal.property(backend, "name").unwrap();
    let dog_name = dog.property(backend, "name").unwrap();
    assert!(!dog_name.same(&animal_name));
    assert_eq!(dog_name.read().model(), dog.id());

    dog.declare_property("sound", PropertyType::String, PropertyOptions::new())
        .unwrap();
    assert!(animal.properties(backend).find("sound").is_none());
    assert_eq!(dog.properties(backend).labels(), vec!["name", "sound"]);
}

#[test]
fn mutating_a_copy_leaves_the_original() {
    let registry = registry();
    let parent = registry.declare("Person").unwrap();
    parent
        .declare_property("age", PropertyType::Integer, PropertyOptions::new())
        .unwrap();
    let child = registry.derive("Student", &parent).unwrap();
    let backend = parent.default_backend();

    child
        .update_property(backend, "age", |age| age.set_flag(PropertyFlags::INDEX, true))
        .unwrap();
    assert!(!parent
        .property(backend, "age")
        .unwrap()
        .read()
        .flags()
        .contains(PropertyFlags::INDEX));

    parent
        .update_property(backend, "age", |age| age.set_flag(PropertyFlags::NULLABLE, false))
        .unwrap();
    assert!(child.property(backend, "age").unwrap().read().is_nullable());
}

#[test]
fn derived_backend_sets_keep_sharing() {
    let registry = registry();
    let legacy = registry
        .catalog()
        .register("legacy", Arc::new(ResourceNaming::Underscored));
    let animal = registry.declare("Animal").unwrap();
    assert!(animal.properties(legacy).is_empty());
    animal
        .declare_property("name", PropertyType::String, PropertyOptions::new())
        .unwrap();

    let dog = registry.derive("Dog", &animal).unwrap();
    let in_default = dog.property(dog.default_backend(), "name").unwrap();
    let in_legacy = dog.property(legacy, "name").unwrap();
    assert!(in_default.same(&in_legacy));
    assert!(!in_default.same(&animal.property(legacy, "name").unwrap()));
}

#[test]
fn storage_names_are_copied() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    let backend = animal.default_backend();
    assert_eq!(animal.storage_name(backend).unwrap(), "animals");
    let dog = registry.derive("Dog", &animal).unwrap();
    assert_eq!(dog.storage_name(backend).unwrap(), "animals");
}

#[test]
fn validations_are_copied() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    animal
        .declare_property("name", PropertyType::String, PropertyOptions::new().nullable(false))
        .unwrap();
    let dog = registry.derive("Dog", &animal).unwrap();
    assert_eq!(dog.validations(), animal.validations());
    assert_eq!(dog.validate(&Default::default()).len(), 1);
}

#[test]
fn removal_does_not_cascade() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    let dog = registry.derive("Dog", &animal).unwrap();
    assert_eq!(names(&registry.enumerate_live()), vec!["Animal", "Dog"]);

    assert!(registry.remove(&animal));
    assert_eq!(names(&registry.enumerate_live()), vec!["Dog"]);
    assert!(!dog.is_removed());
    assert!(registry.lookup("Animal").is_none());
    assert!(!registry.remove(&animal));
}

#[test]
fn duplicate_names_are_rejected() {
    let registry = registry();
    registry.declare("Animal").unwrap();
    assert_eq!(
        registry.declare("Animal").unwrap_err(),
        ModelError::DuplicateRegistration {
            name: "Animal".into()
        }
    );
    assert_eq!(
        registry.declare("animal").unwrap_err(),
        ModelError::InvalidName {
            name: "animal".into()
        }
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn failed_derive_registers_nothing() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    let cat = registry.declare("Cat").unwrap();
    registry.remove(&animal);

    assert_eq!(
        registry.derive("Dog", &animal).unwrap_err(),
        ModelError::Removed {
            name: "Animal".into()
        }
    );
    assert_eq!(
        registry.derive("Cat", &cat).unwrap_err(),
        ModelError::DuplicateRegistration { name: "Cat".into() }
    );
    assert_eq!(names(&registry.enumerate_live()), vec!["Cat"]);
    assert!(cat.children().is_empty());
}

#[test]
fn redeclared_name_starts_fresh() {
    let registry = registry();
    let first = registry.declare("Animal").unwrap();
    first
        .declare_property("name", PropertyType::String, PropertyOptions::new())
        .unwrap();
    registry.remove(&first);

    let second = registry.declare("Animal").unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(second.lifecycle(), Lifecycle::Registered);
    assert!(second.properties(second.default_backend()).is_empty());
    assert!(second.validations().is_empty());
    assert!(Arc::ptr_eq(&registry.lookup("Animal").unwrap(), &second));
}

#[test]
fn clear_removes_everything() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    registry.derive("Dog", &animal).unwrap();
    assert_eq!(registry.clear(), 2);
    assert!(registry.is_empty());
    assert!(animal.is_removed());
    registry.declare("Animal").unwrap();
}

#[test]
fn storage_plan_groups_hierarchies() {
    let registry = registry();
    let animal = registry.declare("Animal").unwrap();
    animal
        .declare_property("id", PropertyType::Serial, PropertyOptions::new())
        .unwrap();
    let dog = registry.derive("Dog", &animal).unwrap();
    dog.declare_property("breed", PropertyType::String, PropertyOptions::new())
        .unwrap();
    let post = registry.declare("Blog::Post").unwrap();
    post.declare_property("title", PropertyType::String, PropertyOptions::new())
        .unwrap();

    let plan = registry
        .storage_plan(registry.catalog().default_backend())
        .unwrap();
    assert_eq!(
        plan,
        vec![
            StoragePlanEntry {
                storage_name: "animals".into(),
                models: vec!["Animal".into(), "Dog".into()],
                fields: vec!["id".into(), "breed".into()],
            },
            StoragePlanEntry {
                storage_name: "blog_posts".into(),
                models: vec!["Blog::Post".into()],
                fields: vec!["title".into()],
            },
        ]
    );
}

#[test]
fn concurrent_declarations_keep_membership() {
    let registry = registry();
    std::thread::scope(|s| {
        for worker in 0..4 {
            let registry = &registry;
            s.spawn(move || {
                for n in 0..25 {
                    let model = registry.declare(&format!("Model{worker}x{n}")).unwrap();
                    model
                        .declare_property("id", PropertyType::Serial, PropertyOptions::new())
                        .unwrap();
                    if n % 5 == 0 {
                        assert!(registry.remove(&model));
                    }
                }
            });
        }
    });
    assert_eq!(registry.len(), 4 * 20);
    let unique: FxHashSet<ModelId> = registry
        .enumerate_live()
        .iter()
        .map(|model| model.id())
        .collect();
    assert_eq!(unique.len(), 80);
}

#[test]
fn declaration_racing_a_derive_reaches_the_subtype() {
    for round in 0..500 {
        let registry = registry();
        let animal = registry.declare("Animal").unwrap();
        let barrier = std::sync::Barrier::new(2);
        let dog = std::thread::scope(|s| {
            let derived = s.spawn(|| {
                barrier.wait();
                registry.derive("Dog", &animal).unwrap()
            });
            s.spawn(|| {
                barrier.wait();
                animal
                    .declare_property("tag", PropertyType::String, PropertyOptions::new())
                    .unwrap();
            });
            derived.join().unwrap()
        });
        let tag = dog.property(dog.default_backend(), "tag");
        assert!(tag.is_ok(), "round {round}: Dog lacks a property of its parent");
        assert_eq!(tag.unwrap().read().model(), dog.id());
        assert_eq!(animal.lifecycle(), Lifecycle::HasSubtypes);
    }
}

#[derive(Clone, Debug)]
enum Step {
    Declare(u8),
    Derive(u8, u8),
    Remove(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..8).prop_map(Step::Declare),
        (0u8..8, 0u8..8).prop_map(|(name, parent)| Step::Derive(name, parent)),
        (0u8..8).prop_map(Step::Remove),
    ]
}

proptest! {
    #[test]
    fn live_set_is_declared_minus_removed(steps in prop::collection::vec(step(), 0..40)) {
        let registry = registry();
        let mut expected: FxHashMap<String, Arc<ModelDescriptor>> = FxHashMap::default();
        for step in steps {
            match step {
                Step::Declare(n) => {
                    let name = format!("M{n}");
                    let result = registry.declare(&name);
                    prop_assert_eq!(result.is_ok(), !expected.contains_key(&name));
                    if let Ok(model) = result {
                        expected.insert(name, model);
                    }
                }
                Step::Derive(n, p) => {
                    let name = format!("M{n}");
                    let Some(parent) = expected.get(&format!("M{p}")).cloned() else {
                        continue;
                    };
                    let result = registry.derive(&name, &parent);
                    prop_assert_eq!(result.is_ok(), !expected.contains_key(&name));
                    if let Ok(model) = result {
                        expected.insert(name, model);
                    }
                }
                Step::Remove(n) => {
                    if let Some(model) = expected.remove(&format!("M{n}")) {
                        prop_assert!(registry.remove(&model));
                    }
                }
            }
            let mut live: Vec<ModelId> = registry.enumerate_live().iter().map(|m| m.id()).collect();
            let mut want: Vec<ModelId> = expected.values().map(|m| m.id()).collect();
            live.sort();
            want.sort();
            prop_assert_eq!(live, want);
        }
    }
}
