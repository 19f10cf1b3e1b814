use bindplan::{
    BindingDeclaration, BindingGraphProcessor, BindingKind, CollectionKind, ComponentDescriptor, ComponentMethod, ComponentTree,
    ContributionType, DeclarationSite, DeclarationStore, DependencyRequest, InjectableType, Key, MapKey, ModuleDescriptor, RequestSite,
    TypeRef,
};

fn ty(name: &str) -> TypeRef {
    TypeRef::declared("test", name)
}

fn string() -> TypeRef {
    TypeRef::declared("java.lang", "String")
}

fn set_element(module: &TypeRef, element: &str) -> BindingDeclaration {
    BindingDeclaration::provision(Key::of(string()), DeclarationSite::new(module.clone(), element)).into_set()
}

fn sites(processor: &BindingGraphProcessor, key: &Key, component: usize) -> Vec<String> {
    let index = processor.tree().indices().nth(component).unwrap();
    let binding = processor.resolver().resolve(key, &processor.tree().path(index)).unwrap();
    let BindingKind::Multibound(multibound) = binding.kind() else {
        panic!("{key} is not multibound");
    };
    multibound.contributions.iter().map(|contribution| contribution.site.to_string()).collect()
}

#[test]
fn test_set_contributions_follow_component_and_declaration_order() {
    let parent_module = ty("ParentModule");
    let child_module = ty("ChildModule");
    // Child contributions are declared first, yet the parent's come first in the set
    let store = DeclarationStore::new()
        .with_module(
            ModuleDescriptor::new(child_module.clone())
                .with_declaration(set_element(&child_module, "b"))
                .with_declaration(set_element(&child_module, "c")),
        )
        .with_module(ModuleDescriptor::new(parent_module.clone()).with_declaration(set_element(&parent_module, "a")));
    let mut tree = ComponentTree::new();
    let parent = tree.add_root(
        ComponentDescriptor::component(ty("Parent"))
            .with_module(parent_module)
            .with_method(ComponentMethod::subcomponent_factory(ty("Parent"), "child", ty("Child"))),
    );
    tree.add_child(parent, ComponentDescriptor::subcomponent(ty("Child")).with_module(child_module));
    let processor = BindingGraphProcessor::new(store, tree);
    let key = Key::of(TypeRef::set_of(string()));

    assert_eq!(sites(&processor, &key, 0), ["ParentModule.a()"]);
    assert_eq!(sites(&processor, &key, 1), ["ParentModule.a()", "ChildModule.b()", "ChildModule.c()"]);

    let child = processor.tree().indices().nth(1).unwrap();
    let binding = processor.resolver().resolve(&key, &processor.tree().path(child)).unwrap();
    assert_eq!(binding.owner(), &processor.tree().path(child));
    assert_eq!(binding.dependencies().len(), 3);
}

#[test]
fn test_set_contributed_only_by_parent_is_shared_with_child() {
    let parent_module = ty("ParentModule");
    let store = DeclarationStore::new().with_module(ModuleDescriptor::new(parent_module.clone()).with_declaration(set_element(&parent_module, "a")));
    let mut tree = ComponentTree::new();
    let parent = tree.add_root(
        ComponentDescriptor::component(ty("Parent"))
            .with_module(parent_module)
            .with_method(ComponentMethod::subcomponent_factory(ty("Parent"), "child", ty("Child"))),
    );
    let child = tree.add_child(parent, ComponentDescriptor::subcomponent(ty("Child")));
    let processor = BindingGraphProcessor::new(store, tree);
    let key = Key::of(TypeRef::set_of(string()));

    let binding = processor.resolver().resolve(&key, &processor.tree().path(child)).unwrap();

    assert_eq!(binding.owner(), &processor.tree().path(parent));
}

#[test]
fn test_set_values_keep_declaration_order() {
    let module = ty("TestModule");
    let strings = Key::of(TypeRef::set_of(string()));
    let set_values = |element: &str| {
        BindingDeclaration::provision(strings.clone(), DeclarationSite::new(module.clone(), element)).into_set_values()
    };
    let store = DeclarationStore::new().with_module(
        ModuleDescriptor::new(module.clone())
            .with_declaration(set_values("x1"))
            .with_declaration(set_values("x2"))
            .with_declaration(set_element(&module, "y")),
    );
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("TestComponent"))
            .with_module(module.clone())
            .with_method(ComponentMethod::provision(ty("TestComponent"), "strings", strings.clone())),
    );
    let processor = BindingGraphProcessor::new(store, tree);

    assert!(!processor.process()[0].has_errors());
    assert_eq!(sites(&processor, &strings, 0), ["TestModule.x1()", "TestModule.x2()", "TestModule.y()"]);

    let binding = processor.resolver().resolve(&strings, &processor.tree().path(processor.tree().roots()[0])).unwrap();
    let BindingKind::Multibound(multibound) = binding.kind() else {
        panic!("{strings} is not multibound");
    };
    assert_eq!(
        multibound
            .contributions
            .iter()
            .map(|contribution| contribution.contribution_type)
            .collect::<Vec<_>>(),
        [ContributionType::SetValues, ContributionType::SetValues, ContributionType::Set]
    );
}

#[test]
fn test_map_key_collision_names_both_contributions() {
    let module = ty("TestModule");
    let foo = ty("Foo");
    let map = Key::of(TypeRef::map_of(string(), foo.clone()));
    let store = DeclarationStore::new().with_module(
        ModuleDescriptor::new(module.clone())
            .with_declaration(
                BindingDeclaration::provision(Key::of(foo.clone()), DeclarationSite::new(module.clone(), "foo1"))
                    .into_map(string(), MapKey("\"a\"".into())),
            )
            .with_declaration(
                BindingDeclaration::provision(Key::of(foo), DeclarationSite::new(module.clone(), "foo2")).into_map(string(), MapKey("\"a\"".into())),
            ),
    );
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("TestComponent"))
            .with_module(module)
            .with_method(ComponentMethod::provision(ty("TestComponent"), "map", map)),
    );
    let processor = BindingGraphProcessor::new(store, tree);

    let outcomes = processor.process();
    let errors: Vec<_> = outcomes[0].diagnostics.iter().map(|diagnostic| diagnostic.message.as_str()).collect();

    assert_eq!(
        errors,
        ["Map<String, Foo> has more than one contribution for the map key \"a\":\n    TestModule.foo1()\n    TestModule.foo2()"]
    );
    assert!(outcomes[0].plan.is_none());
}

#[test]
fn test_empty_multibinds_declaration() {
    let module = ty("TestModule");
    let foos = Key::of(TypeRef::set_of(ty("Foo")));
    let store = DeclarationStore::new().with_module(
        ModuleDescriptor::new(module.clone()).with_declaration(BindingDeclaration::multibinds(foos.clone(), DeclarationSite::new(module.clone(), "foos"))),
    );
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("TestComponent"))
            .with_module(module)
            .with_method(ComponentMethod::provision(ty("TestComponent"), "foos", foos.clone())),
    );
    let processor = BindingGraphProcessor::new(store, tree);

    let outcome = processor.process_component(processor.tree().roots()[0]);
    assert!(!outcome.has_errors());
    assert!(outcome.plan.is_some());

    let binding = processor.resolver().resolve(&foos, &processor.tree().path(outcome.root)).unwrap();
    let BindingKind::Multibound(multibound) = binding.kind() else {
        panic!("{foos} is not multibound");
    };
    assert_eq!(multibound.collection, CollectionKind::Set);
    assert!(multibound.is_empty());
}

#[test]
fn test_contributions_materialized_in_their_module_package() {
    let app_module = TypeRef::declared("app", "AppModule");
    let lib_module = TypeRef::declared("lib", "LibModule");
    let store = DeclarationStore::new()
        .with_module(ModuleDescriptor::new(app_module.clone()).with_declaration(set_element(&app_module, "app")))
        .with_module(ModuleDescriptor::new(lib_module.clone()).with_declaration(set_element(&lib_module, "lib")));
    let mut tree = ComponentTree::new();
    let root = tree.add_root(
        ComponentDescriptor::component(TypeRef::declared("app", "AppComponent"))
            .with_module(app_module)
            .with_module(lib_module),
    );
    // Types of `lib` are package-private
    let processor = BindingGraphProcessor::new(store, tree)
        .with_accessibility_oracle(|ty: &TypeRef, package: &str| ty.package() != Some("lib") || package == "lib");

    let binding = processor
        .resolver()
        .resolve(&Key::of(TypeRef::set_of(string())), &processor.tree().path(root))
        .unwrap();
    let BindingKind::Multibound(multibound) = binding.kind() else {
        panic!("Set<String> is not multibound");
    };

    assert_eq!(multibound.parts.len(), 2);
    assert_eq!(multibound.exposed_part().map(|part| part.contributions.clone()), Some(vec![0]));
    assert_eq!(multibound.parts[1].package.as_deref(), Some("lib"));
    assert_eq!(multibound.parts[1].contributions, [1]);
    assert!(binding.problems().is_empty());
}

#[test]
fn test_inaccessible_contribution() {
    let lib_module = TypeRef::declared("lib", "LibModule");
    let hidden = TypeRef::declared("hidden", "Hidden");
    let component = TypeRef::declared("app", "AppComponent");
    let store = DeclarationStore::new()
        .with_module(
            ModuleDescriptor::new(lib_module.clone()).with_declaration(
                BindingDeclaration::delegate(
                    Key::of(ty("Foo")),
                    DeclarationSite::new(lib_module.clone(), "bindHidden"),
                    DependencyRequest::instance(Key::of(hidden.clone()), RequestSite::method(lib_module.clone(), "bindHidden", "hidden")),
                )
                .into_set(),
            ),
        )
        .with_injectable(InjectableType::new(hidden));
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(component.clone())
            .with_module(lib_module)
            .with_method(ComponentMethod::provision(component, "foos", Key::of(TypeRef::set_of(ty("Foo"))))),
    );
    // `lib` and `hidden` types are only visible inside their own package
    let processor = BindingGraphProcessor::new(store, tree)
        .with_type_oracle(|_: &TypeRef, _: &TypeRef| true)
        .with_accessibility_oracle(|ty: &TypeRef, package: &str| match ty.package() {
            Some(own @ ("lib" | "hidden")) => own == package,
            _ => true,
        });

    let outcome = processor.process_component(processor.tree().roots()[0]);
    let errors: Vec<_> = outcome.diagnostics.iter().map(|diagnostic| diagnostic.message.as_str()).collect();

    assert_eq!(
        errors,
        ["Set<Foo> contribution LibModule.bindHidden() is accessible neither from AppComponent nor from package lib"]
    );
}

#[test]
fn test_map_key_collision_reported_once_for_parent_and_child() {
    let module = ty("ParentModule");
    let child_module = ty("ChildModule");
    let foo = ty("Foo");
    let map = Key::of(TypeRef::map_of(string(), foo.clone()));
    let entry = |module: &TypeRef, element: &str, map_key: &str| {
        BindingDeclaration::provision(Key::of(foo.clone()), DeclarationSite::new(module.clone(), element)).into_map(string(), MapKey(map_key.into()))
    };
    let store = DeclarationStore::new()
        .with_module(
            ModuleDescriptor::new(module.clone())
                .with_declaration(entry(&module, "foo1", "\"a\""))
                .with_declaration(entry(&module, "foo2", "\"a\"")),
        )
        .with_module(ModuleDescriptor::new(child_module.clone()).with_declaration(entry(&child_module, "foo3", "\"b\"")));
    let mut tree = ComponentTree::new();
    let parent = tree.add_root(
        ComponentDescriptor::component(ty("Parent"))
            .with_module(module)
            .with_method(ComponentMethod::provision(ty("Parent"), "map", map.clone()))
            .with_method(ComponentMethod::subcomponent_factory(ty("Parent"), "child", ty("Child"))),
    );
    tree.add_child(
        parent,
        ComponentDescriptor::subcomponent(ty("Child"))
            .with_module(child_module)
            .with_method(ComponentMethod::provision(ty("Child"), "map", map)),
    );
    let processor = BindingGraphProcessor::new(store, tree);

    let outcomes = processor.process();
    let errors: Vec<_> = outcomes[0].diagnostics.iter().map(|diagnostic| diagnostic.message.as_str()).collect();

    assert_eq!(
        errors,
        ["Map<String, Foo> has more than one contribution for the map key \"a\":\n    ParentModule.foo1()\n    ParentModule.foo2()"]
    );
}
