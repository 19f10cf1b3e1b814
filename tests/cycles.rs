use bindplan::{
    BindingDeclaration, BindingGraphProcessor, ComponentDescriptor, ComponentMethod, ComponentTree, Config, DeclarationSite,
    DeclarationStore, DependencyRequest, InjectableType, Key, ModuleDescriptor, Qualifier, RequestSite, TypeRef,
};

fn ty(name: &str) -> TypeRef {
    TypeRef::declared("test", name)
}

fn lang(name: &str) -> TypeRef {
    TypeRef::declared("java.lang", name)
}

fn outer(name: &str, dependency: &str, parameter: &str) -> InjectableType {
    let this = ty(&format!("Outer.{name}"));
    InjectableType::new(this.clone()).with_constructor_dependency(DependencyRequest::instance(
        Key::of(ty(&format!("Outer.{dependency}"))),
        RequestSite::constructor(this, parameter),
    ))
}

fn abc() -> DeclarationStore {
    DeclarationStore::new()
        .with_injectable(outer("A", "C", "cParam"))
        .with_injectable(outer("B", "A", "aParam"))
        .with_injectable(outer("C", "B", "bParam"))
}

fn errors(processor: &BindingGraphProcessor) -> Vec<String> {
    processor
        .process()
        .into_iter()
        .flat_map(|outcome| outcome.diagnostics)
        .filter(|diagnostic| diagnostic.is_error())
        .map(|diagnostic| diagnostic.message)
        .collect()
}

fn cycle_module() -> ModuleDescriptor {
    let module = ty("CycleModule");
    ModuleDescriptor::new(module.clone())
        .with_declaration(
            BindingDeclaration::provision(Key::of(lang("Object")), DeclarationSite::new(module.clone(), "object")).with_dependency(
                DependencyRequest::instance(Key::of(lang("String")), RequestSite::method(module.clone(), "object", "string")),
            ),
        )
        .with_declaration(
            BindingDeclaration::provision(Key::of(lang("String")), DeclarationSite::new(module.clone(), "string")).with_dependency(
                DependencyRequest::instance(Key::of(lang("Object")), RequestSite::method(module, "string", "object")),
            ),
        )
}

#[test]
fn test_cyclic_dependency() {
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("Outer.CComponent"))
            .with_method(ComponentMethod::provision(ty("Outer.CComponent"), "getC", Key::of(ty("Outer.C")))),
    );

    let errors = errors(&BindingGraphProcessor::new(abc(), tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          Outer.C is injected at\n        Outer.A(cParam)\n    \
          Outer.A is injected at\n        Outer.B(aParam)\n    \
          Outer.B is injected at\n        Outer.C(bParam)\n    \
          Outer.C is requested at\n        Outer.CComponent.getC()"]
    );
}

#[test]
fn test_cyclic_dependency_with_full_binding_graph_validation() {
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("Outer.CComponent"))
            .with_method(ComponentMethod::provision(ty("Outer.CComponent"), "getC", Key::of(ty("Outer.C")))),
    );
    let processor = BindingGraphProcessor::new(abc(), tree).with_config(Config {
        full_binding_graph_validation: true,
        ..Config::default()
    });

    let errors = errors(&processor);

    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with(
        "Found a dependency cycle:\n    \
         Outer.C is injected at\n        Outer.A(cParam)\n    \
         Outer.A is injected at\n        Outer.B(aParam)\n    \
         Outer.B is injected at\n        Outer.C(bParam)\n\
         \n\
         ======================\n\
         Full classname legend:\n\
         ======================\n\
         Outer: test.Outer\n\
         ========================\n\
         End of classname legend:\n\
         ========================"
    ));
}

#[test]
fn test_cycle_not_including_entry_point() {
    let store = abc().with_injectable(outer("D", "C", "cParam"));
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("Outer.DComponent"))
            .with_method(ComponentMethod::provision(ty("Outer.DComponent"), "getD", Key::of(ty("Outer.D")))),
    );

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          Outer.C is injected at\n        Outer.A(cParam)\n    \
          Outer.A is injected at\n        Outer.B(aParam)\n    \
          Outer.B is injected at\n        Outer.C(bParam)\n    \
          Outer.C is injected at\n        Outer.D(cParam)\n    \
          Outer.D is requested at\n        Outer.DComponent.getD()"]
    );
}

#[test]
fn test_cycle_reached_through_provider() {
    let d = ty("Outer.D");
    let store = abc().with_injectable(
        InjectableType::new(d.clone())
            .with_constructor_dependency(DependencyRequest::provider(Key::of(ty("Outer.C")), RequestSite::constructor(d, "cParam"))),
    );
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("Outer.DComponent"))
            .with_method(ComponentMethod::provision(ty("Outer.DComponent"), "getD", Key::of(ty("Outer.D")))),
    );

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          Outer.C is injected at\n        Outer.A(cParam)\n    \
          Outer.A is injected at\n        Outer.B(aParam)\n    \
          Outer.B is injected at\n        Outer.C(bParam)\n    \
          Provider<Outer.C> is injected at\n        Outer.D(cParam)\n    \
          Outer.D is requested at\n        Outer.DComponent.getD()"]
    );
}

#[test]
fn test_cycle_in_subcomponents() {
    let store = DeclarationStore::new().with_module(cycle_module());
    let mut tree = ComponentTree::new();
    let parent = tree.add_root(
        ComponentDescriptor::component(ty("Parent")).with_method(ComponentMethod::subcomponent_creator(ty("Parent"), "child", ty("Child"))),
    );
    let child = tree.add_child(
        parent,
        ComponentDescriptor::subcomponent(ty("Child"))
            .with_module(ty("CycleModule"))
            .with_method(ComponentMethod::subcomponent_creator(ty("Child"), "grandchild", ty("Grandchild"))),
    );
    tree.add_child(
        child,
        ComponentDescriptor::subcomponent(ty("Grandchild")).with_method(ComponentMethod::provision(ty("Grandchild"), "entry", Key::of(lang("String")))),
    );

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with(
        "Found a dependency cycle:\n    \
         String is injected at\n        CycleModule.object(string)\n    \
         Object is injected at\n        CycleModule.string(object)\n    \
         String is requested at\n        Grandchild.entry()"
    ));
}

#[test]
fn test_cycle_in_subcomponent_with_children() {
    let store = DeclarationStore::new().with_module(cycle_module());
    let mut tree = ComponentTree::new();
    let parent = tree.add_root(
        ComponentDescriptor::component(ty("Parent")).with_method(ComponentMethod::subcomponent_creator(ty("Parent"), "child", ty("Child"))),
    );
    let child = tree.add_child(
        parent,
        ComponentDescriptor::subcomponent(ty("Child"))
            .with_module(ty("CycleModule"))
            .with_method(ComponentMethod::provision(ty("Child"), "entry", Key::of(lang("String"))))
            .with_method(ComponentMethod::subcomponent_creator(ty("Child"), "grandchild", ty("Grandchild"))),
    );
    tree.add_child(child, ComponentDescriptor::subcomponent(ty("Grandchild")));

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          String is injected at\n        CycleModule.object(string)\n    \
          Object is injected at\n        CycleModule.string(object)\n    \
          String is requested at\n        Child.entry() [Parent → Child]"]
    );
}

#[test]
fn test_circular_binds_methods() {
    let module = ty("TestModule");
    let qualified = Key::qualified(lang("Object"), Qualifier::new(ty("SomeQualifier")));
    let store = DeclarationStore::new().with_module(
        ModuleDescriptor::new(module.clone())
            .with_declaration(BindingDeclaration::delegate(
                Key::of(lang("Object")),
                DeclarationSite::new(module.clone(), "bindUnqualified"),
                DependencyRequest::instance(qualified.clone(), RequestSite::method(module.clone(), "bindUnqualified", "qualified")),
            ))
            .with_declaration(BindingDeclaration::delegate(
                qualified,
                DeclarationSite::new(module.clone(), "bindQualified"),
                DependencyRequest::instance(Key::of(lang("Object")), RequestSite::method(module.clone(), "bindQualified", "unqualified")),
            )),
    );
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("TestComponent"))
            .with_module(module)
            .with_method(ComponentMethod::provision(ty("TestComponent"), "unqualified", Key::of(lang("Object")))),
    );

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          Object is injected at\n        TestModule.bindQualified(unqualified)\n    \
          @SomeQualifier Object is injected at\n        TestModule.bindUnqualified(qualified)\n    \
          Object is requested at\n        TestComponent.unqualified()"]
    );
}

#[test]
fn test_self_referential_binds() {
    let module = ty("TestModule");
    let store = DeclarationStore::new().with_module(ModuleDescriptor::new(module.clone()).with_declaration(BindingDeclaration::delegate(
        Key::of(lang("Object")),
        DeclarationSite::new(module.clone(), "bindToSelf"),
        DependencyRequest::instance(Key::of(lang("Object")), RequestSite::method(module.clone(), "bindToSelf", "sameKey")),
    )));
    let mut tree = ComponentTree::new();
    tree.add_root(
        ComponentDescriptor::component(ty("TestComponent"))
            .with_module(module)
            .with_method(ComponentMethod::provision(ty("TestComponent"), "selfReferential", Key::of(lang("Object")))),
    );

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(
        errors,
        ["Found a dependency cycle:\n    \
          Object is injected at\n        TestModule.bindToSelf(sameKey)\n    \
          Object is requested at\n        TestComponent.selfReferential()"]
    );
}

#[test]
fn test_long_cycle_masked_by_short_broken_cycles() {
    let a = ty("Cycles.A");
    let b = ty("Cycles.B");
    let store = DeclarationStore::new()
        .with_injectable(
            InjectableType::new(a.clone())
                .with_constructor_dependency(DependencyRequest::provider(Key::of(a.clone()), RequestSite::constructor(a.clone(), "aProvider")))
                .with_constructor_dependency(DependencyRequest::instance(Key::of(b.clone()), RequestSite::constructor(a.clone(), "b"))),
        )
        .with_injectable(
            InjectableType::new(b.clone())
                .with_constructor_dependency(DependencyRequest::provider(Key::of(b.clone()), RequestSite::constructor(b.clone(), "bProvider")))
                .with_constructor_dependency(DependencyRequest::instance(Key::of(a.clone()), RequestSite::constructor(b, "a"))),
        );
    let mut tree = ComponentTree::new();
    tree.add_root(ComponentDescriptor::component(ty("Cycles.C")).with_method(ComponentMethod::provision(ty("Cycles.C"), "a", Key::of(a))));

    let errors = errors(&BindingGraphProcessor::new(store, tree));

    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Found a dependency cycle:"));
}
