use bindplan::{
    find_cycles, BindingGraphProcessor, ComponentDescriptor, ComponentMethod, ComponentTree, Config, DeclarationStore, DependencyRequest, GraphRoots,
    InjectableType, Key, RequestSite, Scope, TypeRef,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn ty(index: usize) -> TypeRef {
    TypeRef::declared("bench", format!("T{index}"))
}

/// `T0 -> T1 -> ... -> T{len - 1}`, every fifth type is a singleton
fn chain(len: usize) -> DeclarationStore {
    (0..len).fold(DeclarationStore::new(), |store, index| {
        let mut injectable = InjectableType::new(ty(index));
        if index + 1 < len {
            injectable = injectable.with_constructor_dependency(DependencyRequest::instance(
                Key::of(ty(index + 1)),
                RequestSite::constructor(ty(index), "next"),
            ));
        }
        if index % 5 == 0 {
            injectable = injectable.with_scope(Scope::new("Singleton"));
        }
        store.with_injectable(injectable)
    })
}

/// Root declaring the singleton scope, with `depth` nested subcomponents each requesting `T0`
fn tree(depth: usize) -> ComponentTree {
    let component = TypeRef::declared("bench", "Component");
    let mut tree = ComponentTree::new();
    let mut parent = tree.add_root(
        ComponentDescriptor::component(component.clone())
            .with_scope(Scope::new("Singleton"))
            .with_method(ComponentMethod::provision(component, "t0", Key::of(ty(0)))),
    );
    for level in 0..depth {
        let subcomponent = TypeRef::declared("bench", format!("Sub{level}"));
        parent = tree.add_child(
            parent,
            ComponentDescriptor::subcomponent(subcomponent.clone()).with_method(ComponentMethod::provision(subcomponent, "t0", Key::of(ty(0)))),
        );
    }
    tree
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("process_chain_100", |b| {
        b.iter(|| BindingGraphProcessor::new(chain(100), tree(0)).process())
    })
    .bench_function("process_chain_100_fast_init", |b| {
        b.iter(|| {
            BindingGraphProcessor::new(chain(100), tree(0))
                .with_config(Config {
                    fast_init: true,
                    ..Config::default()
                })
                .process()
        })
    })
    .bench_function("process_subcomponents_10", |b| {
        b.iter(|| BindingGraphProcessor::new(chain(50), tree(10)).process())
    })
    .bench_function("build_graph_with_cache", |b| {
        let processor = BindingGraphProcessor::new(chain(100), tree(5));
        let root = processor.tree().roots()[0];
        b.iter(|| processor.build_graph(root, GraphRoots::EntryPoints).unwrap())
    })
    .bench_function("find_cycles_chain_100", |b| {
        let processor = BindingGraphProcessor::new(chain(100), tree(5));
        let graph = processor.build_graph(processor.tree().roots()[0], GraphRoots::EntryPoints).unwrap();
        b.iter(|| find_cycles(&graph))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
