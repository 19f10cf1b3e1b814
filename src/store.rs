use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
use tracing::debug;

use crate::{
    component::{ComponentIndex, ComponentTree},
    declaration::{BindingDeclaration, BindingKind, InjectableType, ModuleDescriptor},
    key::{Key, TypeRef},
    utils::thread_safety::RcThreadSafety,
};

/// Consumed interface of the declaration extractor.
pub trait DeclarationSource {
    fn modules(&self) -> Vec<ModuleDescriptor>;

    fn injectable_types(&self) -> Vec<InjectableType>;

    fn component_tree(&self) -> ComponentTree;
}

#[derive(Debug, Default)]
struct ModuleEntry {
    ty: Option<TypeRef>,
    includes: Vec<TypeRef>,
    declarations: Vec<RcThreadSafety<BindingDeclaration>>,
    unique: BTreeMap<Key, Vec<RcThreadSafety<BindingDeclaration>>>,
    contributions: BTreeMap<Key, Vec<RcThreadSafety<BindingDeclaration>>>,
    multibinds: BTreeMap<Key, Vec<RcThreadSafety<BindingDeclaration>>>,
}

/// Read-only index of every module and injectable type.
///
/// Declarations are numbered in the order they are added,
/// identical declarations added twice are stored once.
#[derive(Debug, Default)]
pub struct DeclarationStore {
    modules: BTreeMap<TypeRef, ModuleEntry>,
    injectables: BTreeMap<TypeRef, InjectableType>,
    next_order: usize,
}

impl DeclarationStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_source(source: &dyn DeclarationSource) -> Self {
        let mut store = Self::new();
        for module in source.modules() {
            store.add_module(module);
        }
        for injectable in source.injectable_types() {
            store.add_injectable(injectable);
        }
        store
    }

    #[inline]
    #[must_use]
    pub fn with_module(mut self, module: ModuleDescriptor) -> Self {
        self.add_module(module);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_injectable(mut self, injectable: InjectableType) -> Self {
        self.add_injectable(injectable);
        self
    }

    pub fn add_module(&mut self, module: ModuleDescriptor) {
        let ModuleDescriptor {
            ty,
            includes,
            declarations,
        } = module;

        let entry = self.modules.entry(ty.clone()).or_default();
        entry.ty = Some(ty);
        for include in includes {
            if !entry.includes.contains(&include) {
                entry.includes.push(include);
            }
        }

        for mut declaration in declarations {
            if entry.declarations.iter().any(|existing| {
                let mut existing = (**existing).clone();
                existing.order = 0;
                existing == declaration
            }) {
                debug!(site = %declaration.site, "Skip duplicate declaration");
                continue;
            }

            declaration.order = self.next_order;
            self.next_order += 1;

            let index_key = if declaration.contribution_type.is_multibinding() {
                declaration.key.without_contribution()
            } else {
                declaration.key.clone()
            };
            let declaration = RcThreadSafety::new(declaration);
            let index = if declaration.contribution_type.is_multibinding() {
                &mut entry.contributions
            } else if matches!(declaration.kind, BindingKind::Multibinds) {
                &mut entry.multibinds
            } else {
                &mut entry.unique
            };
            index.entry(index_key).or_default().push(declaration.clone());
            entry.declarations.push(declaration);
        }
    }

    /// Injectable types are keyed by type, a later description of the same type replaces the earlier one
    pub fn add_injectable(&mut self, injectable: InjectableType) {
        self.injectables.insert(injectable.ty.clone(), injectable);
    }

    #[inline]
    #[must_use]
    pub fn injectable(&self, ty: &TypeRef) -> Option<&InjectableType> {
        self.injectables.get(ty)
    }

    pub fn injectables(&self) -> impl Iterator<Item = &InjectableType> {
        self.injectables.values()
    }

    #[inline]
    #[must_use]
    pub fn contains_module(&self, ty: &TypeRef) -> bool {
        self.modules.get(ty).is_some_and(|entry| entry.ty.is_some())
    }

    /// Declarations of a single module, without its includes
    pub fn module_declarations(&self, ty: &TypeRef) -> impl Iterator<Item = &RcThreadSafety<BindingDeclaration>> {
        self.modules.get(ty).into_iter().flat_map(|entry| entry.declarations.iter())
    }

    /// Modules installed on every component of the tree, with their transitive includes
    #[must_use]
    pub fn installed_modules(&self, tree: &ComponentTree) -> InstalledModules {
        InstalledModules(
            tree.indices()
                .map(|index| self.transitive_modules(&tree.descriptor(index).modules))
                .collect(),
        )
    }

    /// Depth-first, in declaration order, each module once
    #[must_use]
    pub fn transitive_modules(&self, modules: &[TypeRef]) -> Vec<TypeRef> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<&TypeRef> = modules.iter().rev().collect();
        while let Some(module) = stack.pop() {
            if !seen.insert(module) {
                continue;
            }
            order.push(module.clone());
            if let Some(entry) = self.modules.get(module) {
                stack.extend(entry.includes.iter().rev());
            }
        }
        order
    }

    /// Unique declarations of `key` in `modules`
    #[must_use]
    pub fn unique_declarations(&self, modules: &[TypeRef], key: &Key) -> Vec<RcThreadSafety<BindingDeclaration>> {
        self.collect(modules, |entry| entry.unique.get(key))
    }

    /// Contributions to the collection `key` in `modules`
    #[must_use]
    pub fn contributions(&self, modules: &[TypeRef], key: &Key) -> Vec<RcThreadSafety<BindingDeclaration>> {
        self.collect(modules, |entry| entry.contributions.get(key))
    }

    #[must_use]
    pub fn multibinds_declarations(&self, modules: &[TypeRef], key: &Key) -> Vec<RcThreadSafety<BindingDeclaration>> {
        self.collect(modules, |entry| entry.multibinds.get(key))
    }

    /// Every declaration in `modules`, in declaration order
    #[must_use]
    pub fn declarations(&self, modules: &[TypeRef]) -> Vec<RcThreadSafety<BindingDeclaration>> {
        let mut declarations: Vec<_> = modules
            .iter()
            .filter_map(|module| self.modules.get(module))
            .flat_map(|entry| entry.declarations.iter().cloned())
            .collect();
        declarations.sort_by_key(|declaration| declaration.order);
        declarations
    }

    /// Whether `modules` declare anything for `key`: a unique binding, a contribution or a `Multibinds` declaration
    #[must_use]
    pub fn declares(&self, modules: &[TypeRef], key: &Key) -> bool {
        modules.iter().filter_map(|module| self.modules.get(module)).any(|entry| {
            entry.unique.contains_key(key) || entry.contributions.contains_key(key) || entry.multibinds.contains_key(key)
        })
    }

    fn collect<'a>(
        &'a self,
        modules: &[TypeRef],
        select: impl Fn(&'a ModuleEntry) -> Option<&'a Vec<RcThreadSafety<BindingDeclaration>>>,
    ) -> Vec<RcThreadSafety<BindingDeclaration>> {
        let mut declarations: Vec<_> = modules
            .iter()
            .filter_map(|module| self.modules.get(module))
            .filter_map(select)
            .flat_map(|declarations| declarations.iter().cloned())
            .collect();
        declarations.sort_by_key(|declaration| declaration.order);
        declarations
    }
}

/// Transitively installed modules per component
#[derive(Debug, Clone, Default)]
pub struct InstalledModules(Vec<Vec<TypeRef>>);

impl InstalledModules {
    #[must_use]
    pub fn of(&self, component: ComponentIndex) -> &[TypeRef] {
        self.0.get(component.get()).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    #[allow(unused_imports)]
    use std::{format, string::*};

    use super::DeclarationStore;
    use crate::{
        component::{ComponentDescriptor, ComponentTree},
        declaration::{BindingDeclaration, DeclarationSite, ModuleDescriptor},
        key::{Key, TypeRef},
    };

    use alloc::vec;
    use tracing_test::traced_test;

    fn string() -> TypeRef {
        TypeRef::declared("java.lang", "String")
    }

    fn provides_string(module: &TypeRef, element: &str) -> BindingDeclaration {
        BindingDeclaration::provision(Key::of(string()), DeclarationSite::new(module.clone(), element))
    }

    #[test]
    #[traced_test]
    fn test_includes_are_installed_transitively() {
        let a = TypeRef::declared("test", "AModule");
        let b = TypeRef::declared("test", "BModule");
        let c = TypeRef::declared("test", "CModule");
        let store = DeclarationStore::new()
            .with_module(ModuleDescriptor::new(a.clone()).including(b.clone()))
            .with_module(ModuleDescriptor::new(b.clone()).including(c.clone()).including(a.clone()))
            .with_module(ModuleDescriptor::new(c.clone()));

        assert_eq!(store.transitive_modules(&[a.clone()]), vec![a.clone(), b.clone(), c.clone()]);

        let mut tree = ComponentTree::new();
        let root = tree.add_root(ComponentDescriptor::component(TypeRef::declared("test", "TestComponent")).with_module(c.clone()));
        assert_eq!(store.installed_modules(&tree).of(root), &[c]);
    }

    #[test]
    #[traced_test]
    fn test_identical_declarations_are_stored_once() {
        let module = TypeRef::declared("test", "TestModule");
        let store = DeclarationStore::new()
            .with_module(ModuleDescriptor::new(module.clone()).with_declaration(provides_string(&module, "string")))
            .with_module(ModuleDescriptor::new(module.clone()).with_declaration(provides_string(&module, "string")));

        assert_eq!(store.unique_declarations(&[module.clone()], &Key::of(string())).len(), 1);
        assert!(logs_contain("Skip duplicate declaration"));
    }

    #[test]
    #[traced_test]
    fn test_contributions_are_indexed_by_collection() {
        let module = TypeRef::declared("test", "SetModule");
        let store = DeclarationStore::new().with_module(
            ModuleDescriptor::new(module.clone())
                .with_declaration(provides_string(&module, "first").into_set())
                .with_declaration(provides_string(&module, "second").into_set()),
        );
        let collection = Key::of(TypeRef::set_of(string()));
        let contributions = store.contributions(&[module.clone()], &collection);

        assert_eq!(contributions.len(), 2);
        assert!(contributions[0].order() < contributions[1].order());
        assert!(store.declares(&[module.clone()], &collection));
        assert!(store.unique_declarations(&[module], &collection).is_empty());
    }
}
