use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString as _},
    vec::Vec,
};
use tracing::{debug, error};

use crate::{
    binding::Binding,
    component::ComponentPath,
    contribution::ContributionType,
    declaration::{BindingDeclaration, BindingKind, DeclarationSite, MapKey},
    errors::ResolveErrorKind,
    key::{Key, TypeRef},
    request::{DependencyRequest, RequestSite},
    resolver::BindingResolver,
    utils::thread_safety::RcThreadSafety,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKind {
    Set,
    Map,
}

/// One contribution of an aggregated collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contribution {
    pub key: Key,
    pub contribution_type: ContributionType,
    pub map_key: Option<MapKey>,
    pub site: DeclarationSite,
}

/// Contributions that are materialized together.
/// `package` is `None` for the part built by the owning component itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterializationPart {
    pub package: Option<String>,
    pub contributions: Vec<usize>,
}

/// Aggregated contributions of a multibound collection, in element order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multibound {
    pub collection: CollectionKind,
    pub contributions: Vec<Contribution>,
    pub parts: Vec<MaterializationPart>,
}

impl Multibound {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Part built by the owning component, always the first one
    #[must_use]
    pub fn exposed_part(&self) -> Option<&MaterializationPart> {
        self.parts.first().filter(|part| part.package.is_none())
    }
}

pub(crate) struct MultibindingAggregator<'r, 'a> {
    resolver: &'r BindingResolver<'a>,
}

impl<'r, 'a> MultibindingAggregator<'r, 'a> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(resolver: &'r BindingResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Aggregates the contributions to `key` visible from `path`.
    /// Returns `None` if nothing contributes to `key` and no `Multibinds` declaration is visible.
    pub(crate) fn aggregate(
        &self,
        key: &Key,
        path: &ComponentPath,
    ) -> Result<Option<RcThreadSafety<Binding>>, ResolveErrorKind> {
        let collection = match key.ty {
            TypeRef::Set(_) => CollectionKind::Set,
            TypeRef::Map(..) => CollectionKind::Map,
            _ => return Ok(None),
        };
        let store = self.resolver.store();

        let mut contributions: Vec<(usize, RcThreadSafety<BindingDeclaration>)> = Vec::new();
        let mut multibinds_depths = Vec::new();
        for (index, component) in path.components().enumerate() {
            let depth = index + 1;
            let modules = self.resolver.modules_of(component);
            contributions.extend(
                store
                    .contributions(modules, key)
                    .into_iter()
                    .map(|declaration| (depth, declaration)),
            );
            if !store.multibinds_declarations(modules, key).is_empty() {
                multibinds_depths.push(depth);
            }
        }
        if contributions.is_empty() && multibinds_depths.is_empty() {
            return Ok(None);
        }

        // A module installed at several levels contributes once, at the highest level
        let mut seen = BTreeSet::new();
        contributions.retain(|(_, declaration)| seen.insert(declaration.key.clone()));
        contributions.sort_by(|(depth_a, a), (depth_b, b)| {
            depth_a
                .cmp(depth_b)
                .then_with(|| a.order().cmp(&b.order()))
                .then_with(|| a.site.cmp(&b.site))
        });

        let declared_depth = contributions
            .iter()
            .map(|(depth, _)| *depth)
            .max()
            .or_else(|| multibinds_depths.first().copied())
            .unwrap_or(1);
        let owner_depth = self.resolver.local_depth(
            contributions.iter().map(|(_, declaration)| declaration.key.clone()),
            declared_depth,
            path,
        );
        if owner_depth < path.len() {
            debug!(owner_depth, "Multibinding owned by ancestor");
            return self.resolver.resolve(key, &path.prefix(owner_depth)).map(Some);
        }

        let mut problems = Vec::new();
        if collection == CollectionKind::Map {
            self.check_map_keys(key, path, &contributions, &mut problems);
        }
        let parts = self.materialization_parts(key, path, &contributions, &mut problems);

        let dependencies = contributions
            .iter()
            .map(|(_, declaration)| {
                DependencyRequest::instance(
                    declaration.key.clone(),
                    RequestSite::contribution(declaration.site.enclosing.clone(), declaration.site.element.clone()),
                )
            })
            .collect();
        let multibound = Multibound {
            collection,
            contributions: contributions
                .iter()
                .map(|(_, declaration)| Contribution {
                    key: declaration.key.clone(),
                    contribution_type: declaration.contribution_type,
                    map_key: declaration.map_key.clone(),
                    site: declaration.site.clone(),
                })
                .collect(),
            parts,
        };
        debug!(contributions = multibound.contributions.len(), "Multibinding aggregated");

        let mut binding = Binding::new(key.clone(), BindingKind::Multibound(multibound), path.clone()).with_dependencies(dependencies);
        for problem in problems {
            error!("{}", problem);
            binding.push_problem(problem);
        }
        Ok(Some(RcThreadSafety::new(binding)))
    }

    fn check_map_keys(
        &self,
        key: &Key,
        path: &ComponentPath,
        contributions: &[(usize, RcThreadSafety<BindingDeclaration>)],
        problems: &mut Vec<ResolveErrorKind>,
    ) {
        let mut sites: BTreeMap<&MapKey, &DeclarationSite> = BTreeMap::new();
        for (_, declaration) in contributions {
            let Some(map_key) = &declaration.map_key else {
                continue;
            };
            match sites.get(map_key) {
                Some(first) => problems.push(ResolveErrorKind::MultibindingKeyCollision {
                    key: key.clone(),
                    map_key: map_key.clone(),
                    first: (*first).clone(),
                    second: declaration.site.clone(),
                    component: path.clone(),
                }),
                None => {
                    sites.insert(map_key, &declaration.site);
                }
            }
        }
    }

    /// Splits contributions by where they can be materialized: the owner's package first,
    /// then the packages of the contributing modules.
    fn materialization_parts(
        &self,
        key: &Key,
        path: &ComponentPath,
        contributions: &[(usize, RcThreadSafety<BindingDeclaration>)],
        problems: &mut Vec<ResolveErrorKind>,
    ) -> Vec<MaterializationPart> {
        let tree = self.resolver.tree();
        let owner_package = tree.descriptor(path.leaf()).package();

        let mut exposed = Vec::new();
        let mut by_package: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, (_, declaration)) in contributions.iter().enumerate() {
            if self.is_accessible(declaration, owner_package) {
                exposed.push(index);
                continue;
            }

            let module_package = declaration.site.enclosing.package().unwrap_or_default();
            if self.is_accessible(declaration, module_package) {
                by_package.entry(module_package.to_string()).or_default().push(index);
            } else {
                problems.push(ResolveErrorKind::Accessibility {
                    key: key.clone(),
                    site: declaration.site.clone(),
                    package: module_package.to_string(),
                    component: path.clone(),
                });
            }
        }

        let mut parts = Vec::from([MaterializationPart {
            package: None,
            contributions: exposed,
        }]);
        parts.extend(by_package.into_iter().map(|(package, contributions)| MaterializationPart {
            package: Some(package),
            contributions,
        }));
        parts
    }

    /// A contribution is called through its module, and a delegation also names its source type
    fn is_accessible(&self, declaration: &BindingDeclaration, package: &str) -> bool {
        let oracle = self.resolver.accessibility();
        let source = match &declaration.kind {
            BindingKind::Delegate { delegate } => Some(&delegate.ty),
            _ => None,
        };
        oracle.is_accessible(&declaration.site.enclosing, package) && source.map_or(true, |ty| oracle.is_accessible(ty, package))
    }
}
