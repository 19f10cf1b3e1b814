#![no_std]

extern crate alloc;

pub(crate) mod binding;
pub(crate) mod cache;
pub(crate) mod component;
pub(crate) mod config;
pub(crate) mod contribution;
pub(crate) mod cycle;
pub(crate) mod declaration;
pub(crate) mod diagnostic;
pub(crate) mod errors;
pub(crate) mod graph;
pub(crate) mod key;
pub(crate) mod multibinding;
pub(crate) mod oracle;
pub(crate) mod plugin;
pub(crate) mod processor;
pub(crate) mod request;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod store;
pub(crate) mod strategy;
pub(crate) mod validation;

pub mod utils;

pub use binding::{Binding, BindingId, BindingType};
pub use cache::ResolutionCache;
pub use component::{
    BoundInstance, ComponentDescriptor, ComponentIndex, ComponentKind, ComponentMethod, ComponentMethodKind, ComponentNode,
    ComponentPath, ComponentTree, CreatorDescriptor,
};
pub use config::Config;
pub use contribution::ContributionType;
pub use cycle::{find_cycles, CycleReport, RenderMode};
pub use declaration::{AssistedParameter, BindingDeclaration, BindingKind, DeclarationSite, InjectableType, MapKey, ModuleDescriptor};
pub use diagnostic::{Anchor, Diagnostic, DiagnosticReporter, Severity};
pub use errors::{DeclarationSites, ResolveErrorKind, ValidationErrorKind};
pub use graph::{BindingGraph, Edge, EdgeIndex, EdgeKind, GraphBuilder, GraphRoots, MissingBinding, Node, NodeIndex};
pub use key::{ContributionId, Key, Qualifier, TypeRef};
pub use multibinding::{CollectionKind, Contribution, MaterializationPart, Multibound};
pub use oracle::{AccessibilityOracle, ExactTypeOracle, PublicAccessibilityOracle, TypeOracle};
pub use plugin::{BindingGraphPlugin, BindingGraphPlugins};
pub use processor::{BindingGraphProcessor, ComponentOutcome, Emitter};
pub use request::{DependencyRequest, RequestKind, RequestSite, SiteElement};
pub use resolver::BindingResolver;
pub use scope::{is_stronger_scope, CachingPolicy, DefaultCachingPolicy, Scope, REUSABLE_SCOPE_NAME};
pub use store::{DeclarationSource, DeclarationStore, InstalledModules};
pub use strategy::{
    CachingDiscipline, Creation, InlineForm, Strategy, StrategyKey, StrategyPlan, StrategySelector, SwitchingDispatcher,
};
pub use validation::{validate_declarations, validate_graph};
