/// Config for a binding graph processor
/// ## Fields
/// - `fast_init`:
///   If `true`, deferred requests (`Provider<T>`, `Lazy<T>`) are served by one switching
///   dispatcher per component instead of a factory class per binding.
///
///   This does **not** affect synchronous requests.
/// - `full_binding_graph_validation`:
///   If `true`, every declaration of every component is validated, not only the ones
///   reachable from entry points. Reports carry a classname legend.
/// - `switching_dispatch_max_cases`:
///   Maximum number of cases per switching dispatcher; further cases open a new dispatcher.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub fast_init: bool,
    pub full_binding_graph_validation: bool,
    pub switching_dispatch_max_cases: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fast_init: false,
            full_binding_graph_validation: false,
            switching_dispatch_max_cases: 100,
        }
    }
}
