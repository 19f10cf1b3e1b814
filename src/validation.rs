mod component;
mod declarations;
mod graph;

pub use declarations::validate_declarations;
pub use graph::validate_graph;
