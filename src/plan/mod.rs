//! Plan parsing: turns raw `EXPLAIN ANALYZE`-style text into a typed tree.

mod access_type;
mod node;
mod parser;

pub use access_type::AccessType;
pub use node::{PlanNode, PlanTree};
pub use parser::{is_derived_table_name, parse_plan, strip_derived_marker};
