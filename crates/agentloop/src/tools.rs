//! Tools a model can call during a session, and the invoker that runs them.
pub mod binding;
pub mod invoker;
pub mod result;
pub mod schema;
pub mod web;

pub use binding::{FunctionTool, ToolBinding};
pub use invoker::ToolInvoker;
pub use result::{ToolError, ToolResult};
pub use schema::{ParamType, Parameter, ParameterSchema};
