//! Well-known names shared across the compiler.

/// Executor that runs operations on the orchestrator's own worker.
pub const CENTRAL_DEPLOYMENT_AGENT: &str = "central_deployment_agent";

/// Executor that runs operations on the agent of the hosting node.
pub const HOST_AGENT: &str = "host_agent";

/// Every legal operation/plugin executor.
pub const EXECUTORS: &[&str] = &[CENTRAL_DEPLOYMENT_AGENT, HOST_AGENT];

/// Name under which the script plugin must be declared for script-backed
/// operations to resolve.
pub const SCRIPT_PLUGIN_NAME: &str = "script";

/// Task invoked inside the script plugin for every script-backed operation.
pub const SCRIPT_PLUGIN_RUN_TASK: &str = "script_runner.tasks.run";

/// Reserved operation input carrying the resolved script resource name.
pub const SCRIPT_PATH_PROPERTY: &str = "script_path";

/// Built-in scalar type names. User-declared types may not shadow these.
pub const PRIMITIVE_TYPES: &[&str] = &["integer", "float", "boolean", "string"];

/// Top-level key carrying the definitions-version string.
pub const DEFINITIONS_VERSION_KEY: &str = "definitions_version";

/// True for one of the built-in scalar type names.
pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// True for one of the legal executors.
pub fn is_executor(executor: &str) -> bool {
    EXECUTORS.contains(&executor)
}
