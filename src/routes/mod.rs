/// Router Module Index
///
/// Routes are split by access tier. Each module only declares paths and handlers;
/// the guard for a tier is attached as a `route_layer` in `create_router`, so no
/// handler in a protected module can be reached around its check.

/// Routes accessible to everyone, read-only plus account and session endpoints.
pub mod public;

/// Routes requiring a valid credential.
pub mod authenticated;

/// Routes on a single post or comment, open to its owner and to administrators.
pub mod owner;

/// Routes restricted to administrators.
pub mod admin;
