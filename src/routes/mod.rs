/// Router Module Index
///
/// Routes are split by the guard they sit behind, and each module's router gets its
/// guard as a layer in `create_router`.

/// Routes accessible without credentials (health, logins).
pub mod public;

/// Routes behind the principal-resolving auth middleware.
pub mod authenticated;

/// Routes restricted to platform administrators.
pub mod admin;
