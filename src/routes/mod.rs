//! Router Module Index
//!
//! Splits the routing table by access level. The guard is applied to a whole module as a
//! route layer, so a handler cannot end up exposed by being registered in the wrong place.

/// Routes open to anonymous and logged-in visitors alike.
pub mod public;

/// Routes behind the `AuthUser` guard. An anonymous request is redirected to `/login`
/// before the handler runs.
pub mod authenticated;
