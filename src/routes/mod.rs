/// Router Module Index
///
/// Splits the routing table by access level. Identity itself is enforced by
/// `auth::identity_middleware` on the whole router; these modules decide
/// which extra gate, if any, a route sits behind.

/// Routes on the public allow-list: reachable without a token.
pub mod public;

/// Routes that require any verified identity.
pub mod authenticated;

/// Routes that additionally require the 'admin' role.
pub mod admin;
