use kernel::id::Id;

/// Marker for credential/profile owners. Server generated, opaque to clients.
pub struct UserMarker;
pub type UserId = Id<UserMarker>;
