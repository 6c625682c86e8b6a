// -
// Coordination namespace layout

/// Root segment of every namespace handed out by the factory
pub(crate) const NAMESPACE_PREFIX: &str = "oengine";

/// Per-topic child node holding one marker node per registered observer
pub(crate) const OBSERVERS_NODE: &str = "observers";

/// Per-topic child node backing the distributed mutex
pub(crate) const LOCK_NODE: &str = "lock";
