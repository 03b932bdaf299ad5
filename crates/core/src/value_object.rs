//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are immutable: two prices of `9.99` are
/// the same price. To "change" one, construct a new value through its
/// validating constructor.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
