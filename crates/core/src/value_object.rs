//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attribute values.
/// A `TaxId` is a value object; a persisted `SupplierRecord` is not (it is
/// identified by its `SupplierId`).
///
/// To "modify" a value object, build a new one. Constructors are expected to
/// reject malformed input, so holding a value object means holding a valid
/// value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
