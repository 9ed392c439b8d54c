//! Record types for identities, entities, assignments and reports.
//!
//! # Responsibility
//! - Give every collection a stable, typed shape with explicit optional fields.
//! - Validate records at the boundary, before any repository write.
//!
//! # Invariants
//! - Expert and family ids equal the owning account uid.
//! - Nothing is hard-deleted; there is no tombstone either.

pub mod assignment;
pub mod child;
pub mod expert;
pub mod family;
pub mod identity;
pub mod report;
pub mod validation;
