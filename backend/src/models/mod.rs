//! Domain models for the tour booking backend.
//!
//! These types are shared by the repository layer, the services and the
//! HTTP DTOs. Monetary amounts are always expressed in minor currency units
//! (cents) as `i64`.

pub mod macros;

pub mod analytics;
pub mod booking;
pub mod content;
pub mod language;
pub mod pricing;
pub mod slot;
pub mod tour;
pub mod user;

pub use analytics::*;
pub use booking::*;
pub use content::*;
pub use language::*;
pub use pricing::*;
pub use slot::*;
pub use tour::*;
pub use user::*;

crate::define_id_type!(i64, TourId);
crate::define_id_type!(i64, BlockId);
crate::define_id_type!(i64, UpsellId);
crate::define_id_type!(i64, PackageId);
crate::define_id_type!(i64, SlotId);
crate::define_id_type!(i64, BookingId);
crate::define_id_type!(i64, PageId);
crate::define_id_type!(i64, CategoryId);
crate::define_id_type!(i64, LabelId);
crate::define_id_type!(i64, VisitId);
