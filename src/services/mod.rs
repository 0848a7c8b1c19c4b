//! Business logic services. Each service is a cheap-to-clone handle over
//! the shared database connection and event sender.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod pricing;
pub mod promos;
pub mod settings;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use promos::PromoService;
pub use settings::SettingsService;
