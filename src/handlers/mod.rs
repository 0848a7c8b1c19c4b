//! HTTP handlers, grouped per resource. Each module exposes a `routes()`
//! returning a `Router<AppState>` nested under `/api/v1` in `lib.rs`.

pub mod cart;
pub mod catalog;
pub mod common;
pub mod orders;
pub mod promos;
pub mod settings;
