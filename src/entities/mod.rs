//! Database entities for the booking and shop domain.

pub mod activity;
pub mod activity_booking;
pub mod cart_item;
pub mod money;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_variant;
pub mod promo_code;
pub mod property;
pub mod property_booking;
pub mod setting;
pub mod user_promo_code;

// Re-export entities
pub use activity::{Entity as Activity, Model as ActivityModel};
pub use activity_booking::{Entity as ActivityBooking, Model as ActivityBookingModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, OrderType, PaymentStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use promo_code::{DiscountType, Entity as PromoCode, Model as PromoCodeModel};
pub use property::{Entity as Property, Model as PropertyModel};
pub use property_booking::{
    BookingStatus, Entity as PropertyBooking, Model as PropertyBookingModel,
};
pub use setting::{Entity as Setting, Model as SettingModel, SettingType};
pub use user_promo_code::{Entity as UserPromoCode, Model as UserPromoCodeModel};
