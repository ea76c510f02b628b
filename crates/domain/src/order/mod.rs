//! Orders: placement from a cart snapshot, the status machine, listings and checkout.

mod checkout;
mod commands;
mod filters;
mod service;
mod view;

pub use checkout::CheckoutService;
pub use commands::{CartLine, CartSnapshot, MAX_CART_LINES, MAX_LINE_QUANTITY, SetOrderStatus};
pub use filters::{OrderFilters, StatusFilter};
pub use service::OrderService;
pub use view::{LineView, OrderView, ProductRef};
