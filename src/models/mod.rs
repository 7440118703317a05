pub mod cart;
pub mod order_summary;

pub use cart::{Cart, CartLine, CartView};
pub use order_summary::OrderSummary;
