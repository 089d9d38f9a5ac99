pub mod carts;
pub mod orders;
pub mod pay_orders;
