pub mod order;

pub use order::{
    generate_order_number, sale_number_for, LineSource, NewOrder, Order, OrderLine, OrderType,
};
