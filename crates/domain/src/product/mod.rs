//! Product catalog.

mod commands;
mod service;

pub use commands::{
    AdjustStock, CreateProduct, ListProducts, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, NewProduct,
    UpdateProduct, validate_stock,
};
pub use service::ProductService;
