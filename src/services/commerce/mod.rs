/// Commerce services module - carts, checkout, catalog and customers
pub mod cart_service;
pub mod checkout_service;
pub mod customer_service;
pub mod product_catalog_service;

// Re-export services for convenience
pub use cart_service::{CartContents, CartLine, CartService, CartSort};
pub use checkout_service::CheckoutService;
pub use customer_service::CustomerService;
pub use product_catalog_service::ProductCatalogService;
