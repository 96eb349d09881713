/// Commerce entities module
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod customer;
pub mod customer_account;
pub mod product;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use customer_account::{Entity as CustomerAccount, Model as CustomerAccountModel};
pub use product::{Entity as Product, Model as ProductModel};
