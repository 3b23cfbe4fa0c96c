//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;
pub mod wishlist;

pub use product::{Category, Product, ProductError, ProductImage};
pub use order::{Checkout, ItemCancellation, Order, OrderError, OrderItem, OrderLine, OrderStatus, StockRestoration, CANCELLATION_WINDOW_HOURS, merge_restorations};
pub use cart::{ensure_addable, Cart, CartError, CartItem, CartLine, CartOperation, CartView};
pub use user::{Otp, OtpError, RefreshToken, User, PASSWORD_RESET_PURPOSE};
pub use wishlist::{ToggleOutcome, WishlistEntry, WishlistItem, WishlistStatus};
