//! Cart operations. The cart never reserves stock; it only checks it.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use super::Clock;
use crate::domain::aggregates::{ensure_addable, CartError, CartItem, CartOperation, CartView};
use crate::repositories::{CartRepository, ProductRepository};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { carts, products, clock }
    }

    pub async fn view(&self, user_id: Uuid) -> Result<CartView> {
        Ok(match self.carts.find_cart(user_id).await? {
            Some((cart, rows)) => CartView::build(cart.id, rows),
            None => CartView::empty(),
        })
    }

    #[instrument(skip(self))]
    pub async fn add_product(&self, user_id: Uuid, product_id: Uuid) -> Result<CartItem> {
        let product = self.products.find(product_id).await?.ok_or_else(|| EcommerceError::NotFound("product not found".into()))?;
        ensure_addable(&product)?;
        self.carts.add_item(user_id, product_id, self.clock.now()).await
    }

    #[instrument(skip(self))]
    pub async fn change_quantity(&self, user_id: Uuid, item_id: Uuid, op: CartOperation) -> Result<CartView> {
        let (item, product) = self.carts.find_item(user_id, item_id).await?.ok_or(CartError::ItemNotFound)?;
        let quantity = op.apply(item.quantity, &product)?;
        if quantity != item.quantity {
            self.carts.set_quantity(item.id, quantity, self.clock.now()).await?;
        }
        self.view(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView> {
        if !self.carts.remove_item(user_id, item_id).await? {
            return Err(CartError::ItemNotFound.into());
        }
        self.view(user_id).await
    }
}
