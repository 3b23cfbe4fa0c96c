//! Wishlist operations

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use super::Clock;
use crate::domain::aggregates::{ToggleOutcome, WishlistItem, WishlistStatus};
use crate::repositories::{ProductRepository, WishlistRepository};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct WishlistService {
    wishlist: Arc<dyn WishlistRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl WishlistService {
    pub fn new(wishlist: Arc<dyn WishlistRepository>, products: Arc<dyn ProductRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { wishlist, products, clock }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WishlistItem>> {
        let rows = self.wishlist.list(user_id).await?;
        Ok(rows.into_iter().map(|(entry, product)| WishlistItem::new(entry, product)).collect())
    }

    /// Removes the product if it is already wished for, adds it otherwise.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user_id: Uuid, product_id: Uuid) -> Result<ToggleOutcome> {
        if self.wishlist.remove(user_id, product_id).await? {
            return Ok(ToggleOutcome::Removed);
        }
        match self.products.find(product_id).await? {
            Some(p) if p.is_available() => {}
            Some(_) => return Err(EcommerceError::InvalidState("product is not available".into())),
            None => return Err(EcommerceError::NotFound("product not found".into())),
        }
        self.wishlist.add(user_id, product_id, self.clock.now()).await?;
        Ok(ToggleOutcome::Added)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<()> {
        if self.wishlist.remove(user_id, product_id).await? {
            Ok(())
        } else {
            Err(EcommerceError::NotFound("product not in wishlist".into()))
        }
    }

    pub async fn status(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistStatus> {
        Ok(self.wishlist.find(user_id, product_id).await?.into())
    }
}
