//! Shared fixtures: an in-memory store behind the repository traits, a
//! settable clock, and recording event/mail sinks.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::domain::aggregates::{
    merge_restorations, Cart, CartError, CartItem, Category, ItemCancellation, Order, OrderError, OrderLine,
    OrderStatus, Otp, Product, ProductImage, RefreshToken, User, WishlistEntry,
};
use storefront::domain::events::OrderEvent;
use storefront::domain::value_objects::{Pagination, Role};
use storefront::repositories::{
    CartRepository, NewProduct, NewUser, OrderRepository, OrderSource, OtpRepository, PlaceOrder, ProductChanges,
    ProductFilter, ProductRepository, Repositories, TokenRepository, UserChanges, UserRepository, WishlistRepository,
};
use storefront::services::{tokens, Clock, Email, EventPublisher, Mailer};
use storefront::state::AppState;
use storefront::{EcommerceError, Result};

// ---------------------------------------------------------------------------
// Clock and sinks
// ---------------------------------------------------------------------------

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self { Self(Mutex::new(now)) }
    pub fn set(&self, now: DateTime<Utc>) { *self.0.lock().unwrap() = now; }
    pub fn advance(&self, by: Duration) { *self.0.lock().unwrap() += by; }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}

#[derive(Default)]
pub struct RecordingPublisher(pub Mutex<Vec<OrderEvent>>);

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

impl RecordingPublisher {
    /// Events are published from detached tasks; wait until `n` have arrived.
    pub async fn wait_for(&self, n: usize) -> Vec<OrderEvent> {
        for _ in 0..200 {
            if self.0.lock().unwrap().len() >= n { break; }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingMailer(pub Mutex<Vec<Email>>);

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<()> {
        self.0.lock().unwrap().push(email);
        Ok(())
    }
}

impl RecordingMailer {
    pub async fn wait_for_code(&self) -> String {
        for _ in 0..200 {
            if let Some(mail) = self.0.lock().unwrap().last() {
                return mail.body.chars().filter(char::is_ascii_digit).take(6).collect();
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        panic!("no email was sent");
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Inner {
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    otps: Vec<Otp>,
    categories: Vec<Category>,
    products: BTreeMap<Uuid, Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    wishlist: Vec<WishlistEntry>,
}

/// Every mutation runs against a copy that only replaces the live state on
/// success, so a failed operation leaves nothing behind.
#[derive(Default)]
pub struct MemoryStore { inner: Mutex<Inner> }

impl MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T { f(&self.inner.lock().unwrap()) }

    fn transact<T>(&self, f: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut live = self.inner.lock().unwrap();
        let mut draft = live.clone();
        let out = f(&mut draft)?;
        *live = draft;
        Ok(out)
    }

    pub fn seed_user(&self, email: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(), username: email.split('@').next().unwrap_or("user").to_string(), email: email.to_string(),
            password_hash: String::new(), image: None, phone: None, address: None, role, is_blocked: false,
            created_at: now, updated_at: now,
        };
        self.inner.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn seed_product(&self, name: &str, price: i64, stock: i32) -> Product {
        let now = Utc::now();
        let id = Uuid::now_v7();
        let product = Product {
            id, category_id: None, name: name.to_string(), description: String::new(), price, stock_count: stock,
            is_active: true, created_at: now, updated_at: now, deleted_at: None,
            images: vec![ProductImage { id: Uuid::now_v7(), product_id: id, url: format!("https://cdn.example.com/{name}.png"), alt_text: name.into(), position: 0 }],
        };
        self.inner.lock().unwrap().products.insert(id, product.clone());
        product
    }

    pub fn seed_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> CartItem {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let cart_id = match inner.carts.iter().find(|c| c.user_id == user_id).map(|c| c.id) {
            Some(id) => id,
            None => {
                let cart = Cart { id: Uuid::now_v7(), user_id, created_at: now, updated_at: now };
                inner.carts.push(cart.clone());
                cart.id
            }
        };
        let item = CartItem { id: Uuid::now_v7(), cart_id, product_id, quantity, created_at: now };
        inner.cart_items.push(item.clone());
        item
    }

    pub fn stock(&self, product_id: Uuid) -> i32 { self.read(|i| i.products[&product_id].stock_count) }

    pub fn set_stock(&self, product_id: Uuid, stock: i32) {
        if let Some(p) = self.inner.lock().unwrap().products.get_mut(&product_id) { p.stock_count = stock; }
    }

    pub fn hard_delete_product(&self, product_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        inner.products.remove(&product_id);
        for order in inner.orders.iter_mut() {
            for item in order.items.iter_mut().filter(|i| i.product_id == Some(product_id)) {
                item.product_id = None;
            }
        }
    }

    pub fn cart_len(&self, user_id: Uuid) -> usize {
        self.read(|i| {
            let carts: Vec<Uuid> = i.carts.iter().filter(|c| c.user_id == user_id).map(|c| c.id).collect();
            i.cart_items.iter().filter(|ci| carts.contains(&ci.cart_id)).count()
        })
    }

    pub fn order_count(&self) -> usize { self.read(|i| i.orders.len()) }

    pub fn set_password(&self, user_id: Uuid, hash: String) {
        if let Some(u) = self.inner.lock().unwrap().users.iter_mut().find(|u| u.id == user_id) { u.password_hash = hash; }
    }
}

fn order_not_found() -> EcommerceError { EcommerceError::NotFound("order not found".into()) }

fn page_of<T: Clone>(rows: &[T], page: Pagination) -> Vec<T> {
    rows.iter().skip(page.offset() as usize).take(page.limit() as usize).cloned().collect()
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.read(|i| i.orders.iter().filter(|o| o.user_id == user_id).cloned().collect());
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn list_all(&self, status: Option<OrderStatus>, page: Pagination) -> Result<(Vec<Order>, i64)> {
        let mut orders: Vec<Order> = self.read(|i| i.orders.iter().filter(|o| status.map_or(true, |s| o.status == s)).cloned().collect());
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((page_of(&orders, page), orders.len() as i64))
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>> {
        Ok(self.read(|i| i.orders.iter().find(|o| o.id == order_id).cloned()))
    }

    async fn place(&self, request: PlaceOrder, now: DateTime<Utc>) -> Result<Order> {
        self.transact(|inner| {
            let (lines, consumed): (Vec<OrderLine>, Vec<Uuid>) = match request.source {
                OrderSource::Cart => {
                    let cart_ids: Vec<Uuid> = inner.carts.iter().filter(|c| c.user_id == request.user_id).map(|c| c.id).collect();
                    let mut items: Vec<&CartItem> = inner.cart_items.iter().filter(|ci| cart_ids.contains(&ci.cart_id)).collect();
                    items.sort_by_key(|ci| (ci.created_at, ci.id));
                    (
                        items.iter().map(|ci| OrderLine { product_id: ci.product_id, quantity: ci.quantity }).collect(),
                        items.iter().map(|ci| ci.id).collect(),
                    )
                }
                OrderSource::Single(line) => (vec![line], Vec::new()),
            };

            let mut locked: HashMap<Uuid, Product> = lines
                .iter()
                .filter_map(|l| inner.products.get(&l.product_id).map(|p| (p.id, p.clone())))
                .collect();
            let order = Order::place(request.user_id, &request.checkout, &lines, &mut locked, now)?;

            for (id, product) in locked {
                inner.products.insert(id, product);
            }
            inner.cart_items.retain(|ci| !consumed.contains(&ci.id));
            inner.orders.push(order.clone());
            Ok(order)
        })
    }

    async fn cancel_item(&self, item_id: Uuid, now: DateTime<Utc>) -> Result<(Order, ItemCancellation)> {
        self.transact(|inner| {
            let order = inner
                .orders
                .iter_mut()
                .find(|o| o.items.iter().any(|i| i.id == item_id))
                .ok_or(OrderError::ItemNotFound(item_id))?;
            let outcome = order.cancel_item(item_id, now)?;
            let order = order.clone();
            if let Some(r) = outcome.restoration {
                if let Some(p) = inner.products.get_mut(&r.product_id) { p.stock_count += r.quantity; }
            }
            Ok((order, outcome))
        })
    }

    async fn cancel(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order> {
        self.transact(|inner| {
            let order = inner.orders.iter_mut().find(|o| o.id == order_id).ok_or_else(order_not_found)?;
            let restorations = order.cancel(now)?;
            let order = order.clone();
            for r in merge_restorations(&restorations) {
                if let Some(p) = inner.products.get_mut(&r.product_id) { p.stock_count += r.quantity; }
            }
            Ok(order)
        })
    }

    async fn advance(&self, order_id: Uuid, target: OrderStatus, now: DateTime<Utc>) -> Result<(Order, OrderStatus)> {
        self.transact(|inner| {
            let order = inner.orders.iter_mut().find(|o| o.id == order_id).ok_or_else(order_not_found)?;
            let from = order.status;
            order.advance_to(target, now)?;
            Ok((order.clone(), from))
        })
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, filter: &ProductFilter, page: Pagination) -> Result<(Vec<Product>, i64)> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut rows: Vec<Product> = self.read(|i| {
            i.products
                .values()
                .filter(|p| filter.include_hidden || p.is_available())
                .filter(|p| filter.category_id.map_or(true, |c| p.category_id == Some(c)))
                .filter(|p| search.as_deref().map_or(true, |s| p.name.to_lowercase().contains(s)))
                .filter(|p| filter.min_price.map_or(true, |m| p.price >= m))
                .filter(|p| filter.max_price.map_or(true, |m| p.price <= m))
                .cloned()
                .collect()
        });
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((page_of(&rows, page), rows.len() as i64))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> { Ok(self.read(|i| i.products.get(&id).cloned())) }

    async fn create(&self, product: NewProduct, now: DateTime<Utc>) -> Result<Product> {
        self.transact(|inner| {
            let id = Uuid::now_v7();
            let images = product.image_urls.iter().enumerate().map(|(pos, url)| ProductImage {
                id: Uuid::now_v7(), product_id: id, url: url.clone(), alt_text: product.name.clone(), position: pos as i32,
            }).collect();
            let created = Product {
                id, category_id: product.category_id, name: product.name, description: product.description, price: product.price,
                stock_count: product.stock_count, is_active: true, created_at: now, updated_at: now, deleted_at: None, images,
            };
            inner.products.insert(id, created.clone());
            Ok(created)
        })
    }

    async fn update(&self, id: Uuid, changes: ProductChanges, now: DateTime<Utc>) -> Result<Option<Product>> {
        self.transact(|inner| {
            let Some(p) = inner.products.get_mut(&id).filter(|p| p.deleted_at.is_none()) else { return Ok(None) };
            if let Some(v) = changes.name { p.name = v; }
            if let Some(v) = changes.description { p.description = v; }
            if let Some(v) = changes.price { p.price = v; }
            if let Some(v) = changes.stock_count { p.stock_count = v; }
            if let Some(v) = changes.category_id { p.category_id = v; }
            p.updated_at = now;
            Ok(Some(p.clone()))
        })
    }

    async fn toggle_active(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Product>> {
        self.transact(|inner| {
            let Some(p) = inner.products.get_mut(&id).filter(|p| p.deleted_at.is_none()) else { return Ok(None) };
            p.is_active = !p.is_active;
            p.updated_at = now;
            Ok(Some(p.clone()))
        })
    }

    async fn soft_delete(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.transact(|inner| {
            let Some(p) = inner.products.get_mut(&id).filter(|p| p.deleted_at.is_none()) else { return Ok(false) };
            p.deleted_at = Some(now);
            p.is_active = false;
            Ok(true)
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.read(|i| i.categories.clone());
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: &str, now: DateTime<Utc>) -> Result<Category> {
        self.transact(|inner| {
            if inner.categories.iter().any(|c| c.name == name) {
                return Err(EcommerceError::Conflict("category already exists".into()));
            }
            let category = Category { id: Uuid::now_v7(), name: name.to_string(), created_at: now };
            inner.categories.push(category.clone());
            Ok(category)
        })
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<(Cart, Vec<(CartItem, Product)>)>> {
        Ok(self.read(|i| {
            let cart = i.carts.iter().find(|c| c.user_id == user_id)?.clone();
            let mut items: Vec<&CartItem> = i.cart_items.iter().filter(|ci| ci.cart_id == cart.id).collect();
            items.sort_by_key(|ci| (ci.created_at, ci.id));
            let rows = items.into_iter().filter_map(|ci| i.products.get(&ci.product_id).map(|p| (ci.clone(), p.clone()))).collect();
            Some((cart, rows))
        }))
    }

    async fn add_item(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<CartItem> {
        self.transact(|inner| {
            let cart_id = match inner.carts.iter().find(|c| c.user_id == user_id).map(|c| c.id) {
                Some(id) => id,
                None => {
                    let cart = Cart { id: Uuid::now_v7(), user_id, created_at: now, updated_at: now };
                    inner.carts.push(cart.clone());
                    cart.id
                }
            };
            if inner.cart_items.iter().any(|ci| ci.cart_id == cart_id && ci.product_id == product_id) {
                return Err(CartError::AlreadyInCart.into());
            }
            let item = CartItem { id: Uuid::now_v7(), cart_id, product_id, quantity: 1, created_at: now };
            inner.cart_items.push(item.clone());
            Ok(item)
        })
    }

    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<(CartItem, Product)>> {
        Ok(self.read(|i| {
            let item = i.cart_items.iter().find(|ci| ci.id == item_id)?;
            i.carts.iter().find(|c| c.id == item.cart_id && c.user_id == user_id)?;
            i.products.get(&item.product_id).map(|p| (item.clone(), p.clone()))
        }))
    }

    async fn set_quantity(&self, item_id: Uuid, quantity: i32, _now: DateTime<Utc>) -> Result<()> {
        self.transact(|inner| {
            let item = inner.cart_items.iter_mut().find(|ci| ci.id == item_id).ok_or(CartError::ItemNotFound)?;
            item.quantity = quantity;
            Ok(())
        })
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        self.transact(|inner| {
            let owned: Vec<Uuid> = inner.carts.iter().filter(|c| c.user_id == user_id).map(|c| c.id).collect();
            let before = inner.cart_items.len();
            inner.cart_items.retain(|ci| !(ci.id == item_id && owned.contains(&ci.cart_id)));
            Ok(inner.cart_items.len() < before)
        })
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<(WishlistEntry, Product)>> {
        let mut rows: Vec<(WishlistEntry, Product)> = self.read(|i| {
            i.wishlist
                .iter()
                .filter(|e| e.user_id == user_id)
                .filter_map(|e| i.products.get(&e.product_id).map(|p| (e.clone(), p.clone())))
                .collect()
        });
        rows.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at).then(b.0.id.cmp(&a.0.id)));
        Ok(rows)
    }

    async fn find(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<WishlistEntry>> {
        Ok(self.read(|i| i.wishlist.iter().find(|e| e.user_id == user_id && e.product_id == product_id).cloned()))
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> Result<WishlistEntry> {
        self.transact(|inner| {
            if inner.wishlist.iter().any(|e| e.user_id == user_id && e.product_id == product_id) {
                return Err(EcommerceError::Conflict("product already in wishlist".into()));
            }
            let entry = WishlistEntry { id: Uuid::now_v7(), user_id, product_id, created_at: now };
            inner.wishlist.push(entry.clone());
            Ok(entry)
        })
    }

    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        self.transact(|inner| {
            let before = inner.wishlist.len();
            inner.wishlist.retain(|e| !(e.user_id == user_id && e.product_id == product_id));
            Ok(inner.wishlist.len() < before)
        })
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.read(|i| i.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.read(|i| i.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
        self.transact(|inner| {
            if inner.users.iter().any(|u| u.email == user.email) {
                return Err(EcommerceError::Conflict("email already registered".into()));
            }
            let created = User {
                id: Uuid::now_v7(), username: user.username, email: user.email, password_hash: user.password_hash, image: None,
                phone: user.phone, address: user.address, role: user.role, is_blocked: false, created_at: now, updated_at: now,
            };
            inner.users.push(created.clone());
            Ok(created)
        })
    }

    async fn update(&self, id: Uuid, changes: UserChanges, now: DateTime<Utc>) -> Result<Option<User>> {
        self.transact(|inner| {
            if let Some(email) = &changes.email {
                if inner.users.iter().any(|u| u.id != id && &u.email == email) {
                    return Err(EcommerceError::Conflict("email already registered".into()));
                }
            }
            let Some(u) = inner.users.iter_mut().find(|u| u.id == id) else { return Ok(None) };
            if let Some(v) = changes.username { u.username = v; }
            if let Some(v) = changes.email { u.email = v; }
            if let Some(v) = changes.image { u.image = v; }
            if let Some(v) = changes.phone { u.phone = v; }
            if let Some(v) = changes.address { u.address = v; }
            if let Some(v) = changes.role { u.role = v; }
            if let Some(v) = changes.is_blocked { u.is_blocked = v; }
            u.updated_at = now;
            Ok(Some(u.clone()))
        })
    }

    async fn set_password(&self, id: Uuid, password_hash: &str, now: DateTime<Utc>) -> Result<()> {
        self.transact(|inner| {
            if let Some(u) = inner.users.iter_mut().find(|u| u.id == id) {
                u.password_hash = password_hash.to_string();
                u.updated_at = now;
            }
            Ok(())
        })
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<User>, i64)> {
        let mut users = self.read(|i| i.users.clone());
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok((page_of(&users, page), users.len() as i64))
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn save(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        self.transact(|inner| {
            inner.refresh_tokens.push(RefreshToken {
                id: Uuid::now_v7(), user_id, token_hash: token_hash.to_string(), expires_at, created_at: now, revoked_at: None,
            });
            Ok(())
        })
    }

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        Ok(self.read(|i| i.refresh_tokens.iter().find(|t| t.token_hash == token_hash).cloned()))
    }

    async fn revoke(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        self.transact(|inner| {
            match inner.refresh_tokens.iter_mut().find(|t| t.token_hash == token_hash && t.revoked_at.is_none()) {
                Some(t) => {
                    t.revoked_at = Some(now);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}

#[async_trait]
impl OtpRepository for MemoryStore {
    async fn upsert(&self, otp: &Otp) -> Result<()> {
        self.transact(|inner| {
            inner.otps.retain(|o| !(o.email == otp.email && o.purpose == otp.purpose));
            inner.otps.push(otp.clone());
            Ok(())
        })
    }

    async fn find(&self, email: &str, purpose: &str) -> Result<Option<Otp>> {
        Ok(self.read(|i| i.otps.iter().find(|o| o.email == email && o.purpose == purpose).cloned()))
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool> {
        self.transact(|inner| match inner.otps.iter_mut().find(|o| o.id == id && !o.is_used) {
            Some(o) => {
                o.is_used = true;
                Ok(true)
            }
            None => Ok(false),
        })
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self { Self::with_env(&[]) }

    /// `overrides` take precedence over the test defaults. The default burst is
    /// large so scenarios are not throttled.
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let config = AppConfig::from_lookup(|key| {
            if let Some((_, v)) = overrides.iter().find(|(k, _)| *k == key) {
                return Some(v.to_string());
            }
            match key {
                "DATABASE_URL" => Some("postgres://unused".to_string()),
                "JWT_SECRET" => Some(JWT_SECRET.to_string()),
                "RATE_LIMIT_BURST" => Some("10000".to_string()),
                _ => None,
            }
        })
        .expect("test config");

        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let events = Arc::new(RecordingPublisher::default());
        let mailer = Arc::new(RecordingMailer::default());
        let repos = Repositories {
            orders: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            wishlist: store.clone(),
            users: store.clone(),
            tokens: store.clone(),
            otps: store.clone(),
        };
        let state = AppState::new(Arc::new(config), repos, mailer.clone(), events.clone(), clock.clone());
        Self { state, store, clock, events, mailer }
    }

    pub fn router(&self) -> axum::Router { storefront::http::router(self.state.clone()) }

    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", self.state.tokens.issue_access(user, Utc::now()).expect("token"))
    }

    /// A user that can log in with `password`.
    pub async fn seed_login(&self, email: &str, password: &str) -> User {
        let user = self.store.seed_user(email, Role::Customer);
        self.store.set_password(user.id, tokens::hash_secret(password).await.expect("hash"));
        user
    }
}
