use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{dto::auth::LoginResponse, models::User};

use super::cart::Cart;

pub const CART_KEY: &str = "cart_items_v1";
pub const SESSION_KEY: &str = "user_info";
pub const LAST_ORDER_KEY: &str = "last_order_id";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value persistence for client state.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl ClientStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Signed-in shopper as remembered by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl From<LoginResponse> for Session {
    fn from(login: LoginResponse) -> Self {
        Self {
            token: login.token,
            user: login.user,
        }
    }
}

/// Client-side checkout state with an explicit load/persist boundary.
/// Nothing touches storage between [`CheckoutContext::load`] and
/// [`CheckoutContext::persist`].
pub struct CheckoutContext<S> {
    storage: S,
    pub cart: Cart,
    pub session: Option<Session>,
    pub last_order_id: Option<Uuid>,
}

impl<S: ClientStorage> CheckoutContext<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cart: Cart::new(),
            session: None,
            last_order_id: None,
        }
    }

    /// Unreadable or corrupt entries load as their empty value.
    pub async fn load(storage: S) -> Self {
        let cart = read_entry::<Cart, _>(&storage, CART_KEY).await.unwrap_or_default();
        let session = read_entry::<Session, _>(&storage, SESSION_KEY).await;
        let last_order_id = read_entry::<Uuid, _>(&storage, LAST_ORDER_KEY).await;
        Self {
            storage,
            cart,
            session,
            last_order_id,
        }
    }

    pub async fn persist(&self) -> Result<(), StorageError> {
        self.storage
            .set(CART_KEY, &serde_json::to_string(&self.cart)?)
            .await?;

        match &self.session {
            Some(session) => {
                self.storage
                    .set(SESSION_KEY, &serde_json::to_string(session)?)
                    .await?
            }
            None => self.storage.remove(SESSION_KEY).await?,
        }

        match self.last_order_id {
            Some(id) => {
                self.storage
                    .set(LAST_ORDER_KEY, &serde_json::to_string(&id)?)
                    .await?
            }
            None => self.storage.remove(LAST_ORDER_KEY).await?,
        }
        Ok(())
    }

    pub fn sign_in(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn sign_out(&mut self) {
        self.session = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }
}

async fn read_entry<T: DeserializeOwned, S: ClientStorage>(storage: &S, key: &str) -> Option<T> {
    let raw = match storage.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "client storage read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding corrupt client storage entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::checkout::cart::CartItem;

    #[tokio::test]
    async fn corrupt_cart_loads_empty() {
        let storage = MemoryStorage::new();
        storage.set(CART_KEY, "{not json").await.unwrap();
        storage.set(LAST_ORDER_KEY, "\"also-not-a-uuid\"").await.unwrap();

        let ctx = CheckoutContext::load(storage).await;
        assert!(ctx.cart.is_empty());
        assert!(ctx.last_order_id.is_none());
    }

    #[tokio::test]
    async fn file_storage_round_trips_context() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CheckoutContext::new(FileStorage::new(dir.path()));
        ctx.cart
            .add(CartItem::new("p-1", "Notebook", dec!(120), "/img/nb.png"));
        ctx.last_order_id = Some(Uuid::new_v4());
        ctx.persist().await.unwrap();

        let reloaded = CheckoutContext::load(FileStorage::new(dir.path())).await;
        assert_eq!(reloaded.cart, ctx.cart);
        assert_eq!(reloaded.last_order_id, ctx.last_order_id);
        assert!(reloaded.session.is_none());
    }

    #[tokio::test]
    async fn signing_out_forgets_the_stored_session() {
        let storage = MemoryStorage::new();
        let mut ctx = CheckoutContext::new(storage);
        let session = Session {
            token: "jwt".into(),
            user: User {
                id: Uuid::new_v4(),
                name: "Asha Rao".into(),
                email: "asha@example.in".into(),
                role: "user".into(),
                created_at: chrono::Utc::now(),
            },
        };
        ctx.sign_in(session.clone());
        ctx.persist().await.unwrap();

        let restored = CheckoutContext::load(ctx.storage).await;
        assert_eq!(restored.session.as_ref(), Some(&session));
        assert_eq!(restored.token(), Some("jwt"));

        let mut ctx = restored;
        ctx.sign_out();
        ctx.persist().await.unwrap();
        assert!(ctx.storage.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));
        assert!(storage.get(CART_KEY).await.unwrap().is_none());
        storage.remove(CART_KEY).await.unwrap();
    }
}
