use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{GatewayResult, PersistenceGateway, apply_many};
use crate::core::{GatewayError, Manuscript, ManuscriptPatch, UserSettings};

/// Gateway that keeps everything in process memory. Used for ephemeral
/// sessions and as the backing store in tests.
#[derive(Default)]
pub struct InMemoryGateway {
    manuscripts: RwLock<Vec<Manuscript>>,
    settings: RwLock<Option<UserSettings>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated gateway; `manuscripts` are taken in list order.
    pub fn with_manuscripts(manuscripts: impl IntoIterator<Item = Manuscript>) -> Self {
        Self {
            manuscripts: RwLock::new(manuscripts.into_iter().map(|m| m.normalized()).collect()),
            settings: RwLock::new(None),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Manuscript> {
        self.manuscripts
            .read()
            .await
            .iter()
            .find(|manuscript| manuscript.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.manuscripts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.manuscripts.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn list(&self) -> GatewayResult<Vec<Manuscript>> {
        Ok(self.manuscripts.read().await.clone())
    }

    async fn create(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        let mut manuscripts = self.manuscripts.write().await;
        if manuscripts.iter().any(|existing| existing.id == manuscript.id) {
            return Err(GatewayError::AlreadyExists(manuscript.id));
        }

        let stored = manuscript.normalized();
        manuscripts.insert(0, stored.clone());
        Ok(stored)
    }

    async fn update(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        let mut manuscripts = self.manuscripts.write().await;
        let Some(slot) = manuscripts
            .iter_mut()
            .find(|existing| existing.id == manuscript.id)
        else {
            return Err(GatewayError::NotFound(manuscript.id));
        };

        *slot = manuscript.normalized();
        Ok(slot.clone())
    }

    async fn update_many(&self, ids: &[String], changes: &ManuscriptPatch) -> GatewayResult<()> {
        let mut manuscripts = self.manuscripts.write().await;
        apply_many(&mut manuscripts, ids, changes);
        Ok(())
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        let mut manuscripts = self.manuscripts.write().await;
        let before = manuscripts.len();
        manuscripts.retain(|manuscript| manuscript.id != id);
        if manuscripts.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn load_settings(&self) -> GatewayResult<Option<UserSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: UserSettings) -> GatewayResult<UserSettings> {
        *self.settings.write().await = Some(settings.clone());
        Ok(settings)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
