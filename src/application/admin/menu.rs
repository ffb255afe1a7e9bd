use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::slugs::required;
use crate::application::repos::{
    CreateMenuItemParams, MenuRepo, MenuWriteRepo, RepoError, UpdateMenuItemParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::MenuItemRecord;
use crate::domain::error::DomainError;
use crate::domain::menu::MenuDestination;

#[derive(Debug, Error)]
pub enum AdminMenuError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Destination(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct MenuItemCommand {
    pub label: String,
    pub destination: String,
    pub sort_order: i32,
    pub visible: bool,
}

#[derive(Clone)]
pub struct AdminMenuService {
    reader: Arc<dyn MenuRepo>,
    writer: Arc<dyn MenuWriteRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminMenuService {
    pub fn new(
        reader: Arc<dyn MenuRepo>,
        writer: Arc<dyn MenuWriteRepo>,
        audit: AdminAuditService,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            audit,
            trigger,
        }
    }

    /// Every item, hidden ones included.
    pub async fn list(&self) -> Result<Vec<MenuItemRecord>, AdminMenuError> {
        self.reader
            .list_items(false)
            .await
            .map_err(AdminMenuError::from)
    }

    pub async fn create_item(
        &self,
        actor: &str,
        command: MenuItemCommand,
    ) -> Result<MenuItemRecord, AdminMenuError> {
        let (label, destination) = validate(&command)?;

        let item = self
            .writer
            .create_item(CreateMenuItemParams {
                label,
                destination,
                sort_order: command.sort_order,
                visible: command.visible,
            })
            .await?;
        self.trigger.menu_changed().await;
        self.audit
            .record(
                actor,
                "menu.create",
                "menu_item",
                Some(&item.id.to_string()),
                Some(&MenuSnapshot::from(&item)),
            )
            .await?;
        Ok(item)
    }

    pub async fn update_item(
        &self,
        actor: &str,
        id: Uuid,
        command: MenuItemCommand,
    ) -> Result<MenuItemRecord, AdminMenuError> {
        let (label, destination) = validate(&command)?;
        self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;

        let item = self
            .writer
            .update_item(UpdateMenuItemParams {
                id,
                label,
                destination,
                sort_order: command.sort_order,
                visible: command.visible,
            })
            .await?;
        self.trigger.menu_changed().await;
        self.audit
            .record(
                actor,
                "menu.update",
                "menu_item",
                Some(&item.id.to_string()),
                Some(&MenuSnapshot::from(&item)),
            )
            .await?;
        Ok(item)
    }

    pub async fn delete_item(&self, actor: &str, id: Uuid) -> Result<(), AdminMenuError> {
        self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;

        self.writer.delete_item(id).await?;
        self.trigger.menu_changed().await;
        self.audit
            .record(
                actor,
                "menu.delete",
                "menu_item",
                Some(&id.to_string()),
                Option::<&MenuSnapshot>::None,
            )
            .await?;
        Ok(())
    }
}

fn validate(command: &MenuItemCommand) -> Result<(String, String), AdminMenuError> {
    let label = required(&command.label, "label").map_err(AdminMenuError::ConstraintViolation)?;
    let destination = MenuDestination::parse(&command.destination)?;
    Ok((label, destination.as_stored()))
}

#[derive(Debug, Serialize)]
struct MenuSnapshot<'a> {
    label: &'a str,
    destination: &'a str,
    sort_order: i32,
    visible: bool,
}

impl<'a> From<&'a MenuItemRecord> for MenuSnapshot<'a> {
    fn from(item: &'a MenuItemRecord) -> Self {
        Self {
            label: item.label.as_str(),
            destination: item.destination.as_str(),
            sort_order: item.sort_order,
            visible: item.visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use crate::application::admin::test_support::{FakeAuditRepo, memory_trigger};
    use crate::cache::{CacheKey, SetOptions};

    #[derive(Default)]
    struct MemoryMenu {
        items: Mutex<Vec<MenuItemRecord>>,
    }

    #[async_trait]
    impl MenuRepo for MemoryMenu {
        async fn list_items(&self, visible_only: bool) -> Result<Vec<MenuItemRecord>, RepoError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|item| !visible_only || item.visible)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemRecord>, RepoError> {
            let items = self.items.lock().unwrap();
            Ok(items.iter().find(|item| item.id == id).cloned())
        }
    }

    #[async_trait]
    impl MenuWriteRepo for MemoryMenu {
        async fn create_item(
            &self,
            params: CreateMenuItemParams,
        ) -> Result<MenuItemRecord, RepoError> {
            let now = OffsetDateTime::now_utc();
            let item = MenuItemRecord {
                id: Uuid::new_v4(),
                label: params.label,
                destination: params.destination,
                sort_order: params.sort_order,
                visible: params.visible,
                created_at: now,
                updated_at: now,
            };
            self.items.lock().unwrap().push(item.clone());
            Ok(item)
        }

        async fn update_item(
            &self,
            params: UpdateMenuItemParams,
        ) -> Result<MenuItemRecord, RepoError> {
            let mut items = self.items.lock().unwrap();
            let item = items
                .iter_mut()
                .find(|item| item.id == params.id)
                .ok_or(RepoError::NotFound)?;
            item.label = params.label;
            item.destination = params.destination;
            item.sort_order = params.sort_order;
            item.visible = params.visible;
            Ok(item.clone())
        }

        async fn delete_item(&self, id: Uuid) -> Result<(), RepoError> {
            self.items.lock().unwrap().retain(|item| item.id != id);
            Ok(())
        }
    }

    fn service_with(repo: Arc<MemoryMenu>) -> (AdminMenuService, CacheTrigger) {
        let audit = AdminAuditService::new(Arc::new(FakeAuditRepo::default()));
        let trigger = memory_trigger();
        let service = AdminMenuService::new(repo.clone(), repo, audit, trigger.clone());
        (service, trigger)
    }

    fn command(label: &str, destination: &str) -> MenuItemCommand {
        MenuItemCommand {
            label: label.into(),
            destination: destination.into(),
            sort_order: 0,
            visible: true,
        }
    }

    #[tokio::test]
    async fn rejects_unsafe_destination() {
        let (service, _) = service_with(Arc::new(MemoryMenu::default()));
        let result = service
            .create_item("tester", command("Evil", "javascript:alert(1)"))
            .await;
        assert!(matches!(result, Err(AdminMenuError::Destination(_))));
    }

    #[tokio::test]
    async fn create_stores_normalized_destination_and_drops_cached_menu() {
        let repo = Arc::new(MemoryMenu::default());
        let (service, trigger) = service_with(repo.clone());
        let cache = trigger.cache().clone();
        cache
            .set(&CacheKey::Menu, &Vec::<String>::new(), SetOptions::default())
            .await;

        let item = service
            .create_item("tester", command(" Home ", "https://example.com"))
            .await
            .expect("create succeeds");

        assert_eq!(item.label, "Home");
        assert_eq!(item.destination, "https://example.com/");
        assert_eq!(cache.get::<Vec<String>>(&CacheKey::Menu).await, None);
    }

    #[tokio::test]
    async fn update_missing_item_is_not_found() {
        let (service, _) = service_with(Arc::new(MemoryMenu::default()));
        let result = service
            .update_item("tester", Uuid::new_v4(), command("About", "/pages/about"))
            .await;
        assert!(matches!(result, Err(AdminMenuError::Repo(RepoError::NotFound))));
    }
}
