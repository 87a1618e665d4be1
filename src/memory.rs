//! In-process stores backed by `RwLock`ed maps. Used for tests and for
//! running the service without Postgres (`DATABASE_URL=memory`).

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, Profile, User, UserChanges},
    },
    error::{StoreError, StoreResult},
    tasks::{
        repo::TaskStore,
        repo_types::{NewTask, SortField, SortKey, Task, TaskChanges, TaskFilter, TaskStatus},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.users.read().await.get(&id).cloned().map(Profile::from))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            avatar: user.avatar,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate("email"));
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = avatar;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

struct Entry {
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct TaskTable {
    next_seq: u64,
    rows: HashMap<Uuid, Entry>,
}

#[derive(Default)]
pub struct MemoryTaskStore {
    table: RwLock<TaskTable>,
}

fn passes_filter(task: &Task, filter: &TaskFilter) -> bool {
    if filter.status.is_some_and(|s| s != task.status) {
        return false;
    }
    if filter.priority.is_some_and(|p| p != task.priority) {
        return false;
    }
    match &filter.search {
        Some(needle) => {
            let needle = needle.to_lowercase();
            task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle)
        }
        None => true,
    }
}

fn compare(a: &Entry, b: &Entry, key: SortKey) -> Ordering {
    let (x, y) = (&a.task, &b.task);
    let ord = match key.field {
        SortField::CreatedAt => x.created_at.cmp(&y.created_at),
        SortField::UpdatedAt => x.updated_at.cmp(&y.updated_at),
        SortField::Title => x.title.cmp(&y.title),
        SortField::Priority => x.priority.cmp(&y.priority),
        SortField::Status => x.status.cmp(&y.status),
        // missing due dates go last in both directions
        SortField::DueDate => {
            return match (x.due_date, y.due_date) {
                (Some(p), Some(q)) if key.descending => q.cmp(&p),
                (Some(p), Some(q)) => p.cmp(&q),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }
    };
    if key.descending {
        ord.reverse()
    } else {
        ord
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let table = self.table.read().await;
        let mut hits: Vec<&Entry> = table
            .rows
            .values()
            .filter(|e| e.task.owner_id == owner && passes_filter(&e.task, filter))
            .collect();
        hits.sort_by(|a, b| {
            filter
                .sort
                .iter()
                .map(|key| compare(a, b, *key))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| compare(a, b, SortKey::NEWEST_FIRST))
                .then_with(|| b.seq.cmp(&a.seq))
        });
        Ok(hits.into_iter().map(|e| e.task.clone()).collect())
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .get(&id)
            .filter(|e| e.task.owner_id == owner)
            .map(|e| e.task.clone()))
    }

    async fn create(&self, owner: Uuid, task: NewTask) -> StoreResult<Task> {
        let mut table = self.table.write().await;
        let now = OffsetDateTime::now_utc();
        let record = Task {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(
            record.id,
            Entry {
                seq,
                task: record.clone(),
            },
        );
        Ok(record)
    }

    async fn update(&self, owner: Uuid, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let mut table = self.table.write().await;
        let Some(entry) = table.rows.get_mut(&id).filter(|e| e.task.owner_id == owner) else {
            return Ok(None);
        };
        let task = &mut entry.task;
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut table = self.table.write().await;
        let owned = table.rows.get(&id).is_some_and(|e| e.task.owner_id == owner);
        if owned {
            table.rows.remove(&id);
        }
        Ok(owned)
    }

    async fn count_by_status(&self, owner: Uuid) -> StoreResult<Vec<(TaskStatus, i64)>> {
        let table = self.table.read().await;
        let mut counts: HashMap<TaskStatus, i64> = HashMap::new();
        for e in table.rows.values().filter(|e| e.task.owner_id == owner) {
            *counts.entry(e.task.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::repo_types::TaskPriority;

    fn new_task(title: &str, status: TaskStatus, priority: TaskPriority) -> NewTask {
        NewTask {
            title: title.into(),
            description: String::new(),
            status,
            priority,
            due_date: None,
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Someone".into(),
            email: email.into(),
            password_hash: "hash".into(),
            avatar: String::new(),
        }
    }

    #[tokio::test]
    async fn user_emails_stay_unique() {
        let store = MemoryUserStore::default();
        let a = store.create(new_user("a@example.com")).await.unwrap();
        let b = store.create(new_user("b@example.com")).await.unwrap();
        assert!(matches!(
            store.create(new_user("a@example.com")).await,
            Err(StoreError::Duplicate("email"))
        ));
        let changes = UserChanges {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(b.id, changes).await,
            Err(StoreError::Duplicate("email"))
        ));
        let own = UserChanges {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(store.update(a.id, own).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tasks_are_invisible_to_other_owners() {
        let store = MemoryTaskStore::default();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let task = store
            .create(alice, new_task("secret", TaskStatus::Pending, TaskPriority::Low))
            .await
            .unwrap();

        assert!(store.find(bob, task.id).await.unwrap().is_none());
        assert!(store
            .update(bob, task.id, TaskChanges::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(bob, task.id).await.unwrap());
        assert!(store.list(bob, &TaskFilter::default()).await.unwrap().is_empty());
        assert!(store.count_by_status(bob).await.unwrap().is_empty());

        assert!(store.find(alice, task.id).await.unwrap().is_some());
        assert!(store.delete(alice, task.id).await.unwrap());
        assert!(store.find(alice, task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_listing_is_newest_first() {
        let store = MemoryTaskStore::default();
        let owner = Uuid::new_v4();
        for title in ["first", "second", "third"] {
            store
                .create(owner, new_task(title, TaskStatus::Pending, TaskPriority::Medium))
                .await
                .unwrap();
        }
        let titles: Vec<String> = store
            .list(owner, &TaskFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn priority_sort_uses_rank() {
        let store = MemoryTaskStore::default();
        let owner = Uuid::new_v4();
        for (title, priority) in [
            ("m", TaskPriority::Medium),
            ("h", TaskPriority::High),
            ("l", TaskPriority::Low),
        ] {
            store
                .create(owner, new_task(title, TaskStatus::Pending, priority))
                .await
                .unwrap();
        }
        let filter = TaskFilter {
            sort: vec![SortKey {
                field: SortField::Priority,
                descending: true,
            }],
            ..Default::default()
        };
        let titles: Vec<String> = store
            .list(owner, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["h", "m", "l"]);
    }

    #[tokio::test]
    async fn update_can_clear_due_date() {
        let store = MemoryTaskStore::default();
        let owner = Uuid::new_v4();
        let mut task = new_task("dated", TaskStatus::Pending, TaskPriority::Low);
        task.due_date = Some(OffsetDateTime::now_utc());
        let task = store.create(owner, task).await.unwrap();

        let untouched = store
            .update(owner, task.id, TaskChanges::default())
            .await
            .unwrap()
            .unwrap();
        assert!(untouched.due_date.is_some());

        let cleared = store
            .update(
                owner,
                task.id,
                TaskChanges {
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.due_date.is_none());
    }
}
