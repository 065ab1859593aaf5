use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, TodoStore};
use crate::model::{self, NewTodo, ObjectId, Todo, TodoPatch};

/// Process-local store. Insertion order is the order of the backing `Vec`.
#[derive(Clone, Debug, Default)]
pub struct MemoryTodoStore {
    todos: Arc<RwLock<Vec<Todo>>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn insert(&self, fields: NewTodo) -> Result<Todo, StoreError> {
        let todo = fields.validate()?.into_todo(ObjectId::generate(), model::now());
        self.todos.write().await.push(todo.clone());
        Ok(todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.todos.read().await.clone())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Todo, StoreError> {
        let todos = self.todos.read().await;
        todos
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_by_id(&self, id: ObjectId, patch: TodoPatch) -> Result<Todo, StoreError> {
        let changes = patch.validate()?;
        let mut todos = self.todos.write().await;
        let todo = todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound)?;

        let mut merged = todo.clone();
        changes.apply(&mut merged);
        merged.check()?;
        merged.updated_at = model::next_update_stamp(todo.updated_at);
        *todo = merged.clone();
        Ok(merged)
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<(), StoreError> {
        let mut todos = self.todos.write().await;
        let index = todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or(StoreError::NotFound)?;
        todos.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TITLE_TOO_LONG;

    #[tokio::test]
    async fn insert_assigns_id_and_equal_timestamps() {
        let store = MemoryTodoStore::new();
        let todo = store
            .insert(NewTodo::titled("Test Todo").with_description("This is a test todo"))
            .await
            .unwrap();
        assert_eq!(todo.title, "Test Todo");
        assert_eq!(todo.description, "This is a test todo");
        assert!(!todo.completed);
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[tokio::test]
    async fn insert_rejects_long_title_and_persists_nothing() {
        let store = MemoryTodoStore::new();
        let err = store.insert(NewTodo::titled("a".repeat(101))).await.unwrap_err();
        match err {
            StoreError::Validation(errors) => {
                assert_eq!(errors.message("title"), Some(TITLE_TOO_LONG));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_all_keeps_insertion_order() {
        let store = MemoryTodoStore::new();
        for title in ["first", "second", "third"] {
            store.insert(NewTodo::titled(title)).await.unwrap();
        }
        let titles: Vec<_> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn update_merges_and_bumps_updated_at() {
        let store = MemoryTodoStore::new();
        let created = store
            .insert(NewTodo::titled("Original title").with_description("Original description"))
            .await
            .unwrap();

        let updated = store
            .update_by_id(created.id, TodoPatch::default().with_completed(true))
            .await
            .unwrap();
        assert_eq!(updated.title, "Original title");
        assert_eq!(updated.description, "Original description");
        assert!(updated.completed);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(store.find_by_id(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn invalid_update_leaves_record_untouched() {
        let store = MemoryTodoStore::new();
        let created = store.insert(NewTodo::titled("keep")).await.unwrap();
        let err = store
            .update_by_id(created.id, TodoPatch::default().with_title(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.find_by_id(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = MemoryTodoStore::new();
        let id = ObjectId::generate();
        assert!(matches!(store.find_by_id(id).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.update_by_id(id, TodoPatch::default()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.delete_by_id(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() {
        let store = MemoryTodoStore::new();
        let created = store.insert(NewTodo::titled("once")).await.unwrap();
        store.delete_by_id(created.id).await.unwrap();
        assert!(matches!(
            store.delete_by_id(created.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_inserts_are_all_kept() {
        let store = MemoryTodoStore::new();
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(NewTodo::titled(format!("todo {i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.find_all().await.unwrap().len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_to_one_todo_are_both_kept() {
        let store = MemoryTodoStore::new();
        let created = store.insert(NewTodo::titled("before")).await.unwrap();

        let retitle = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(created.id, TodoPatch::default().with_title("after"))
                    .await
            })
        };
        let complete = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(created.id, TodoPatch::default().with_completed(true))
                    .await
            })
        };
        let first = retitle.await.unwrap().unwrap();
        let second = complete.await.unwrap().unwrap();
        assert_ne!(first.updated_at, second.updated_at);

        let stored = store.find_by_id(created.id).await.unwrap();
        assert_eq!(stored.title, "after");
        assert!(stored.completed);
        assert_eq!(stored.updated_at, first.updated_at.max(second.updated_at));
    }
}
