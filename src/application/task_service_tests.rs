#[cfg(test)]
mod tests {
    use super::super::task_service::{TaskService, TaskServiceError};
    use super::super::testing::InMemoryTasks;
    use crate::domain::{
        error::StoreError,
        task::{Category, NewTask, TaskError, TaskId, TaskPatch, TaskStatus},
    };
    use crate::infrastructure::unconfigured::UnconfiguredStore;

    #[tokio::test]
    async fn unit_create_prepends_to_cache() {
        let service = TaskService::new(InMemoryTasks::default());
        let first = service.create(NewTask::titled("First")).await.unwrap();
        let second = service.create(NewTask::titled("Second")).await.unwrap();
        let cached = service.cached().await;
        assert_eq!(cached.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert_eq!(first.category, Category::Goal);
        assert_eq!(first.status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn unit_set_status_manages_completed_at() {
        let service = TaskService::new(InMemoryTasks::default());
        let task = service.create(NewTask::titled("Essay")).await.unwrap();
        let done = service.set_status(task.id, TaskStatus::Done).await.unwrap();
        assert!(done.completed_at.is_some());
        let reopened = service.set_status(task.id, TaskStatus::Todo).await.unwrap();
        assert!(reopened.completed_at.is_none());
        assert_eq!(service.cached().await[0].status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn unit_advance_stops_at_done() {
        let service = TaskService::new(InMemoryTasks::default());
        let task = service.create(NewTask::titled("Quest")).await.unwrap();
        assert_eq!(service.advance(task.id).await.unwrap().status, TaskStatus::InProgress);
        assert_eq!(service.advance(task.id).await.unwrap().status, TaskStatus::Done);
        assert_eq!(service.advance(task.id).await.unwrap_err(), TaskServiceError::Invalid(TaskError::NoNextStatus));
    }

    #[tokio::test]
    async fn unit_failed_write_leaves_cache_untouched() {
        let repo = InMemoryTasks::default();
        let service = TaskService::new(repo.clone());
        let task = service.create(NewTask::titled("Shift")).await.unwrap();
        repo.fail_writes(true);

        let before = service.cached().await;
        let err = service
            .update(task.id, TaskPatch { title: Some("Renamed".into()), ..TaskPatch::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskServiceError::Store(StoreError::Failed(_))));
        assert!(service.delete(task.id).await.is_err());
        assert!(service.create(NewTask::titled("Another")).await.is_err());
        assert_eq!(service.cached().await, before);
    }

    #[tokio::test]
    async fn unit_delete_and_missing_ids() {
        let service = TaskService::new(InMemoryTasks::default());
        let task = service.create(NewTask::titled("Gone soon")).await.unwrap();
        service.delete(task.id).await.unwrap();
        assert!(service.cached().await.is_empty());
        assert_eq!(service.delete(task.id).await.unwrap_err(), TaskServiceError::Store(StoreError::NotFound));
        assert_eq!(
            service.set_status(TaskId::default(), TaskStatus::Done).await.unwrap_err(),
            TaskServiceError::Store(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn unit_refresh_orders_newest_first() {
        let repo = InMemoryTasks::default();
        let service = TaskService::new(repo.clone());
        let old = service.create(NewTask::titled("old")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let new = service.create(NewTask::titled("new")).await.unwrap();
        let other = TaskService::new(repo);
        let listed = other.list().await.unwrap();
        assert_eq!(listed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn unit_unconfigured_store_reads_empty_and_rejects_writes() {
        let service = TaskService::new(UnconfiguredStore);
        assert!(!service.is_configured());
        assert!(service.list().await.unwrap().is_empty());
        let err = service.create(NewTask::titled("Nope")).await.unwrap_err();
        assert_eq!(err, TaskServiceError::Store(StoreError::Unconfigured));
        assert_eq!(
            service.set_status(TaskId::default(), TaskStatus::Done).await.unwrap_err(),
            TaskServiceError::Store(StoreError::Unconfigured)
        );
        assert!(service.cached().await.is_empty());
    }

    #[tokio::test]
    async fn unit_status_and_patch_do_not_overwrite_each_other() {
        let repo = InMemoryTasks::default();
        let editor = TaskService::new(repo.clone());
        let task = editor.create(NewTask::titled("Draft")).await.unwrap();
        // a second session still holding the original row
        let other = TaskService::new(repo.clone());
        other.refresh().await.unwrap();

        editor.update(task.id, TaskPatch { title: Some("Final draft".into()), ..TaskPatch::default() }).await.unwrap();
        let done = other.set_status(task.id, TaskStatus::Done).await.unwrap();
        assert_eq!(done.title, "Final draft");

        let patched = other
            .update(task.id, TaskPatch { description: Some(Some("  ".into())), ..TaskPatch::default() })
            .await
            .unwrap();
        assert_eq!(patched.status, TaskStatus::Done);
        assert_eq!(patched.description, None);
        assert_eq!(other.cached().await[0], patched);
    }

    #[tokio::test]
    async fn unit_require_distinguishes_missing_from_unconfigured() {
        let service = TaskService::new(InMemoryTasks::default());
        let task = service.create(NewTask::titled("Here")).await.unwrap();
        assert_eq!(service.require(task.id).await.unwrap().id, task.id);
        assert_eq!(service.require(TaskId::default()).await.unwrap_err(), TaskServiceError::Store(StoreError::NotFound));
        assert_eq!(
            TaskService::new(UnconfiguredStore).require(task.id).await.unwrap_err(),
            TaskServiceError::Store(StoreError::Unconfigured)
        );
    }
}
