//! Database Block End-to-End Tests
//!
//! Exercises the full lifecycle of an embedded database block through the
//! public services: schema seeding and evolution, position-ordered row
//! creation and moves, shallow property merges, soft deletion, and the
//! error kinds each misuse surfaces.

#[cfg(test)]
mod database_block_tests {
    use anyhow::Result;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use tabular_core::db::{Pagination, Storage};
    use tabular_core::models::{PropertyOptions, PropertyType, SelectOption};
    use tabular_core::services::{
        CreateDatabaseParams, CreateRowParams, DatabaseService, MoveRowParams, RowService,
        ServiceError, UpdateRowParams,
    };
    use tempfile::TempDir;

    /// Helper to create both services on a shared temp database
    async fn create_test_services() -> Result<(DatabaseService, RowService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let storage = Arc::new(Storage::new(temp_dir.path().join("test.db")).await?);
        Ok((
            DatabaseService::new(storage.clone()),
            RowService::new(storage),
            temp_dir,
        ))
    }

    async fn create_block(databases: &DatabaseService) -> Result<tabular_core::models::Database> {
        Ok(databases
            .create(
                "user-1",
                "ws-1",
                CreateDatabaseParams {
                    page_id: Some("page-1".to_string()),
                    space_id: "space-1".to_string(),
                    title: Some("Tasks".to_string()),
                    icon: None,
                },
            )
            .await?)
    }

    fn titled_row(database_id: &str, title: &str) -> CreateRowParams {
        CreateRowParams {
            database_id: database_id.to_string(),
            title: Some(title.to_string()),
            icon: None,
            properties: None,
        }
    }

    async fn ordered_titles(rows: &RowService, database_id: &str) -> Result<Vec<String>> {
        Ok(rows
            .list(database_id, Pagination::default())
            .await?
            .items
            .into_iter()
            .map(|row| row.title.unwrap_or_default())
            .collect())
    }

    #[tokio::test]
    async fn test_full_block_lifecycle() -> Result<()> {
        let (databases, rows, _temp) = create_test_services().await?;

        // A fresh block has exactly one text property.
        let database = create_block(&databases).await?;
        assert_eq!(database.properties.len(), 1);
        let title_prop_id = database.properties[0].id.clone();

        // Three rows land in creation order.
        let r1 = rows.create("user-1", titled_row(&database.id, "r1")).await?;
        let r2 = rows.create("user-1", titled_row(&database.id, "r2")).await?;
        let r3 = rows.create("user-1", titled_row(&database.id, "r3")).await?;
        assert!(r1.position < r2.position);
        assert!(r2.position < r3.position);
        assert_eq!(ordered_titles(&rows, &database.id).await?, ["r1", "r2", "r3"]);

        // Moving the last row before the first reorders without touching
        // the other rows' keys.
        rows.move_row(
            &r3.id,
            MoveRowParams {
                before_row_id: Some(r1.id.clone()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ordered_titles(&rows, &database.id).await?, ["r3", "r1", "r2"]);
        let r1_after = rows.find_by_id(&r1.id, false).await?;
        assert_eq!(r1_after.position, r1.position);

        // The sole property cannot be deleted.
        let err = databases
            .delete_property(&database.id, &title_prop_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        // Adding a select property and writing a value for it leaves the
        // existing text value untouched.
        let database = databases
            .add_property(
                &database.id,
                "Status",
                PropertyType::Select,
                Some(PropertyOptions {
                    options: Some(vec![SelectOption {
                        id: "o1".to_string(),
                        label: "Todo".to_string(),
                        color: "blue".to_string(),
                    }]),
                    ..Default::default()
                }),
            )
            .await?;
        let status_prop_id = database.properties[1].id.clone();

        let mut text_value = Map::new();
        text_value.insert(title_prop_id.clone(), json!("write the report"));
        rows.update(
            "user-1",
            &r1.id,
            UpdateRowParams {
                properties: Some(text_value),
                ..Default::default()
            },
        )
        .await?;

        let mut select_value = Map::new();
        select_value.insert(status_prop_id.clone(), json!("o1"));
        let updated = rows
            .update(
                "user-1",
                &r1.id,
                UpdateRowParams {
                    properties: Some(select_value),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!(updated.properties[&title_prop_id], json!("write the report"));
        assert_eq!(updated.properties[&status_prop_id], json!("o1"));

        Ok(())
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_leave_the_order() -> Result<()> {
        let (databases, rows, _temp) = create_test_services().await?;
        let database = create_block(&databases).await?;

        let r1 = rows.create("user-1", titled_row(&database.id, "r1")).await?;
        rows.create("user-1", titled_row(&database.id, "r2")).await?;

        rows.delete(&r1.id).await?;
        assert_eq!(ordered_titles(&rows, &database.id).await?, ["r2"]);
        assert_eq!(rows.count_rows(&database.id).await?, 1);

        // New rows append after the remaining tail, not after the tombstone.
        let r3 = rows.create("user-1", titled_row(&database.id, "r3")).await?;
        assert_eq!(ordered_titles(&rows, &database.id).await?, ["r2", "r3"]);
        assert!(!r3.position.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_block_tombstones_rows() -> Result<()> {
        let (databases, rows, _temp) = create_test_services().await?;
        let database = create_block(&databases).await?;
        let row = rows.create("user-1", titled_row(&database.id, "r1")).await?;

        databases.delete(&database.id).await?;

        let err = rows.find_by_id(&row.id, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        let err = rows
            .create("user-1", titled_row(&database.id, "r2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_addressable_by_slug() -> Result<()> {
        let (databases, rows, _temp) = create_test_services().await?;
        let database = create_block(&databases).await?;
        let row = rows.create("user-1", titled_row(&database.id, "r1")).await?;

        assert_eq!(
            databases.find_by_slug(&database.slug_id).await?.id,
            database.id
        );
        assert_eq!(rows.find_by_slug(&row.slug_id, false).await?.id, row.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_paging_through_a_block() -> Result<()> {
        let (databases, rows, _temp) = create_test_services().await?;
        let database = create_block(&databases).await?;

        for i in 0..7 {
            rows.create("user-1", titled_row(&database.id, &format!("r{}", i)))
                .await?;
        }

        let mut collected = Vec::new();
        let mut page = 1;
        loop {
            let result = rows.list(&database.id, Pagination::new(page, 3)).await?;
            let has_next = result.meta.has_next;
            collected.extend(result.items.into_iter().map(|r| r.title.unwrap_or_default()));
            if !has_next {
                break;
            }
            page += 1;
        }

        assert_eq!(collected, ["r0", "r1", "r2", "r3", "r4", "r5", "r6"]);
        Ok(())
    }
}
