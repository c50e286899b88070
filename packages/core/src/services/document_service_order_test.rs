//! Sibling Ordering and Move Tests
//!
//! Validates the dense-rank invariant (active siblings always carry
//! `sort_order` values `0..k`) across create, reorder, reparent, and update,
//! plus the cycle guard and index clamping at the move boundary.

#[cfg(test)]
mod tests {
    use crate::db::DatabaseService;
    use crate::models::{CreateDocumentParams, Document, DocumentPatch, ListOptions};
    use crate::services::{DocumentService, DocumentServiceError};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Helper to create a test service
    /// Returns (service, _temp_dir) - temp_dir must be kept alive for test duration
    async fn create_test_service() -> (DocumentService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());

        (DocumentService::new(db), temp_dir)
    }

    async fn create_doc(service: &DocumentService, title: &str, parent: Option<&str>) -> Document {
        service
            .create(CreateDocumentParams {
                title: title.to_string(),
                parent_id: parent.map(String::from),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// Assert that the active children of `parent` carry ranks 0..k and
    /// return them in rank order.
    async fn assert_dense(service: &DocumentService, parent: Option<&str>) -> Vec<Document> {
        let children = service.children_of(parent).await.unwrap();
        for (i, child) in children.iter().enumerate() {
            assert_eq!(
                child.sort_order,
                i as i64,
                "rank gap under {:?}: {:?}",
                parent,
                children
                    .iter()
                    .map(|c| (c.title.clone(), c.sort_order))
                    .collect::<Vec<_>>()
            );
        }
        children
    }

    fn titles(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_prepends_at_rank_zero() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        create_doc(&service, "B", None).await;
        create_doc(&service, "C", None).await;
        create_doc(&service, "D", None).await;

        // Each create enters at the top, so order is newest-first
        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["D", "C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_create_normalizes_title() {
        let (service, _temp) = create_test_service().await;

        let doc = create_doc(&service, "  Untitled  ", None).await;
        assert_eq!(doc.title, "");

        let doc = create_doc(&service, "  Plans  ", None).await;
        assert_eq!(doc.title, "Plans");
    }

    #[tokio::test]
    async fn test_same_parent_reorder_to_lower_index() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;
        create_doc(&service, "B", None).await;
        create_doc(&service, "C", None).await;
        create_doc(&service, "D", None).await;
        // Ranks now: D=0, C=1, B=2, A=3

        let moved = service.move_document(&a.id, None, 1.0).await.unwrap();
        assert_eq!(moved.sort_order, 1);

        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["D", "A", "C", "B"]);
    }

    #[tokio::test]
    async fn test_same_parent_reorder_to_higher_index() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        create_doc(&service, "B", None).await;
        let c = create_doc(&service, "C", None).await;
        // Ranks: C=0, B=1, A=2

        service.move_document(&c.id, None, 2.0).await.unwrap();

        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_noop_reorder_keeps_updated_at() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", None).await;
        // Ranks: B=0, A=1

        let before = service.get_by_id(&b.id).await.unwrap().unwrap();
        let moved = service.move_document(&b.id, None, 0.0).await.unwrap();

        assert_eq!(moved.updated_at, before.updated_at);
        assert_eq!(moved.sort_order, 0);
        assert_dense(&service, None).await;
    }

    #[tokio::test]
    async fn test_reorder_index_is_clamped_and_floored() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        create_doc(&service, "B", None).await;
        let c = create_doc(&service, "C", None).await;
        // Ranks: C=0, B=1, A=2

        // Overshoot clamps to the last slot of the existing list
        service.move_document(&c.id, None, 99.0).await.unwrap();
        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["B", "A", "C"]);

        // Negative clamps to 0
        service.move_document(&c.id, None, -5.0).await.unwrap();
        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["C", "B", "A"]);

        // Fractional floors: 1.9 -> 1
        service.move_document(&c.id, None, 1.9).await.unwrap();
        let children = assert_dense(&service, None).await;
        assert_eq!(titles(&children), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_cross_parent_move_keeps_both_lists_dense() {
        let (service, _temp) = create_test_service().await;

        let source = create_doc(&service, "Source", None).await;
        let dest = create_doc(&service, "Dest", None).await;

        for title in ["S1", "S2", "S3", "S4", "S5"] {
            create_doc(&service, title, Some(&source.id)).await;
        }
        for title in ["D1", "D2", "D3"] {
            create_doc(&service, title, Some(&dest.id)).await;
        }

        // Move the middle source child (rank 2) to position 1 of the destination
        let source_children = assert_dense(&service, Some(&source.id)).await;
        let middle = source_children[2].clone();

        let moved = service
            .move_document(&middle.id, Some(&dest.id), 1.0)
            .await
            .unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some(dest.id.as_str()));
        assert_eq!(moved.sort_order, 1);

        let source_after = assert_dense(&service, Some(&source.id)).await;
        assert_eq!(source_after.len(), 4);

        let dest_after = assert_dense(&service, Some(&dest.id)).await;
        assert_eq!(dest_after.len(), 4);
        assert_eq!(dest_after[1].id, middle.id);
    }

    #[tokio::test]
    async fn test_cross_parent_append_clamps_to_end() {
        let (service, _temp) = create_test_service().await;

        let parent = create_doc(&service, "Parent", None).await;
        create_doc(&service, "Child1", Some(&parent.id)).await;
        create_doc(&service, "Child2", Some(&parent.id)).await;
        let loose = create_doc(&service, "Loose", None).await;

        // Insert mode allows index == sibling count (append); overshoot clamps there
        let moved = service
            .move_document(&loose.id, Some(&parent.id), 50.0)
            .await
            .unwrap();
        assert_eq!(moved.sort_order, 2);

        let children = assert_dense(&service, Some(&parent.id)).await;
        assert_eq!(titles(&children), vec!["Child2", "Child1", "Loose"]);
        assert_dense(&service, None).await;
    }

    #[tokio::test]
    async fn test_subtree_travels_with_moved_document() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", Some(&a.id)).await;
        let c = create_doc(&service, "C", Some(&b.id)).await;
        let dest = create_doc(&service, "Dest", None).await;

        service
            .move_document(&a.id, Some(&dest.id), 0.0)
            .await
            .unwrap();

        // Descendants keep their parent links; only the root repointed
        let b_after = service.get_by_id(&b.id).await.unwrap().unwrap();
        let c_after = service.get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(b_after.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(c_after.parent_id.as_deref(), Some(b.id.as_str()));
    }

    #[tokio::test]
    async fn test_nest_then_unnest_round_trip() {
        let (service, _temp) = create_test_service().await;

        let folder = create_doc(&service, "Folder", None).await;
        create_doc(&service, "F1", Some(&folder.id)).await;
        create_doc(&service, "F2", Some(&folder.id)).await;
        create_doc(&service, "X", None).await;
        create_doc(&service, "Y", None).await;

        let root_before = assert_dense(&service, None).await;
        let folder_before = assert_dense(&service, Some(&folder.id)).await;
        let x = root_before.iter().find(|d| d.title == "X").unwrap().clone();

        // Nest X at the end of the folder, then move it back where it was
        service
            .move_document(&x.id, Some(&folder.id), 99.0)
            .await
            .unwrap();
        assert_dense(&service, None).await;
        assert_dense(&service, Some(&folder.id)).await;

        service
            .move_document(&x.id, None, x.sort_order as f64)
            .await
            .unwrap();

        let root_after = assert_dense(&service, None).await;
        let folder_after = assert_dense(&service, Some(&folder.id)).await;

        assert_eq!(titles(&root_after), titles(&root_before));
        assert_eq!(titles(&folder_after), titles(&folder_before));
    }

    #[tokio::test]
    async fn test_move_rejects_self_reference() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;

        let err = service
            .move_document(&a.id, Some(&a.id), 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::SelfReference { .. }));
        assert_eq!(err.kind(), "SelfReference");
    }

    #[tokio::test]
    async fn test_move_rejects_descendant_cycle() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", Some(&a.id)).await;
        let c = create_doc(&service, "C", Some(&b.id)).await;

        // Direct child and deep descendant both rejected
        for target in [&b.id, &c.id] {
            let err = service
                .move_document(&a.id, Some(target), 0.0)
                .await
                .unwrap_err();
            assert!(matches!(err, DocumentServiceError::DescendantCycle { .. }));
        }

        // Nothing moved
        let a_after = service.get_by_id(&a.id).await.unwrap().unwrap();
        assert!(a_after.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_rejected_move_becomes_valid_after_detach() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", Some(&a.id)).await;
        let c = create_doc(&service, "C", Some(&b.id)).await;

        let err = service
            .move_document(&a.id, Some(&c.id), 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::DescendantCycle { .. }));

        // Detaching C removes it from A's subtree; the same move is now legal
        service.move_document(&c.id, None, 0.0).await.unwrap();
        let moved = service
            .move_document(&a.id, Some(&c.id), 0.0)
            .await
            .unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some(c.id.as_str()));

        assert_dense(&service, None).await;
        assert_dense(&service, Some(&c.id)).await;
    }

    #[tokio::test]
    async fn test_move_rejects_trashed_document() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", None).await;
        create_doc(&service, "C", None).await;
        // Ranks: C=0, B=1, A=2

        service.trash(&b.id).await.unwrap();
        let active_before = assert_dense(&service, None).await;

        // A trashed document's rank is only a restore hint; letting it move
        // would shift active siblings around a slot that does not exist
        let err = service.move_document(&b.id, None, 0.0).await.unwrap_err();
        assert!(matches!(err, DocumentServiceError::InvalidUpdate(_)));

        let active_after = assert_dense(&service, None).await;
        assert_eq!(titles(&active_after), titles(&active_before));

        // B keeps the legacy rank it held when it was trashed
        let b_after = service.get_by_id(&b.id).await.unwrap().unwrap();
        assert!(b_after.is_trashed());
        assert_eq!(b_after.sort_order, 1);
    }

    #[tokio::test]
    async fn test_move_missing_document_fails_not_found() {
        let (service, _temp) = create_test_service().await;

        let err = service
            .move_document("no-such-id", None, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_changes_attributes_and_updated_at() {
        let (service, _temp) = create_test_service().await;

        let doc = create_doc(&service, "Old title", None).await;

        let updated = service
            .update(
                &doc.id,
                DocumentPatch {
                    title: Some("New title".to_string()),
                    emoji: Some(Some("📝".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.emoji.as_deref(), Some("📝"));
        assert!(updated.updated_at > doc.updated_at);
        // Rank untouched by attribute updates
        assert_eq!(updated.sort_order, doc.sort_order);
    }

    #[tokio::test]
    async fn test_update_noop_keeps_updated_at() {
        let (service, _temp) = create_test_service().await;

        let doc = create_doc(&service, "Stable", None).await;

        let updated = service
            .update(
                &doc.id,
                DocumentPatch {
                    title: Some("Stable".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.updated_at, doc.updated_at);
    }

    #[tokio::test]
    async fn test_update_rejects_parent_change() {
        let (service, _temp) = create_test_service().await;

        let doc = create_doc(&service, "Doc", None).await;
        let other = create_doc(&service, "Other", None).await;

        let err = service
            .update(
                &doc.id,
                DocumentPatch {
                    parent_id: Some(Some(other.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::InvalidUpdate(_)));

        // Clearing the parent through update is equally illegal
        let err = service
            .update(
                &doc.id,
                DocumentPatch {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails_not_found() {
        let (service, _temp) = create_test_service().await;

        let err = service
            .update("no-such-id", DocumentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_by_id_returns_none_for_unknown() {
        let (service, _temp) = create_test_service().await;

        assert!(service.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_clamps_paging_and_filters_trashed() {
        let (service, _temp) = create_test_service().await;

        let a = create_doc(&service, "A", None).await;
        create_doc(&service, "B", None).await;
        create_doc(&service, "C", None).await;
        service.trash(&a.id).await.unwrap();

        // limit 0 clamps to 1
        let page = service
            .list(ListOptions {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);

        // negative offset clamps to 0; trashed rows excluded by default
        let page = service
            .list(ListOptions {
                offset: Some(-10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|d| !d.is_trashed()));

        // include_trashed brings the trashed row back
        let page = service
            .list(ListOptions {
                include_trashed: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
    }

    #[tokio::test]
    async fn test_list_orders_by_rank_then_recency() {
        let (service, _temp) = create_test_service().await;

        create_doc(&service, "A", None).await;
        let b = create_doc(&service, "B", None).await;
        // Ranks: B=0, A=1

        let page = service.list(ListOptions::default()).await.unwrap();
        assert_eq!(titles(&page), vec!["B", "A"]);
        assert_eq!(page[0].id, b.id);
    }
}
