#[cfg(test)]
mod tests {
    use crate::{backend, index, match_all, options, retriever};
    use connectors::memory::{FaultKind, Operation};
    use engine_core::{error::RetrievalError, report::RetrievalOutcome};
    use model::pagination::cursor::Cursor;
    use serde_json::json;
    use tracing_test::traced_test;

    // Scenario: the second scroll page reports a failed shard.
    // Expected Outcome: the call fails with PartialShardFailure, no rows are
    // returned and the scroll is still cleared once.
    #[traced_test]
    #[tokio::test]
    async fn shard_failure_discards_rows_and_clears_scroll() {
        let backend = backend(50);
        backend.inject(
            Operation::Scroll,
            1,
            FaultKind::ShardFailure("node left".into()),
        );
        let retriever = retriever(&backend);

        let err = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options(&retriever, 10))
            .await
            .unwrap_err();

        match err {
            RetrievalError::PartialShardFailure {
                failed, failures, ..
            } => {
                assert_eq!(failed, 1);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected a shard failure, got {other:?}"),
        }
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
        assert_eq!(backend.open_scrolls(), 0);
    }

    // Scenario: a shard failure in the middle of a sorted traversal.
    // Expected Outcome: the error carries the last accepted sort tuple so the
    // caller can retry from there.
    #[traced_test]
    #[tokio::test]
    async fn sorted_shard_failure_carries_resume_point() {
        let backend = backend(50);
        backend.inject(
            Operation::Search,
            3,
            FaultKind::ShardFailure("timeout".into()),
        );
        let retriever = retriever(&backend);

        let err = retriever
            .retrieve_by_sorted_pagination(&index(), &match_all(), None, None, &options(&retriever, 10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RetrievalError::PartialShardFailure { resume: Cursor::SearchAfter(ref values), .. }
                if values == &vec![json!("00019")]
        ));
    }

    // Scenario: a shard failure while scanning.
    // Expected Outcome: PartialShardFailure without a resume point.
    #[traced_test]
    #[tokio::test]
    async fn scan_shard_failure_is_raised() {
        let backend = backend(30);
        backend.inject(
            Operation::Scroll,
            1,
            FaultKind::ShardFailure("disk".into()),
        );
        let retriever = retriever(&backend);

        let err = retriever
            .retrieve_by_scan(&index(), &match_all(), &options(&retriever, 10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RetrievalError::PartialShardFailure {
                resume: Cursor::None,
                ..
            }
        ));
        assert_eq!(backend.open_scrolls(), 0);
    }

    // Scenario: a missing index, for every strategy.
    // Expected Outcome: IndexNotFound; no scroll was opened so none is cleared.
    #[traced_test]
    #[tokio::test]
    async fn missing_index_is_not_found() {
        let backend = backend(5);
        let retriever = retriever(&backend);
        let missing = model::core::identifiers::IndexSelector::single("nope");
        let options = options(&retriever, 10);

        let scan = retriever.retrieve_by_scan(&missing, &match_all(), &options).await;
        let scroll = retriever
            .retrieve_by_scroll(&missing, &match_all(), None, &options)
            .await;
        let sorted = retriever
            .retrieve_by_sorted_pagination(&missing, &match_all(), None, None, &options)
            .await;

        for result in [scan, scroll, sorted] {
            assert!(matches!(result, Err(RetrievalError::IndexNotFound(_))));
        }
        assert_eq!(backend.calls(Operation::ClearScroll), 0);
    }

    // Scenario: a scroll is resumed with an id the backend no longer knows.
    // Expected Outcome: IndexNotFound, and no clear is sent for the dead id.
    #[traced_test]
    #[tokio::test]
    async fn expired_scroll_resume_is_not_found_without_a_clear() {
        let backend = backend(5);
        let retriever = retriever(&backend);

        let result = retriever
            .retrieve_by_scroll(
                &index(),
                &match_all(),
                Some("expired-scroll".to_string()),
                &options(&retriever, 10),
            )
            .await;

        assert!(matches!(result, Err(RetrievalError::IndexNotFound(_))));
        assert_eq!(backend.calls(Operation::Scroll), 1);
        assert_eq!(backend.calls(Operation::ClearScroll), 0);
        assert!(!logs_contain("backend still holds"));
    }

    // Scenario: a query the backend cannot parse.
    // Expected Outcome: BadRequest for every strategy.
    #[traced_test]
    #[tokio::test]
    async fn malformed_query_is_bad_request() {
        let backend = backend(5);
        let retriever = retriever(&backend);
        let query = json!({"query": {"no_such_clause": {"title": "x"}}});
        let options = options(&retriever, 10);

        let scan = retriever.retrieve_by_scan(&index(), &query, &options).await;
        let scroll = retriever
            .retrieve_by_scroll(&index(), &query, None, &options)
            .await;
        let sorted = retriever
            .retrieve_by_sorted_pagination(&index(), &query, None, None, &options)
            .await;

        for result in [scan, scroll, sorted] {
            assert!(matches!(result, Err(RetrievalError::BadRequest(_))));
        }
    }

    // Scenario: the connection drops on the third sorted page.
    // Expected Outcome: the rows of the first two pages come back with an
    // Interrupted outcome pointing after the last of them; the failure is
    // logged.
    #[traced_test]
    #[tokio::test]
    async fn unclassified_failure_returns_partial_rows() {
        let backend = backend(50);
        backend.inject(
            Operation::Search,
            3,
            FaultKind::Transport("connection reset".into()),
        );
        let retriever = retriever(&backend);

        let report = retriever
            .retrieve_by_sorted_pagination(&index(), &match_all(), None, None, &options(&retriever, 10))
            .await
            .unwrap();

        assert_eq!(report.rows(), 20);
        match &report.outcome {
            RetrievalOutcome::Interrupted { error, resume, .. } => {
                assert!(error.contains("connection reset"));
                assert_eq!(resume, &Cursor::SearchAfter(vec![json!("00019")]));
            }
            other => panic!("expected an interrupted outcome, got {other}"),
        }
        assert!(logs_contain("Unexpected failure"));
    }

    // Scenario: the scan helper loses the connection mid-drain.
    // Expected Outcome: partial rows, no resume point, scroll released.
    #[traced_test]
    #[tokio::test]
    async fn interrupted_scan_keeps_rows_without_resume() {
        let backend = backend(50);
        backend.inject(
            Operation::Scroll,
            2,
            FaultKind::Transport("broken pipe".into()),
        );
        let retriever = retriever(&backend);

        let report = retriever
            .retrieve_by_scan(&index(), &match_all(), &options(&retriever, 10))
            .await
            .unwrap();

        assert_eq!(report.rows(), 20);
        assert!(matches!(
            report.outcome,
            RetrievalOutcome::Interrupted {
                resume: Cursor::None,
                ..
            }
        ));
        assert_eq!(backend.open_scrolls(), 0);
    }

    // Scenario: clearing the scroll fails after a complete traversal.
    // Expected Outcome: rows are kept, the release is attempted exactly once
    // and the leaked id is logged.
    #[traced_test]
    #[tokio::test]
    async fn failed_release_is_attempted_once_and_logged() {
        let backend = backend(15);
        backend.inject(
            Operation::ClearScroll,
            1,
            FaultKind::Transport("timeout".into()),
        );
        let retriever = retriever(&backend);

        let report = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options(&retriever, 10))
            .await
            .unwrap();

        assert!(report.outcome.is_complete());
        assert_eq!(report.rows(), 15);
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
        assert_eq!(backend.open_scrolls(), 1);
        assert!(logs_contain("Failed to clear scroll"));
    }
}
