#[cfg(test)]
mod tests {
    use crate::{assert_no_duplicates, backend, ids, index, match_all, options, retriever};
    use connectors::memory::Operation;
    use engine_core::error::RetrievalError;
    use model::{
        core::identifiers::FieldProjection, pagination::sort::SortSpec, records::table::Cell,
    };
    use serde_json::json;
    use std::collections::BTreeSet;
    use tracing_test::traced_test;

    // Scenario: 150 documents, page size 50, scroll traversal.
    // Expected Outcome: one opening search, three scroll calls (the last one
    // empty), 150 rows and the scroll cleared exactly once.
    #[traced_test]
    #[tokio::test]
    async fn scroll_150_documents_in_pages_of_50() {
        let backend = backend(150);
        let retriever = retriever(&backend);

        let report = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options(&retriever, 50))
            .await
            .unwrap();

        assert!(report.outcome.is_complete());
        assert_eq!(report.rows(), 150);
        assert_eq!(report.pages, 4);
        assert_eq!(backend.calls(Operation::Search), 1);
        assert_eq!(backend.calls(Operation::Scroll), 3);
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
        assert_eq!(backend.open_scrolls(), 0);
        assert_no_duplicates(&report.table);
    }

    // Scenario: a result set smaller than one page.
    // Expected Outcome: the short first page ends the traversal without any
    // scroll call; the context is still released.
    #[traced_test]
    #[tokio::test]
    async fn short_first_page_needs_no_scroll() {
        let backend = backend(7);
        let retriever = retriever(&backend);

        let report = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options(&retriever, 50))
            .await
            .unwrap();

        assert_eq!(report.rows(), 7);
        assert_eq!(backend.calls(Operation::Scroll), 0);
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
    }

    // Scenario: N is an exact multiple of the page size, for both cursor
    // strategies.
    // Expected Outcome: every document is returned once; the last full page
    // is followed by exactly one empty round-trip.
    #[traced_test]
    #[tokio::test]
    async fn exact_multiple_of_page_size_is_not_cut_short() {
        let backend = backend(100);
        let retriever = retriever(&backend);

        let scrolled = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options(&retriever, 25))
            .await
            .unwrap();
        assert_eq!(scrolled.rows(), 100);
        assert_eq!(backend.calls(Operation::Scroll), 4);

        let sorted = retriever
            .retrieve_by_sorted_pagination(
                &index(),
                &match_all(),
                None,
                None,
                &options(&retriever, 25),
            )
            .await
            .unwrap();
        assert_eq!(sorted.rows(), 100);
        // One search for the scroll, five for the sorted traversal.
        assert_eq!(backend.calls(Operation::Search), 6);
        assert_no_duplicates(&sorted.table);
    }

    // Scenario: the same query through scroll and sorted pagination.
    // Expected Outcome: the same set of ids, no duplicates, no omissions.
    #[traced_test]
    #[tokio::test]
    async fn scroll_and_sorted_return_the_same_documents() {
        let backend = backend(233);
        let retriever = retriever(&backend);
        let query = json!({"bool": {"must_not": [{"term": {"rank": 3}}]}});
        let expected = retriever.count_matches(&index(), &query).await.unwrap();

        let scrolled = retriever
            .retrieve_by_scroll(&index(), &query, None, &options(&retriever, 40))
            .await
            .unwrap();
        let sorted = retriever
            .retrieve_by_sorted_pagination(&index(), &query, None, None, &options(&retriever, 40))
            .await
            .unwrap();

        assert_eq!(scrolled.rows() as u64, expected);
        assert_eq!(sorted.rows() as u64, expected);
        assert_no_duplicates(&scrolled.table);
        assert_no_duplicates(&sorted.table);

        let scrolled_ids: BTreeSet<String> = ids(&scrolled.table).into_iter().collect();
        let sorted_ids: BTreeSet<String> = ids(&sorted.table).into_iter().collect();
        assert_eq!(scrolled_ids, sorted_ids);
    }

    // Scenario: sort on a field with many ties, without a tiebreaker.
    // Expected Outcome: same rows and order as with an explicit ascending id
    // tiebreaker, and the traversal is repeatable.
    #[traced_test]
    #[tokio::test]
    async fn ambiguous_sort_gets_an_id_tiebreaker() {
        let backend = backend(60);
        let retriever = retriever(&backend);
        let by_rank = SortSpec::from_json(&json!({"rank": "desc"})).unwrap();
        let explicit = SortSpec::from_json(&json!([{"rank": "desc"}, {"id": "asc"}])).unwrap();

        let mut runs = Vec::new();
        for sort in [by_rank.clone(), explicit, by_rank] {
            let report = retriever
                .retrieve_by_sorted_pagination(
                    &index(),
                    &match_all(),
                    Some(sort),
                    None,
                    &options(&retriever, 8),
                )
                .await
                .unwrap();
            assert_eq!(report.rows(), 60);
            runs.push(ids(&report.table));
        }

        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[0], runs[2]);
        // rank 6 is the highest; ids 6, 13, 20, ... come first in id order.
        assert_eq!(runs[0][..3], ["00006", "00013", "00020"]);
    }

    // Scenario: scan over N documents with several page sizes.
    // Expected Outcome: exactly N rows whatever the page size.
    #[traced_test]
    #[tokio::test]
    async fn scan_returns_every_document() {
        for size in [1, 13, 100, 10_000] {
            let backend = backend(120);
            let retriever = retriever(&backend);

            let report = retriever
                .retrieve_by_scan(&index(), &match_all(), &options(&retriever, size))
                .await
                .unwrap();

            assert!(report.outcome.is_complete());
            assert_eq!(report.rows(), 120, "page size {size}");
            assert_eq!(report.total, Some(120));
            assert_no_duplicates(&report.table);
            assert_eq!(backend.open_scrolls(), 0);
        }
    }

    // Scenario: the count and the totals reported by the strategies.
    // Expected Outcome: they all agree.
    #[traced_test]
    #[tokio::test]
    async fn count_agrees_with_reported_totals() {
        let backend = backend(91);
        let retriever = retriever(&backend);
        let query = json!({"query": {"terms": {"category": ["cardio", "onco"]}}});

        let count = retriever.count_matches(&index(), &query).await.unwrap();
        assert!(count > 0);

        let scan = retriever
            .retrieve_by_scan(&index(), &query, &options(&retriever, 10))
            .await
            .unwrap();
        let scroll = retriever
            .retrieve_by_scroll(&index(), &query, None, &options(&retriever, 10))
            .await
            .unwrap();
        let sorted = retriever
            .retrieve_by_sorted_pagination(&index(), &query, None, None, &options(&retriever, 10))
            .await
            .unwrap();

        for report in [&scan, &scroll, &sorted] {
            assert_eq!(report.total, Some(count));
            assert_eq!(report.rows() as u64, count);
        }
    }

    // Scenario: a projection naming a field some documents lack.
    // Expected Outcome: those rows carry an empty string in that column and
    // the columns are exactly the meta columns plus the projection.
    #[traced_test]
    #[tokio::test]
    async fn projected_field_missing_from_a_document_is_empty() {
        let backend = backend(10);
        let retriever = retriever(&backend);
        let options = options(&retriever, 4).with_fields(FieldProjection::new(["title", "category"]));

        let report = retriever
            .retrieve_by_sorted_pagination(&index(), &match_all(), None, None, &options)
            .await
            .unwrap();

        assert_eq!(
            report.table.columns(),
            ["_index", "_id", "_score", "title", "category"]
        );
        // Article 0 and 5 have no category.
        assert_eq!(report.table.cell(0, "category"), Some(&Cell::empty()));
        assert_eq!(report.table.cell(5, "category"), Some(&Cell::empty()));
        assert_eq!(
            report.table.cell(1, "category"),
            Some(&Cell::Text("neuro".into()))
        );
    }

    // Scenario: the wildcard projection.
    // Expected Outcome: columns follow the documents, multi-valued fields are
    // joined with ", ".
    #[traced_test]
    #[tokio::test]
    async fn wildcard_columns_are_read_from_the_rows() {
        let backend = backend(3);
        let retriever = retriever(&backend);
        let options = options(&retriever, 10).with_fields(FieldProjection::all());

        let report = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options)
            .await
            .unwrap();

        assert!(report.table.column_index("rank").is_some());
        assert_eq!(report.table.cell(0, "tags"), Some(&Cell::Text("a, b".into())));
    }

    // Scenario: page size above the backend maximum, for every strategy.
    // Expected Outcome: InvalidArgument before any backend call.
    #[traced_test]
    #[tokio::test]
    async fn oversized_page_is_rejected_without_a_call() {
        let backend = backend(5);
        let retriever = retriever(&backend);
        let options = options(&retriever, 10_001);

        let scan = retriever
            .retrieve_by_scan(&index(), &match_all(), &options)
            .await;
        let scroll = retriever
            .retrieve_by_scroll(&index(), &match_all(), None, &options)
            .await;
        let sorted = retriever
            .retrieve_by_sorted_pagination(&index(), &match_all(), None, None, &options)
            .await;

        for result in [scan, scroll, sorted] {
            assert!(matches!(result, Err(RetrievalError::InvalidArgument(_))));
        }
        assert_eq!(backend.total_calls(), 0);
    }

    // Scenario: query passed wrapped in "query" and bare.
    // Expected Outcome: both select the same documents.
    #[traced_test]
    #[tokio::test]
    async fn wrapped_and_bare_queries_match_alike() {
        let backend = backend(40);
        let retriever = retriever(&backend);
        let clause = json!({"term": {"category": "neuro"}});

        let bare = retriever.count_matches(&index(), &clause).await.unwrap();
        let wrapped = retriever
            .count_matches(&index(), &json!({ "query": clause }))
            .await
            .unwrap();
        assert_eq!(bare, wrapped);
        assert!(bare > 0);
    }
}
