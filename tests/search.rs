mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;

use common::{MockTransport, Request, client};
use kira_rcsb::error::RcsbError;
use kira_rcsb::search::{
    ComparisonType, LogicalOperator, QueryNode, QueryResults, QuerySearchOptions, QueryType,
    RequestOptions, ReturnType, ScoredResult, SearchOperator, SearchOptions, SearchOutcome,
};

fn status(code: u16) -> RcsbError {
    RcsbError::Status {
        url: "https://search.rcsb.org/rcsbsearch/v2/query".to_string(),
        status: code,
        message: "unavailable".to_string(),
    }
}

#[test]
fn query_search_returns_identifiers() {
    let rcsb = client(MockTransport::new().respond_json(json!({
        "query_id": "abc",
        "result_type": "entry",
        "total_count": 1,
        "result_set": [{"identifier": "4HHB", "score": 1.0}]
    })));

    let results = rcsb
        .query_search("hemoglobin", QueryType::FullText, &QuerySearchOptions::default())
        .unwrap();
    assert_eq!(results, QueryResults::Identifiers(vec!["4HHB".to_string()]));

    let requests = rcsb.transport().requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].body().unwrap();
    assert_eq!(body["query"]["service"], "full_text");
    assert_eq!(body["query"]["parameters"]["value"], "hemoglobin");
    assert_eq!(body["return_type"], "entry");
    assert_eq!(body["request_options"]["return_all_hits"], true);
}

#[test]
fn scan_params_override_only_what_they_name() {
    let rcsb = client(
        MockTransport::new().respond_json(json!({"result_set": [{"identifier": "1A3N"}]})),
    );
    let options = QuerySearchOptions {
        scan_params: Some(json!({"request_options": {"paginate": {"start": 0, "rows": 5}}})),
        ..QuerySearchOptions::default()
    };
    rcsb.query_search("P69905", QueryType::Uniprot, &options).unwrap();

    let body = rcsb.transport().requests()[0].body().cloned().unwrap();
    assert_eq!(body["query"]["service"], "text");
    assert_eq!(body["request_options"]["paginate"]["rows"], 5);
    assert_eq!(body["request_options"]["return_all_hits"], true);
}

#[test]
fn non_object_scan_params_are_rejected_before_sending() {
    let rcsb = client(MockTransport::new());
    let options = QuerySearchOptions {
        scan_params: Some(json!(["paginate"])),
        ..QuerySearchOptions::default()
    };
    assert_matches!(
        rcsb.query_search("hemoglobin", QueryType::FullText, &options),
        Err(RcsbError::InvalidInput(_))
    );
    assert!(rcsb.transport().requests().is_empty());
}

#[test]
fn transport_failures_retry_but_parse_failures_do_not() {
    let rcsb = client(
        MockTransport::new()
            .fail(status(503))
            .respond_json(json!({"result_set": [{"identifier": "4HHB"}]})),
    );
    let options = QuerySearchOptions {
        num_attempts: 2,
        sleep_time: Duration::from_millis(1),
        ..QuerySearchOptions::default()
    };
    let results = rcsb.query_search("hemoglobin", QueryType::FullText, &options).unwrap();
    assert_eq!(results.identifiers().unwrap(), ["4HHB".to_string()]);
    assert_eq!(rcsb.transport().requests().len(), 2);

    let rcsb = client(
        MockTransport::new()
            .respond(200, "not json")
            .respond_json(json!({"result_set": [{"identifier": "4HHB"}]})),
    );
    assert_matches!(
        rcsb.query_search("hemoglobin", QueryType::FullText, &options),
        Err(RcsbError::MalformedResponse(_))
    );
    assert_eq!(rcsb.transport().requests().len(), 1);
}

#[test]
fn retries_stop_after_the_attempt_budget() {
    let rcsb = client(MockTransport::new().fail(status(500)).fail(status(502)));
    let options = QuerySearchOptions {
        num_attempts: 2,
        sleep_time: Duration::from_millis(1),
        ..QuerySearchOptions::default()
    };
    assert_matches!(
        rcsb.query_search("hemoglobin", QueryType::FullText, &options),
        Err(RcsbError::Status { status: 502, .. })
    );
}

#[test]
fn empty_identifier_walk_is_malformed() {
    let rcsb = client(MockTransport::new().respond_json(json!({"result_set": []})));
    assert_matches!(
        rcsb.query_search("nothing", QueryType::FullText, &QuerySearchOptions::default()),
        Err(RcsbError::MalformedResponse(_))
    );
}

#[test]
fn non_entry_return_types_come_back_raw() {
    let payload = json!({"result_set": [{"identifier": "4HHB_1"}]});
    let rcsb = client(MockTransport::new().respond_json(payload.clone()));
    let options = QuerySearchOptions {
        return_type: ReturnType::PolymerEntity,
        ..QuerySearchOptions::default()
    };
    let results = rcsb.query_search("hemoglobin", QueryType::FullText, &options).unwrap();
    assert_eq!(results, QueryResults::Raw(payload));
}

#[test]
fn perform_search_posts_the_tree_and_maps_identifiers() {
    let rcsb = client(MockTransport::new().respond_json(json!({
        "result_set": [
            {"identifier": "4HHB", "score": 1.0},
            {"identifier": "2HHB", "score": 0.8}
        ]
    })));
    let tree = QueryNode::group(
        [
            SearchOperator::exact_match("exptl.method", "X-RAY DIFFRACTION"),
            SearchOperator::comparison(
                "rcsb_entry_info.resolution_combined",
                2.0,
                ComparisonType::LessOrEqual,
            ),
        ],
        LogicalOperator::And,
    )
    .unwrap();

    let outcome = rcsb.perform_search(tree, &SearchOptions::default()).unwrap();
    assert_eq!(
        outcome,
        SearchOutcome::Identifiers(vec!["4HHB".to_string(), "2HHB".to_string()])
    );

    let requests = rcsb.transport().requests();
    assert_matches!(&requests[0], Request::Post(url, _) if url.ends_with("/rcsbsearch/v2/query"));
    let body = requests[0].body().unwrap();
    assert_eq!(body["query"]["type"], "group");
    assert_eq!(body["query"]["logical_operator"], "and");
    assert_eq!(body["query"]["nodes"][1]["parameters"]["operator"], "less_or_equal");
}

#[test]
fn perform_search_with_scores_and_pagination() {
    let rcsb = client(MockTransport::new().respond_json(json!({
        "result_set": [{"identifier": "4HHB", "score": 0.5}]
    })));
    let options = SearchOptions {
        return_type: "CHEMICAL_COMPONENT".parse().unwrap(),
        request_options: Some(RequestOptions::default().paginate(0, 10)),
        return_with_scores: true,
        return_raw: false,
    };
    let outcome = rcsb
        .perform_search(SearchOperator::default_text("heme"), &options)
        .unwrap();
    assert_eq!(
        outcome,
        SearchOutcome::Scored(vec![ScoredResult {
            entity_id: "4HHB".to_string(),
            score: 0.5
        }])
    );
    let body = rcsb.transport().requests()[0].body().cloned().unwrap();
    assert_eq!(body["return_type"], "mol_definition");
    assert_eq!(body["request_options"], json!({"paginate": {"start": 0, "rows": 10}}));
}

#[test]
fn perform_search_without_result_set_is_malformed() {
    let rcsb = client(MockTransport::new().respond_json(json!({"total_count": 0})));
    assert_matches!(
        rcsb.perform_search(SearchOperator::default_text("x"), &SearchOptions::default()),
        Err(RcsbError::MalformedResponse(_))
    );
}

#[test]
fn perform_search_no_content_is_empty() {
    let rcsb = client(MockTransport::new().respond(204, Vec::new()));
    let outcome = rcsb
        .perform_search(SearchOperator::default_text("zzzz"), &SearchOptions::default())
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Identifiers(Vec::new()));
}

#[test]
fn http_status_errors_carry_url_and_status() {
    let rcsb = client(MockTransport::new().respond(400, "bad request"));
    let err = rcsb
        .perform_search(SearchOperator::default_text("x"), &SearchOptions::default())
        .unwrap_err();
    assert_matches!(
        err,
        RcsbError::Status { status: 400, ref message, ref url }
            if message == "bad request" && url.contains("search.rcsb.org")
    );
}

#[test]
fn perform_search_raw_returns_the_whole_body() {
    let payload = json!({
        "query_id": "q1",
        "total_count": 1,
        "result_set": [{"identifier": "4HHB", "score": 1.0}]
    });
    let rcsb = client(MockTransport::new().respond_json(payload.clone()));
    let options = SearchOptions {
        return_raw: true,
        ..SearchOptions::default()
    };
    let outcome = rcsb
        .perform_search(SearchOperator::exists("rcsb_primary_citation.title"), &options)
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Raw(payload));

    let body = rcsb.transport().requests()[0].body().cloned().unwrap();
    assert_eq!(body["query"]["service"], "text");
    assert_eq!(
        body["query"]["parameters"],
        json!({"attribute": "rcsb_primary_citation.title", "operator": "exists"})
    );
}

#[test]
fn sequence_search_posts_sequence_service() {
    let rcsb = client(MockTransport::new().respond_json(json!({"result_set": [{"identifier": "4HHB_1"}]})));
    let operator = SearchOperator::sequence("VLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSF").unwrap();
    rcsb.perform_search(operator, &SearchOptions::default()).unwrap();

    let body = rcsb.transport().requests()[0].body().cloned().unwrap();
    assert_eq!(body["query"]["service"], "sequence");
    assert_eq!(body["query"]["parameters"]["target"], "pdb_protein_sequence");
    assert_eq!(body["query"]["parameters"]["evalue_cutoff"], 100.0);
    assert_eq!(body["query"]["parameters"]["identity_cutoff"], 0.95);
}

#[test]
fn contains_phrase_search_uses_text_service() {
    let rcsb = client(MockTransport::new().respond_json(json!({"result_set": [{"identifier": "4HHB"}]})));
    let operator = SearchOperator::contains_phrase("struct.title", "deoxy hemoglobin");
    rcsb.perform_search(operator, &SearchOptions::default()).unwrap();

    let body = rcsb.transport().requests()[0].body().cloned().unwrap();
    assert_eq!(body["query"]["service"], "text");
    assert_eq!(body["query"]["parameters"]["operator"], "contains_phrase");
}

#[test]
fn unknown_experimental_method_is_rejected_before_sending() {
    let rcsb = client(MockTransport::new());
    assert_matches!(
        rcsb.query_search("crystal gazing", QueryType::ExpType, &QuerySearchOptions::default()),
        Err(RcsbError::InvalidInput(_))
    );
    assert!(rcsb.transport().requests().is_empty());
}
