//! HTTP client behaviour against a mock Solr server.

use armature_solr::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SolrClient {
    SolrClient::new(SolrConfig::new(format!("{}/solr", server.uri()))).unwrap()
}

fn ok_update() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "responseHeader": { "status": 0, "QTime": 3 }
    }))
}

#[tokio::test]
async fn test_save_posts_json_array_with_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/collection1/update"))
        .and(query_param("commit", "true"))
        .and(query_param("wt", "json"))
        .and(body_json(json!([{
            "id": "1000",
            "name": "product-1000",
            "cat": ["test"],
            "popularity": 10000
        }])))
        .respond_with(ok_update())
        .expect(1)
        .mount(&server)
        .await;

    let repo = ProductRepository::new(Arc::new(client_for(&server)));
    let product = Product::new("1000", "product-1000")
        .with_category("test")
        .with_popularity(10000);

    let saved = repo.save(product.clone()).await.unwrap();
    assert_eq!(saved, product);
}

#[tokio::test]
async fn test_commit_within_policy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/products/update"))
        .and(query_param("commitWithin", "500"))
        .respond_with(ok_update())
        .expect(1)
        .mount(&server)
        .await;

    let config = SolrConfig::new(format!("{}/solr", server.uri()))
        .with_collection("products")
        .with_commit(CommitPolicy::Within(Duration::from_millis(500)));
    let repo = ProductRepository::new(Arc::new(SolrClient::new(config).unwrap()));

    repo.save(Product::new("1", "one")).await.unwrap();
}

#[tokio::test]
async fn test_find_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/get"))
        .and(query_param("id", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doc": {
                "id": "1000",
                "name": "product-1000",
                "cat": ["test"],
                "popularity": 10000,
                "_version_": 1790000000000000000i64
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/get"))
        .and(query_param("id", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "doc": null })))
        .mount(&server)
        .await;

    let repo = ProductRepository::new(Arc::new(client_for(&server)));

    let product = repo.find_one("1000").await.unwrap().unwrap();
    assert_eq!(product.name, "product-1000");
    assert_eq!(product.categories, vec!["test"]);

    assert!(repo.find_one("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_popularity_query_parameters_and_parsing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .and(query_param("q", "popularity:[10000 TO *]"))
        .and(query_param("start", "0"))
        .and(query_param("rows", "10"))
        .and(query_param("wt", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseHeader": { "status": 0, "QTime": 1 },
            "response": {
                "numFound": 1,
                "start": 0,
                "docs": [
                    { "id": "1000", "name": "product-1000", "cat": ["test"], "popularity": 10000 }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ProductRepository::new(Arc::new(client_for(&server)));
    let page = repo
        .find_by_popularity_greater_than_equal(10000, PageRequest::of(0, 10))
        .await
        .unwrap();

    assert_eq!(page.total_elements(), 1);
    assert_eq!(page.content()[0].id, "1000");
}

#[tokio::test]
async fn test_named_query_sends_sort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .and(query_param("q", "(name:solr OR cat:solr)"))
        .and(query_param("sort", "id desc"))
        .and(query_param("rows", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "numFound": 1,
                "start": 0,
                "docs": [
                    { "id": "SOLR1000", "name": "Solr, the Enterprise Search Server", "cat": ["software", "search"], "popularity": 10 }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ProductRepository::new(Arc::new(client_for(&server)));
    let products = repo
        .find_by_name_or_category("solr", Sort::desc("id"))
        .await
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "SOLR1000");
}

#[tokio::test]
async fn test_count_requests_no_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .and(query_param("q", "*:*"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "numFound": 44, "start": 0, "docs": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ProductRepository::new(Arc::new(client_for(&server)));
    assert_eq!(repo.count().await.unwrap(), 44);
}

#[tokio::test]
async fn test_delete_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/collection1/update"))
        .and(body_json(json!({ "delete": ["1000"] })))
        .respond_with(ok_update())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/solr/collection1/update"))
        .and(body_json(json!({ "delete": { "query": "cat:test" } })))
        .respond_with(ok_update())
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let repo = ProductRepository::new(client.clone());

    repo.delete(&Product::new("1000", "product-1000"))
        .await
        .unwrap();
    client
        .delete_by_query("collection1", &Query::raw("cat:test"))
        .await
        .unwrap();
}

#[allow(dead_code)]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Note {
    id: String,
    doc_type: String,
    title: String,
}

impl Document for Note {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn type_query() -> Query {
        Query::term("doc_type", "note")
    }
}

#[tokio::test]
async fn test_typed_delete_groups_raw_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/collection1/update"))
        .and(body_json(json!({
            "delete": { "query": "(doc_type:note AND (title:a OR title:b))" }
        })))
        .respond_with(ok_update())
        .expect(2)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let repo: SolrRepository<Note, _> = SolrRepository::new(client.clone());

    repo.delete_by_query(Query::raw("title:a OR title:b"))
        .await
        .unwrap();
    client
        .delete_matching::<Note>(&Query::raw("title:a OR title:b"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_solr_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "responseHeader": { "status": 400, "QTime": 0 },
            "error": { "msg": "undefined field bogus", "code": 400 }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .query_for_page::<Product>(&SearchQuery::new(Query::raw("bogus:1")))
        .await
        .unwrap_err();

    match err {
        SolrError::Solr { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "undefined field bogus");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "numFound": 0, "start": 0, "docs": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server)
        .with_retry_policy(RetryPolicy::exponential(3).with_backoff(BackoffStrategy::None));
    let page = client
        .query_for_page::<Product>(&SearchQuery::match_all())
        .await
        .unwrap();

    assert!(page.is_empty());
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .query_for_page::<Product>(&SearchQuery::match_all())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/admin/ping"))
        .and(header("authorization", "Basic YWRtaW46czNjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        SolrConfig::new(format!("{}/solr", server.uri())).with_basic_auth("admin", "s3cret");
    let client = SolrClient::new(config).unwrap();

    assert!(client.ping("collection1").await.unwrap());
}

#[tokio::test]
async fn test_ping_failure_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/admin/ping"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!client_for(&server).ping("collection1").await.unwrap());
}

#[tokio::test]
async fn test_explicit_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/collection1/update"))
        .and(body_json(json!({ "commit": {} })))
        .respond_with(ok_update())
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).commit("collection1").await.unwrap();
}
