//! Integration tests for request execution: pagination, read planning,
//! balancer failover, schema caching and the wire format of table and item
//! operations. All traffic goes to the scripted transports in `common`.

use serde_json::json;
use storage_link::{
    AttributeValue, Attributes, KeyDataType, ProvisionLoad, ProvisionType, StorageLinkError,
    TableKey, Throughput,
};

mod common;

use common::{items_page, message, users_schema, messages_schema, MockPubSub, Reply, ScriptedHttp};

fn user(id: usize) -> serde_json::Value {
    json!({"id": format!("u{:02}", id), "name": format!("user {}", id)})
}

// ── pagination ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_collects_every_page() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(users_schema()));
    http.reply(
        "listItems",
        Reply::Data(items_page((0..10).map(user).collect(), Some(json!({"id": "u09"})))),
    );
    http.reply(
        "listItems",
        Reply::Data(items_page((10..20).map(user).collect(), Some(json!({"id": "u19"})))),
    );
    http.reply("listItems", Reply::Data(items_page((20..25).map(user).collect(), None)));

    let client = common::direct_client(&http, &pubsub);
    let items = client.table("users").get_items().await.unwrap();

    assert_eq!(items.len(), 25);
    assert_eq!(items[24].get("id"), Some(&AttributeValue::from("u24")));
    assert_eq!(items[0].primary(), Some(&AttributeValue::from("u00")));

    let pages = http.calls_to("listItems");
    assert_eq!(pages.len(), 3);
    assert!(pages[0].body.get("startKey").is_none());
    assert_eq!(pages[1].body["startKey"], json!({"id": "u09"}));
    assert_eq!(pages[2].body["startKey"], json!({"id": "u19"}));
    for page in &pages {
        assert_eq!(page.body["applicationKey"], "app-key");
        assert_eq!(page.body["authenticationToken"], "token");
        assert_eq!(page.body["table"], "users");
        assert_eq!(page.url, format!("{}/listItems", common::STORAGE_URL));
    }
}

#[tokio::test]
async fn test_keyed_query_stops_at_limit() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(messages_schema()));
    http.reply(
        "queryItems",
        Reply::Data(items_page(
            (0..10).map(|ts| message("lobby", ts)).collect(),
            Some(json!({"chat": "lobby", "ts": 9})),
        )),
    );
    http.reply(
        "queryItems",
        Reply::Data(items_page(
            (10..20).map(|ts| message("lobby", ts)).collect(),
            Some(json!({"chat": "lobby", "ts": 19})),
        )),
    );

    let client = common::direct_client(&http, &pubsub);
    let items = client
        .table("messages")
        .equals("chat", "lobby")
        .limit(15)
        .get_items()
        .await
        .unwrap();

    assert_eq!(items.len(), 15);
    let calls = http.calls_to("queryItems");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].body["key"], json!({"primary": "lobby"}));
    assert_eq!(calls[0].body["limit"], 15);
    assert!(calls[0].body.get("filter").is_none());
}

#[tokio::test]
async fn test_keyed_query_without_limit_reads_to_the_end() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(messages_schema()));
    http.reply(
        "queryItems",
        Reply::Data(items_page(vec![message("lobby", 1)], Some(json!({"ts": 1})))),
    );
    http.reply("queryItems", Reply::Data(items_page(vec![message("lobby", 2)], None)));

    let client = common::direct_client(&http, &pubsub);
    let items = client
        .table("messages")
        .equals("chat", "lobby")
        .greater_than("ts", 0)
        .get_items()
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    let calls = http.calls_to("queryItems");
    assert_eq!(
        calls[0].body["filter"],
        json!({"operator": "greaterThan", "item": "ts", "value": 0})
    );
    assert!(calls[0].body.get("limit").is_none());
}

#[tokio::test]
async fn test_list_tables_follows_stop_table() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("listTables", Reply::Data(json!({"tables": ["a", "b"], "stopTable": "b"})));
    http.reply("listTables", Reply::Data(json!({"tables": ["c"], "stopTable": ""})));

    let client = common::direct_client(&http, &pubsub);
    let tables = client.list_tables().await.unwrap();

    assert_eq!(tables, vec!["a", "b", "c"]);
    let calls = http.calls_to("listTables");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].body["startTable"], "b");
}

// ── read planning ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_primary_equality_fetches_single_item() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(users_schema()));
    http.reply("getItem", Reply::Data(json!({"id": "7", "name": "seven"})));
    http.reply("getItem", Reply::Data(json!(null)));

    let client = common::direct_client(&http, &pubsub);
    let users = client.table("users").equals("id", 7);

    let found = users.get_items().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&AttributeValue::from("seven")));

    let missing = users.get_items().await.unwrap();
    assert!(missing.is_empty());

    let calls = http.calls_to("getItem");
    assert_eq!(calls[0].body["key"], json!({"primary": "7"}));
}

#[tokio::test]
async fn test_scan_operator_lists_with_filter_array() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(messages_schema()));
    http.reply(
        "listItems",
        Reply::Data(items_page(
            vec![message("b", 3), message("a", 9), message("a", 1)],
            None,
        )),
    );

    let client = common::direct_client(&http, &pubsub);
    let items = client
        .table("messages")
        .equals("chat", "a")
        .contains("text", "message")
        .desc()
        .limit(2)
        .get_items()
        .await
        .unwrap();

    let ts: Vec<_> = items.iter().filter_map(|i| i.get("ts").cloned()).collect();
    assert_eq!(ts, vec![AttributeValue::from(9), AttributeValue::from(3)]);

    let filter = &http.calls_to("listItems")[0].body["filter"];
    assert_eq!(filter.as_array().map(Vec::len), Some(2));
    assert_eq!(filter[1]["operator"], "contains");
}

// ── schema cache ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_schema_is_fetched_once() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(users_schema()));
    http.always("listItems", Reply::Data(items_page(vec![user(1)], None)));

    let client = common::direct_client(&http, &pubsub);
    client.table("users").get_items().await.unwrap();
    client.table("users").not_null("name").get_items().await.unwrap();
    assert_eq!(http.calls_to("describeTable").len(), 1);

    assert!(client.invalidate_schema("users"));
    client.table("users").get_items().await.unwrap();
    assert_eq!(http.calls_to("describeTable").len(), 2);
}

#[tokio::test]
async fn test_meta_primes_schema_cache() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("describeTable", Reply::Data(messages_schema()));
    http.always("queryItems", Reply::Data(items_page(vec![], None)));

    let client = common::direct_client(&http, &pubsub);
    let schema = client.table("messages").meta().await.unwrap();
    assert_eq!(schema.sort_key_name(), "ts");

    client
        .table("messages")
        .equals("chat", "x")
        .get_items()
        .await
        .unwrap();
    assert_eq!(http.routes(), vec!["describeTable", "queryItems"]);
}

// ── errors ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_and_decode_errors() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("listTables", Reply::Error(1401, "Invalid application key".into()));
    http.reply("listTables", Reply::Raw("<html>".into()));

    let client = common::direct_client(&http, &pubsub);
    match client.list_tables().await {
        Err(StorageLinkError::ServerError { code, message }) => {
            assert_eq!(code, 1401);
            assert_eq!(message, "Invalid application key");
        }
        other => panic!("expected server error, got {:?}", other),
    }
    assert_eq!(client.list_tables().await.unwrap_err().code(), 1006);
    assert_eq!(http.calls_to("listTables").len(), 2);
}

#[tokio::test]
async fn test_is_authenticated_checks_given_token() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("isAuthenticated", Reply::Data(json!(false)));

    let client = common::direct_client(&http, &pubsub);
    assert!(!client.is_authenticated("other-token").await.unwrap());
    assert_eq!(
        http.calls_to("isAuthenticated")[0].body["authenticationToken"],
        "other-token"
    );
}

// ── balancer ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failover_on_cached_endpoint() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("balancer", Reply::Data(json!(null)));
    http.reply("balancer", Reply::Raw(json!({"url": "http://node1.test"}).to_string()));
    http.reply("balancer", Reply::Raw(json!({"url": "http://node2.test/"}).to_string()));
    http.reply("listTables", Reply::Data(json!({"tables": ["a"]})));
    http.reply("listTables", Reply::Fail("connection reset".into()));
    http.reply("listTables", Reply::Data(json!({"tables": ["b"]})));

    let client = common::balanced_client(&http, &pubsub);

    // First answer carries no url.
    let err = client.list_tables().await.unwrap_err();
    assert_eq!(err.code(), 1002);
    assert_eq!(client.resolved_url(), None);

    assert_eq!(client.list_tables().await.unwrap(), vec!["a"]);
    assert_eq!(client.resolved_url().as_deref(), Some("http://node1.test"));

    assert_eq!(client.list_tables().await.unwrap(), vec!["b"]);
    assert_eq!(client.resolved_url().as_deref(), Some("http://node2.test/"));

    let urls: Vec<_> = http.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}?appkey=app-key", common::BALANCER_URL),
            format!("{}?appkey=app-key", common::BALANCER_URL),
            "http://node1.test/listTables".to_string(),
            "http://node1.test/listTables".to_string(),
            format!("{}?appkey=app-key", common::BALANCER_URL),
            "http://node2.test/listTables".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_no_failover_on_fresh_endpoint() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("balancer", Reply::Raw(json!({"url": "http://node1.test"}).to_string()));
    http.reply("listTables", Reply::Fail("connection refused".into()));

    let client = common::balanced_client(&http, &pubsub);
    let err = client.list_tables().await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(http.routes(), vec!["balancer", "listTables"]);
}

#[tokio::test]
async fn test_failover_retries_only_once() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.reply("balancer", Reply::Raw(json!({"url": "http://node1.test"}).to_string()));
    http.reply("balancer", Reply::Raw(json!({"url": "http://node2.test"}).to_string()));
    http.reply("listTables", Reply::Data(json!({"tables": ["a"]})));
    http.reply("listTables", Reply::Fail("connection reset".into()));
    http.reply("listTables", Reply::Fail("connection refused".into()));

    let client = common::balanced_client(&http, &pubsub);
    client.list_tables().await.unwrap();

    let err = client.list_tables().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.code(), 1005);
    assert_eq!(
        http.routes(),
        vec!["balancer", "listTables", "listTables", "balancer", "listTables"]
    );
    assert_eq!(http.calls_to("listTables")[2].url, "http://node2.test/listTables");
}

#[tokio::test]
async fn test_unreachable_balancer() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    let client = common::balanced_client(&http, &pubsub);

    let err = client.list_tables().await.unwrap_err();
    assert!(matches!(err, StorageLinkError::ResolutionError(_)));
    assert!(http.calls_to("listTables").is_empty());
}

// ── table and item operations ────────────────────────────────────────────────

#[tokio::test]
async fn test_table_management_wire_format() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always(
        "createTable",
        Reply::Data(json!({"table": "messages", "creationDate": 1700000000, "status": "creating"})),
    );
    http.reply("deleteTable", Reply::Data(json!(true)));

    let client = common::direct_client(&http, &pubsub);
    let messages = client.table("messages");
    let key = TableKey::primary("chat", KeyDataType::String).with_secondary("ts", KeyDataType::Number);

    let created = messages
        .create(key.clone(), ProvisionLoad::Balanced, ProvisionType::Light)
        .await
        .unwrap();
    assert_eq!(created.status.as_deref(), Some("creating"));

    messages
        .create_with_throughput(key, Throughput::new(5, 2))
        .await
        .unwrap();
    assert!(messages.delete().await.unwrap());

    let creates = http.calls_to("createTable");
    assert_eq!(creates[0].body["provisionLoad"], 3);
    assert_eq!(creates[0].body["provisionType"], 1);
    assert_eq!(creates[0].body["key"]["secondary"]["dataType"], "number");
    assert!(creates[1].body.get("provisionLoad").is_none());
    assert_eq!(creates[1].body["provisionType"], 5);
    assert_eq!(creates[1].body["throughput"], json!({"read": 5, "write": 2}));
    assert_eq!(http.calls_to("deleteTable")[0].body["table"], "messages");
}

#[tokio::test]
async fn test_update_rejects_radical_change() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(messages_schema()));
    http.reply("updateTable", Reply::Data(json!({"table": "messages", "status": "updating"})));

    let client = common::direct_client(&http, &pubsub);
    let messages = client.table("messages");

    let err = messages
        .update(ProvisionLoad::Write, ProvisionType::Medium)
        .await
        .unwrap_err();
    assert_eq!(err.code(), 1001);
    assert!(http.calls_to("updateTable").is_empty());

    let updated = messages
        .update(ProvisionLoad::Balanced, ProvisionType::Medium)
        .await
        .unwrap();
    assert_eq!(updated.status.as_deref(), Some("updating"));
    assert_eq!(http.calls_to("updateTable")[0].body["provisionType"], 2);
}

#[tokio::test]
async fn test_item_operations_wire_format() {
    let http = ScriptedHttp::new();
    let pubsub = MockPubSub::new();
    http.always("describeTable", Reply::Data(messages_schema()));
    http.always("updateItem", Reply::Data(message("lobby", 5)));
    http.always("incr", Reply::Data(json!({"chat": "lobby", "ts": 5, "likes": 3})));
    http.always("decr", Reply::Data(json!({"chat": "lobby", "ts": 5, "likes": 2})));
    http.always("putItem", Reply::Data(message("lobby", 6)));

    let client = common::direct_client(&http, &pubsub);
    let messages = client.table("messages");
    let item = messages.item("lobby", Some(AttributeValue::from(5)));

    let mut attributes = Attributes::new();
    attributes.insert("chat".into(), "lobby".into());
    attributes.insert("ts".into(), AttributeValue::from(5));
    attributes.insert("text".into(), "edited".into());

    let updated = item.set(&attributes).await.unwrap();
    assert_eq!(updated.secondary(), Some(&AttributeValue::from(5)));

    let liked = item.incr("likes", Some(2)).await.unwrap();
    assert_eq!(liked.get("likes"), Some(&AttributeValue::from(3)));
    item.decr("likes", None).await.unwrap();

    let pushed = messages.push(&attributes).await.unwrap();
    assert_eq!(pushed.primary(), Some(&AttributeValue::from("lobby")));

    let update = &http.calls_to("updateItem")[0].body;
    assert_eq!(update["key"], json!({"primary": "lobby", "secondary": 5}));
    assert_eq!(update["item"], json!({"text": "edited"}));

    let incr = &http.calls_to("incr")[0].body;
    assert_eq!(incr["property"], "likes");
    assert_eq!(incr["value"], 2);
    assert!(http.calls_to("decr")[0].body.get("value").is_none());

    assert_eq!(
        http.calls_to("putItem")[0].body["item"],
        json!({"chat": "lobby", "text": "edited", "ts": 5})
    );
}
