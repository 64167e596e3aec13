// Integration tests for `AccessClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doorsync_api::access::{PolicyCreate, PolicyResource, ScheduleUpdate, TimeRange, WeekSchedule};
use doorsync_api::{AccessClient, AccessConfig, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> AccessConfig {
    AccessConfig {
        base_url: server.uri(),
        api_token: Some(SecretString::from("token-123".to_string())),
        api_key_header: "X-API-Key".into(),
        transport: TransportConfig::default(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn lists_schedules_with_api_key_header() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    let body = json!({
        "code": "SUCCESS",
        "msg": "success",
        "data": [
            { "id": "s1", "name": "PCO Sync front_lobby", "is_default": false },
            { "id": "s2", "name": "Default Schedule", "is_default": true, "holiday_group_id": "hg1" },
        ]
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules"))
        .and(header("X-API-Key", "token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let schedules = client.list_schedules().await.unwrap();
    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0].name, "PCO Sync front_lobby");
    assert!(schedules[1].is_default);
    assert_eq!(schedules[1].holiday_group_id.as_deref(), Some("hg1"));
}

#[tokio::test]
async fn bearer_prefix_added_for_authorization_header() {
    let server = MockServer::start().await;
    let client = AccessClient::new(AccessConfig {
        api_key_header: "Authorization".into(),
        ..config(&server)
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules"))
        .and(header("Authorization", "Bearer token-123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_schedules().await.unwrap().is_empty());
}

#[tokio::test]
async fn schedule_detail_parses_weekly() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    let body = json!({
        "code": "SUCCESS",
        "data": {
            "id": "s1",
            "name": "PCO Sync front_lobby",
            "weekly": {
                "sunday": [ { "start_time": "09:00:00", "end_time": "11:00:00" } ],
                "monday": [],
            },
            "holiday_group_id": "hg1",
            "holiday_schedule": []
        }
    });
    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let detail = client.get_schedule("s1").await.unwrap();
    assert_eq!(
        detail.weekly.sunday,
        vec![TimeRange {
            start_time: "09:00:00".into(),
            end_time: "11:00:00".into(),
        }]
    );
    assert!(detail.weekly.saturday.is_empty());
}

#[tokio::test]
async fn update_schedule_sends_week_schedule_field() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    Mock::given(method("PUT"))
        .and(path("/api/v1/developer/access_policies/schedules/s1"))
        .and(body_partial_json(json!({
            "name": "PCO Sync front_lobby",
            "week_schedule": {
                "sunday": [ { "start_time": "09:00:00", "end_time": "11:00:00" } ],
            },
            "holiday_group_id": "hg1",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let update = ScheduleUpdate {
        name: "PCO Sync front_lobby".into(),
        week_schedule: WeekSchedule {
            sunday: vec![TimeRange {
                start_time: "09:00:00".into(),
                end_time: "11:00:00".into(),
            }],
            ..WeekSchedule::default()
        },
        holiday_group_id: "hg1".into(),
        holiday_schedule: json!([]),
    };
    client.update_schedule("s1", &update).await.unwrap();
}

#[tokio::test]
async fn policy_create_and_delete() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/developer/access_policies"))
        .and(body_partial_json(json!({
            "name": "PCO Sync Policy front_lobby",
            "schedule_id": "s1",
            "resource": [ { "id": "d-1", "type": "door" } ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "data": {
                "id": "p1",
                "name": "PCO Sync Policy front_lobby",
                "schedule_id": "s1",
                "resources": [ { "id": "d-1", "type": "door" } ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/developer/access_policies/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_policy(&PolicyCreate {
            name: "PCO Sync Policy front_lobby".into(),
            resource: vec![PolicyResource::door("d-1")],
            schedule_id: "s1".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "p1");
    assert_eq!(created.resources, vec![PolicyResource::door("d-1")]);

    client.delete_policy("p1").await.unwrap();
}

#[tokio::test]
async fn non_success_code_is_an_error() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    let body = json!({ "code": "CODE_PARAMS_INVALID", "msg": "bad params", "data": null });
    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let err = client.list_schedules().await.unwrap_err();
    match err {
        Error::Controller { code, message } => {
            assert_eq!(code, "CODE_PARAMS_INVALID");
            assert_eq!(message, "bad params");
        }
        other => panic!("expected controller error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_carries_status() {
    let server = MockServer::start().await;
    let client = AccessClient::new(config(&server)).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client.list_schedules().await.unwrap_err();
    match err {
        Error::Api { status, .. } => assert_eq!(status, 502),
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn week_schedule_normalization_ignores_order() {
    let a = WeekSchedule {
        monday: vec![
            TimeRange { start_time: "18:00:00".into(), end_time: "20:00:00".into() },
            TimeRange { start_time: "09:00:00".into(), end_time: "11:00:00".into() },
        ],
        ..WeekSchedule::default()
    };
    let b = WeekSchedule {
        monday: vec![
            TimeRange { start_time: "09:00:00".into(), end_time: "11:00:00".into() },
            TimeRange { start_time: "18:00:00".into(), end_time: "20:00:00".into() },
        ],
        ..WeekSchedule::default()
    };
    assert_ne!(a, b);
    assert_eq!(a.normalized(), b.normalized());
}
