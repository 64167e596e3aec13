// Remote-applier tests against a mock controller.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doorsync_api::{AccessClient, AccessConfig, TransportConfig};
use doorsync_core::apply::apply_remote;
use doorsync_core::builder::SchedulePlan;
use doorsync_core::store::mapping::Mapping;
use doorsync_core::timewin::Interval;
use doorsync_core::SyncError;

const EASTERN: Tz = chrono_tz::America::New_York;

// ── Helpers ─────────────────────────────────────────────────────────

fn client(server: &MockServer) -> AccessClient {
    AccessClient::new(AccessConfig {
        base_url: server.uri(),
        api_token: None,
        api_key_header: "X-API-Key".into(),
        transport: TransportConfig::default(),
    })
    .unwrap()
}

fn mapping() -> Mapping {
    serde_json::from_value(json!({
        "doors": {
            "front_lobby": { "label": "Front Lobby", "unifiDoorIds": ["d-1"] },
            "gym_front": { "label": "Gym Front", "unifiDoorIds": ["d-4"] },
        },
        "rooms": { "Sanctuary": ["front_lobby"], "Gym": ["gym_front"] },
    }))
    .unwrap()
}

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// Sunday 09:00-11:00 Eastern on both doors.
fn plan() -> SchedulePlan {
    let mut plan = SchedulePlan::default();
    let window = Interval::new(utc("2026-03-01T14:00:00Z"), utc("2026-03-01T16:00:00Z"));
    plan.door_windows.insert("front_lobby".into(), vec![window]);
    plan.door_windows.insert("gym_front".into(), vec![window]);
    plan
}

fn sunday_weekly() -> serde_json::Value {
    json!({ "sunday": [ { "start_time": "09:00:00", "end_time": "11:00:00" } ] })
}

async fn mount_schedule_list(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies/schedules"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": rows })),
        )
        .mount(server)
        .await;
}

async fn mount_policy_list(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/developer/access_policies"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": rows })),
        )
        .mount(server)
        .await;
}

async fn mount_schedule_detail(server: &MockServer, id: &str, weekly: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/developer/access_policies/schedules/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "data": {
                "id": id,
                "name": "PCO Sync front_lobby",
                "weekly": weekly,
                "holiday_group_id": "hg1",
                "holiday_schedule": []
            }
        })))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_schedule_is_per_door_fatal_but_others_continue() {
    let server = MockServer::start().await;

    // Only front_lobby has its pre-created schedule; gym_front's is absent.
    mount_schedule_list(
        &server,
        json!([ { "id": "s1", "name": "PCO Sync front_lobby" } ]),
    )
    .await;
    mount_policy_list(&server, json!([])).await;
    mount_schedule_detail(&server, "s1", json!({})).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/developer/access_policies/schedules/s1"))
        .and(body_partial_json(json!({ "week_schedule": sunday_weekly() })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/developer/access_policies"))
        .and(body_partial_json(json!({
            "name": "PCO Sync Policy front_lobby",
            "schedule_id": "s1",
            "resource": [ { "id": "d-1", "type": "door" } ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "data": { "id": "p1", "name": "PCO Sync Policy front_lobby" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = apply_remote(&client(&server), &plan(), &mapping(), EASTERN)
        .await
        .unwrap();

    assert_eq!(report.schedules_updated, ["front_lobby"]);
    assert_eq!(report.policies_replaced, ["front_lobby"]);
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        SyncError::RemoteScheduleMissing { door_key, schedule } => {
            assert_eq!(door_key, "gym_front");
            assert_eq!(schedule, "PCO Sync gym_front");
        }
        other => panic!("expected missing-schedule error, got {other:?}"),
    }
}

#[tokio::test]
async fn identical_weekly_and_policy_issue_no_writes() {
    let server = MockServer::start().await;

    mount_schedule_list(
        &server,
        json!([
            { "id": "s1", "name": "PCO Sync front_lobby" },
            { "id": "s2", "name": "PCO Sync gym_front" },
        ]),
    )
    .await;
    mount_policy_list(
        &server,
        json!([
            {
                "id": "p1", "name": "PCO Sync Policy front_lobby",
                "schedule_id": "s1", "resources": [ { "id": "d-1", "type": "door" } ]
            },
            {
                "id": "p2", "name": "PCO Sync Policy gym_front",
                "schedule_id": "s2", "resources": [ { "id": "d-4", "type": "door" } ]
            },
        ]),
    )
    .await;
    mount_schedule_detail(&server, "s1", sunday_weekly()).await;
    mount_schedule_detail(&server, "s2", sunday_weekly()).await;

    // No PUT/POST/DELETE mocks are mounted: a write would 404 and surface
    // as a per-door error.
    let report = apply_remote(&client(&server), &plan(), &mapping(), EASTERN)
        .await
        .unwrap();

    assert!(report.errors.is_empty());
    assert!(report.schedules_updated.is_empty());
    assert!(report.policies_replaced.is_empty());
}

#[tokio::test]
async fn drifted_policy_resources_are_recreated() {
    let server = MockServer::start().await;

    mount_schedule_list(&server, json!([ { "id": "s1", "name": "PCO Sync front_lobby" } ])).await;
    mount_policy_list(
        &server,
        json!([
            {
                "id": "p1", "name": "PCO Sync Policy front_lobby",
                "schedule_id": "s1", "resources": [ { "id": "d-stale", "type": "door" } ]
            },
        ]),
    )
    .await;
    mount_schedule_detail(&server, "s1", sunday_weekly()).await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/developer/access_policies/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/developer/access_policies"))
        .and(body_partial_json(json!({
            "resource": [ { "id": "d-1", "type": "door" } ],
            "schedule_id": "s1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "data": { "id": "p9", "name": "PCO Sync Policy front_lobby" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mapping: Mapping = serde_json::from_value(json!({
        "doors": { "front_lobby": { "label": "Front Lobby", "unifiDoorIds": ["d-1"] } },
        "rooms": { "Sanctuary": ["front_lobby"] },
    }))
    .unwrap();
    let mut plan = plan();
    plan.door_windows.remove("gym_front");

    let report = apply_remote(&client(&server), &plan, &mapping, EASTERN)
        .await
        .unwrap();

    assert!(report.errors.is_empty());
    assert!(report.schedules_updated.is_empty());
    assert_eq!(report.policies_replaced, ["front_lobby"]);
}

#[tokio::test]
async fn empty_plan_clears_a_stale_remote_week() {
    let server = MockServer::start().await;

    mount_schedule_list(&server, json!([ { "id": "s1", "name": "PCO Sync front_lobby" } ])).await;
    mount_policy_list(
        &server,
        json!([
            {
                "id": "p1", "name": "PCO Sync Policy front_lobby",
                "schedule_id": "s1", "resources": [ { "id": "d-1", "type": "door" } ]
            },
        ]),
    )
    .await;
    // Remote still carries last week's hours; desired is now empty.
    mount_schedule_detail(&server, "s1", sunday_weekly()).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/developer/access_policies/schedules/s1"))
        .and(body_partial_json(json!({ "week_schedule": { "sunday": [] } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "SUCCESS", "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mapping: Mapping = serde_json::from_value(json!({
        "doors": { "front_lobby": { "label": "Front Lobby", "unifiDoorIds": ["d-1"] } },
        "rooms": { "Sanctuary": ["front_lobby"] },
    }))
    .unwrap();

    let report = apply_remote(&client(&server), &SchedulePlan::default(), &mapping, EASTERN)
        .await
        .unwrap();

    assert_eq!(report.schedules_updated, ["front_lobby"]);
    assert!(report.policies_replaced.is_empty());
    assert!(report.errors.is_empty());
}
