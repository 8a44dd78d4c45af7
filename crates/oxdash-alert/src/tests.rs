use crate::decorate::{decorate, DashboardResolver};
use crate::error::AlertError;
use crate::service::{AlertService, AlertServiceOptions};
use chrono::Utc;
use oxdash_common::types::{
    AlertRule, AlertState, Dashboard, DashboardId, NewAlertRule, OrgId, UpdateAlertStateCommand,
};
use oxdash_storage::AlertStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Resolver returning a fixed set of dashboards and recording every call.
#[derive(Default)]
struct FakeResolver {
    dashboards: Vec<Dashboard>,
    calls: Mutex<Vec<Vec<DashboardId>>>,
}

impl FakeResolver {
    fn with(dashboards: &[(DashboardId, &str)]) -> Self {
        Self {
            dashboards: dashboards
                .iter()
                .map(|(id, slug)| Dashboard {
                    id: *id,
                    org_id: None,
                    slug: slug.to_string(),
                    title: String::new(),
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<DashboardId>> {
        self.calls.lock().unwrap().clone()
    }
}

impl DashboardResolver for FakeResolver {
    fn resolve(&self, ids: &[DashboardId]) -> anyhow::Result<Vec<Dashboard>> {
        self.calls.lock().unwrap().push(ids.to_vec());
        Ok(self
            .dashboards
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect())
    }
}

struct FailingResolver;

impl DashboardResolver for FailingResolver {
    fn resolve(&self, _ids: &[DashboardId]) -> anyhow::Result<Vec<Dashboard>> {
        anyhow::bail!("dashboard backend unavailable")
    }
}

struct Fixture {
    _dir: TempDir,
    store: Arc<AlertStore>,
    service: Arc<AlertService>,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(AlertStore::new(dir.path()).unwrap());
    let service = Arc::new(AlertService::new(store.clone(), store.clone()));
    Fixture {
        _dir: dir,
        store,
        service,
    }
}

fn new_alert(org: Option<i64>, dashboard_id: i64) -> NewAlertRule {
    NewAlertRule {
        org_id: org.map(OrgId),
        dashboard_id,
        panel_id: 1,
        query: "max(disk.used_percent)".to_string(),
        query_ref_id: "B".to_string(),
        query_range: 600,
        aggregator: "max".to_string(),
        warn_level: 85.0,
        crit_level: 95.0,
        interval: 30,
        title: "disk usage".to_string(),
        description: "root volume".to_string(),
        state: AlertState::Ok,
    }
}

fn rule(id: i64, dashboard_id: i64) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id,
        org_id: Some(OrgId(1)),
        dashboard_id,
        panel_id: 1,
        query: String::new(),
        query_ref_id: String::new(),
        query_range: 0,
        aggregator: String::new(),
        warn_level: 0.0,
        crit_level: 0.0,
        interval: 60,
        title: format!("alert {id}"),
        description: String::new(),
        state: AlertState::Ok,
        created_at: now,
        updated_at: now,
    }
}

fn cmd(alert_id: i64, new_state: AlertState) -> UpdateAlertStateCommand {
    UpdateAlertStateCommand {
        alert_id,
        new_state,
        info: None,
    }
}

// ---- Access guard ----

#[tokio::test]
async fn other_org_is_forbidden_everywhere() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    assert!(matches!(
        fx.service.get_alert(OrgId(2), alert.id),
        Err(AlertError::Forbidden(id)) if id == alert.id
    ));
    assert!(matches!(
        fx.service.delete_alert(OrgId(2), alert.id).await,
        Err(AlertError::Forbidden(_))
    ));
    assert!(matches!(
        fx.service
            .set_state(OrgId(2), alert.id, cmd(alert.id, AlertState::Crit))
            .await,
        Err(AlertError::Forbidden(_))
    ));

    // Nothing changed for the owner
    let stored = fx.service.get_alert(OrgId(1), alert.id).unwrap();
    assert_eq!(stored.state, AlertState::Ok);
    assert!(fx.service.get_state_log(alert.id).unwrap().is_empty());
}

#[tokio::test]
async fn owner_org_succeeds_everywhere() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    assert_eq!(fx.service.get_alert(OrgId(1), alert.id).unwrap().id, alert.id);

    let transition = fx
        .service
        .set_state(OrgId(1), alert.id, cmd(alert.id, AlertState::Warn))
        .await
        .unwrap();
    assert_eq!(transition.alert.state, AlertState::Warn);

    assert_eq!(
        fx.service.delete_alert(OrgId(1), alert.id).await.unwrap(),
        alert.id
    );
    assert!(matches!(
        fx.service.get_alert(OrgId(1), alert.id),
        Err(AlertError::NotFound(_))
    ));
}

#[tokio::test]
async fn unowned_alert_accepts_state_updates_from_any_org() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(None, 10)).unwrap();

    let first = fx
        .service
        .set_state(OrgId(5), alert.id, cmd(alert.id, AlertState::NoData))
        .await
        .unwrap();
    let second = fx
        .service
        .set_state(OrgId(9), alert.id, cmd(alert.id, AlertState::Ok))
        .await
        .unwrap();
    assert_eq!(first.log_entry.new_state, AlertState::NoData);
    assert_eq!(second.log_entry.previous_state, AlertState::NoData);

    // Reads and deletes remain strict
    assert!(matches!(
        fx.service.get_alert(OrgId(5), alert.id),
        Err(AlertError::Forbidden(_))
    ));
    assert!(matches!(
        fx.service.delete_alert(OrgId(5), alert.id).await,
        Err(AlertError::Forbidden(_))
    ));
}

#[tokio::test]
async fn unknown_alert_is_not_found() {
    let fx = setup();
    assert!(matches!(
        fx.service.get_alert(OrgId(1), 999),
        Err(AlertError::NotFound(999))
    ));
    assert!(matches!(
        fx.service.delete_alert(OrgId(1), 999).await,
        Err(AlertError::NotFound(999))
    ));
    assert!(matches!(
        fx.service
            .set_state(OrgId(1), 999, cmd(999, AlertState::Crit))
            .await,
        Err(AlertError::NotFound(999))
    ));
}

#[tokio::test]
async fn delete_rejects_non_positive_ids() {
    let fx = setup();
    assert!(matches!(
        fx.service.delete_alert(OrgId(1), 0).await,
        Err(AlertError::BadRequest(_))
    ));
}

// ---- State transitions ----

#[tokio::test]
async fn set_state_returns_updated_alert_and_log_entry() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    let transition = fx
        .service
        .set_state(
            OrgId(1),
            alert.id,
            UpdateAlertStateCommand {
                alert_id: alert.id,
                new_state: AlertState::ExecutionError,
                info: Some("query timed out".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(transition.alert.state, AlertState::ExecutionError);
    assert_eq!(transition.log_entry.previous_state, AlertState::Ok);
    assert_eq!(transition.log_entry.new_state, AlertState::ExecutionError);
    assert_eq!(transition.log_entry.info.as_deref(), Some("query timed out"));

    let stored = fx.store.get_alert_by_id(alert.id).unwrap().unwrap();
    assert_eq!(stored, transition.alert);
    assert_eq!(
        fx.service.get_state_log(alert.id).unwrap(),
        vec![transition.log_entry]
    );
}

#[tokio::test]
async fn same_state_request_is_still_recorded() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    fx.service
        .set_state(OrgId(1), alert.id, cmd(alert.id, AlertState::Ok))
        .await
        .unwrap();
    let log = fx.service.get_state_log(alert.id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].previous_state, AlertState::Ok);
    assert_eq!(log[0].new_state, AlertState::Ok);
}

#[tokio::test]
async fn id_mismatch_is_rejected_before_lookup() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    let err = fx
        .service
        .set_state(OrgId(1), alert.id, cmd(alert.id + 100, AlertState::Crit))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AlertError::AlertIdMismatch { path, payload } if path == alert.id && payload == alert.id + 100
    ));

    // Mismatch wins even when neither id exists
    let err = fx
        .service
        .set_state(OrgId(1), 5, cmd(7, AlertState::Crit))
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::AlertIdMismatch { path: 5, payload: 7 }));

    assert!(fx.service.get_state_log(alert.id).unwrap().is_empty());
    assert!(fx.service.get_state_log(5).unwrap().is_empty());
    assert!(fx.service.get_state_log(7).unwrap().is_empty());
    assert_eq!(
        fx.store.get_alert_by_id(alert.id).unwrap().unwrap().state,
        AlertState::Ok
    );
}

#[tokio::test]
async fn oversized_info_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(AlertStore::new(dir.path()).unwrap());
    let service = AlertService::with_options(
        store.clone(),
        store.clone(),
        AlertServiceOptions {
            max_info_len: 8,
            ..Default::default()
        },
    );
    let alert = store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    let err = service
        .set_state(
            OrgId(1),
            alert.id,
            UpdateAlertStateCommand {
                alert_id: alert.id,
                new_state: AlertState::Crit,
                info: Some("way more than eight characters".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::BadRequest(_)));
    assert!(service.get_state_log(alert.id).unwrap().is_empty());
}

#[tokio::test]
async fn failed_log_append_leaves_state_and_log_untouched() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    let side = rusqlite::Connection::open(fx.store.db_path()).unwrap();
    side.execute_batch(
        "CREATE TRIGGER reject_log BEFORE INSERT ON alert_state_log
         BEGIN SELECT RAISE(ABORT, 'injected log failure'); END;",
    )
    .unwrap();

    let err = fx
        .service
        .set_state(OrgId(1), alert.id, cmd(alert.id, AlertState::Crit))
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::Internal(_)));

    assert_eq!(
        fx.store.get_alert_by_id(alert.id).unwrap().unwrap().state,
        AlertState::Ok
    );
    assert!(fx.service.get_state_log(alert.id).unwrap().is_empty());

    // Once the fault is gone both sides move together
    side.execute_batch("DROP TRIGGER reject_log;").unwrap();
    fx.service
        .set_state(OrgId(1), alert.id, cmd(alert.id, AlertState::Crit))
        .await
        .unwrap();
    assert_eq!(
        fx.store.get_alert_by_id(alert.id).unwrap().unwrap().state,
        AlertState::Crit
    );
    assert_eq!(fx.service.get_state_log(alert.id).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_on_one_alert_form_a_single_chain() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();
    let alert_id = alert.id;
    let requests = 24;

    let mut handles = Vec::new();
    for i in 0..requests {
        let service = fx.service.clone();
        let state = AlertState::ALL[i % AlertState::ALL.len()];
        handles.push(tokio::spawn(async move {
            service
                .set_state(OrgId(1), alert_id, cmd(alert_id, state))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let log = fx.service.get_state_log(alert.id).unwrap();
    assert_eq!(log.len(), requests);
    assert_eq!(log[0].previous_state, AlertState::Ok);
    for pair in log.windows(2) {
        assert_eq!(pair[1].previous_state, pair[0].new_state);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    let last = log.last().unwrap();
    let stored = fx.store.get_alert_by_id(alert.id).unwrap().unwrap();
    assert_eq!(stored.state, last.new_state);
    assert_eq!(fx.service.locks().active_scopes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_alert_does_not_block_other_alerts() {
    let fx = setup();
    let busy = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();
    let free = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();

    let held = fx.service.locks().acquire(busy.id).await;

    let other = tokio::time::timeout(
        Duration::from_secs(2),
        fx.service
            .set_state(OrgId(1), free.id, cmd(free.id, AlertState::Warn)),
    )
    .await;
    assert!(matches!(other, Ok(Ok(_))));

    let blocked = tokio::time::timeout(
        Duration::from_millis(100),
        fx.service
            .set_state(OrgId(1), busy.id, cmd(busy.id, AlertState::Warn)),
    )
    .await;
    assert!(blocked.is_err());
    assert!(fx.service.get_state_log(busy.id).unwrap().is_empty());

    drop(held);
    fx.service
        .set_state(OrgId(1), busy.id, cmd(busy.id, AlertState::Warn))
        .await
        .unwrap();
    assert_eq!(fx.service.get_state_log(busy.id).unwrap().len(), 1);
}

// ---- Listing and decoration ----

#[test]
fn decoration_resolves_uris_with_one_batched_call() {
    let resolver = FakeResolver::with(&[(1, "foo"), (3, "bar")]);
    let alerts = vec![rule(10, 1), rule(11, 2), rule(12, 3), rule(13, 1)];

    let decorated = decorate(alerts, &resolver).unwrap();
    let uris: Vec<(i64, &str)> = decorated
        .iter()
        .map(|d| (d.alert.dashboard_id, d.dashboard_uri.as_str()))
        .collect();
    assert_eq!(
        uris,
        vec![(1, "db/foo"), (2, ""), (3, "db/bar"), (1, "db/foo")]
    );
    assert_eq!(resolver.calls(), vec![vec![1, 2, 3]]);
}

#[test]
fn decoration_uses_first_duplicate_from_resolver() {
    let resolver = FakeResolver::with(&[(4, "first"), (4, "second")]);
    let decorated = decorate(vec![rule(1, 4)], &resolver).unwrap();
    assert_eq!(decorated[0].dashboard_uri, "db/first");
}

#[test]
fn decoration_of_empty_list_skips_resolver() {
    let resolver = FakeResolver::default();
    assert!(decorate(Vec::new(), &resolver).unwrap().is_empty());
    assert!(resolver.calls().is_empty());
}

#[test]
fn resolver_failure_is_internal() {
    let err = decorate(vec![rule(1, 1)], &FailingResolver).unwrap_err();
    assert!(matches!(err, AlertError::Internal(_)));
}

#[test]
fn list_alerts_is_org_scoped_and_decorated() {
    let fx = setup();
    for (id, slug) in [(1, "foo"), (3, "bar")] {
        fx.store
            .upsert_dashboard(&Dashboard {
                id,
                org_id: Some(OrgId(1)),
                slug: slug.to_string(),
                title: String::new(),
            })
            .unwrap();
    }
    for dashboard_id in [1, 2, 3] {
        fx.store
            .insert_alert(&new_alert(Some(1), dashboard_id))
            .unwrap();
    }
    fx.store.insert_alert(&new_alert(Some(2), 1)).unwrap();

    let mut listed = fx.service.list_alerts(OrgId(1)).unwrap();
    listed.sort_by_key(|d| d.alert.dashboard_id);
    let uris: Vec<(i64, &str)> = listed
        .iter()
        .map(|d| (d.alert.dashboard_id, d.dashboard_uri.as_str()))
        .collect();
    assert_eq!(uris, vec![(1, "db/foo"), (2, ""), (3, "db/bar")]);
    assert!(fx.service.list_alerts(OrgId(3)).unwrap().is_empty());
}

#[test]
fn dashboard_and_panel_listings() {
    let fx = setup();
    let a = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();
    let mut other_panel = new_alert(Some(2), 10);
    other_panel.panel_id = 2;
    let b = fx.store.insert_alert(&other_panel).unwrap();

    let ids: Vec<i64> = fx
        .service
        .list_for_dashboard(10)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id]);

    let panel: Vec<i64> = fx
        .service
        .list_for_panel(10, 2)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(panel, vec![b.id]);
}

#[test]
fn state_log_of_untouched_alert_is_empty() {
    let fx = setup();
    let alert = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();
    assert!(fx.service.get_state_log(alert.id).unwrap().is_empty());
}

#[tokio::test]
async fn change_feed_is_org_scoped_and_clamped() {
    let fx = setup();
    let a = fx.store.insert_alert(&new_alert(Some(1), 10)).unwrap();
    fx.store.insert_alert(&new_alert(Some(2), 10)).unwrap();
    fx.service.delete_alert(OrgId(1), a.id).await.unwrap();

    let changes = fx.service.list_changes(OrgId(1), None).unwrap();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.alert_id == a.id));

    assert_eq!(fx.service.list_changes(OrgId(1), Some(0)).unwrap().len(), 1);
}
