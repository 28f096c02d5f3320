use chrono::{Duration, Utc};
use lreg_database::*;
use lreg_derive::versioned_model;
use lreg_domain::versioned::{Revision, Versioned};
use surrealdb::types::SurrealValue;

#[versioned_model]
#[derive(Debug, Clone, PartialEq)]
pub struct Nettstad {
    #[versioned(lineage)]
    pub id: i64,
    pub namn: String,
    pub sider: i64,
    pub merknad: Option<String>,
}

#[derive(Debug, SurrealValue)]
pub struct NettstadRad {
    rad_id: i64,
    original: i64,
    tidspunkt: i64,
    aktiv: Option<bool>,
    namn: Option<String>,
    sider: Option<i64>,
    merknad: Option<String>,
    nullstilt: Option<Vec<String>>,
}

#[derive(Debug)]
struct NettstadTable;

impl VersionedTable for NettstadTable {
    type Model = Nettstad;
    type Row = NettstadRad;

    const NAME: &'static str = "nettstad";
    const COLUMNS: &'static str = "namn, sider, merknad, nullstilt";

    fn to_row(revision: Revision<NettstadDiff>) -> NettstadRad {
        let mut nullstilt = Nullstilt::default();
        let merknad = nullstilt.store("merknad", revision.felt.merknad);
        NettstadRad {
            rad_id: revision.id,
            original: revision.original,
            tidspunkt: to_micros(revision.tidspunkt),
            aktiv: revision.aktiv,
            namn: revision.felt.namn,
            sider: revision.felt.sider,
            merknad,
            nullstilt: nullstilt.into_column(),
        }
    }

    fn from_row(row: NettstadRad) -> Result<Revision<NettstadDiff>, DatabaseError> {
        Ok(Revision {
            id: row.rad_id,
            original: row.original,
            tidspunkt: from_micros(row.tidspunkt)?,
            aktiv: row.aktiv,
            felt: NettstadDiff {
                namn: row.namn,
                sider: row.sider,
                merknad: Nullstilt::from_column(row.nullstilt).load("merknad", row.merknad),
            },
        })
    }
}

const MIGRATIONS: &[Migration] =
    &[Migration::new("nettstad", "0001", versioned_table_script!("nettstad"))];

async fn database() -> Database {
    Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .migrations(MIGRATIONS.iter().copied())
        .init()
        .await
        .expect("connect to mem://")
}

fn nettstad(namn: &str, sider: i64) -> Nettstad {
    Nettstad { id: 0, namn: namn.to_owned(), sider, merknad: None }
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = database().await;
    db.health().await.expect("health check");
    assert_eq!(db.namespace(), "test_ns");
    assert_eq!(db.migration_report().applied, vec!["nettstad:0001".to_owned()]);
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn create_then_read_back() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let id = store.create_lineage(&nettstad("Forsida", 3)).await.expect("create");

    let found = store.get(id, Utc::now()).await.expect("get").expect("exists");
    assert_eq!(found, Nettstad { id, ..nettstad("Forsida", 3) });

    let revisions = store.revisions(Some(&[id][..]), Utc::now()).await.expect("revisions");
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].id, id);
    assert_eq!(revisions[0].original, id);
    assert_eq!(revisions[0].aktiv, Some(true));
}

#[tokio::test]
async fn ids_are_unique_and_increasing() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let a = store.create_lineage(&nettstad("a", 1)).await.expect("create");
    let b = store.create_lineage(&nettstad("b", 1)).await.expect("create");
    let row = store.append(a, None, NettstadDiff::default()).await.expect("append");
    assert!(a < b && b < row);
}

#[tokio::test]
async fn update_appends_only_changed_fields() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let id = store.create_lineage(&nettstad("a", 1)).await.expect("create");

    let mut desired = store.get(id, Utc::now()).await.expect("get").expect("exists");
    desired.sider = 7;
    store.append_update(&desired).await.expect("update");

    let revisions = store.revisions(Some(&[id][..]), Utc::now()).await.expect("revisions");
    assert_eq!(revisions.len(), 2);
    let update = revisions.iter().find(|r| r.id != id).expect("update row");
    assert_eq!(update.felt, NettstadDiff { sider: Some(7), ..NettstadDiff::default() });
    assert_eq!(update.aktiv, None);

    let current = store.get(id, Utc::now()).await.expect("get").expect("exists");
    assert_eq!(current.sider, 7);
    assert_eq!(current.namn, "a");
}

#[tokio::test]
async fn update_of_missing_lineage_is_not_found() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let err = store.append_update(&Nettstad { id: 404, ..nettstad("x", 1) }).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound { id: 404, .. }));
}

#[tokio::test]
async fn deactivate_hides_and_reactivate_restores() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let id = store.create_lineage(&nettstad("a", 1)).await.expect("create");

    store.append_deactivate(id).await.expect("deactivate");
    assert!(store.get(id, Utc::now()).await.expect("get").is_none());
    assert!(store.get_by_lineage(None, Utc::now()).await.expect("list").is_empty());

    let folded = store.folded(Some(&[id][..]), Utc::now()).await.expect("folded");
    assert_eq!(folded.len(), 1);
    assert!(!folded[0].is_aktiv());

    let carried =
        NettstadDiff { merknad: Some(Some("tilbake".to_owned())), ..NettstadDiff::default() };
    store.append_reactivate(id, carried).await.expect("reactivate");
    let back = store.get(id, Utc::now()).await.expect("get").expect("exists");
    assert_eq!(back.merknad.as_deref(), Some("tilbake"));
    assert_eq!(back.namn, "a");
}

#[tokio::test]
async fn reads_before_first_row_are_empty() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let before = Utc::now() - Duration::seconds(5);
    let id = store.create_lineage(&nettstad("a", 1)).await.expect("create");

    assert!(store.get(id, before).await.expect("get").is_none());
    assert!(store.get_by_lineage(None, before).await.expect("list").is_empty());
}

#[tokio::test]
async fn reads_between_updates_see_earlier_state() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let id = store.create_lineage(&nettstad("første", 1)).await.expect("create");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let between = Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let mut desired = store.get(id, Utc::now()).await.expect("get").expect("exists");
    desired.namn = "andre".to_owned();
    store.append_update(&desired).await.expect("update");

    let old = store.get(id, between).await.expect("get").expect("exists");
    assert_eq!(old.namn, "første");
    let new = store.get(id, Utc::now()).await.expect("get").expect("exists");
    assert_eq!(new.namn, "andre");
}

#[tokio::test]
async fn empty_lineage_filter_returns_nothing() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    store.create_lineage(&nettstad("a", 1)).await.expect("create");
    assert!(store.get_by_lineage(Some(&[] as &[i64]), Utc::now()).await.expect("list").is_empty());
}

#[tokio::test]
async fn lineages_where_is_distinct_and_historical() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let a = store.create_lineage(&nettstad("Kommune", 1)).await.expect("create");
    let b = store.create_lineage(&nettstad("Fylke", 1)).await.expect("create");

    let mut renamed = store.get(a, Utc::now()).await.expect("get").expect("exists");
    renamed.namn = "Kommunen".to_owned();
    store.append_update(&renamed).await.expect("update");

    let hits = store
        .lineages_where(
            "string::contains(string::lowercase(namn ?? ''), $term)",
            [("term", "kommune".to_owned())],
        )
        .await
        .expect("search");
    assert_eq!(hits, vec![a]);

    let all = store.lineages_where("true", []).await.expect("search");
    assert_eq!(all, vec![a, b]);
}

#[tokio::test]
async fn migrations_are_idempotent_and_checksummed() {
    let db = database().await;

    let rerun = db.migrate(MIGRATIONS).await.expect("rerun");
    assert!(rerun.applied.is_empty());
    assert_eq!(rerun.skipped, vec!["nettstad:0001".to_owned()]);

    let edited = [Migration::new("nettstad", "0001", "DEFINE TABLE IF NOT EXISTS annan SCHEMALESS;")];
    let err = db.migrate(&edited).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Migration { .. }));

    let next = [Migration::new("nettstad", "0002", "DEFINE FIELD IF NOT EXISTS merknad ON nettstad TYPE option<string>;")];
    let report = db.migrate(&next).await.expect("new version");
    assert_eq!(report.applied, vec!["nettstad:0002".to_owned()]);
}

#[tokio::test]
async fn update_can_clear_an_optional_field() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let id = store
        .create_lineage(&Nettstad { merknad: Some("utkast".to_owned()), ..nettstad("a", 1) })
        .await
        .expect("create");

    let mut desired = store.get(id, Utc::now()).await.expect("get").expect("exists");
    desired.merknad = None;
    store.append_update(&desired).await.expect("update");

    let current = store.get(id, Utc::now()).await.expect("get").expect("exists");
    assert_eq!(current, Nettstad { id, ..nettstad("a", 1) });

    let revisions = store.revisions(Some(&[id][..]), Utc::now()).await.expect("revisions");
    let update = revisions.iter().find(|r| r.id != id).expect("update row");
    assert_eq!(update.felt, NettstadDiff { merknad: Some(None), ..NettstadDiff::default() });
}

#[tokio::test]
async fn batch_rows_get_consecutive_ids() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let a = store.create_lineage(&nettstad("a", 1)).await.expect("create");

    let mut batch = Batch::<NettstadTable>::new();
    batch.deactivate(a).create(&nettstad("b", 2));
    let ids = store.commit(batch).await.expect("commit");
    assert_eq!(ids, vec![a + 1, a + 2]);

    assert!(store.get(a, Utc::now()).await.expect("get").is_none());
    let b = store.get(a + 2, Utc::now()).await.expect("get").expect("new lineage");
    assert_eq!(b, Nettstad { id: a + 2, ..nettstad("b", 2) });
}

#[tokio::test]
async fn failing_batch_writes_nothing() {
    let store = VersionedStore::<NettstadTable>::new(database().await);
    let a = store.create_lineage(&nettstad("a", 1)).await.expect("create");

    // Occupy the id the second row of the batch would get.
    store
        .database()
        .query("CREATE nettstad SET rad_id = $id, original = $id, tidspunkt = 0")
        .bind(("id", a + 2))
        .await
        .expect("query")
        .check()
        .expect("stray row");

    let mut batch = Batch::<NettstadTable>::new();
    batch.deactivate(a).append(a, None, NettstadDiff { sider: Some(9), ..NettstadDiff::default() });
    assert!(store.commit(batch).await.is_err());

    let revisions = store.revisions(Some(&[a][..]), Utc::now()).await.expect("revisions");
    assert_eq!(revisions.len(), 1);
    let current = store.get(a, Utc::now()).await.expect("get").expect("still active");
    assert_eq!(current.sider, 1);

    let next = store.create_lineage(&nettstad("c", 3)).await.expect("create after rollback");
    assert_eq!(next, a + 1, "the counter was rolled back with the rows");
}

#[test]
fn diff_glue_is_generated() {
    let a = Nettstad { id: 1, ..nettstad("a", 1) };
    assert_eq!(Nettstad::diff(&a, &a), NettstadDiff::default());

    let noted = Nettstad { merknad: Some("x".to_owned()), ..a.clone() };
    assert_eq!(Nettstad::diff(&noted, &a).merknad, Some(None));
    assert_eq!(Nettstad::diff(&a, &noted).merknad, Some(Some("x".to_owned())));
}
