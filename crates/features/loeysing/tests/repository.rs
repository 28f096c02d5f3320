use chrono::Utc;
use lreg_database::{Database, VersionedStore};
use lreg_domain::nettadresse::Nettadresse;
use lreg_domain::verksemd::NyVerksemd;
use lreg_loeysing::{LoeysingError, LoeysingRepository, LoeysingTable, MIGRATIONS, expand};
use lreg_verksemd::VerksemdRepository;
use std::time::Duration;

struct Fixture {
    db: Database,
    loeysingar: LoeysingRepository,
    verksemder: VerksemdRepository,
}

async fn fixture() -> Fixture {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .migrations(lreg_verksemd::MIGRATIONS.iter().chain(MIGRATIONS).copied())
        .init()
        .await
        .expect("connect to mem://");

    Fixture {
        loeysingar: LoeysingRepository::new(db.clone()),
        verksemder: VerksemdRepository::new(db.clone()),
        db,
    }
}

fn url(raw: &str) -> Nettadresse {
    Nettadresse::parse(raw).expect("valid url")
}

async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

async fn row_count(db: &Database, id: i64) -> usize {
    VersionedStore::<LoeysingTable>::new(db.clone())
        .revisions(Some(&[id][..]), Utc::now())
        .await
        .expect("revisions")
        .len()
}

#[tokio::test]
async fn create_then_get() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Tilsynet", &url("www.uutilsynet.no"), "991825827", Some(7))
        .await
        .expect("create");

    let found = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    assert_eq!(found.id, id);
    assert_eq!(found.namn, "Tilsynet");
    assert_eq!(found.url.as_str(), "https://www.uutilsynet.no");
    assert_eq!(found.orgnummer, "991825827");
    assert_eq!(found.verksemd_id, Some(7));
}

#[tokio::test]
async fn duplicate_create_returns_the_same_lineage_without_new_rows() {
    let f = fixture().await;
    let first = f
        .loeysingar
        .create("Tilsynet", &url("https://www.uutilsynet.no/"), "991825827", None)
        .await
        .expect("create");
    let second = f
        .loeysingar
        .create("Anna namn", &url("http://UUTILSYNET.no"), "991825827", None)
        .await
        .expect("create again");

    assert_eq!(first, second);
    assert_eq!(row_count(&f.db, first).await, 1);

    let other_owner = f
        .loeysingar
        .create("Tilsynet", &url("uutilsynet.no"), "938644500", None)
        .await
        .expect("create for another owner");
    assert_ne!(other_owner, first);
}

#[tokio::test]
async fn recreate_after_delete_reactivates_with_the_original_name() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Gammalt namn", &url("example.com"), "938644500", None)
        .await
        .expect("create");
    f.loeysingar.delete(id).await.expect("delete");
    assert!(f.loeysingar.get(id, Utc::now()).await.expect("get").is_none());

    let again = f
        .loeysingar
        .create("Nytt namn", &url("https://example.com"), "938644500", None)
        .await
        .expect("recreate");
    assert_eq!(again, id);
    assert_eq!(row_count(&f.db, id).await, 3);

    let found = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active again");
    assert_eq!(found.namn, "Gammalt namn");
}

#[tokio::test]
async fn find_by_url_and_orgnummer_sees_inactive_lineages() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Side", &url("example.com/a"), "938644500", None)
        .await
        .expect("create");
    f.loeysingar.delete(id).await.expect("delete");

    let found = f
        .loeysingar
        .find_by_url_and_orgnummer(&url("www.example.com/a/"), "938644500")
        .await
        .expect("find")
        .expect("inactive lineage");
    assert_eq!(found.original, id);
    assert!(!found.is_aktiv());

    let missing = f
        .loeysingar
        .find_by_url_and_orgnummer(&url("example.com/b"), "938644500")
        .await
        .expect("find");
    assert!(missing.is_none());
}

#[tokio::test]
async fn reads_follow_the_requested_instant() {
    let f = fixture().await;
    let before_create = Utc::now();
    tick().await;
    let id = f
        .loeysingar
        .create("Første", &url("example.com"), "938644500", None)
        .await
        .expect("create");
    tick().await;
    let between = Utc::now();
    tick().await;

    let mut loeysing = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    loeysing.namn = "Andre".to_owned();
    f.loeysingar.update(&loeysing).await.expect("update");

    assert!(f.loeysingar.get(id, before_create).await.expect("get").is_none());
    assert!(f.loeysingar.list(None, before_create).await.expect("list").is_empty());
    let then = f.loeysingar.get(id, between).await.expect("get").expect("active then");
    assert_eq!(then.namn, "Første");
    let now = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active now");
    assert_eq!(now.namn, "Andre");
    assert_eq!(row_count(&f.db, id).await, 2);
}

#[tokio::test]
async fn update_can_clear_the_owner() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Side", &url("example.com"), "938644500", Some(3))
        .await
        .expect("create");

    let mut loeysing = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    loeysing.verksemd_id = None;
    loeysing.url = url("example.com/ny");
    f.loeysingar.update(&loeysing).await.expect("update");

    let found = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    assert_eq!(found.verksemd_id, None);
    assert_eq!(found.url.as_str(), "https://example.com/ny");
    assert_eq!(found, loeysing);
}

#[tokio::test]
async fn unchanged_update_appends_an_empty_row() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Side", &url("example.com"), "938644500", None)
        .await
        .expect("create");
    let loeysing = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    f.loeysingar.update(&loeysing).await.expect("update");

    let found = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    assert_eq!(found, loeysing);
}

#[tokio::test]
async fn missing_lineages_are_not_found() {
    let f = fixture().await;
    let id = f
        .loeysingar
        .create("Side", &url("example.com"), "938644500", None)
        .await
        .expect("create");
    let mut ghost = f.loeysingar.get(id, Utc::now()).await.expect("get").expect("active");
    ghost.id = 404;

    let updated = f.loeysingar.update(&ghost).await;
    assert!(matches!(updated, Err(LoeysingError::NotFound { id: 404 })));
    assert!(matches!(f.loeysingar.delete(404).await, Err(LoeysingError::NotFound { id: 404 })));

    f.loeysingar.delete(id).await.expect("delete");
    assert!(matches!(f.loeysingar.delete(id).await, Err(LoeysingError::NotFound { .. })));
}

#[tokio::test]
async fn search_covers_namn_url_orgnummer_and_history() {
    let f = fixture().await;
    let tilsyn = f
        .loeysingar
        .create("Uutilsynet", &url("www.uutilsynet.no"), "991825827", None)
        .await
        .expect("create");
    let nav = f
        .loeysingar
        .create("Arbeid og velferd", &url("www.nav.no"), "889640782", None)
        .await
        .expect("create");

    let mut renamed = f.loeysingar.get(nav, Utc::now()).await.expect("get").expect("active");
    renamed.namn = "Nav".to_owned();
    f.loeysingar.update(&renamed).await.expect("update");

    let search = |term: &'static str| {
        let repository = f.loeysingar.clone();
        async move {
            let found = repository.search(term, Utc::now()).await.expect("search");
            found.into_iter().map(|l| l.id).collect::<Vec<_>>()
        }
    };
    assert_eq!(search("UUTILSYNET").await, vec![tilsyn]);
    assert_eq!(search("nav.no").await, vec![nav]);
    assert_eq!(search("88964").await, vec![nav]);
    assert_eq!(search("velferd").await, vec![nav]);
    assert!(f.loeysingar.search("finst ikkje", Utc::now()).await.expect("search").is_empty());
}

#[tokio::test]
async fn search_by_owning_org_and_expand() {
    let f = fixture().await;
    let owner = f
        .verksemder
        .create(NyVerksemd {
            namn: "Digitaliseringsdirektoratet".to_owned(),
            organisasjonsnummer: "991825827".to_owned(),
            ..NyVerksemd::default()
        })
        .await
        .expect("create verksemd");

    let owned = f
        .loeysingar
        .create("Digdir", &url("www.digdir.no"), "991825827", Some(owner))
        .await
        .expect("create");
    let orphan = f
        .loeysingar
        .create("Orphan", &url("example.com"), "938644500", None)
        .await
        .expect("create");

    let by_name =
        f.loeysingar.search_by_owning_org("direktoratet", Utc::now()).await.expect("search");
    assert_eq!(by_name.iter().map(|l| l.id).collect::<Vec<_>>(), vec![owned]);
    let by_number = f.loeysingar.search_by_owning_org("991825", Utc::now()).await.expect("search");
    assert_eq!(by_number.len(), 1);
    let unrelated =
        f.loeysingar.search_by_owning_org("938644500", Utc::now()).await.expect("search");
    assert!(unrelated.is_empty());

    let all = f.loeysingar.list(None, Utc::now()).await.expect("list");
    let expanded = expand(&f.verksemder, all, Utc::now()).await.expect("expand");
    assert_eq!(expanded.len(), 2);
    let with_owner = expanded.iter().find(|e| e.id == owned).expect("owned");
    assert_eq!(with_owner.verksemd.as_ref().map(|v| v.id), Some(owner));
    let without = expanded.iter().find(|e| e.id == orphan).expect("orphan");
    assert!(without.verksemd.is_none());
}
