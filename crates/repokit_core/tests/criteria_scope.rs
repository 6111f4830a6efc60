use repokit_core::db::open_db_in_memory;
use repokit_core::{
    attributes, CriteriaRepository, Criterion, CrudRepository, EntityDescriptor,
    FnCriterion, Limit, Operator, OrderBy, Record, RepoError, RepositoryView, Scope,
    SqliteRepository, Value, WhereCompare, WhereEquals, WhereIn, WhereNull,
};
use rusqlite::Connection;

/// Narrows to one role title, the way host applications write their own criteria.
struct ByRoleTitle {
    title: String,
}

impl ByRoleTitle {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl Criterion for ByRoleTitle {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.where_eq("role", self.title.as_str())
    }
}

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT,
            score INTEGER NOT NULL
        );
        INSERT INTO users (id, name, role, score) VALUES
            (1, 'Ann', 'admin', 10),
            (2, 'Bob', 'staff', 20),
            (3, 'Cid', 'staff', 30),
            (4, 'Dee', NULL, 40);",
    )
    .unwrap();
    conn
}

fn users(conn: &Connection) -> SqliteRepository<'_, Record> {
    SqliteRepository::try_new(conn, EntityDescriptor::new("users")).unwrap()
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.get("name").unwrap().to_string())
        .collect()
}

#[test]
fn criteria_fold_in_push_order_like_a_manual_fold() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(ByRoleTitle::new("staff"))
        .push_criteria(WhereCompare::new("score", Operator::Gt, 25));

    repo.apply_criteria();
    let manual = Scope::new()
        .where_eq("role", "staff")
        .where_op("score", Operator::Gt, 25);
    assert_eq!(repo.builder(), &manual);
    assert_eq!(repo.criteria().len(), 2);
    assert_eq!(names(&repo.all(None).unwrap()), vec!["Cid"]);
}

#[test]
fn repeated_apply_does_not_double_filter() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("role", "staff"));

    repo.apply_criteria().apply_criteria();
    repo.all(None).unwrap();
    repo.count().unwrap();
    assert_eq!(repo.builder().filters().len(), 1);

    repo.push_criteria(OrderBy::desc("score"));
    repo.apply_criteria();
    assert_eq!(repo.builder().filters().len(), 1);
    assert_eq!(repo.builder().orderings().len(), 1);
    assert_eq!(names(&repo.all(None).unwrap()), vec!["Cid", "Bob"]);
}

#[test]
fn clear_scope_matches_a_fresh_repository() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("role", "admin"));
    assert_eq!(repo.all(None).unwrap().len(), 1);

    repo.clear_scope();
    assert!(repo.criteria().is_empty());
    assert_eq!(repo.builder(), users(&conn).builder());
    assert_eq!(repo.builder(), &Scope::new());
    assert_eq!(repo.all(None).unwrap().len(), 4);
}

#[test]
fn find_respects_scope_and_fails_hard_outside_it() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("role", "staff"));

    let bob = repo.find(2, None).unwrap();
    assert_eq!(bob.get("name"), Some(&Value::from("Bob")));

    let err = repo.find(1, None).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn lookups_do_not_leak_into_the_repository_scope() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereNull::not_null("role"));

    assert!(repo.find_by("name", "Ann", None).unwrap().is_some());
    assert!(repo.exists(2, None).unwrap());
    assert!(repo.find(3, None).is_ok());

    assert_eq!(repo.builder(), &Scope::new().where_not_null("role"));
    assert_eq!(repo.all(None).unwrap().len(), 3);
}

#[test]
fn aggregates_run_under_the_criteria_scope() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereIn::new("id", [2, 3, 4]))
        .push_criteria(Limit(1));

    assert_eq!(repo.sum("score").unwrap(), Value::Integer(90));
    assert_eq!(repo.count().unwrap(), 3);
    assert!(repo.exists("Dee", Some("name")).unwrap());
    assert!(!repo.exists("Ann", Some("name")).unwrap());
    assert_eq!(repo.pluck("name").unwrap().len(), 1);

    let page = repo.paginate(Some(2), None).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.last_page, 2);
}

#[test]
fn find_by_returns_first_in_scope_order() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(OrderBy::desc("score"));

    let top_staff = repo
        .find_by("role", "staff", None)
        .unwrap()
        .unwrap();
    assert_eq!(top_staff.get("name"), Some(&Value::from("Cid")));
}

#[test]
fn writes_ignore_pending_criteria() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("role", "staff"));

    assert_eq!(
        repo.update(1, &attributes([("score", 99)]), None).unwrap(),
        1
    );
    assert_eq!(repo.delete(4, None).unwrap(), 1);
    let created = repo
        .create(attributes([
            ("id", Value::from(5)),
            ("name", Value::from("Eve")),
            ("role", Value::from("guest")),
            ("score", Value::from(0)),
        ]))
        .unwrap();
    assert_eq!(created.get("role"), Some(&Value::from("guest")));

    repo.clear_scope();
    assert_eq!(repo.find(1, None).unwrap().get("score"), Some(&Value::Integer(99)));
    assert_eq!(repo.count().unwrap(), 4);
}

#[test]
fn closure_criteria_can_read_the_repository_view() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("role", "staff"));
    repo.push_criteria(FnCriterion::new(
        |scope: Scope, view: &dyn RepositoryView| {
            // Only narrow further when another criterion already filtered roles.
            if view.pending_criteria().len() > 1 && view.descriptor().table == "users" {
                scope.where_op("score", Operator::Lt, 25)
            } else {
                scope
            }
        },
    ));

    assert_eq!(names(&repo.all(None).unwrap()), vec!["Bob"]);
}

#[test]
fn criteria_naming_unknown_columns_fail_at_read_time() {
    let conn = seeded();
    let mut repo = users(&conn);
    repo.push_criteria(WhereEquals::new("rank", "x"));

    let err = repo.all(None).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(ref message) if message.contains("rank")));
}

#[test]
fn builder_mut_narrows_outside_the_criteria_list() {
    let conn = seeded();
    let mut repo = users(&conn);
    let narrowed = std::mem::take(repo.builder_mut()).where_op("score", Operator::Gte, 30);
    *repo.builder_mut() = narrowed;

    assert_eq!(names(&repo.all(None).unwrap()), vec!["Cid", "Dee"]);
    assert!(repo.criteria().is_empty());
}
