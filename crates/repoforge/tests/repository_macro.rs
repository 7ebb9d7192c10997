//! End-to-end coverage of `#[repository]` + `#[derive(SqlEntity)]` against
//! the in-memory fake driver in `common`.

mod common;

use std::sync::Arc;

use repoforge::prelude::*;
use repoforge_macros::{repository, SqlEntity};

use common::{FakeConnection, FakeRow, Recorder, Script};

#[derive(SqlEntity, Debug, PartialEq)]
struct User {
    #[identity]
    id: i64,
    name: String,
    email: String,
}

#[repository(dialect = SqlServer, entity = User)]
trait UserRepository {
    async fn get_by_id(&self, id: i64) -> Option<User>;
    async fn list_all(&self) -> Vec<User>;
    async fn count_active(&self) -> i64;
    async fn exists_by_email(&self, email: String) -> bool;
    #[return_inserted_id]
    async fn create(&self, user: User) -> i64;
    async fn update_email(&self, id: i64, email: String) -> u64;
    async fn delete_by_id(&self, id: i64) -> u64;
    #[sql_execute_type(BatchInsert)]
    async fn batch_insert(&self, users: Vec<User>) -> u64;
    async fn find_matching(&self, query: ExpressionToSql<User>) -> Vec<User>;
}

fn user_row(id: i64, name: &str, email: &str) -> FakeRow {
    FakeRow::new(vec![("id", Value::Int(id)), ("name", Value::Text(name.to_string())), ("email", Value::Text(email.to_string()))])
}

#[tokio::test]
async fn get_by_id_selects_columns_and_materializes_option() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { rows: vec![user_row(1, "Ada", "ada@example.com")], ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script);
    let repo = UserRepositoryRepository::new(conn);

    let found = repo.get_by_id(1).await.unwrap();
    assert_eq!(found, Some(User { id: 1, name: "Ada".to_string(), email: "ada@example.com".to_string() }));

    let sql = recorder.prepared_sql.lock().unwrap().clone();
    assert_eq!(sql.len(), 1);
    assert_eq!(sql[0], "SELECT id, name, email FROM user WHERE id = @id");
}

#[tokio::test]
async fn list_all_returns_every_row_as_a_vec() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { rows: vec![user_row(1, "Ada", "ada@example.com"), user_row(2, "Grace", "grace@example.com")], ..Default::default() };
    let conn = FakeConnection::new(recorder, script);
    let repo = UserRepositoryRepository::new(conn);

    let all = repo.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].name, "Grace");
}

#[tokio::test]
async fn count_active_dispatches_to_scalar() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { scalar: Some(Value::Int(7)), ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script);
    let repo = UserRepositoryRepository::new(conn);

    let count = repo.count_active().await.unwrap();
    assert_eq!(count, 7);
    assert!(recorder.prepared_sql.lock().unwrap()[0].starts_with("SELECT COUNT(*) FROM user"));
}

#[tokio::test]
async fn exists_by_email_is_a_bool_over_a_nonzero_scalar() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { scalar: Some(Value::Int(1)), ..Default::default() };
    let conn = FakeConnection::new(recorder, script);
    let repo = UserRepositoryRepository::new(conn);

    assert!(repo.exists_by_email("ada@example.com".to_string()).await.unwrap());
}

#[tokio::test]
async fn create_runs_the_appended_identity_select() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { scalar: Some(Value::Int(42)), ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script);
    let repo = UserRepositoryRepository::new(conn);

    let new_id = repo.create(User { id: 0, name: "Grace".to_string(), email: "grace@example.com".to_string() }).await.unwrap();
    assert_eq!(new_id, 42);

    let sql = recorder.prepared_sql.lock().unwrap().clone();
    assert_eq!(sql[0], "INSERT INTO user (name, email) VALUES (@name, @email)");
    assert_eq!(sql[1], "SELECT SCOPE_IDENTITY();");
}

#[tokio::test]
async fn update_and_delete_return_affected_row_counts() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { affected: 1, ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script);
    let repo = UserRepositoryRepository::new(conn);

    assert_eq!(repo.update_email(1, "new@example.com".to_string()).await.unwrap(), 1);
    assert_eq!(repo.delete_by_id(1).await.unwrap(), 1);

    let sql = recorder.prepared_sql.lock().unwrap().clone();
    assert!(sql[0].starts_with("UPDATE user SET"));
    assert_eq!(sql[1], "DELETE FROM user WHERE id = @id");
}

#[tokio::test]
async fn batch_insert_falls_back_to_a_per_item_loop_when_the_driver_lacks_native_support() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { affected: 1, ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script).with_native_batch(false);
    let repo = UserRepositoryRepository::new(conn);

    let users = vec![
        User { id: 0, name: "Ada".to_string(), email: "ada@example.com".to_string() },
        User { id: 0, name: "Grace".to_string(), email: "grace@example.com".to_string() },
    ];
    let affected = repo.batch_insert(users).await.unwrap();
    assert_eq!(affected, 2);
    assert_eq!(recorder.bound.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn batch_insert_rejects_an_empty_collection_before_touching_the_driver() {
    let recorder = Arc::new(Recorder::default());
    let conn = FakeConnection::new(recorder.clone(), Script::default());
    let repo = UserRepositoryRepository::new(conn);

    let err = repo.batch_insert(Vec::new()).await.unwrap_err();
    assert!(matches!(err, DriverError::BatchRequiresCollection));
    assert!(recorder.prepared_sql.lock().unwrap().is_empty());
}

#[tokio::test]
async fn expression_to_sql_parameter_bypasses_template_synthesis() {
    let recorder = Arc::new(Recorder::default());
    let script = Script { rows: vec![user_row(3, "Tess", "tess@example.com")], ..Default::default() };
    let conn = FakeConnection::new(recorder.clone(), script);
    let repo = UserRepositoryRepository::new(conn);

    let query = ExpressionToSql::<User>::for_sql_server().where_(Expr::column("name").eq(Expr::Literal(Literal::String("Tess".to_string()))));
    let matching = repo.find_matching(query).await.unwrap();
    assert_eq!(matching.len(), 1);

    let sql = recorder.prepared_sql.lock().unwrap().clone();
    assert!(sql[0].contains("Tess"));
}
