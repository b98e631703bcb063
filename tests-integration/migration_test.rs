//! Integration tests against a real PostgreSQL server.
//!
//! Set `UNDERTOW_TEST_DATABASE_URL` to run them; without it every test
//! returns early. Each test works in its own schema and drops it afterwards.
//!
//! Test flow:
//! 1. Create a scratch schema and point the search path at it
//! 2. Migrate the target tables onto the empty schema
//! 3. Verify the catalog, then migrate again and expect no statements
//! 4. Change the target and verify the single ALTER

use undertow::migration::{Introspector, Migrator, WriteDriver};
use undertow::{
    connect_executor, Column, ColumnType, DefaultValue, Dialect, ForeignKey, Index, LifeExecutor,
    MayPostgresExecutor, MigrateOptions, Postgres, ReferenceOption, Table,
};

const DATABASE_URL_VAR: &str = "UNDERTOW_TEST_DATABASE_URL";

/// A connection with the search path set to a fresh schema.
struct Scratch {
    conn: MayPostgresExecutor,
    schema: String,
}

impl Scratch {
    fn open(name: &str) -> Option<Self> {
        let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
            eprintln!("skipping: {DATABASE_URL_VAR} not set");
            return None;
        };
        let conn = connect_executor(&url).expect("connect to test database");
        let schema = format!("undertow_it_{name}_{}", std::process::id());
        conn.execute(&format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE"), &[])
            .expect("drop stale schema");
        conn.execute(&format!("CREATE SCHEMA \"{schema}\""), &[])
            .expect("create schema");
        conn.execute(&format!("SET search_path TO \"{schema}\""), &[])
            .expect("set search path");
        Some(Self { conn, schema })
    }

    fn options(&self) -> MigrateOptions {
        MigrateOptions::default().schema(self.schema.clone())
    }

    fn migrate(&self, options: MigrateOptions, tables: &[Table]) -> undertow::MigrationReport {
        Migrator::postgres(&self.conn, options)
            .create(tables)
            .expect("migration failed")
    }

    fn count(&self, sql: &str, params: &[&str]) -> i64 {
        let rows = self.conn.query_all(sql, params).expect("catalog query");
        rows[0].get(0).and_then(|v| v.parse().ok()).expect("count")
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Err(e) = self
            .conn
            .execute(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.schema), &[])
        {
            log::warn!("leaving schema {} behind: {e}", self.schema);
        }
    }
}

fn users() -> Table {
    Table::new("users")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("name", ColumnType::String).nullable())
        .with_column(Column::new("email", ColumnType::String).size(255).unique())
        .with_column(Column::new("nickname", ColumnType::String).default_value(DefaultValue::string("O'Brien")))
        .with_column(Column::new("created_at", ColumnType::Time).default_value(DefaultValue::expr("CURRENT_TIMESTAMP")))
        .with_primary_key(["id"])
        .with_index(Index::new("name", ["name"]))
}

fn pets() -> Table {
    Table::new("pets")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("owner_id", ColumnType::Int64).nullable())
        .with_column(Column::new("weight", ColumnType::Float64).precision(6, 2).default_value(0.5))
        .with_primary_key(["id"])
        .with_foreign_key(
            ForeignKey::new("pets_users_pets", ["owner_id"], "users", ["id"]).on_delete(ReferenceOption::SetNull),
        )
}

#[test]
fn test_migrate_empty_schema_then_nothing() {
    let Some(db) = Scratch::open("settle") else { return };
    let targets = [pets(), users()];

    let first = db.migrate(db.options(), &targets);
    assert!(first.is_complete());
    assert!(first.statement_count() >= 4);

    let tables = db.count(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1",
        &[db.schema.as_str()],
    );
    assert_eq!(tables, 2);
    let fks = db.count(
        "SELECT COUNT(*) FROM information_schema.table_constraints \
         WHERE table_schema = $1 AND constraint_type = 'FOREIGN KEY'",
        &[db.schema.as_str()],
    );
    assert_eq!(fks, 1);

    let second = db.migrate(db.options(), &targets);
    assert!(second.is_empty(), "unexpected statements: {:#?}", second.statements);
}

#[test]
fn test_introspect_round_trip() {
    let Some(db) = Scratch::open("introspect") else { return };
    db.migrate(db.options(), &[users()]);

    let mut dialect = Postgres::from_options(&db.options());
    dialect.init(&db.conn).expect("init dialect");
    let live = Introspector::new(&dialect, &db.conn).table("users").expect("introspect");

    assert_eq!(live.primary_key, vec!["id".to_string()]);
    assert!(live.column("email").expect("email").unique);
    assert_eq!(
        live.column("nickname").expect("nickname").default,
        Some(DefaultValue::string("O'Brien"))
    );
    assert!(live.index("name").is_some());
}

#[test]
fn test_added_column_is_one_alter() {
    let Some(db) = Scratch::open("alter") else { return };
    db.migrate(db.options(), &[users()]);

    let changed = users().with_column(Column::new("age", ColumnType::Int32).nullable());
    let report = db.migrate(db.options(), &[changed]);
    assert_eq!(
        report.statements,
        vec!["ALTER TABLE \"users\" ADD COLUMN \"age\" integer NULL".to_string()]
    );
}

#[test]
fn test_plan_does_not_touch_the_database() {
    let Some(db) = Scratch::open("plan") else { return };

    let driver = WriteDriver::new(&db.conn, Vec::new());
    Migrator::postgres(&driver, db.options())
        .create(&[users(), pets()])
        .expect("plan failed");
    let plan = String::from_utf8(driver.finish().expect("flush")).expect("utf-8 plan");
    assert!(plan.starts_with("CREATE TABLE IF NOT EXISTS \"users\""));

    let tables = db.count(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1",
        &[db.schema.as_str()],
    );
    assert_eq!(tables, 0);
}

#[test]
fn test_transactional_failure_leaves_nothing() {
    let Some(db) = Scratch::open("rollback") else { return };
    let broken = Table::new("broken")
        .with_column(Column::new("id", ColumnType::Int64))
        .with_primary_key(["id"])
        .with_foreign_key(ForeignKey::new("broken_missing", ["id"], "missing", ["id"]));

    let result = Migrator::postgres(&db.conn, db.options().transactional(true)).create(&[users(), broken]);
    assert!(result.is_err());

    let tables = db.count(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1",
        &[db.schema.as_str()],
    );
    assert_eq!(tables, 0);
}
