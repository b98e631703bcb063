//! End-to-end migration scenarios against the in-memory fake catalog.
//!
//! Each scenario seeds `MockExecutor` with the live tables (as the server
//! stores them), runs the migrator and checks the exact statements.

use undertow::migration::{normalize_targets, Introspector, MigrationReport, Migrator, WriteDriver};
use undertow::test_helpers::MockExecutor;
use undertow::{
    Column, ColumnType, DefaultValue, ForeignKey, Index, MigrateOptions, Postgres, ReferenceOption, Table,
};

fn migrate(mock: &MockExecutor, options: MigrateOptions, tables: &[Table]) -> MigrationReport {
    Migrator::postgres(mock, options).create(tables).unwrap()
}

fn accounts() -> Table {
    Table::new("accounts")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("email", ColumnType::String).size(255))
        .with_column(Column::new("country", ColumnType::String).schema_type("postgres", "char(2)"))
        .with_column(Column::new("bio", ColumnType::String).size(1 << 24).nullable())
        .with_column(Column::new("status", ColumnType::Enum).default_value(DefaultValue::string("draft")))
        .with_column(Column::new("active", ColumnType::Bool).default_value(true))
        .with_column(Column::new("logins", ColumnType::Int32).default_value(0))
        .with_column(Column::new("balance", ColumnType::Float64).precision(10, 2).default_value(1.5))
        .with_column(Column::new("created_at", ColumnType::Time).default_value(DefaultValue::expr("CURRENT_TIMESTAMP")))
        .with_column(Column::new("settings", ColumnType::Json).nullable())
        .with_column(Column::new("external_id", ColumnType::Uuid).nullable())
        .with_column(Column::new("avatar", ColumnType::Bytes).nullable())
        .with_column(Column::new("tags", ColumnType::Other).schema_type("postgres", "text[]").nullable())
        .with_primary_key(["id"])
        .with_index(Index::new("email", ["email"]).unique())
        .with_index(Index::new("by_country_status", ["country", "status"]))
}

fn sessions() -> Table {
    Table::new("sessions")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("account_id", ColumnType::Int64))
        .with_column(Column::new("token", ColumnType::String).size(64))
        .with_primary_key(["id"])
        .with_index(Index::new("account_id", ["account_id"]))
        .with_foreign_key(
            ForeignKey::new("sessions_accounts_sessions", ["account_id"], "accounts", ["id"])
                .on_delete(ReferenceOption::Cascade),
        )
}

#[test]
fn second_run_emits_nothing() {
    let targets = vec![sessions(), accounts()];

    let empty = MockExecutor::new();
    let first = migrate(&empty, MigrateOptions::default(), &targets);
    // Two tables, one plain index each (the unique email index is inline), one foreign key.
    assert_eq!(first.statement_count(), 5);

    let settled = MockExecutor::new().with_tables(normalize_targets(&targets, false).unwrap());
    let second = migrate(&settled, MigrateOptions::default(), &targets);
    assert!(second.is_empty(), "unexpected statements: {:#?}", second.statements);
    assert!(second.is_complete());
}

#[test]
fn types_read_back_as_declared() {
    let lossy = |t: ColumnType| match t {
        ColumnType::Int8 | ColumnType::Uint8 | ColumnType::Uint16 => ColumnType::Int16,
        ColumnType::Uint32 => ColumnType::Int32,
        ColumnType::Uint64 => ColumnType::Int64,
        ColumnType::Enum => ColumnType::String,
        t => t,
    };

    let mut table = Table::new("types")
        .with_column(Column::new("id", ColumnType::Int64))
        .with_primary_key(["id"]);
    for t in ColumnType::ALL.iter().copied() {
        let mut column = Column::new(format!("c_{}", t.name()), t).nullable();
        if t == ColumnType::Other {
            column = column.schema_type("postgres", "inet");
        }
        table = table.with_column(column);
    }

    let mock = MockExecutor::new().with_table(table.clone());
    let dialect = Postgres::new().with_schema("public");
    let live = Introspector::new(&dialect, &mock).table("types").unwrap();
    for declared in &table.columns[1..] {
        let read = live.column(&declared.name).unwrap();
        assert_eq!(
            read.column_type,
            lossy(declared.column_type),
            "column {}",
            declared.name
        );
    }
    assert_eq!(live.column("c_other").unwrap().native_type(), Some("inet"));
}

#[test]
fn index_found_under_its_catalog_name() {
    let mut stored = Index::new("name", ["name"]);
    stored.catalog_name = Some("users_name_idx".to_string());
    let live = Table::new("users")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("name", ColumnType::String).nullable())
        .with_primary_key(["id"])
        .with_index(stored);
    let target = Table::new("users")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("name", ColumnType::String).nullable())
        .with_primary_key(["id"])
        .with_index(Index::new("name", ["name"]));

    let mock = MockExecutor::new().with_table(live);
    let report = migrate(&mock, MigrateOptions::default(), &[target]);
    assert!(report.is_empty(), "unexpected statements: {:#?}", report.statements);
}

#[test]
fn referenced_table_exists_before_its_foreign_keys() {
    let mock = MockExecutor::new();
    migrate(&mock, MigrateOptions::default(), &[sessions(), accounts()]);
    let executed = mock.executed();

    let first_reference = executed
        .iter()
        .position(|s| s.contains("REFERENCES \"accounts\""))
        .unwrap();
    let accounts_created = executed
        .iter()
        .position(|s| s.starts_with("CREATE TABLE IF NOT EXISTS \"accounts\""))
        .unwrap();
    assert!(accounts_created < first_reference);
    assert!(executed[first_reference].ends_with("ON DELETE CASCADE"));
    assert_eq!(first_reference, executed.len() - 1);
}

#[test]
fn dry_run_writes_the_executed_statements() {
    let targets = vec![sessions(), accounts()];
    let options = MigrateOptions::default().universal_id(true);

    let executed = MockExecutor::new();
    migrate(&executed, options.clone(), &targets);

    let planned = MockExecutor::new();
    let driver = WriteDriver::new(&planned, Vec::new());
    Migrator::postgres(&driver, options).create(&targets).unwrap();
    let written = String::from_utf8(driver.finish().unwrap()).unwrap();

    let expected: String = executed.executed().iter().map(|s| format!("{s};\n")).collect();
    assert_eq!(written, expected);
    assert!(planned.executed().is_empty());
}

#[test]
fn explicit_column_rename() {
    let live = Table::new("users")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("name", ColumnType::String).nullable())
        .with_primary_key(["id"]);
    let target = Table::new("users")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(
            Column::new("display_name", ColumnType::String)
                .nullable()
                .renamed_from("name"),
        )
        .with_primary_key(["id"]);

    let mock = MockExecutor::new().with_table(live);
    migrate(&mock, MigrateOptions::default(), &[target]);
    assert_eq!(
        mock.executed(),
        vec!["ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"display_name\""]
    );
}

#[test]
fn type_change_is_one_alter() {
    let live = Table::new("accounts")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("email", ColumnType::String).size(120))
        .with_column(Column::new("note", ColumnType::String).nullable())
        .with_primary_key(["id"]);
    let target = Table::new("accounts")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(Column::new("email", ColumnType::String).size(255))
        .with_column(Column::new("note", ColumnType::String))
        .with_primary_key(["id"]);

    let mock = MockExecutor::new().with_table(live);
    migrate(&mock, MigrateOptions::default(), &[target]);
    let executed = mock.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("ALTER TABLE \"accounts\" ALTER COLUMN \"email\" TYPE varchar(255)"));
    assert!(executed[0].contains("ALTER COLUMN \"note\" SET NOT NULL"));
}

#[test]
fn exported_tables_replay_without_changes() {
    let live = Table::new("events")
        .with_column(Column::new("id", ColumnType::Int64).increment())
        .with_column(
            Column::new("happened_at", ColumnType::Time).schema_type("postgres", "timestamp without time zone"),
        )
        .with_column(Column::new("labels", ColumnType::Other).schema_type("postgres", "text[]").nullable())
        .with_column(Column::new("peer", ColumnType::Other).schema_type("postgres", "inet").nullable())
        .with_column(Column::new("payload", ColumnType::Json).nullable())
        .with_primary_key(["id"])
        .with_index(Index::new("happened_at", ["happened_at"]));
    let mock = MockExecutor::new().with_table(live);

    let dialect = Postgres::new().with_schema("public");
    let exported = Introspector::new(&dialect, &mock).export(&["events"]).unwrap();
    let happened_at = exported[0].column("happened_at").unwrap();
    assert_eq!(happened_at.type_override("postgres"), Some("timestamp without time zone"));

    let report = migrate(&mock, MigrateOptions::default(), &exported);
    assert!(report.is_empty(), "unexpected statements: {:#?}", report.statements);
}
