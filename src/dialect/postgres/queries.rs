//! Catalog queries. Every selected column is cast to text and every
//! parameter is bound as text; `$1` is always the schema name.

pub const SERVER_VERSION: &str = "SHOW server_version_num";

pub const CURRENT_SCHEMA: &str = "SELECT CURRENT_SCHEMA()::text";

pub const TABLE_EXISTS: &str = "SELECT COUNT(*)::text FROM information_schema.tables \
     WHERE table_schema = $1::text AND table_name = $2::text";

pub const CONSTRAINT_EXISTS: &str = "SELECT COUNT(*)::text FROM information_schema.table_constraints \
     WHERE table_schema = $1::text AND constraint_type = $2::text AND constraint_name = $3::text";

pub const FOREIGN_KEY_COLUMNS: &str = "SELECT kcu.column_name::text \
     FROM information_schema.key_column_usage AS kcu \
     WHERE kcu.table_schema = $1::text AND kcu.table_name = $2::text AND kcu.constraint_name = $3::text \
     ORDER BY kcu.ordinal_position";

/// Columns in catalog order.
pub const COLUMNS: &str = "SELECT column_name::text, data_type::text, is_nullable::text, \
     column_default::text, udt_name::text, character_maximum_length::text, \
     numeric_precision::text, numeric_scale::text, is_identity::text, collation_name::text \
     FROM information_schema.columns \
     WHERE table_schema = $1::text AND table_name = $2::text \
     ORDER BY ordinal_position";

/// Index columns, ordered by index name then position inside the index.
pub const INDEXES: &str = "SELECT i.relname::text AS index_name, \
     a.attname::text AS column_name, \
     idx.indisprimary::text AS is_primary, \
     idx.indisunique::text AS is_unique \
     FROM pg_class t, pg_class i, pg_index idx, pg_attribute a, pg_namespace n \
     WHERE t.oid = idx.indrelid \
       AND i.oid = idx.indexrelid \
       AND n.oid = t.relnamespace \
       AND a.attrelid = t.oid \
       AND a.attnum = ANY(idx.indkey) \
       AND t.relkind = 'r' \
       AND n.nspname = $1::text \
       AND t.relname = $2::text \
     ORDER BY i.relname, array_position(idx.indkey, a.attnum)";

/// Foreign-key column pairs, grouped by constraint and ordered by key position.
pub const FOREIGN_KEYS: &str = "SELECT tc.constraint_name::text, kcu.column_name::text, \
     ccu.table_name::text AS foreign_table_name, ccu.column_name::text AS foreign_column_name, \
     rc.update_rule::text, rc.delete_rule::text \
     FROM information_schema.table_constraints AS tc \
     JOIN information_schema.key_column_usage AS kcu \
       ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
     JOIN information_schema.referential_constraints AS rc \
       ON rc.constraint_name = tc.constraint_name AND rc.constraint_schema = tc.table_schema \
     JOIN information_schema.key_column_usage AS ccu \
       ON ccu.constraint_name = rc.unique_constraint_name \
      AND ccu.constraint_schema = rc.unique_constraint_schema \
      AND ccu.ordinal_position = kcu.position_in_unique_constraint \
     WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1::text AND tc.table_name = $2::text \
     ORDER BY tc.constraint_name, kcu.ordinal_position";
