//! Database schema definitions

/// SQL to create the meta table (knowledge base source, model, hash)
pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create the chunks table
pub const CREATE_CHUNKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    idx INTEGER PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT NOT NULL,
    vector BLOB NOT NULL
)
"#;

pub const META_SOURCE: &str = "source";
pub const META_EMBEDDING_MODEL: &str = "embedding_model";
pub const META_CONTENT_HASH: &str = "content_hash";
pub const META_DIMENSIONS: &str = "dimensions";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_META_TABLE, CREATE_CHUNKS_TABLE]
}
