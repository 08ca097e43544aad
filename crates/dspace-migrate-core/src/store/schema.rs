//! DSpace 5 table layout, restricted to the tables the migration touches.
//!
//! `metadatavalue.resource_id`, `handle.resource_id` and
//! `resourcepolicy.resource_id` are polymorphic in DSpace and therefore carry
//! no foreign key; every other item reference does.

pub(crate) const DSPACE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS metadataschemaregistry (
    metadata_schema_id INTEGER PRIMARY KEY,
    namespace TEXT,
    short_id TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS metadatafieldregistry (
    metadata_field_id INTEGER PRIMARY KEY,
    metadata_schema_id INTEGER NOT NULL REFERENCES metadataschemaregistry(metadata_schema_id),
    element TEXT NOT NULL,
    qualifier TEXT,
    scope_note TEXT
);

CREATE TABLE IF NOT EXISTS item (
    item_id INTEGER PRIMARY KEY,
    submitter_id INTEGER,
    in_archive INTEGER NOT NULL DEFAULT 0,
    withdrawn INTEGER NOT NULL DEFAULT 0,
    owning_collection INTEGER,
    last_modified TEXT,
    discoverable INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS metadatavalue (
    metadata_value_id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL,
    metadata_field_id INTEGER NOT NULL REFERENCES metadatafieldregistry(metadata_field_id),
    text_value TEXT,
    text_lang TEXT,
    place INTEGER,
    authority TEXT,
    confidence INTEGER DEFAULT -1,
    resource_type_id INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS metadatavalue_item_idx
    ON metadatavalue(resource_id, resource_type_id);
CREATE INDEX IF NOT EXISTS metadatavalue_field_idx
    ON metadatavalue(metadata_field_id, text_value);

CREATE TABLE IF NOT EXISTS handle (
    handle_id INTEGER PRIMARY KEY AUTOINCREMENT,
    handle TEXT UNIQUE,
    resource_type_id INTEGER,
    resource_id INTEGER
);

CREATE TABLE IF NOT EXISTS community2collection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id INTEGER NOT NULL,
    collection_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS collection2item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_id INTEGER NOT NULL,
    item_id INTEGER NOT NULL REFERENCES item(item_id)
);

CREATE TABLE IF NOT EXISTS communities2item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id INTEGER NOT NULL,
    item_id INTEGER NOT NULL REFERENCES item(item_id)
);

CREATE TABLE IF NOT EXISTS resourcepolicy (
    policy_id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_type_id INTEGER,
    resource_id INTEGER,
    action_id INTEGER,
    eperson_id INTEGER,
    epersongroup_id INTEGER
);

CREATE TABLE IF NOT EXISTS bitstream (
    bitstream_id INTEGER PRIMARY KEY AUTOINCREMENT,
    bitstream_format_id INTEGER,
    checksum TEXT,
    checksum_algorithm TEXT,
    internal_id TEXT,
    deleted INTEGER NOT NULL DEFAULT 0,
    store_number INTEGER,
    sequence_id INTEGER,
    size_bytes INTEGER
);

CREATE TABLE IF NOT EXISTS bundle (
    bundle_id INTEGER PRIMARY KEY AUTOINCREMENT,
    primary_bitstream_id INTEGER REFERENCES bitstream(bitstream_id)
);

CREATE TABLE IF NOT EXISTS item2bundle (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL REFERENCES item(item_id),
    bundle_id INTEGER NOT NULL REFERENCES bundle(bundle_id)
);

CREATE TABLE IF NOT EXISTS bundle2bitstream (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bundle_id INTEGER NOT NULL REFERENCES bundle(bundle_id),
    bitstream_id INTEGER NOT NULL REFERENCES bitstream(bitstream_id),
    bitstream_order INTEGER
);

CREATE TABLE IF NOT EXISTS workflowitem (
    workflow_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER UNIQUE REFERENCES item(item_id),
    collection_id INTEGER,
    state INTEGER
);

CREATE TABLE IF NOT EXISTS workspaceitem (
    workspace_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER REFERENCES item(item_id),
    collection_id INTEGER,
    stage_reached INTEGER
);
"#;
