//! Local validation of ids, query parameters and bodies
//!
//! These checks reject requests the API would answer with a 400 before any
//! token is fetched or any request is sent.

use serde_json::{Map, Value};

use crate::Error;

const ALL: &[&str] = &["fields", "page", "limit", "sort"];
const GET: &[&str] = &["fields"];
const ALL_USERS: &[&str] = &[
    "fields", "page", "limit", "sort", "username", "surname", "firstname", "email",
];
const ALL_COMMUNITIES: &[&str] = &["fields", "page", "limit", "sort", "description", "name"];
const ALL_MEMBERS: &[&str] = &["roles", "fields", "page", "limit"];
const ALL_DATABASES: &[&str] = &["fields", "page", "limit", "sort", "name", "title", "schema"];
const ALL_VERSIONS: &[&str] = &["fields", "page", "limit"];
const ALL_UPLOADS: &[&str] = &[
    "fields",
    "sort",
    "page",
    "limit",
    "status",
    "tablename",
    "format",
    "error_message",
    "date",
    "user",
];
const ALL_TRANSACTIONS: &[&str] = &[
    "fields",
    "sort",
    "page",
    "limit",
    "comment",
    "started_at",
    "finished_at",
    "status",
    "user",
];
const ALL_REPORTS: &[&str] = &[
    "author",
    "territory",
    "departements",
    "commune",
    "communities",
    "opening_date",
    "updating_date",
    "closing_date",
    "input_device",
    "comment",
    "status",
    "attributes",
    "box",
    "fields",
    "sort",
    "page",
    "limit",
];

fn allowed_params(operation: &str) -> Option<&'static [&'static str]> {
    match operation {
        "all" => Some(ALL),
        "get" => Some(GET),
        "all_users" => Some(ALL_USERS),
        "all_communities" => Some(ALL_COMMUNITIES),
        "all_members" => Some(ALL_MEMBERS),
        "all_databases" => Some(ALL_DATABASES),
        "all_versions" => Some(ALL_VERSIONS),
        "all_uploads" => Some(ALL_UPLOADS),
        "all_transactions" => Some(ALL_TRANSACTIONS),
        "all_reports" => Some(ALL_REPORTS),
        _ => None,
    }
}

/// A body resource with known fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resource {
    User,
    Community,
    Layer,
    Member,
    Database,
    Table,
    Transaction,
    Permission,
    Report,
}

impl Resource {
    fn fields(self) -> &'static [&'static str] {
        match self {
            Self::User => &["description", "administrator"],
            Self::Community => &[
                "name",
                "description",
                "email",
                "attributes",
                "default_comment",
                "active",
                "all_members_can_valid",
                "shared_extractions",
                "shared_georem",
                "offline_allowed",
                "open_without_affiliation",
                "open_with_email",
            ],
            Self::Layer => &[
                "opacity",
                "visibility",
                "order",
                "role",
                "snapto",
                "geoservice",
                "table",
            ],
            Self::Member => &["profile", "active", "role", "user_id"],
            Self::Database => &[
                "title",
                "source",
                "description",
                "licence",
                "fullDownloadAllowed",
                "extent",
                "writableTimeRange",
                "adapter",
                "dbname",
                "schema",
                "host",
                "databaseType",
                "versioning",
                "conflict",
                "port",
                "username",
                "password",
                "territory",
            ],
            Self::Table => &[
                "name",
                "title",
                "description",
                "id_name",
                "geometry_name",
                "min_zoom_level",
                "max_zoom_level",
                "tile_zoom_level",
                "position",
                "table_name",
                "style",
                "styles",
            ],
            Self::Transaction => &["comment", "actions", "geometry"],
            Self::Permission => &["database", "community", "table", "column", "level"],
            Self::Report => &[
                "community",
                "geometry",
                "comment",
                "status",
                "sketch",
                "attributes",
                "input_device",
                "device_version",
            ],
        }
    }

    fn mandatory(self) -> &'static [&'static str] {
        match self {
            Self::Community => &["name"],
            Self::Layer => &["order"],
            Self::Member => &["user_id"],
            Self::Table => &["name", "title", "id_name", "geometry_name", "table_name"],
            Self::Transaction => &["comment", "actions"],
            Self::Permission => &["database", "community", "level"],
            Self::Report => &["geometry"],
            Self::User | Self::Database => &[],
        }
    }
}

/// Whether a body creates a resource or modifies an existing one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Intent {
    Create,
    Update,
}

/// Parses a caller-supplied id
///
/// Leading and trailing whitespace is ignored.
pub fn parse_id(id: &str) -> Result<u64, Error> {
    id.trim()
        .parse()
        .map_err(|_| Error::invalid("id must be a positive number"))
}

/// Checks query parameter names against the allow-list of `operation`
///
/// Operations without a list of their own fall back to the generic list
/// for their `all_`/`get_` prefix. Operations matching neither are unchecked.
pub(crate) fn params(operation: &str, params: &[(&str, &str)]) -> Result<(), Error> {
    let allowed = allowed_params(operation).or_else(|| {
        operation
            .split_once('_')
            .and_then(|(prefix, _)| allowed_params(prefix))
    });

    let Some(allowed) = allowed else {
        return Ok(());
    };

    match params.iter().find(|(name, _)| !allowed.contains(name)) {
        Some((name, _)) => Err(Error::invalid(format!(
            "Invalid parameter {}: must be in [{}]",
            name,
            allowed.join(", ")
        ))),
        None => Ok(()),
    }
}

/// Checks that `body` is an object with only known fields
///
/// On creation, every mandatory field must be present and not null.
pub(crate) fn body<'a>(
    resource: Resource,
    intent: Intent,
    body: &'a Value,
) -> Result<&'a Map<String, Value>, Error> {
    let object = object(body)?;
    let fields = resource.fields();

    if let Some(name) = object.keys().find(|k| !fields.contains(&k.as_str())) {
        return Err(Error::invalid(format!(
            "Invalid field {}: must be in [{}]",
            name,
            fields.join(", ")
        )));
    }

    if intent == Intent::Create {
        let missing: Vec<_> = resource
            .mandatory()
            .iter()
            .copied()
            .filter(|f| object.get(*f).map_or(true, Value::is_null))
            .collect();

        if !missing.is_empty() {
            return Err(Error::invalid(format!(
                "Missing mandatory fields: [{}]",
                missing.join(", ")
            )));
        }
    }

    Ok(object)
}

/// Checks that `body` is a JSON object
pub(crate) fn object(body: &Value) -> Result<&Map<String, Value>, Error> {
    body.as_object()
        .ok_or_else(|| Error::invalid("body must be a JSON object"))
}
