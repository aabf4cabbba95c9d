//! Entity type registry for publishable content.
//!
//! Every content table shares the same column shape: common bookkeeping
//! columns plus a `<field>_draft` / `<field>_published` pair per editable
//! field. The descriptors here are the single source of truth for that
//! shape — the store builds SQL from them and the publish engine walks
//! them instead of carrying per-table logic.

pub mod service;

pub use service::ContentService;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Publishable entity types, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Section,
    SectionBullet,
    Project,
    ProjectPage,
    SiteSetting,
    ThemeSetting,
    SocialLink,
    ResumeAsset,
}

/// All entity types, in declaration order.
pub const ALL_ENTITY_TYPES: [EntityType; 8] = [
    EntityType::Section,
    EntityType::SectionBullet,
    EntityType::Project,
    EntityType::ProjectPage,
    EntityType::SiteSetting,
    EntityType::ThemeSetting,
    EntityType::SocialLink,
    EntityType::ResumeAsset,
];

/// Root entity types: everything that is not a child of another entity.
/// Bulk publish/discard sweeps walk these; children ride on the cascade.
pub const ROOT_ENTITY_TYPES: [EntityType; 6] = [
    EntityType::Section,
    EntityType::Project,
    EntityType::SiteSetting,
    EntityType::ThemeSetting,
    EntityType::SocialLink,
    EntityType::ResumeAsset,
];

impl EntityType {
    /// Machine name, also used in routes and audit rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::SectionBullet => "section_bullet",
            Self::Project => "project",
            Self::ProjectPage => "project_page",
            Self::SiteSetting => "site_setting",
            Self::ThemeSetting => "theme_setting",
            Self::SocialLink => "social_link",
            Self::ResumeAsset => "resume_asset",
        }
    }

    /// Descriptor for this entity type.
    pub fn descriptor(&self) -> &'static EntityDescriptor {
        descriptor(*self)
    }
}

impl std::str::FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "section" => Ok(Self::Section),
            "section_bullet" => Ok(Self::SectionBullet),
            "project" => Ok(Self::Project),
            "project_page" => Ok(Self::ProjectPage),
            "site_setting" => Ok(Self::SiteSetting),
            "theme_setting" => Ok(Self::ThemeSetting),
            "social_link" => Ok(Self::SocialLink),
            "resume_asset" => Ok(Self::ResumeAsset),
            other => Err(AppError::Validation(format!(
                "unknown entity type: {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value kind of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text, stored as TEXT.
    Text,
    /// URL, stored as TEXT, validated on write.
    Url,
    /// Structured content, stored as JSONB.
    Json,
}

/// One editable field. The store derives the `<name>_draft` and
/// `<name>_published` column pair from `name`.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    /// Draft column name.
    pub fn draft_column(&self) -> String {
        format!("{}_draft", self.name)
    }

    /// Published column name.
    pub fn published_column(&self) -> String {
        format!("{}_published", self.name)
    }
}

/// Shape of one publishable entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub entity: EntityType,
    /// Table name.
    pub table: &'static str,
    /// Editable fields carrying draft/published column pairs.
    pub fields: &'static [FieldSpec],
    /// Child entity type published/discarded with this one, if any.
    pub children: Option<EntityType>,
    /// Parent entity type, if this is a child.
    pub parent: Option<EntityType>,
    /// Draft field used as the human-readable label in summaries.
    pub display_field: Option<&'static str>,
    /// Whether rows carry a natural key in `slug` (key-value entries).
    pub has_slug: bool,
    /// Whether rows participate in the single-active invariant.
    pub has_active: bool,
}

const SECTION: EntityDescriptor = EntityDescriptor {
    entity: EntityType::Section,
    table: "section",
    fields: &[
        FieldSpec::required("title", FieldKind::Text),
        FieldSpec::optional("subtitle", FieldKind::Text),
        FieldSpec::optional("body", FieldKind::Json),
    ],
    children: Some(EntityType::SectionBullet),
    parent: None,
    display_field: Some("title"),
    has_slug: false,
    has_active: false,
};

const SECTION_BULLET: EntityDescriptor = EntityDescriptor {
    entity: EntityType::SectionBullet,
    table: "section_bullet",
    fields: &[
        FieldSpec::required("text", FieldKind::Text),
        FieldSpec::optional("icon", FieldKind::Text),
    ],
    children: None,
    parent: Some(EntityType::Section),
    display_field: Some("text"),
    has_slug: false,
    has_active: false,
};

const PROJECT: EntityDescriptor = EntityDescriptor {
    entity: EntityType::Project,
    table: "project",
    fields: &[
        FieldSpec::required("title", FieldKind::Text),
        FieldSpec::optional("summary", FieldKind::Text),
        FieldSpec::optional("body", FieldKind::Json),
        FieldSpec::optional("tech_stack", FieldKind::Json),
        FieldSpec::optional("repo_url", FieldKind::Url),
        FieldSpec::optional("live_url", FieldKind::Url),
        FieldSpec::optional("cover_image", FieldKind::Text),
    ],
    children: Some(EntityType::ProjectPage),
    parent: None,
    display_field: Some("title"),
    has_slug: false,
    has_active: false,
};

const PROJECT_PAGE: EntityDescriptor = EntityDescriptor {
    entity: EntityType::ProjectPage,
    table: "project_page",
    fields: &[
        FieldSpec::required("title", FieldKind::Text),
        FieldSpec::optional("body", FieldKind::Json),
    ],
    children: None,
    parent: Some(EntityType::Project),
    display_field: Some("title"),
    has_slug: false,
    has_active: false,
};

const SITE_SETTING: EntityDescriptor = EntityDescriptor {
    entity: EntityType::SiteSetting,
    table: "site_setting",
    fields: &[FieldSpec::optional("value", FieldKind::Json)],
    children: None,
    parent: None,
    display_field: None,
    has_slug: true,
    has_active: false,
};

const THEME_SETTING: EntityDescriptor = EntityDescriptor {
    entity: EntityType::ThemeSetting,
    table: "theme_setting",
    fields: &[FieldSpec::optional("value", FieldKind::Json)],
    children: None,
    parent: None,
    display_field: None,
    has_slug: true,
    has_active: false,
};

const SOCIAL_LINK: EntityDescriptor = EntityDescriptor {
    entity: EntityType::SocialLink,
    table: "social_link",
    fields: &[
        FieldSpec::required("platform", FieldKind::Text),
        FieldSpec::required("url", FieldKind::Url),
        FieldSpec::optional("icon", FieldKind::Text),
    ],
    children: None,
    parent: None,
    display_field: Some("platform"),
    has_slug: false,
    has_active: false,
};

const RESUME_ASSET: EntityDescriptor = EntityDescriptor {
    entity: EntityType::ResumeAsset,
    table: "resume_asset",
    fields: &[
        FieldSpec::required("label", FieldKind::Text),
        FieldSpec::required("file_url", FieldKind::Url),
    ],
    children: None,
    parent: None,
    display_field: Some("label"),
    has_slug: false,
    has_active: true,
};

/// Look up the descriptor for an entity type.
pub fn descriptor(entity: EntityType) -> &'static EntityDescriptor {
    match entity {
        EntityType::Section => &SECTION,
        EntityType::SectionBullet => &SECTION_BULLET,
        EntityType::Project => &PROJECT,
        EntityType::ProjectPage => &PROJECT_PAGE,
        EntityType::SiteSetting => &SITE_SETTING,
        EntityType::ThemeSetting => &THEME_SETTING,
        EntityType::SocialLink => &SOCIAL_LINK,
        EntityType::ResumeAsset => &RESUME_ASSET,
    }
}

/// Structural equality over field values.
///
/// Rides on `serde_json::Value` equality (object comparison is key-order
/// independent) and additionally treats an absent value as equal to an
/// explicit null, so an unset optional field matches a null column.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    a == b
}

/// Validate draft field values against a descriptor.
///
/// With `require_all` set (entity creation), every required field must be
/// present and valid; otherwise (partial draft save) only the provided
/// fields are checked. Unknown field names are rejected in both modes.
pub fn validate_fields(
    desc: &EntityDescriptor,
    fields: &serde_json::Map<String, Value>,
    require_all: bool,
) -> AppResult<()> {
    for name in fields.keys() {
        if !desc.fields.iter().any(|f| f.name == name) {
            return Err(AppError::Validation(format!(
                "unknown field {:?} for entity type {:?}",
                name,
                desc.entity.as_str()
            )));
        }
    }

    for spec in desc.fields {
        let value = fields.get(spec.name);
        match value {
            None => {
                if require_all && spec.required {
                    return Err(AppError::Validation(format!(
                        "missing required field {:?}",
                        spec.name
                    )));
                }
            }
            Some(value) => validate_value(spec, value)?,
        }
    }

    Ok(())
}

fn validate_value(spec: &FieldSpec, value: &Value) -> AppResult<()> {
    if value.is_null() {
        if spec.required {
            return Err(AppError::Validation(format!(
                "field {:?} is required and cannot be null",
                spec.name
            )));
        }
        return Ok(());
    }

    match spec.kind {
        FieldKind::Text => {
            let Some(text) = value.as_str() else {
                return Err(AppError::Validation(format!(
                    "field {:?} must be a string",
                    spec.name
                )));
            };
            if spec.required && text.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "field {:?} must not be empty",
                    spec.name
                )));
            }
        }
        FieldKind::Url => {
            let Some(text) = value.as_str() else {
                return Err(AppError::Validation(format!(
                    "field {:?} must be a URL string",
                    spec.name
                )));
            };
            url::Url::parse(text).map_err(|e| {
                AppError::Validation(format!("field {:?} is not a valid URL: {e}", spec.name))
            })?;
        }
        // Any JSON shape is accepted; renderers own the interpretation.
        FieldKind::Json => {}
    }

    Ok(())
}
