use super::collaborators::{State, User, Workspace};
use super::organization::Organization;
use super::project_type::ProjectType;
use super::reference::{Identified, Reference};
use super::{Aggregate, DeletionMode, related};
use crate::core::{Collection, EntityId};
use crate::storage::{CollectionSchema, FieldKind, FieldRule, Populate};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SLUG: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// A file entry embedded in a project. Content lives in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ProjectFile {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: None,
            mime_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub organization: Option<Reference<Organization>>,
    #[serde(rename = "type", default)]
    pub project_type: Option<Reference<ProjectType>>,
    #[serde(default)]
    pub owner: Option<Reference<User>>,
    #[serde(default)]
    pub state: Option<Reference<State>>,
    #[serde(default)]
    pub workspace: Option<Reference<Workspace>>,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
    pub slug: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Identified for Project {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Aggregate for Project {
    const ENTITY: &'static str = "Project";
    const COLLECTION: Collection = Collection::Projects;
    const DELETION: DeletionMode = DeletionMode::Logical;
    const POPULATE: &'static [Populate] = &[
        related::<Organization>("organization"),
        related::<ProjectType>("type"),
        related::<User>("owner"),
        related::<State>("state"),
        related::<Workspace>("workspace"),
    ];
}

/// Input of `ProjectWriter::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub organization: Reference<Organization>,
    #[serde(rename = "type")]
    pub project_type: Reference<ProjectType>,
    pub owner: Reference<User>,
    #[serde(default)]
    pub state: Option<Reference<State>>,
    #[serde(default)]
    pub workspace: Option<Reference<Workspace>>,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
}

impl NewProject {
    pub fn new(
        name: impl Into<String>,
        organization: impl Into<Reference<Organization>>,
        project_type: impl Into<Reference<ProjectType>>,
        owner: impl Into<Reference<User>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            organization: organization.into(),
            project_type: project_type.into(),
            owner: owner.into(),
            state: None,
            workspace: None,
            files: Vec::new(),
            slug: None,
            is_template: false,
            path: None,
            view: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn state(mut self, state: impl Into<Reference<State>>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn workspace(mut self, workspace: impl Into<Reference<Workspace>>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn files(mut self, files: Vec<ProjectFile>) -> Self {
        self.files = files;
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn template(mut self) -> Self {
        self.is_template = true;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }
}

/// Lowercase, dash-separated form of a project name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

pub(crate) fn schema() -> CollectionSchema {
    let files = FieldKind::custom(|value| {
        let files: Vec<ProjectFile> = serde_json::from_value(value.clone())
            .map_err(|err| format!("must be a list of files ({})", err))?;
        match files.iter().position(|file| file.name.trim().is_empty()) {
            Some(index) => Err(format!("file {} has an empty name", index)),
            None => Ok(()),
        }
    });

    CollectionSchema::default()
        .field(FieldRule::new("name", FieldKind::String).required())
        .field(FieldRule::new("description", FieldKind::String))
        .field(FieldRule::new("organization", FieldKind::Reference).required())
        .field(FieldRule::new("type", FieldKind::Reference).required())
        .field(FieldRule::new("owner", FieldKind::Reference).required())
        .field(FieldRule::new("state", FieldKind::Reference))
        .field(FieldRule::new("workspace", FieldKind::Reference))
        .field(FieldRule::new("files", files))
        .field(FieldRule::new("slug", FieldKind::Pattern(SLUG.clone())).required())
        .field(FieldRule::new("isTemplate", FieldKind::Boolean))
        .field(FieldRule::new("path", FieldKind::String))
        .field(FieldRule::new("view", FieldKind::String))
        .field(FieldRule::new("createdAt", FieldKind::Timestamp).required())
        .field(FieldRule::new("updatedAt", FieldKind::Timestamp).required())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Quarterly Report 2024"), "quarterly-report-2024");
        assert_eq!(slugify("  --Hello,   World!-- "), "hello-world");
        assert_eq!(slugify("???"), "project");
    }

    #[test]
    fn test_slug_pattern() {
        assert!(SLUG.is_match("alpha-beta-2"));
        assert!(!SLUG.is_match("Alpha"));
        assert!(!SLUG.is_match("alpha--beta"));
    }

    #[test]
    fn test_schema_checks_files() {
        let doc = serde_json::json!({"files": [{"name": " ", "path": "/a"}]});
        let violations = schema().validate(doc.as_object().unwrap());
        assert!(violations.iter().any(|v| v.field == "files"));
    }
}
