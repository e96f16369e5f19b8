//! Turns raw project rows into gallery entries.

use obra_core::client_name::resolve_client_name;
use obra_db::models::project::{Project, ProjectImagesRow};
use obra_db::models::project_image::ProjectImage;
use serde::{Deserialize, Serialize};

/// A project with its images as loaded, before ordering and filtering.
#[derive(Debug, Clone)]
pub struct RawProject {
    pub project: Project,
    pub images: Vec<ProjectImage>,
}

impl From<ProjectImagesRow> for RawProject {
    fn from(row: ProjectImagesRow) -> Self {
        Self {
            project: row.project,
            images: row.images.0,
        }
    }
}

/// A gallery-ready project: at least one image, images in display order and
/// `client_name` resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWithImages {
    #[serde(flatten)]
    pub project: Project,
    pub images: Vec<ProjectImage>,
}

/// Order images, resolve client names and drop projects without images.
pub fn transform_projects(raw: Vec<RawProject>) -> Vec<ProjectWithImages> {
    raw.into_iter()
        .filter(|p| !p.images.is_empty())
        .map(|RawProject { mut project, mut images }| {
            images.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then(a.created_at.cmp(&b.created_at))
            });
            project.client_name = resolve_client_name(
                project.client_name.as_deref(),
                project.description.as_deref(),
            );
            ProjectWithImages { project, images }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn project(description: Option<&str>, client_name: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            title: "Moradia T3".to_string(),
            category: None,
            city: None,
            description: description.map(str::to_string),
            cover_image: None,
            start_date: None,
            end_date: None,
            delivery_date: None,
            completion_deadline: None,
            status: "active".to_string(),
            client_name: client_name.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    fn image(project_id: uuid::Uuid, position: i32, minute: i64) -> ProjectImage {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute);
        ProjectImage {
            id: Uuid::new_v4(),
            project_id,
            url: format!("/img/{position}-{minute}.jpg"),
            caption: None,
            image_date: None,
            position,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn projects_without_images_are_dropped() {
        let bare = project(None, None);
        let shown = project(None, None);
        let shown_id = shown.id;
        let raw = vec![
            RawProject {
                project: bare,
                images: vec![],
            },
            RawProject {
                images: vec![image(shown_id, 0, 0)],
                project: shown,
            },
        ];

        let out = transform_projects(raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].project.id, shown_id);
    }

    #[test]
    fn images_sorted_by_position_then_creation() {
        let p = project(None, None);
        let id = p.id;
        let raw = vec![RawProject {
            project: p,
            images: vec![image(id, 1, 0), image(id, 0, 5), image(id, 0, 2)],
        }];

        let out = transform_projects(raw);
        let order: Vec<(i32, String)> = out[0]
            .images
            .iter()
            .map(|i| (i.position, i.url.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, "/img/0-2.jpg".to_string()),
                (0, "/img/0-5.jpg".to_string()),
                (1, "/img/1-0.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn client_name_prefers_column_then_description() {
        let stored = project(Some("Cliente: Outro"), Some("Grupo Sousa"));
        let parsed = project(Some("Obra nova.\nCliente: Maria Costa."), None);
        let stored_id = stored.id;
        let parsed_id = parsed.id;
        let raw = vec![
            RawProject {
                images: vec![image(stored_id, 0, 0)],
                project: stored,
            },
            RawProject {
                images: vec![image(parsed_id, 0, 0)],
                project: parsed,
            },
        ];

        let out = transform_projects(raw);
        assert_eq!(out[0].project.client_name.as_deref(), Some("Grupo Sousa"));
        assert_eq!(out[1].project.client_name.as_deref(), Some("Maria Costa"));
    }

    #[test]
    fn serializes_project_fields_flat() {
        let p = project(None, Some("ACME"));
        let id = p.id;
        let entry = ProjectWithImages {
            images: vec![image(id, 0, 0)],
            project: p,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["client_name"], "ACME");
        assert_eq!(json["images"].as_array().unwrap().len(), 1);
        assert!(json.get("project").is_none());
    }
}
