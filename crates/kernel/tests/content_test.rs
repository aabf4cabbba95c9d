//! Integration tests for the content authoring service.

mod common;

use common::test_env;
use serde_json::json;
use uuid::Uuid;

use vetrina_kernel::content::EntityType;
use vetrina_kernel::error::AppError;
use vetrina_kernel::models::NewEntity;
use vetrina_test_utils::{section_fields, setting_fields, test_fields};

#[tokio::test]
async fn create_populates_draft_side_only() {
    let env = test_env();
    let section = env.create_section("About").await;

    assert_eq!(section.draft["title"], json!("About"));
    assert!(section.published.is_empty());
    assert!(!section.is_published);
    assert!(section.is_visible);
    assert!(section.deleted.is_none());
}

#[tokio::test]
async fn create_rejects_missing_required_fields() {
    let env = test_env();

    let result = env
        .content
        .create(
            EntityType::SocialLink,
            NewEntity {
                fields: test_fields().with_text("platform", "GitHub").build(),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn child_creation_requires_a_live_parent() {
    let env = test_env();

    let orphan = env
        .content
        .create(
            EntityType::SectionBullet,
            NewEntity {
                fields: test_fields().with_text("text", "Rust").build(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(orphan, Err(AppError::Validation(_))));

    let bad_parent = env
        .content
        .create(
            EntityType::SectionBullet,
            NewEntity {
                parent_id: Some(Uuid::now_v7()),
                fields: test_fields().with_text("text", "Rust").build(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(bad_parent, Err(AppError::NotFound)));
}

#[tokio::test]
async fn settings_require_unique_slugs() {
    let env = test_env();
    env.create_setting(EntityType::SiteSetting, "site_title", json!("Jane"))
        .await;

    let duplicate = env
        .content
        .create(
            EntityType::SiteSetting,
            NewEntity {
                slug: Some("site_title".to_string()),
                fields: setting_fields(json!("Other")).build(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));

    let slugless = env
        .content
        .create(
            EntityType::SiteSetting,
            NewEntity {
                fields: setting_fields(json!("Other")).build(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(slugless, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn sections_do_not_take_slugs() {
    let env = test_env();

    let result = env
        .content
        .create(
            EntityType::Section,
            NewEntity {
                slug: Some("about".to_string()),
                fields: section_fields("About").build(),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn soft_deleted_rows_stay_loadable_by_id_only() {
    let env = test_env();
    let section = env.create_section("Old").await;

    env.content
        .soft_delete(EntityType::Section, section.id)
        .await
        .expect("soft delete");

    // Gone from listings.
    let listed = env
        .content
        .list(EntityType::Section)
        .await
        .expect("list sections");
    assert!(listed.is_empty());

    // Still there for the direct admin lookup.
    let loaded = env
        .content
        .load(EntityType::Section, section.id)
        .await
        .expect("direct load");
    assert!(loaded.is_deleted());

    // A second delete is NotFound.
    let again = env.content.soft_delete(EntityType::Section, section.id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
}

#[tokio::test]
async fn display_order_appends_within_siblings() {
    let env = test_env();
    let section_a = env.create_section("A").await;
    let section_b = env.create_section("B").await;
    assert!(section_a.display_order < section_b.display_order);

    // Child ordering is scoped to the parent.
    let other = env.create_section("Other").await;
    let first_here = env.create_bullet(section_a.id, "one").await;
    let first_there = env.create_bullet(other.id, "uno").await;
    assert_eq!(first_here.display_order, 0);
    assert_eq!(first_there.display_order, 0);
}

#[tokio::test]
async fn reorder_persists_a_full_permutation() {
    let env = test_env();
    let a = env.create_section("A").await;
    let b = env.create_section("B").await;
    let c = env.create_section("C").await;

    env.content
        .reorder(EntityType::Section, &[c.id, a.id, b.id])
        .await
        .expect("reorder");

    let listed = env
        .content
        .list(EntityType::Section)
        .await
        .expect("list sections");
    let ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
}

#[tokio::test]
async fn reorder_rejects_unknown_ids() {
    let env = test_env();
    let a = env.create_section("A").await;

    let result = env
        .content
        .reorder(EntityType::Section, &[a.id, Uuid::now_v7()])
        .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn visibility_toggle_is_independent_of_publishing() {
    let env = test_env();
    let section = env.create_section("About").await;

    let hidden = env
        .content
        .set_visibility(EntityType::Section, section.id, false)
        .await
        .expect("hide");
    assert!(!hidden.is_visible);
    assert!(!hidden.is_published);

    env.publisher
        .publish(EntityType::Section, section.id)
        .await
        .expect("publish");

    let row = env
        .content
        .load(EntityType::Section, section.id)
        .await
        .expect("load");
    assert!(row.is_published);
    assert!(!row.is_visible, "publishing must not flip visibility");
}

#[tokio::test]
async fn load_by_slug_finds_settings() {
    let env = test_env();
    let created = env
        .create_setting(EntityType::ThemeSetting, "accent", json!("#7c3aed"))
        .await;

    let loaded = env
        .content
        .load_by_slug(EntityType::ThemeSetting, "accent")
        .await
        .expect("load by slug");
    assert_eq!(loaded.id, created.id);

    let missing = env
        .content
        .load_by_slug(EntityType::ThemeSetting, "missing")
        .await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}
