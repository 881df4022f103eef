//! The seven ordered scenarios of the Story Spoiler contract.
//!
//! Registration order is the contract order: edit, list and delete reuse
//! the id captured by the create scenario, and the two trailing negative
//! scenarios rely on the sentinel id that never exists.

use std::{future::Future, pin::Pin, sync::Arc};

use eyre::OptionExt;
use spoilcheck_core::{check, check_eq, http::StatusCode, Runner};

use crate::{
    context::Context,
    model::{ApiResponse, Story},
    payload,
};

/// Story id that is guaranteed not to exist on the server.
const UNKNOWN_STORY_ID: &str = "-1";

type ScenarioFuture = Pin<Box<dyn Future<Output = eyre::Result<()>> + Send>>;

fn add<F, Fut>(runner: &mut Runner, name: &str, ctx: &Arc<Context>, scenario: F)
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<()>> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    runner.add_test(
        name,
        "story",
        Arc::new(move || -> ScenarioFuture { Box::pin(scenario(Arc::clone(&ctx))) }),
    );
}

/// Register the scenarios in contract order.
pub fn register(runner: &mut Runner, ctx: &Arc<Context>) {
    add(runner, "create_story", ctx, create_story);
    add(runner, "edit_story", ctx, edit_story);
    add(runner, "list_stories", ctx, list_stories);
    add(runner, "delete_story", ctx, delete_story);
    add(
        runner,
        "create_story_without_required_fields",
        ctx,
        create_story_without_required_fields,
    );
    add(runner, "edit_missing_story", ctx, edit_missing_story);
    add(runner, "delete_missing_story", ctx, delete_missing_story);
}

/// Create a story with valid random fields and capture the returned id for
/// the scenarios after this one.
async fn create_story(ctx: Arc<Context>) -> eyre::Result<()> {
    let story = Story {
        title: payload::story_title(),
        description: payload::story_description(),
        url: Some(String::new()),
        ..Story::default()
    };

    let res = ctx.client.post("/api/Story/Create").json(&story).send().await?;
    check_eq!(StatusCode::CREATED, res.status());

    let body: ApiResponse = res.json().await?;
    check_eq!(Some("Successfully created!"), body.message.as_deref());

    let story_id = body.story_id.unwrap_or_default();
    check!(!story_id.is_empty(), "response did not carry a storyId");
    ctx.remember_story(story_id);

    Ok(())
}

/// Edit the story captured by `create_story` with fresh random fields.
async fn edit_story(ctx: Arc<Context>) -> eyre::Result<()> {
    let story_id = ctx
        .story_id()
        .ok_or_eyre("no story id captured; create_story must run first")?;
    let edited = Story {
        title: payload::edited_title(),
        description: payload::edited_description(),
        ..Story::default()
    };

    let res = ctx
        .client
        .put(&format!("/api/Story/Edit/{story_id}"))
        .json(&edited)
        .send()
        .await?;
    check_eq!(StatusCode::OK, res.status());

    let body: ApiResponse = res.json().await?;
    check_eq!(Some("Successfully edited"), body.message.as_deref());

    Ok(())
}

/// List all stories; at least the one created earlier must be present.
async fn list_stories(ctx: Arc<Context>) -> eyre::Result<()> {
    let res = ctx.client.get("/api/Story/All").send().await?;
    check_eq!(StatusCode::OK, res.status());

    let stories: Vec<serde_json::Value> = res.json().await?;
    check!(!stories.is_empty(), "expected at least one story in the listing");

    Ok(())
}

/// Delete the story captured by `create_story`.
async fn delete_story(ctx: Arc<Context>) -> eyre::Result<()> {
    let story_id = ctx
        .story_id()
        .ok_or_eyre("no story id captured; create_story must run first")?;

    let res = ctx
        .client
        .delete(&format!("/api/Story/Delete/{story_id}"))
        .send()
        .await?;
    check_eq!(StatusCode::OK, res.status());

    let body: ApiResponse = res.json().await?;
    check_eq!(Some("Deleted successfully!"), body.message.as_deref());

    Ok(())
}

/// Creating with empty required fields must be rejected with both
/// validation messages.
async fn create_story_without_required_fields(ctx: Arc<Context>) -> eyre::Result<()> {
    let empty = Story::default();

    let res = ctx.client.post("/api/Story/Create").json(&empty).send().await?;
    check_eq!(StatusCode::BAD_REQUEST, res.status());

    let body = res.text().await?;
    check!(
        body.contains("The Title field is required."),
        "missing title validation message in {body}"
    );
    check!(
        body.contains("The Description field is required."),
        "missing description validation message in {body}"
    );

    Ok(())
}

/// Editing a story that does not exist yields not-found.
async fn edit_missing_story(ctx: Arc<Context>) -> eyre::Result<()> {
    let story = Story {
        title: "Non existing story title".into(),
        description: "Non existing story description".into(),
        ..Story::default()
    };

    let res = ctx
        .client
        .put(&format!("/api/Story/Edit/{UNKNOWN_STORY_ID}"))
        .json(&story)
        .send()
        .await?;
    check_eq!(StatusCode::NOT_FOUND, res.status());

    let body: ApiResponse = res.json().await?;
    check_eq!(Some("No spoilers..."), body.message.as_deref());

    Ok(())
}

/// Deleting a story that does not exist is rejected, not ignored: delete
/// is deliberately not idempotent in this contract.
async fn delete_missing_story(ctx: Arc<Context>) -> eyre::Result<()> {
    let res = ctx
        .client
        .delete(&format!("/api/Story/Delete/{UNKNOWN_STORY_ID}"))
        .send()
        .await?;
    check_eq!(StatusCode::BAD_REQUEST, res.status());

    let body: ApiResponse = res.json().await?;
    check_eq!(
        Some("Unable to delete this story spoiler!"),
        body.message.as_deref()
    );

    Ok(())
}
