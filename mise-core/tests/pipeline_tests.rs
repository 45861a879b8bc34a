//! End-to-end pipeline tests against canned HTTP, a fake backend and the
//! in-memory store.

use std::sync::Arc;

use mise_core::ai::ExtractionInput;
use mise_core::video::{oembed_url, watch_page_url};
use mise_core::{
    ExtractionOutcome, FakeBackend, MemoryStore, MockClient, PipelineError, RecipePipeline,
    RecipeStore, SaveOutcome, SourceType,
};
use serde_json::json;
use uuid::Uuid;

const BLOG_PAGE: &str = r#"<html><head>
<script type="application/ld+json">{"@type":"Recipe","name":"Chicken Salad","recipeIngredient":["2 chicken breasts","1 cup mayo"]}</script>
</head><body></body></html>"#;

const SOUP_PAGE: &str = r#"<html><head>
<script type="application/ld+json">{"@type":"Recipe","name":"Chicken Soup","recipeIngredient":["1 chicken breast","3 carrots"]}</script>
</head><body></body></html>"#;

const CHICKEN_SALAD: &str = r#"{
    "title": "Chicken Salad",
    "ingredients": [
        {"name": "  Chicken Breasts ", "quantity": "2"},
        {"name": "mayonnaise", "quantity": "1", "unit": "cup"}
    ],
    "steps": [{"stepNumber": 1, "instruction": "Mix everything."}]
}"#;

const CHICKEN_SOUP: &str = r#"{
    "title": "Chicken Soup",
    "ingredients": [
        {"name": "chicken breasts", "quantity": "1"},
        {"name": "Carrots", "quantity": "3"}
    ],
    "steps": [{"stepNumber": 1, "instruction": "Simmer."}]
}"#;

const OEMBED: &str = r#"{"title":"Easy Fried Rice","author_name":"Wok Nights","thumbnail_url":"https://i.ytimg.com/vi/vid123/hqdefault.jpg"}"#;

fn watch_page(tracks: &str) -> String {
    format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"videoDetails":{{"lengthSeconds":"300"}},"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":{}}}}}}};</script></html>"#,
        tracks
    )
}

fn pipeline(client: MockClient, backend: FakeBackend) -> RecipePipeline<MemoryStore> {
    RecipePipeline::new(Arc::new(client), Arc::new(backend), MemoryStore::new())
}

#[tokio::test]
async fn test_dedup_gate_scenario() {
    let client = MockClient::new()
        .with_text("https://blog.example/recipe?utm_source=x", BLOG_PAGE)
        .with_text("https://blog.example/recipe", BLOG_PAGE);
    let pipeline = pipeline(client, FakeBackend::new().with_default_response(CHICKEN_SALAD));
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let saved = pipeline
        .extract_and_save("https://blog.example/recipe?utm_source=x", user_a)
        .await
        .unwrap();
    let SaveOutcome::Created(recipe_id) = saved else {
        panic!("expected a new recipe, got {:?}", saved);
    };

    match pipeline
        .extract_from_url("https://blog.example/recipe", user_a)
        .await
        .unwrap()
    {
        ExtractionOutcome::Existing(existing) => {
            assert_eq!(existing.id, recipe_id);
            assert_eq!(existing.title, "Chicken Salad");
        }
        other => panic!("expected existing recipe, got {:?}", other),
    }

    match pipeline
        .extract_from_url("https://blog.example/recipe", user_b)
        .await
        .unwrap()
    {
        ExtractionOutcome::Extracted(extracted) => {
            assert_eq!(extracted.source.source_type, SourceType::Blog);
            assert_eq!(extracted.recipe.title, "Chicken Salad");
        }
        other => panic!("expected a fresh extraction, got {:?}", other),
    }

    assert_eq!(pipeline.store().recipes().len(), 1);
}

#[tokio::test]
async fn test_existing_recipe_skips_fetch_and_extraction() {
    let client = Arc::new(MockClient::new().with_text("https://blog.example/recipe", BLOG_PAGE));
    let backend = Arc::new(FakeBackend::new().with_default_response(CHICKEN_SALAD));
    let pipeline = RecipePipeline::new(client.clone(), backend.clone(), MemoryStore::new());
    let user = Uuid::new_v4();

    pipeline
        .extract_and_save("https://blog.example/recipe", user)
        .await
        .unwrap();
    assert_eq!(client.requests().len(), 1);
    assert_eq!(backend.requests().len(), 1);

    let again = pipeline
        .extract_and_save("https://www.blog.example/recipe/#comments", user)
        .await
        .unwrap();
    assert!(matches!(again, SaveOutcome::Existing(_)));
    assert_eq!(client.requests().len(), 1);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_save_rechecks_dedup() {
    let client = MockClient::new().with_text("https://blog.example/recipe", BLOG_PAGE);
    let pipeline = pipeline(client, FakeBackend::new().with_default_response(CHICKEN_SALAD));
    let user = Uuid::new_v4();

    let first = pipeline.extract_only("https://blog.example/recipe").await.unwrap();
    let second = pipeline.extract_only("https://blog.example/recipe").await.unwrap();

    assert!(matches!(
        pipeline.save_extracted(user, &first).unwrap(),
        SaveOutcome::Created(_)
    ));
    assert!(matches!(
        pipeline.save_extracted(user, &second).unwrap(),
        SaveOutcome::Existing(_)
    ));
    assert_eq!(pipeline.store().recipes().len(), 1);
}

#[tokio::test]
async fn test_ingredient_resolution_is_idempotent() {
    let client = MockClient::new()
        .with_text("https://blog.example/salad", BLOG_PAGE)
        .with_text("https://blog.example/soup", SOUP_PAGE)
        .with_text("https://blog.example/salad-again", BLOG_PAGE);
    let backend = FakeBackend::new()
        .with_response("Chicken Salad", CHICKEN_SALAD)
        .with_response("Chicken Soup", CHICKEN_SOUP);
    let pipeline = pipeline(client, backend);

    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    pipeline
        .extract_and_save("https://blog.example/salad", user_a)
        .await
        .unwrap();
    pipeline
        .extract_and_save("https://blog.example/soup", user_b)
        .await
        .unwrap();

    let names: Vec<String> = pipeline
        .store()
        .ingredients()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names.len(), 3, "{:?}", names);
    assert_eq!(names.iter().filter(|n| *n == "chicken breasts").count(), 1);

    pipeline
        .extract_and_save("https://blog.example/salad-again", user_a)
        .await
        .unwrap();
    assert_eq!(pipeline.store().ingredients().len(), 3);
    assert_eq!(pipeline.store().recipes().len(), 3);
}

#[tokio::test]
async fn test_transcript_path() {
    let client = MockClient::new()
        .with_text(&oembed_url("vid123"), OEMBED)
        .with_text(
            &watch_page_url("vid123"),
            &watch_page(r#"[{"baseUrl":"https://yt.example/tt?v=vid123","languageCode":"en"}]"#),
        )
        .with_text(
            "https://yt.example/tt?v=vid123",
            r#"<transcript><text start="5" dur="3">Heat the wok until smoking</text><text start="65" dur="4">Add the day-old rice</text></transcript>"#,
        );
    let backend = Arc::new(FakeBackend::new().with_default_response(
        r#"{"title":"Fried Rice","ingredients":[{"name":"rice"}],"steps":[
            {"stepNumber":1,"instruction":"Heat wok.","timestampSeconds":5},
            {"stepNumber":2,"instruction":"Add rice.","timestampSeconds":65},
            {"stepNumber":3,"instruction":"Serve.","timestampSeconds":900}
        ]}"#,
    ));
    let pipeline = RecipePipeline::new(Arc::new(client), backend.clone(), MemoryStore::new());

    let extracted = pipeline
        .extract_only("https://youtu.be/vid123")
        .await
        .unwrap();

    assert_eq!(extracted.source.source_type, SourceType::Youtube);
    assert_eq!(extracted.source.youtube_video_id.as_deref(), Some("vid123"));
    assert_eq!(extracted.source.author.as_deref(), Some("Wok Nights"));
    assert_eq!(extracted.recipe.steps[1].timestamp_seconds, Some(65));
    // beyond the 300 second video length
    assert_eq!(extracted.recipe.steps[2].timestamp_seconds, None);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].1.input {
        ExtractionInput::Text { content } => {
            assert!(content.starts_with("Video title: Easy Fried Rice\nBy: Wok Nights"));
            assert!(content.contains("[0:05] Heat the wok until smoking"));
            assert!(content.contains("[1:05] Add the day-old rice"));
        }
        other => panic!("expected text input, got {:?}", other),
    }
}

#[tokio::test]
async fn test_native_video_path_skips_captions() {
    let client = Arc::new(
        MockClient::new()
            .with_text(&oembed_url("vid123"), OEMBED)
            .with_text(&watch_page_url("vid123"), &watch_page("[]")),
    );
    let backend = Arc::new(FakeBackend::with_sample_recipe().with_native_video());
    let pipeline = RecipePipeline::new(client.clone(), backend.clone(), MemoryStore::new());

    let extracted = pipeline
        .extract_only("https://www.youtube.com/shorts/vid123")
        .await
        .unwrap();
    assert_eq!(extracted.recipe.title, "Garlic Butter Pasta");
    assert_eq!(
        extracted.source.thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/vid123/hqdefault.jpg")
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].1.input,
        ExtractionInput::NativeVideo {
            video_url: "https://youtube.com/watch?v=vid123".to_string()
        }
    );
    assert!(requests[0].1.instructions.contains("300 seconds"));
    assert!(!client
        .requests()
        .iter()
        .any(|(url, _)| url.starts_with("https://yt.example")));
}

#[tokio::test]
async fn test_no_captions_is_reported() {
    let client = MockClient::new()
        .with_text(&oembed_url("silent"), OEMBED)
        .with_text(&watch_page_url("silent"), &watch_page("[]"));
    let backend = Arc::new(FakeBackend::with_sample_recipe());
    let pipeline = RecipePipeline::new(Arc::new(client), backend.clone(), MemoryStore::new());

    let err = pipeline
        .extract_only("https://www.youtube.com/watch?v=silent")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoCaptions { ref video_id } if video_id == "silent"));
    assert!(err.user_message().contains("no captions"));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_url_fails_before_any_request() {
    let client = Arc::new(MockClient::new());
    let pipeline = RecipePipeline::new(
        client.clone(),
        Arc::new(FakeBackend::with_sample_recipe()),
        MemoryStore::new(),
    );

    for url in ["not a url", "ftp://example.com/x", "https://youtube.com/feed/library"] {
        let err = pipeline.extract_from_url(url, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl(_)), "{}: {:?}", url, err);
    }
    assert!(client.requests().is_empty());
    assert!(pipeline.store().statements().is_empty());
}

#[tokio::test]
async fn test_fetch_and_extraction_failures() {
    let client = MockClient::new()
        .with_status("https://blog.example/gone", 404)
        .with_text("https://blog.example/recipe", BLOG_PAGE);
    let backend = FakeBackend::new().with_failure("Chicken Salad", "upstream timeout");
    let pipeline = pipeline(client, backend);

    let err = pipeline
        .extract_only("https://blog.example/gone")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Blog(_)));
    assert_eq!(err.user_message(), "Failed to extract content from URL");

    let err = pipeline
        .extract_only("https://blog.example/recipe")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Extraction(_)));
    assert_eq!(err.user_message(), "Failed to extract recipe");
}

#[tokio::test]
async fn test_large_recipe_is_chunked() {
    let ingredients: Vec<_> = (0..120)
        .map(|i| json!({"name": format!("spice {}", i), "quantity": "1", "unit": "tsp"}))
        .collect();
    let steps: Vec<_> = (0..50)
        .map(|i| json!({"stepNumber": i + 1, "instruction": format!("Step {}", i + 1)}))
        .collect();
    let response = json!({"title": "Spice Blend", "ingredients": ingredients, "steps": steps});

    let client = MockClient::new().with_text("https://blog.example/spices", BLOG_PAGE);
    let pipeline = pipeline(
        client,
        FakeBackend::new().with_default_response(&response.to_string()),
    );

    let outcome = pipeline
        .extract_and_save("https://blog.example/spices", Uuid::new_v4())
        .await
        .unwrap();
    let SaveOutcome::Created(recipe_id) = outcome else {
        panic!("expected a new recipe");
    };

    let store = pipeline.store();
    let ceiling = store.max_params_per_statement();
    for statement in store.statements() {
        assert!(statement.params <= ceiling, "{:?}", statement);
    }
    assert_eq!(store.steps_for(recipe_id).len(), 50);
    assert_eq!(store.recipe_ingredients_for(recipe_id).len(), 120);
    assert_eq!(store.ingredients().len(), 120);
}

#[tokio::test]
async fn test_delete_and_merge_through_pipeline() {
    let client = MockClient::new().with_text("https://blog.example/recipe", BLOG_PAGE);
    let pipeline = pipeline(client, FakeBackend::new().with_default_response(CHICKEN_SALAD));
    let owner = Uuid::new_v4();

    let SaveOutcome::Created(recipe_id) = pipeline
        .extract_and_save("https://blog.example/recipe", owner)
        .await
        .unwrap()
    else {
        panic!("expected a new recipe");
    };

    let mayo = pipeline.store().seed_ingredient("mayo");
    let mayonnaise = pipeline
        .store()
        .ingredients()
        .into_iter()
        .find(|i| i.name == "mayonnaise")
        .unwrap()
        .id;
    assert_eq!(pipeline.merge_ingredients(mayonnaise, mayo).unwrap(), 1);

    let err = pipeline.delete_recipe(Uuid::new_v4(), recipe_id).unwrap_err();
    assert!(matches!(err, PipelineError::Store(mise_core::StoreError::Validation(_))));

    pipeline.delete_recipe(owner, recipe_id).unwrap();
    assert!(pipeline.store().recipes().is_empty());
}
