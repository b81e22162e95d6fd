mod common;

use serde_json::Value;

async fn cast(
    app: &common::TestApp,
    token: &str,
    target_id: i32,
    kind: &str,
) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/votes/{target_id}")))
        .bearer_auth(token)
        .json(&serde_json::json!({ "vote_kind": kind }))
        .send()
        .await
        .unwrap()
}

async fn stats(app: &common::TestApp, token: Option<&str>, target_id: i32) -> Value {
    let mut req = app.client.get(app.url(&format!("/votes/{target_id}/stats")));
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn cast_vote_returns_stats() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (_, token) = common::create_test_user(&app.db, "caster").await;
    let location_id = common::create_test_location(&app.db).await;

    let resp = cast(&app, &token, location_id, "upvote").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(body["data"]["downvotes"], 0);
    assert_eq!(body["data"]["user_vote"], "upvote");
}

#[tokio::test]
async fn recast_overwrites_previous_vote() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (_, token) = common::create_test_user(&app.db, "swinger").await;
    let location_id = common::create_test_location(&app.db).await;

    cast(&app, &token, location_id, "upvote").await;
    let resp = cast(&app, &token, location_id, "downvote").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();

    // The old upvote is gone, not counted alongside the new downvote.
    assert_eq!(body["data"]["upvotes"], 0);
    assert_eq!(body["data"]["downvotes"], 1);
    assert_eq!(body["data"]["user_vote"], "downvote");
}

#[tokio::test]
async fn recast_same_kind_is_idempotent() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (user_id, token) = common::create_test_user(&app.db, "repeat").await;
    let location_id = common::create_test_location(&app.db).await;

    cast(&app, &token, location_id, "upvote").await;
    let resp = cast(&app, &token, location_id, "upvote").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(common::live_vote_count(&app.db, user_id, location_id).await, 1);
}

#[tokio::test]
async fn concurrent_casts_leave_exactly_one_live_row() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (user_id, token) = common::create_test_user(&app.db, "racer").await;
    let location_id = common::create_test_location(&app.db).await;

    let casts = (0..10).map(|i| {
        let kind = if i % 2 == 0 { "upvote" } else { "downvote" };
        cast(&app, &token, location_id, kind)
    });
    let responses = futures::future::join_all(casts).await;
    for resp in responses {
        assert_eq!(resp.status(), 201);
    }

    // Never zero, never more than one, regardless of interleaving.
    assert_eq!(common::live_vote_count(&app.db, user_id, location_id).await, 1);
}

#[tokio::test]
async fn invalid_vote_kind_is_rejected() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (user_id, token) = common::create_test_user(&app.db, "badkind").await;
    let location_id = common::create_test_location(&app.db).await;

    let resp = cast(&app, &token, location_id, "sideways").await;
    assert_eq!(resp.status(), 400);

    // Numeric convention is not accepted on the wire.
    let resp = cast(&app, &token, location_id, "1").await;
    assert_eq!(resp.status(), 400);

    assert_eq!(common::live_vote_count(&app.db, user_id, location_id).await, 0);
}

#[tokio::test]
async fn cast_on_missing_target_is_404() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (_, token) = common::create_test_user(&app.db, "lost").await;

    let resp = cast(&app, &token, 999_999_999, "upvote").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn cast_requires_authentication() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let location_id = common::create_test_location(&app.db).await;

    let resp = app
        .client
        .post(app.url(&format!("/votes/{location_id}")))
        .json(&serde_json::json!({ "vote_kind": "upvote" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn remove_without_prior_vote_is_400() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (_, token) = common::create_test_user(&app.db, "remover").await;
    let location_id = common::create_test_location(&app.db).await;

    let resp = app
        .client
        .delete(app.url(&format!("/votes/{location_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn remove_then_stats_shows_no_user_vote() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (user_id, token) = common::create_test_user(&app.db, "regret").await;
    let location_id = common::create_test_location(&app.db).await;

    cast(&app, &token, location_id, "downvote").await;

    let resp = app
        .client
        .delete(app.url(&format!("/votes/{location_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let body = stats(&app, Some(&token), location_id).await;
    assert_eq!(body["data"]["upvotes"], 0);
    assert_eq!(body["data"]["downvotes"], 0);
    assert!(body["data"]["user_vote"].is_null());
    assert_eq!(common::live_vote_count(&app.db, user_id, location_id).await, 0);

    // A second removal has nothing left to remove.
    let resp = app
        .client
        .delete(app.url(&format!("/votes/{location_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn revote_after_removal_revives_the_vote() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (user_id, token) = common::create_test_user(&app.db, "returner").await;
    let location_id = common::create_test_location(&app.db).await;

    cast(&app, &token, location_id, "upvote").await;
    app.client
        .delete(app.url(&format!("/votes/{location_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let resp = cast(&app, &token, location_id, "downvote").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["downvotes"], 1);
    assert_eq!(common::live_vote_count(&app.db, user_id, location_id).await, 1);
}

#[tokio::test]
async fn stats_partition_votes_by_kind() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let location_id = common::create_test_location(&app.db).await;

    for _ in 0..3 {
        let (_, token) = common::create_test_user(&app.db, "up").await;
        cast(&app, &token, location_id, "upvote").await;
    }
    for _ in 0..2 {
        let (_, token) = common::create_test_user(&app.db, "down").await;
        cast(&app, &token, location_id, "downvote").await;
    }

    let body = stats(&app, None, location_id).await;
    assert_eq!(body["data"]["upvotes"], 3);
    assert_eq!(body["data"]["downvotes"], 2);
    assert!(body["data"]["user_vote"].is_null());
}

#[tokio::test]
async fn stats_user_vote_requires_token() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let (_, token) = common::create_test_user(&app.db, "anon").await;
    let location_id = common::create_test_location(&app.db).await;

    cast(&app, &token, location_id, "upvote").await;

    let anonymous = stats(&app, None, location_id).await;
    assert!(anonymous["data"]["user_vote"].is_null());

    let authed = stats(&app, Some(&token), location_id).await;
    assert_eq!(authed["data"]["user_vote"], "upvote");
}

#[tokio::test]
async fn voters_are_listed_most_recent_first() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let location_id = common::create_test_location(&app.db).await;

    let mut user_ids = Vec::new();
    for _ in 0..3 {
        let (user_id, token) = common::create_test_user(&app.db, "order").await;
        cast(&app, &token, location_id, "upvote").await;
        user_ids.push(user_id);
        // Keep creation timestamps strictly ordered.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let resp = app
        .client
        .get(app.url(&format!("/votes/{location_id}/voters")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let upvoters = body["data"]["upvoters"].as_array().unwrap();
    assert_eq!(upvoters.len(), 3);
    let listed: Vec<i64> = upvoters
        .iter()
        .map(|v| v["user_id"].as_i64().unwrap())
        .collect();
    let expected: Vec<i64> = user_ids.iter().rev().map(|id| *id as i64).collect();
    assert_eq!(listed, expected);
    assert!(body["data"]["downvoters"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn voters_exclude_removed_users() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let location_id = common::create_test_location(&app.db).await;

    let (kept_id, kept_token) = common::create_test_user(&app.db, "kept").await;
    let (gone_id, gone_token) = common::create_test_user(&app.db, "gone").await;
    cast(&app, &kept_token, location_id, "upvote").await;
    cast(&app, &gone_token, location_id, "upvote").await;

    common::soft_delete_user(&app.db, gone_id).await;

    let resp = app
        .client
        .get(app.url(&format!("/votes/{location_id}/voters")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();

    let upvoters = body["data"]["upvoters"].as_array().unwrap();
    assert_eq!(upvoters.len(), 1);
    assert_eq!(upvoters[0]["user_id"], kept_id);
}
