mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn group_chat_with_no_guests_is_rejected() -> Result<()> {
    let host = common::login_host("empty-group-host").await?;

    let (status, envelope) = common::send(
        "POST",
        "/chat/group",
        Some(&host.token),
        Some(json!({"guests": []})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["message"], json!("Cannot create an empty group chat"));
    assert_eq!(envelope["body"], json!(null));
    Ok(())
}

#[tokio::test]
async fn group_chat_with_one_guest_is_too_small() -> Result<()> {
    let host = common::login_host("small-group-host").await?;
    let guest = common::login_guest("only-guest", host.user_id).await?;

    let (status, envelope) = common::send(
        "POST",
        "/chat/group",
        Some(&host.token),
        Some(json!({"guests": [guest.user_id]})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        envelope["message"],
        json!("Group chat should have at least 3 members")
    );
    Ok(())
}

#[tokio::test]
async fn group_chat_with_two_guests_returns_projected_chat() -> Result<()> {
    let host = common::login_host("full-group-host").await?;
    let first = common::login_guest("first-guest", host.user_id).await?;
    let second = common::login_guest("second-guest", host.user_id).await?;

    let chat = common::create_group_chat(&host, &[first.user_id, second.user_id]).await?;

    assert!(chat["chat_id"].is_i64());
    assert_eq!(chat["group"], json!(true));
    assert_eq!(chat["name"], json!("Group Chat (3)"));
    assert_eq!(chat["host"]["user_id"], json!(host.user_id));
    let guests = chat["guests"].as_array().cloned().unwrap_or_default();
    assert_eq!(guests.len(), 2);
    assert_eq!(guests[0]["user_id"], json!(first.user_id));
    // Renamed projection: no raw id key alongside chat_id
    assert!(chat.get("id").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicated_guests_are_rejected_as_a_list_error() -> Result<()> {
    let host = common::login_host("dup-group-host").await?;
    let guest = common::login_guest("dup-guest", host.user_id).await?;

    let (status, envelope) = common::send(
        "POST",
        "/chat/group",
        Some(&host.token),
        Some(json!({"guests": [guest.user_id, guest.user_id]})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["message"], json!("duplicated guests"));
    Ok(())
}

#[tokio::test]
async fn unknown_guest_in_list_names_the_element() -> Result<()> {
    let host = common::login_host("missing-guest-host").await?;
    let guest = common::login_guest("present-guest", host.user_id).await?;

    let (status, envelope) = common::send(
        "POST",
        "/chat/group",
        Some(&host.token),
        Some(json!({"guests": [guest.user_id, 88_888_888]})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        envelope["message"],
        json!("User (user id=88888888) does not exist (guests[1])")
    );
    Ok(())
}

#[tokio::test]
async fn only_the_owner_may_delete_a_group_chat() -> Result<()> {
    let host = common::login_host("owner-host").await?;
    let rival = common::login_host("rival-host").await?;
    let a = common::login_guest("owner-guest-a", host.user_id).await?;
    let b = common::login_guest("owner-guest-b", host.user_id).await?;
    let chat = common::create_group_chat(&host, &[a.user_id, b.user_id]).await?;
    let chat_id = chat["chat_id"].as_i64().unwrap_or_default();

    let uri = format!("/chat/group?chat_id={chat_id}");
    let (status, envelope) = common::send("DELETE", &uri, Some(&rival.token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(envelope["message"], json!("You are not the owner of this chat"));

    let (status, envelope) = common::send("DELETE", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["body"], json!(null));

    // Deleted chats no longer resolve
    let (status, envelope) = common::send("DELETE", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        envelope["message"],
        json!(format!("Chat {chat_id} does not exist"))
    );
    Ok(())
}

#[tokio::test]
async fn renaming_requires_a_group_chat_owner() -> Result<()> {
    let host = common::login_host("rename-host").await?;
    let a = common::login_guest("rename-guest-a", host.user_id).await?;
    let b = common::login_guest("rename-guest-b", host.user_id).await?;
    let chat = common::create_group_chat(&host, &[a.user_id, b.user_id]).await?;
    let chat_id = chat["chat_id"].as_i64().unwrap_or_default();

    let uri = format!("/chat/group/name?chat_id={chat_id}");
    let (status, envelope) = common::send(
        "POST",
        &uri,
        Some(&host.token),
        Some(json!({"name": "weekend crew"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["body"]["name"], json!("weekend crew"));
    Ok(())
}

#[tokio::test]
async fn deleting_a_single_chat_as_group_is_rejected() -> Result<()> {
    let host = common::login_host("narrow-host").await?;
    let guest = common::login_guest("narrow-guest", host.user_id).await?;

    let (_, envelope) = common::send("GET", "/chat", Some(&guest.token), None).await?;
    let single_id = envelope["body"][0]["chat_id"].as_i64().unwrap_or_default();

    let uri = format!("/chat/group?chat_id={single_id}");
    let (status, envelope) = common::send("DELETE", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["message"], json!("not a group chat"));
    Ok(())
}

#[tokio::test]
async fn membership_can_be_managed_by_the_owner() -> Result<()> {
    let host = common::login_host("member-mgmt-host").await?;
    let a = common::login_guest("mgmt-guest-a", host.user_id).await?;
    let b = common::login_guest("mgmt-guest-b", host.user_id).await?;
    let c = common::login_guest("mgmt-guest-c", host.user_id).await?;
    let chat = common::create_group_chat(&host, &[a.user_id, b.user_id]).await?;
    let chat_id = chat["chat_id"].as_i64().unwrap_or_default();

    let uri = format!("/chat/guest?chat_id={chat_id}&user_id={}", c.user_id);
    let (status, envelope) = common::send("PUT", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["body"]["guests"].as_array().map(Vec::len), Some(3));

    let (status, envelope) = common::send("DELETE", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["body"]["guests"].as_array().map(Vec::len), Some(2));

    // Removing again: the guest is no longer a member
    let (status, envelope) = common::send("DELETE", &uri, Some(&host.token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        envelope["message"],
        json!("Guest mgmt-guest-c is not a member of the group chat Group Chat (3)")
    );
    Ok(())
}

#[tokio::test]
async fn chat_list_separates_host_and_guest_views() -> Result<()> {
    let host = common::login_host("list-host").await?;
    let a = common::login_guest("list-guest-a", host.user_id).await?;
    let b = common::login_guest("list-guest-b", host.user_id).await?;
    common::create_group_chat(&host, &[a.user_id, b.user_id]).await?;

    // Host sees both singles and the group chat
    let (_, envelope) = common::send("GET", "/chat", Some(&host.token), None).await?;
    let host_chats = envelope["body"].as_array().cloned().unwrap_or_default();
    assert_eq!(host_chats.len(), 3);

    // A guest sees their single chat and the group chat
    let (_, envelope) = common::send("GET", "/chat", Some(&a.token), None).await?;
    let guest_chats = envelope["body"].as_array().cloned().unwrap_or_default();
    assert_eq!(guest_chats.len(), 2);
    Ok(())
}
