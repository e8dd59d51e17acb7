//! Integration tests for the built-in standing and alias commands, driven
//! end to end through dispatch.

mod common;

use adjutant::db::Membership;
use adjutant_store::Record as _;
use common::*;

async fn run(fixture: &mut TestBot, author: i64, channel: i64, command: &str) -> String {
    let msg = message(author, channel, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, command, &msg)
        .await;
    assert!(handled, "no handler ran for `{command}`");
    next_reply(&mut fixture.outbox).await.text
}

async fn bob_membership(fixture: &TestBot) -> Option<Membership> {
    let user = fixture
        .bot
        .db
        .user_by_did(BOB)
        .await
        .expect("lookup user")?;
    fixture
        .bot
        .db
        .membership_of(user.id().expect("row id"), HAVEN)
        .await
        .expect("lookup membership")
}

#[tokio::test]
async fn add_user_grants_admin_standing_here() {
    let mut fixture = test_bot().await;

    let reply = run(&mut fixture, OWNER, HALL, "add user Bob admin").await;
    assert_eq!(reply, "Admin `Bob` added to `haven` successfully");

    let membership = bob_membership(&fixture).await.expect("membership row");
    assert!(membership.admin);
    assert!(!membership.blacklisted);
}

#[tokio::test]
async fn add_user_accepts_mentions_and_rejects_unknowns() {
    let mut fixture = test_bot().await;

    let reply = run(&mut fixture, OWNER, HALL, "add user <@2> blacklist").await;
    assert_eq!(reply, "Blacklist `Bob` added to `haven` successfully");

    let reply = run(&mut fixture, OWNER, HALL, "add user Zo admin").await;
    assert_eq!(reply, "User `Zo` not found");

    let reply = run(&mut fixture, OWNER, HALL, "add user Bob sponsor").await;
    assert_eq!(reply, "Unknown user type `sponsor`");
}

#[tokio::test]
async fn remove_user_cascades_empty_records_away() {
    let mut fixture = test_bot().await;

    run(&mut fixture, OWNER, HALL, "add user Bob admin").await;
    assert!(bob_membership(&fixture).await.is_some());

    let reply = run(&mut fixture, OWNER, HALL, "remove user Bob admin").await;
    assert_eq!(reply, "Admin `Bob` removed from `haven` successfully");

    // The membership held no other standing, so it is gone; the user held
    // no other membership, so it is gone too.
    assert!(bob_membership(&fixture).await.is_none());
    assert!(
        fixture
            .bot
            .db
            .user_by_did(BOB)
            .await
            .expect("lookup")
            .is_none()
    );
}

#[tokio::test]
async fn remove_user_keeps_records_with_remaining_standing() {
    let mut fixture = test_bot().await;

    run(&mut fixture, OWNER, HALL, "add user Bob admin").await;
    run(&mut fixture, OWNER, HALL, "add user Bob blacklist").await;
    run(&mut fixture, OWNER, HALL, "remove user Bob admin").await;

    let membership = bob_membership(&fixture).await.expect("membership survives");
    assert!(!membership.admin);
    assert!(membership.blacklisted);
}

#[tokio::test]
async fn standing_commands_refuse_private_here() {
    let mut fixture = test_bot().await;
    // The owner level reaches the handler anywhere; the handler itself then
    // rejects "here" in a private conversation.
    let reply = run(&mut fixture, OWNER, DM, "add user Bob admin").await;
    assert_eq!(reply, "This command isn't supported in private conversations");
}

#[tokio::test]
async fn list_users_reports_standing_per_guild() {
    let mut fixture = test_bot().await;

    run(&mut fixture, OWNER, HALL, "add user Bob admin").await;
    run(&mut fixture, OWNER, HALL, "add user Mallory blacklist").await;

    let reply = run(&mut fixture, OWNER, HALL, "list users").await;
    assert!(reply.contains("`haven`: `Bob` `admin`"));
    assert!(reply.contains("`haven`: `Mallory` `blacklisted`"));

    let reply = run(&mut fixture, OWNER, HALL, "list users admin").await;
    assert!(reply.contains("Bob"));
    assert!(!reply.contains("Mallory"));

    let reply = run(&mut fixture, OWNER, HALL, "list users both here Zo").await;
    assert_eq!(reply, "No users found.");

    let reply = run(&mut fixture, OWNER, HALL, "list users everything").await;
    assert_eq!(reply, "Unrecognised list type `everything`");
}

#[tokio::test]
async fn alias_commands_round_trip() {
    let mut fixture = test_bot().await;

    let reply = run(&mut fixture, OWNER, HALL, "add alias au add user").await;
    assert_eq!(reply, "Alias `au` now runs `add user`");

    // The alias now dispatches like the canonical command.
    let reply = run(&mut fixture, OWNER, HALL, "au Bob admin").await;
    assert_eq!(reply, "Admin `Bob` added to `haven` successfully");

    let reply = run(&mut fixture, OWNER, HALL, "add alias au add user").await;
    assert_eq!(reply, "Alias `au` already exists");

    let reply = run(&mut fixture, OWNER, HALL, "add alias xx no such thing").await;
    assert_eq!(reply, "Command `no such thing` not found");

    let reply = run(&mut fixture, OWNER, HALL, "list aliases").await;
    assert_eq!(reply, "`au`: `add user`");

    let reply = run(&mut fixture, OWNER, HALL, "remove alias au").await;
    assert_eq!(reply, "Alias `au` removed");
    let reply = run(&mut fixture, OWNER, HALL, "list aliases").await;
    assert_eq!(reply, "No aliases defined.");
}

#[tokio::test]
async fn help_lists_only_what_the_caller_can_reach() {
    let mut fixture = test_bot().await;

    // A plain member sees the user-level commands but not the standing
    // management set.
    let reply = run(&mut fixture, MALLORY, HALL, "help").await;
    assert!(reply.contains("`help"));
    assert!(!reply.contains("add user"));

    let reply = run(&mut fixture, OWNER, HALL, "help").await;
    assert!(reply.contains("add user"));

    let reply = run(&mut fixture, OWNER, HALL, "help add user").await;
    assert!(reply.contains("`add user <username> <usertype>"));
}

#[tokio::test]
async fn say_echoes_the_remaining_text() {
    let mut fixture = test_bot().await;
    let reply = run(&mut fixture, OWNER, HALL, "say all hands meet at noon").await;
    assert_eq!(reply, "all hands meet at noon");
}

#[tokio::test]
async fn directory_listings_respect_filters() {
    let mut fixture = test_bot().await;
    let mut user = fixture.bot.db.ensure_user(OWNER).await.expect("ensure");
    user.global_admin = true;
    fixture.bot.db.users().save(&mut user).await.expect("save");

    let reply = run(&mut fixture, OWNER, HALL, "list all channels").await;
    assert!(reply.contains("Guild: `haven`"));
    assert!(reply.contains("`hall`"));
    assert!(reply.contains("`sidebar`"));

    let reply = run(&mut fixture, OWNER, HALL, "list all channels side").await;
    assert!(reply.contains("`sidebar`"));
    assert!(!reply.contains("`hall`"));

    let reply = run(&mut fixture, OWNER, HALL, "list all users mallory").await;
    assert!(reply.contains("`Mallory`"));
    assert!(!reply.contains("`Bob`"));
}
